use std::collections::BTreeSet;

use crate::models::{BundlePath, InclusionPattern};
use crate::paths::{PathMapping, ResolvedPaths};
use crate::postprocess::PostProcessorChain;
use crate::variant::VariantDimensions;

/// Configuration and resolved state shared by simple and composite bundles.
#[derive(Debug, Clone)]
pub struct BundleDefinition {
  /// Path the bundle is served under.
  pub id: String,
  /// Unique configuration name.
  pub name: String,
  /// Resource extension, with its leading dot.
  pub file_extension: String,
  /// Rendering rules.
  pub inclusion: InclusionPattern,
  /// Mapping specifications the paths were resolved from.
  pub mappings: Vec<PathMapping>,
  /// Resolved production/debug paths and licenses.
  pub paths: ResolvedPaths,
  /// Variant dimensions; grows when post-processors discover new ones.
  pub variants: VariantDimensions,
  /// Declared dependency names.
  pub dependencies: Vec<String>,
  /// Flattened dependency names, dependencies first.
  pub resolved_dependencies: Vec<String>,
  /// Unit chain overriding the default one.
  pub unit_post_processor: Option<PostProcessorChain>,
  /// Bundle chain overriding the default one.
  pub bundle_post_processor: Option<PostProcessorChain>,
  /// URL served in production instead of the built artifact.
  pub alternate_production_url: Option<String>,
}

impl BundleDefinition {
  /// Definition with no paths, variants or dependencies yet.
  pub fn new(id: &str, name: &str, file_extension: &str, inclusion: InclusionPattern) -> Self {
    Self {
      id: id.to_string(),
      name: name.to_string(),
      file_extension: file_extension.to_string(),
      inclusion,
      mappings: Vec::new(),
      paths: ResolvedPaths::default(),
      variants: VariantDimensions::new(),
      dependencies: Vec::new(),
      resolved_dependencies: Vec::new(),
      unit_post_processor: None,
      bundle_post_processor: None,
      alternate_production_url: None,
    }
  }

  /// Paths joined into an artifact: the debug list for debug-only bundles.
  pub fn joined_paths(&self) -> &[BundlePath] {
    if self.inclusion.includes_in_production() {
      &self.paths.items
    } else {
      &self.paths.debug_items
    }
  }

  /// Whether `path` is one of the resolved resources.
  pub fn contains_path(&self, path: &str) -> bool {
    self
      .paths
      .items
      .iter()
      .chain(&self.paths.debug_items)
      .any(|item| item.path == path)
  }
}

/// Bundle whose content is the concatenation of its children.
#[derive(Debug, Clone)]
pub struct CompositeBundle {
  /// Composite configuration; its paths mirror the children's.
  pub definition: BundleDefinition,
  /// Children in declaration order.
  pub children: Vec<Bundle>,
}

/// A simple bundle backed by mappings, or a composite of other bundles.
#[derive(Debug, Clone)]
pub enum Bundle {
  /// Bundle resolved from path mappings.
  Simple(BundleDefinition),
  /// Bundle made of child bundles.
  Composite(CompositeBundle),
}

impl Bundle {
  /// Shared definition.
  pub fn definition(&self) -> &BundleDefinition {
    match self {
      Self::Simple(definition) => definition,
      Self::Composite(composite) => &composite.definition,
    }
  }

  /// Mutable shared definition.
  pub fn definition_mut(&mut self) -> &mut BundleDefinition {
    match self {
      Self::Simple(definition) => definition,
      Self::Composite(composite) => &mut composite.definition,
    }
  }

  /// Bundle id.
  pub fn id(&self) -> &str {
    &self.definition().id
  }

  /// Bundle name.
  pub fn name(&self) -> &str {
    &self.definition().name
  }

  /// Children of a composite; empty for simple bundles.
  pub fn children(&self) -> &[Bundle] {
    match self {
      Self::Simple(_) => &[],
      Self::Composite(composite) => &composite.children,
    }
  }

  /// Whether this is a composite bundle.
  pub fn is_composite(&self) -> bool {
    matches!(self, Self::Composite(_))
  }

  /// License files of the bundle and of every nested child.
  pub fn licenses(&self) -> BTreeSet<String> {
    let mut licenses = self.definition().paths.licenses.clone();
    for child in self.children() {
      licenses.extend(child.licenses());
    }
    licenses
  }

  /// Whether `path` belongs to this bundle or one of its children.
  pub fn contains_path(&self, path: &str) -> bool {
    self.definition().contains_path(path)
      || self.children().iter().any(|child| child.contains_path(path))
  }

  /// Paths served one by one in debug mode, composites expanding their children.
  pub fn debug_paths(&self) -> Vec<BundlePath> {
    match self {
      Self::Simple(definition) => definition.paths.debug_items.clone(),
      Self::Composite(composite) => composite
        .children
        .iter()
        .filter(|child| child.definition().inclusion.includes_in_debug())
        .flat_map(Bundle::debug_paths)
        .collect(),
    }
  }
}
