//! Engine configuration describing resources, bundles and post-processing defaults.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BundleError, Result};
use crate::hash::HashAlgorithmKind;
use crate::models::{DebugInclusion, InclusionPattern};
use crate::variant::{VariantDimensions, VariantSet};

/// Configuration file searched for by [`EngineConfig::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "bundles.config.json";

/// Kind of resources a configuration bundles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
  /// JavaScript bundles.
  #[default]
  Js,
  /// Stylesheet bundles.
  Css,
}

impl ResourceType {
  /// File extension of the resources, with its leading dot.
  pub fn extension(self) -> &'static str {
    match self {
      Self::Js => ".js",
      Self::Css => ".css",
    }
  }
}

/// Engine-level post-processor chains, as registry keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcessorsConfig {
  /// Applied to each resource of bundles without their own unit chain.
  pub unit: Vec<String>,
  /// Applied to each joined bundle without its own bundle chain.
  pub bundle: Vec<String>,
  /// Applied to each child of composites without their own unit chain.
  pub composite_unit: Vec<String>,
  /// Applied to joined composites without their own bundle chain.
  pub composite_bundle: Vec<String>,
}

impl Default for PostProcessorsConfig {
  fn default() -> Self {
    Self {
      unit: Vec::new(),
      bundle: vec!["license".into()],
      composite_unit: Vec::new(),
      composite_bundle: Vec::new(),
    }
  }
}

/// Declared values of one variant dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSetConfig {
  /// Default value, used when a request doesn't name one.
  pub default: String,
  /// Available values, in order.
  pub values: Vec<String>,
}

/// Declaration of one bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
  /// Unique configuration name.
  pub name: String,
  /// Bundle id, the path the bundle is served under.
  pub id: String,
  /// Mapping specifications, in order.
  pub mappings: Vec<String>,
  /// Rendered on every page.
  pub global: bool,
  /// Order among global bundles.
  pub order: i32,
  /// Only served in debug mode.
  pub debug_only: bool,
  /// Never served in debug mode.
  pub debug_never: bool,
  /// Names of the bundles this one depends on.
  pub dependencies: Vec<String>,
  /// Variant dimensions declared up front.
  pub variants: BTreeMap<String, VariantSetConfig>,
  /// Unit chain overriding the engine default.
  pub unit_post_processors: Vec<String>,
  /// Bundle chain overriding the engine default.
  pub bundle_post_processors: Vec<String>,
  /// Names of child bundles; a non-empty list makes this a composite bundle.
  pub children: Vec<String>,
  /// URL served in production instead of a built artifact.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub alternate_production_url: Option<String>,
}

impl BundleConfig {
  /// Whether this declares a composite bundle.
  pub fn is_composite(&self) -> bool {
    !self.children.is_empty()
  }

  /// Inclusion pattern built from the flags.
  pub fn inclusion(&self) -> Result<InclusionPattern> {
    let debug = DebugInclusion::from_flags(&self.name, self.debug_only, self.debug_never)?;
    Ok(InclusionPattern::new(self.global, self.order, debug))
  }

  /// Declared variant dimensions.
  pub fn variant_dimensions(&self) -> Result<VariantDimensions> {
    self
      .variants
      .iter()
      .map(|(dimension, set)| {
        let set = VariantSet::new(dimension, &set.default, set.values.iter().cloned())?;
        Ok((dimension.clone(), set))
      })
      .collect()
  }
}

/// Discoverable engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Kind of bundled resources.
  pub resource_type: ResourceType,
  /// Directory resources are read from, relative to the configuration file.
  pub resource_root: String,
  /// Directory artifacts are written to, relative to the configuration file.
  pub output_dir: String,
  /// Name of the JSON snapshot written next to the artifacts.
  pub mapping_file: String,
  /// Digest used for cache-busting tokens.
  pub hash_algorithm: HashAlgorithmKind,
  /// Roots bundle ids and orphans may not live under.
  pub reserved_roots: Vec<String>,
  /// Turn unmapped resources into bundles.
  pub scan_for_orphans: bool,
  /// Directory scanned for orphans.
  pub orphan_base_dir: String,
  /// Id of a single bundle gathering every orphan, instead of one bundle per orphan.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub single_orphan_bundle: Option<String>,
  /// Prefixes of generated resource paths, such as `messages:`.
  pub generator_prefixes: Vec<String>,
  /// Engine-level post-processor chains.
  pub post_processors: PostProcessorsConfig,
  /// Optional JSON file selecting which bundles get built.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub selection_file: Option<String>,
  /// Declared bundles, in order.
  pub bundles: Vec<BundleConfig>,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      resource_type: ResourceType::Js,
      resource_root: ".".into(),
      output_dir: "target/bundles".into(),
      mapping_file: "bundle-mapping.json".into(),
      hash_algorithm: HashAlgorithmKind::Sha256,
      reserved_roots: vec!["/WEB-INF/".into(), "/META-INF/".into()],
      scan_for_orphans: false,
      orphan_base_dir: "/".into(),
      single_orphan_bundle: None,
      generator_prefixes: Vec::new(),
      post_processors: PostProcessorsConfig::default(),
      selection_file: None,
      bundles: Vec::new(),
    }
  }
}

impl EngineConfig {
  /// Load `bundles.config.json` from `dir`, or defaults when the file doesn't exist.
  pub fn discover(dir: &Path) -> Result<Self> {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    match Self::load(&candidate) {
      Err(BundleError::ConfigIo { source, .. }) if source.kind() == ErrorKind::NotFound => {
        Ok(Self::default())
      }
      other => other,
    }
  }

  /// Read a JSON or YAML configuration, chosen by extension.
  pub fn load(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path).map_err(|source| BundleError::ConfigIo {
      path: path.to_path_buf(),
      source,
    })?;

    let is_yaml = matches!(
      path.extension().and_then(|ext| ext.to_str()),
      Some("yaml" | "yml")
    );
    let parsed = if is_yaml {
      serde_yaml::from_str(&content).map_err(|err| err.to_string())
    } else {
      serde_json::from_str(&content).map_err(|err| err.to_string())
    };

    parsed.map_err(|message| BundleError::ConfigParse {
      path: path.to_path_buf(),
      message,
    })
  }

  /// Digest of the whole configuration, used to notice edits between builds.
  pub fn digest(&self) -> Result<String> {
    let canonical = serde_json::to_string(self).map_err(|err| BundleError::Io(err.into()))?;
    Ok(self.hash_algorithm.algorithm().digest(&canonical))
  }

  /// Resource extension, with its leading dot.
  pub fn extension(&self) -> &'static str {
    self.resource_type.extension()
  }

  /// Resource root resolved against `base_dir`.
  pub fn resource_root_path(&self, base_dir: &Path) -> PathBuf {
    base_dir.join(&self.resource_root)
  }

  /// Output directory resolved against `base_dir`.
  pub fn output_dir_path(&self, base_dir: &Path) -> PathBuf {
    base_dir.join(&self.output_dir)
  }

  /// Selection file resolved against `base_dir`, when configured.
  pub fn selection_file_path(&self, base_dir: &Path) -> Option<PathBuf> {
    self
      .selection_file
      .as_ref()
      .map(|file| base_dir.join(file))
  }
}
