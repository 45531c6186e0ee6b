use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::bundle_set::BundleSet;
use crate::bundle_set::definition::{Bundle, BundleDefinition, CompositeBundle};
use crate::config::{BundleConfig, EngineConfig};
use crate::dependency::{DependencyNode, DependencyResolver};
use crate::error::{BundleError, Result};
use crate::models::{BundlePath, InclusionPattern};
use crate::paths::{PathMapping, PathResolver, ResolvedPaths, as_dir_path};
use crate::postprocess::PostProcessorRegistry;
use crate::resource::{GeneratorRegistry, ResourceReader};
use crate::variant::merge_dimensions;

/// Turns an [`EngineConfig`] into a validated, path-resolved [`BundleSet`].
pub struct BundleFactory<'a> {
  config: &'a EngineConfig,
  reader: &'a dyn ResourceReader,
  generators: &'a dyn GeneratorRegistry,
  registry: &'a PostProcessorRegistry,
}

impl<'a> BundleFactory<'a> {
  /// Create a factory.
  pub fn new(
    config: &'a EngineConfig,
    reader: &'a dyn ResourceReader,
    generators: &'a dyn GeneratorRegistry,
    registry: &'a PostProcessorRegistry,
  ) -> Self {
    Self {
      config,
      reader,
      generators,
      registry,
    }
  }

  /// Build every configured bundle, then orphans, then resolve dependencies.
  pub fn build(&self) -> Result<BundleSet> {
    let mut by_name: BTreeMap<&str, &BundleConfig> = BTreeMap::new();
    for bundle in &self.config.bundles {
      if by_name.insert(bundle.name.as_str(), bundle).is_some() {
        return Err(BundleError::DuplicateName(bundle.name.clone()));
      }
    }

    let child_names: BTreeSet<&str> = self
      .config
      .bundles
      .iter()
      .flat_map(|bundle| bundle.children.iter().map(String::as_str))
      .collect();

    for config in self.config.bundles.iter().filter(|bundle| bundle.is_composite()) {
      check_nesting(config, &by_name, &mut vec![config.name.as_str()])?;
    }

    let resolver = PathResolver::new(self.reader, self.generators, self.config.extension());
    let mut bundles = Vec::new();
    for config in &self.config.bundles {
      if child_names.contains(config.name.as_str()) {
        continue;
      }
      bundles.push(self.build_bundle(config, &by_name, &resolver)?);
    }

    if self.config.scan_for_orphans {
      let orphans = self.orphan_bundles(&bundles)?;
      info!(orphans = orphans.len(), "orphan bundles created");
      bundles.extend(orphans);
    }

    resolve_dependencies(&mut bundles)?;
    Ok(BundleSet::new(bundles))
  }

  fn build_bundle(
    &self,
    config: &BundleConfig,
    by_name: &BTreeMap<&str, &BundleConfig>,
    resolver: &PathResolver<'_>,
  ) -> Result<Bundle> {
    self.validate_id(&config.name, &config.id)?;
    debug!(bundle = %config.name, id = %config.id, "creating bundle");

    let inclusion = config.inclusion()?;
    let mut definition =
      BundleDefinition::new(&config.id, &config.name, self.config.extension(), inclusion);
    definition.dependencies = config.dependencies.clone();
    definition.variants = config.variant_dimensions()?;
    definition.alternate_production_url = config.alternate_production_url.clone();
    definition.unit_post_processor = self
      .registry
      .chain(&config.name, &config.unit_post_processors)?;
    definition.bundle_post_processor = self
      .registry
      .chain(&config.name, &config.bundle_post_processors)?;

    if !config.is_composite() {
      definition.mappings = config
        .mappings
        .iter()
        .map(|mapping| PathMapping::parse(mapping))
        .collect();
      definition.paths = resolver.resolve(&config.name, &config.id, &definition.mappings, inclusion)?;
      return Ok(Bundle::Simple(definition));
    }

    let mut children = Vec::with_capacity(config.children.len());
    for child_name in &config.children {
      let child = by_name.get(child_name.as_str()).ok_or_else(|| {
        BundleError::dependency(&config.name, format!("unknown child bundle '{child_name}'"))
      })?;
      children.push(self.build_bundle(child, by_name, resolver)?);
    }

    let mut paths = ResolvedPaths::default();
    for child in &children {
      let child_paths = &child.definition().paths;
      paths.items.extend(child_paths.items.iter().cloned());
      paths.debug_items.extend(child_paths.debug_items.iter().cloned());
      paths.licenses.extend(child_paths.licenses.iter().cloned());
      paths.sort_files.extend(child_paths.sort_files.iter().cloned());
      definition.variants = merge_dimensions(&definition.variants, &child.definition().variants)?;
    }
    definition.paths = paths;

    Ok(Bundle::Composite(CompositeBundle {
      definition,
      children,
    }))
  }

  fn validate_id(&self, name: &str, id: &str) -> Result<()> {
    let extension = self.config.extension();
    if !self.generators.is_generated_path(id) && !id.ends_with(extension) {
      return Err(BundleError::InvalidExtension {
        bundle: name.to_string(),
        id: id.to_string(),
        extension: extension.to_string(),
      });
    }

    if let Some(root) = self
      .config
      .reserved_roots
      .iter()
      .find(|root| id.starts_with(root.as_str()))
    {
      return Err(BundleError::ReservedRoot {
        bundle: name.to_string(),
        id: id.to_string(),
        root: root.clone(),
      });
    }
    Ok(())
  }

  fn orphan_bundles(&self, bundles: &[Bundle]) -> Result<Vec<Bundle>> {
    let extension = self.config.extension();
    let resolver = PathResolver::for_orphans(
      self.reader,
      self.generators,
      extension,
      &self.config.reserved_roots,
    );
    let base = format!("{}**", as_dir_path(&self.config.orphan_base_dir));
    let resolved = resolver.resolve("orphans", &base, &[PathMapping::parse(&base)], InclusionPattern::default())?;

    let orphans: Vec<BundlePath> = resolved
      .items
      .into_iter()
      .filter(|path| !bundles.iter().any(|bundle| bundle.contains_path(&path.path)))
      .collect();
    let id_taken = |id: &str| bundles.iter().any(|bundle| bundle.id() == id);

    if let Some(single_id) = &self.config.single_orphan_bundle {
      if orphans.is_empty() {
        return Ok(Vec::new());
      }
      let id = if single_id.ends_with(extension) {
        single_id.clone()
      } else {
        format!("{single_id}{extension}")
      };
      if id_taken(&id) {
        return Err(BundleError::DuplicateBundlePath(id));
      }

      let mut definition = BundleDefinition::new(&id, &id, extension, InclusionPattern::default());
      definition.mappings = orphans.iter().map(|path| PathMapping::parse(&path.path)).collect();
      definition.paths = ResolvedPaths {
        items: orphans.clone(),
        debug_items: orphans,
        licenses: resolved.licenses,
        sort_files: resolved.sort_files,
      };
      return Ok(vec![Bundle::Simple(definition)]);
    }

    orphans
      .into_iter()
      .map(|orphan| {
        if id_taken(&orphan.path) {
          return Err(BundleError::DuplicateBundlePath(orphan.path));
        }
        debug!(path = %orphan.path, "creating orphan bundle");
        let mut definition =
          BundleDefinition::new(&orphan.path, &orphan.path, extension, InclusionPattern::default());
        definition.mappings = vec![PathMapping::parse(&orphan.path)];
        definition.paths.items = vec![orphan.clone()];
        definition.paths.debug_items = vec![orphan];
        Ok(Bundle::Simple(definition))
      })
      .collect()
  }
}

/// Fails when a composite contains itself, directly or through nested composites.
fn check_nesting<'c>(
  config: &'c BundleConfig,
  by_name: &BTreeMap<&'c str, &'c BundleConfig>,
  nesting: &mut Vec<&'c str>,
) -> Result<()> {
  for child_name in &config.children {
    if nesting.contains(&child_name.as_str()) {
      return Err(BundleError::dependency(
        &config.name,
        format!("composite bundle '{child_name}' contains itself"),
      ));
    }
    if let Some(child) = by_name.get(child_name.as_str()).copied() {
      nesting.push(child_name.as_str());
      check_nesting(child, by_name, nesting)?;
      nesting.pop();
    }
  }
  Ok(())
}

fn resolve_dependencies(bundles: &mut [Bundle]) -> Result<()> {
  let nodes: Vec<DependencyNode> = bundles
    .iter()
    .map(|bundle| {
      let definition = bundle.definition();
      DependencyNode::new(
        definition.name.clone(),
        definition.inclusion.global,
        definition.dependencies.clone(),
      )
    })
    .collect();

  let mut resolved = DependencyResolver::new(&nodes).resolve_all()?;
  for bundle in bundles.iter_mut() {
    let dependencies = resolved.remove(bundle.name()).unwrap_or_default();
    bundle.definition_mut().resolved_dependencies = dependencies;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::DebugInclusion;
  use crate::resource::{MemoryResourceReader, NoGenerators};

  fn bundle(name: &str, id: &str, mappings: &[&str]) -> BundleConfig {
    BundleConfig {
      name: name.into(),
      id: id.into(),
      mappings: mappings.iter().map(|m| m.to_string()).collect(),
      ..BundleConfig::default()
    }
  }

  fn reader() -> MemoryResourceReader {
    MemoryResourceReader::new()
      .with_file("/js/lib/a.js", "a")
      .with_file("/js/lib/b.js", "b")
      .with_file("/js/app/main.js", "main")
      .with_file("/js/loose.js", "loose")
      .with_file("/WEB-INF/secret.js", "secret")
  }

  fn build(config: &EngineConfig, reader: &MemoryResourceReader) -> Result<BundleSet> {
    let registry = PostProcessorRegistry::with_builtins()?;
    BundleFactory::new(config, reader, &NoGenerators, &registry).build()
  }

  #[test]
  fn builds_bundles_and_resolves_dependencies() {
    let mut app = bundle("app", "/app.js", &["/js/app/"]);
    app.dependencies = vec!["lib".into()];
    let config = EngineConfig {
      bundles: vec![bundle("lib", "/lib.js", &["/js/lib/**"]), app],
      ..EngineConfig::default()
    };

    let set = build(&config, &reader()).unwrap();
    let app = set.by_name("app").unwrap().definition();
    assert_eq!(app.resolved_dependencies, vec!["lib"]);
    assert_eq!(set.get("/lib.js").unwrap().definition().paths.items.len(), 2);
  }

  #[test]
  fn rejects_bad_ids_and_duplicate_names() {
    let reader = reader();
    let config = EngineConfig {
      bundles: vec![bundle("lib", "/lib.css", &["/js/lib/"])],
      ..EngineConfig::default()
    };
    assert!(matches!(build(&config, &reader), Err(BundleError::InvalidExtension { .. })));

    let config = EngineConfig {
      bundles: vec![bundle("lib", "/WEB-INF/lib.js", &["/js/lib/"])],
      ..EngineConfig::default()
    };
    assert!(matches!(build(&config, &reader), Err(BundleError::ReservedRoot { .. })));

    let config = EngineConfig {
      bundles: vec![
        bundle("lib", "/lib.js", &["/js/lib/"]),
        bundle("lib", "/lib2.js", &["/js/lib/"]),
      ],
      ..EngineConfig::default()
    };
    assert!(matches!(build(&config, &reader), Err(BundleError::DuplicateName(name)) if name == "lib"));
  }

  #[test]
  fn composites_own_their_children() {
    let mut all = bundle("all", "/all.js", &[]);
    all.children = vec!["lib".into(), "app".into()];
    let mut app = bundle("app", "/app.js", &["/js/app/"]);
    app.debug_only = true;
    app.variants.insert(
      "locale".into(),
      crate::config::VariantSetConfig {
        default: "en".into(),
        values: vec!["en".into(), "fr".into()],
      },
    );
    let config = EngineConfig {
      bundles: vec![all, bundle("lib", "/lib.js", &["/js/lib/"]), app],
      ..EngineConfig::default()
    };

    let set = build(&config, &reader()).unwrap();
    assert_eq!(set.len(), 1);
    let all = set.get("/all.js").unwrap();
    assert_eq!(all.children().len(), 2);
    assert_eq!(
      all.children()[1].definition().inclusion.debug_inclusion,
      DebugInclusion::Only
    );
    assert!(all.definition().variants.contains_key("locale"));
    assert_eq!(all.definition().paths.items.len(), 2);
    assert_eq!(all.definition().paths.debug_items.len(), 3);
  }

  #[test]
  fn composites_nested_in_each_other_are_rejected() {
    let mut outer = bundle("a", "/a.js", &[]);
    outer.children = vec!["b".into()];
    let mut inner = bundle("b", "/b.js", &[]);
    inner.children = vec!["a".into()];
    let config = EngineConfig {
      bundles: vec![outer, inner],
      ..EngineConfig::default()
    };
    assert!(matches!(build(&config, &reader()), Err(BundleError::Dependency { .. })));

    let mut itself = bundle("self", "/self.js", &[]);
    itself.children = vec!["self".into()];
    let config = EngineConfig {
      bundles: vec![itself],
      ..EngineConfig::default()
    };
    assert!(matches!(build(&config, &reader()), Err(BundleError::Dependency { .. })));
  }

  #[test]
  fn orphans_become_bundles_outside_reserved_roots() {
    let config = EngineConfig {
      scan_for_orphans: true,
      bundles: vec![bundle("lib", "/lib.js", &["/js/lib/"])],
      ..EngineConfig::default()
    };
    let set = build(&config, &reader()).unwrap();
    let ids: Vec<&str> = set.iter().map(Bundle::id).collect();
    assert_eq!(ids, vec!["/lib.js", "/js/loose.js", "/js/app/main.js"]);

    let config = EngineConfig {
      scan_for_orphans: true,
      single_orphan_bundle: Some("/orphans".into()),
      bundles: vec![bundle("lib", "/lib.js", &["/js/lib/"])],
      ..EngineConfig::default()
    };
    let set = build(&config, &reader()).unwrap();
    let orphans = set.get("/orphans.js").unwrap().definition();
    assert_eq!(orphans.paths.items.len(), 2);
  }

  #[test]
  fn orphan_colliding_with_bundle_id_fails() {
    let config = EngineConfig {
      scan_for_orphans: true,
      bundles: vec![bundle("loose", "/js/loose.js", &["/js/lib/"])],
      ..EngineConfig::default()
    };
    assert!(matches!(
      build(&config, &reader()),
      Err(BundleError::DuplicateBundlePath(path)) if path == "/js/loose.js"
    ));
  }
}
