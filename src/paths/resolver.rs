//! Expansion of mapping specifications into ordered resource paths.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{BundleError, Result};
use crate::models::{BundlePath, InclusionPattern};
use crate::paths::mapping::{PathMapping, PathMappingKind};
use crate::paths::normalize::{as_path, join_paths};
use crate::paths::sorting::{SORT_FILE_NAME, parse_sort_file};
use crate::resource::{GeneratorRegistry, ResourceReader};

/// Name of the license file collected next to bundled resources.
pub const LICENSE_FILE_NAME: &str = ".license";

/// Ordered paths of a bundle, split per serving mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
  /// Paths joined into the production artifact.
  pub items: Vec<BundlePath>,
  /// Paths served one by one in debug mode.
  pub debug_items: Vec<BundlePath>,
  /// License files found while expanding the mappings.
  pub licenses: BTreeSet<String>,
  /// Sort files that decided the order of the paths.
  pub sort_files: BTreeSet<String>,
}

/// Expands mappings against a [`ResourceReader`].
pub struct PathResolver<'a> {
  reader: &'a dyn ResourceReader,
  generators: &'a dyn GeneratorRegistry,
  extension: String,
  excluded_roots: Vec<String>,
}

impl<'a> PathResolver<'a> {
  /// Resolver for explicitly configured bundles.
  pub fn new(
    reader: &'a dyn ResourceReader,
    generators: &'a dyn GeneratorRegistry,
    extension: &str,
  ) -> Self {
    Self {
      reader,
      generators,
      extension: normalize_extension(extension),
      excluded_roots: Vec::new(),
    }
  }

  /// Resolver used to discover orphan resources; it never descends into `reserved_roots`.
  pub fn for_orphans(
    reader: &'a dyn ResourceReader,
    generators: &'a dyn GeneratorRegistry,
    extension: &str,
    reserved_roots: &[String],
  ) -> Self {
    Self {
      excluded_roots: reserved_roots.to_vec(),
      ..Self::new(reader, generators, extension)
    }
  }

  /// Extension accepted for single assets, including the leading dot.
  pub fn extension(&self) -> &str {
    &self.extension
  }

  /// Expand `mappings` in order for the bundle `bundle_name` (`bundle_id`).
  pub fn resolve(
    &self,
    bundle_name: &str,
    bundle_id: &str,
    mappings: &[PathMapping],
    inclusion: InclusionPattern,
  ) -> Result<ResolvedPaths> {
    debug!(bundle = bundle_id, "creating bundle path list");

    let mut collector = PathCollector {
      resolver: self,
      bundle_name,
      bundle_id,
      inclusion,
      paths: ResolvedPaths::default(),
    };

    for mapping in mappings {
      collector.add_mapping(mapping)?;
    }

    debug!(
      bundle = bundle_id,
      files = collector.paths.items.len(),
      licenses = collector.paths.licenses.len(),
      "finished creating bundle path list"
    );
    Ok(collector.paths)
  }

  fn is_excluded(&self, path: &str) -> bool {
    self
      .excluded_roots
      .iter()
      .any(|root| path.starts_with(root.as_str()))
  }
}

struct PathCollector<'r, 'a> {
  resolver: &'r PathResolver<'a>,
  bundle_name: &'r str,
  bundle_id: &'r str,
  inclusion: InclusionPattern,
  paths: ResolvedPaths,
}

impl PathCollector<'_, '_> {
  fn add_mapping(&mut self, mapping: &PathMapping) -> Result<()> {
    let resolver = self.resolver;
    let raw = mapping.raw();
    let generated = resolver.generators.is_generated_path(raw);

    match mapping.kind() {
      PathMappingKind::Directory => self.add_items_from_dir(mapping.path(), false),
      PathMappingKind::RecursiveDirectory => self.add_items_from_dir(mapping.path(), true),
      PathMappingKind::Asset if raw.ends_with(resolver.extension.as_str()) => {
        self.add_path(&as_resource_path(raw, generated), generated);
        Ok(())
      }
      PathMappingKind::Asset if generated => {
        self.add_path(raw, true);
        Ok(())
      }
      PathMappingKind::Asset if raw.ends_with(LICENSE_FILE_NAME) => {
        self.paths.licenses.insert(as_resource_path(raw, generated));
        Ok(())
      }
      PathMappingKind::Asset => Err(BundleError::InvalidMapping {
        bundle: self.bundle_name.to_string(),
        mapping: raw.to_string(),
      }),
    }
  }

  /// Single gate every accepted path goes through.
  fn add_path(&mut self, path: &str, generated: bool) {
    if self.resolver.is_excluded(path) {
      return;
    }

    let bundle_path = if generated {
      BundlePath::generated(path, self.bundle_id)
    } else {
      BundlePath::new(path)
    };

    if self.inclusion.includes_in_production() {
      self.paths.items.push(bundle_path.clone());
    }
    if self.inclusion.includes_in_debug() {
      self.paths.debug_items.push(bundle_path);
    }
  }

  fn is_asset(&self, path: &str) -> bool {
    path.ends_with(self.resolver.extension.as_str())
      || (!path.ends_with('/') && self.resolver.generators.is_generated_path(path))
  }

  fn add_items_from_dir(&mut self, dir: &str, recursive: bool) -> Result<()> {
    let resolver = self.resolver;
    if resolver.is_excluded(dir) {
      return Ok(());
    }

    let generated = resolver.generators.is_generated_path(dir);
    let mut names = resolver.reader.list_names(dir);
    debug!(
      bundle = self.bundle_id,
      dir,
      resources = names.len(),
      "adding resources from directory"
    );

    if names.remove(SORT_FILE_NAME) {
      let sort_path = join_paths(dir, SORT_FILE_NAME, generated);
      let content = resolver
        .reader
        .read(&sort_path)
        .map_err(|source| BundleError::Resource {
          bundle: self.bundle_name.to_string(),
          source,
        })?;
      self.paths.sort_files.insert(sort_path);

      for path in parse_sort_file(&content, &mut names, dir, &resolver.extension, generated) {
        if self.is_asset(&path) {
          debug!(bundle = self.bundle_id, path = %path, "added from sorting file");
          self.add_path(&path, generated);
        } else if recursive && resolver.reader.is_directory(&path) {
          self.add_items_from_dir(&path, true)?;
        }
      }
    }

    if names.remove(LICENSE_FILE_NAME) {
      self
        .paths
        .licenses
        .insert(join_paths(dir, LICENSE_FILE_NAME, generated));
    }

    // Sub-directories come after the files of this level unless the sort file says otherwise.
    let mut folders = Vec::new();
    for name in &names {
      let path = join_paths(dir, name, generated);
      let is_dir = resolver.reader.is_directory(&path);
      if is_dir {
        if recursive {
          folders.push(join_paths(dir, &format!("{name}/"), generated));
        }
      } else if self.is_asset(&path) {
        self.add_path(&path, generated);
      }
    }

    for folder in folders {
      self.add_items_from_dir(&folder, true)?;
    }

    Ok(())
  }
}

fn as_resource_path(path: &str, generated: bool) -> String {
  if generated {
    path.to_string()
  } else {
    as_path(path)
  }
}

fn normalize_extension(extension: &str) -> String {
  if extension.is_empty() || extension.starts_with('.') {
    extension.to_string()
  } else {
    format!(".{extension}")
  }
}
