//! Serializable record of a build, used to skip rebuilding unchanged bundles.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::bundle_set::Bundle;
use crate::error::{BundleError, Result};
use crate::hash::{HashAlgorithmKind, HashVersioner};
use crate::models::InclusionPattern;
use crate::resource::ResourceReader;
use crate::variant::VariantDimensions;

/// A resource path with the modification stamp it had when built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStamp {
  /// Resource path.
  pub path: String,
  /// Seconds since the epoch, when the reader knows it.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_modified: Option<u64>,
}

impl ResourceStamp {
  /// Stamp `path` as the reader sees it now.
  pub fn capture(path: &str, reader: &dyn ResourceReader) -> Self {
    Self {
      path: path.to_string(),
      last_modified: reader.last_modified(path),
    }
  }

  /// Resources without a known stamp count as changed.
  pub fn is_current(&self, reader: &dyn ResourceReader) -> bool {
    self.last_modified.is_some() && self.last_modified == reader.last_modified(&self.path)
  }
}

/// Everything needed to restore one bundle without rebuilding it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSnapshot {
  /// Bundle id.
  pub id: String,
  /// Bundle name.
  pub name: String,
  /// Rendering rules.
  pub inclusion: InclusionPattern,
  /// Resources joined into the artifact, with their stamps.
  pub items: Vec<ResourceStamp>,
  /// Debug resources.
  pub debug_items: Vec<String>,
  /// License files, stamped since they end up in the artifact.
  pub licenses: Vec<ResourceStamp>,
  /// Sort files that ordered the resources.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub sort_files: Vec<ResourceStamp>,
  /// Variant dimensions, including discovered ones.
  pub variants: VariantDimensions,
  /// Resolved dependency names.
  pub dependencies: Vec<String>,
  /// Child bundle ids of a composite.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub children: Vec<String>,
  /// Hash of the unvaried artifact.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hash: Option<String>,
  /// Hash per variant key.
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub variant_hashes: BTreeMap<String, String>,
  /// URL served instead of a built artifact.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub alternate_production_url: Option<String>,
}

impl BundleSnapshot {
  /// Capture the current state of `bundle`.
  pub fn capture(bundle: &Bundle, versioner: &HashVersioner, reader: &dyn ResourceReader) -> Self {
    let definition = bundle.definition();
    Self {
      id: definition.id.clone(),
      name: definition.name.clone(),
      inclusion: definition.inclusion,
      items: definition
        .joined_paths()
        .iter()
        .map(|item| ResourceStamp::capture(&item.path, reader))
        .collect(),
      debug_items: definition
        .paths
        .debug_items
        .iter()
        .map(|item| item.path.clone())
        .collect(),
      licenses: bundle
        .licenses()
        .iter()
        .map(|path| ResourceStamp::capture(path, reader))
        .collect(),
      sort_files: definition
        .paths
        .sort_files
        .iter()
        .map(|path| ResourceStamp::capture(path, reader))
        .collect(),
      variants: definition.variants.clone(),
      dependencies: definition.resolved_dependencies.clone(),
      children: bundle.children().iter().map(|child| child.id().to_string()).collect(),
      hash: versioner.hash_of(&definition.id, None).map(str::to_string),
      variant_hashes: versioner.variant_hashes(&definition.id),
      alternate_production_url: definition.alternate_production_url.clone(),
    }
  }

  /// Whether every resource, license and sort file still carries the stamp recorded at build
  /// time.
  pub fn is_up_to_date(&self, reader: &dyn ResourceReader) -> bool {
    self
      .items
      .iter()
      .chain(&self.licenses)
      .chain(&self.sort_files)
      .all(|stamp| stamp.is_current(reader))
  }
}

/// Snapshot of every bundle of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSnapshot {
  /// Digest the hashes were computed with.
  pub hash_algorithm: HashAlgorithmKind,
  /// Digest of the configuration the build ran with.
  #[serde(default)]
  pub config_digest: String,
  /// Bundles in declaration order.
  pub bundles: Vec<BundleSnapshot>,
}

impl BuildSnapshot {
  /// Snapshot of `id`.
  pub fn bundle(&self, id: &str) -> Option<&BundleSnapshot> {
    self.bundles.iter().find(|bundle| bundle.id == id)
  }

  /// Whether the configuration digest still matches and no bundle changed since the snapshot
  /// was taken.
  pub fn is_up_to_date(&self, config_digest: &str, reader: &dyn ResourceReader) -> bool {
    self.config_digest == config_digest
      && self.bundles.iter().all(|bundle| bundle.is_up_to_date(reader))
  }

  /// Pretty JSON representation.
  pub fn to_json(&self) -> Result<String> {
    serde_json::to_string_pretty(self).map_err(|err| BundleError::Io(err.into()))
  }

  /// Write the snapshot as JSON.
  pub fn write(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(path, self.to_json()?)?;
    Ok(())
  }

  /// Read a snapshot written by [`BuildSnapshot::write`].
  pub fn load(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path).map_err(|source| BundleError::ConfigIo {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|err| BundleError::ConfigParse {
      path: path.to_path_buf(),
      message: err.to_string(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bundle_set::BundleDefinition;
  use crate::models::{BundlePath, DebugInclusion};
  use crate::resource::{FsResourceReader, MemoryResourceReader};
  use std::fs::File;
  use std::time::{Duration, SystemTime};

  fn bundle(path: &str, debug_inclusion: DebugInclusion) -> Bundle {
    let inclusion = InclusionPattern::new(false, 0, debug_inclusion);
    let mut definition = BundleDefinition::new("/lib.js", "lib", ".js", inclusion);
    let resource = BundlePath::new(path);
    if inclusion.includes_in_production() {
      definition.paths.items.push(resource.clone());
    }
    if inclusion.includes_in_debug() {
      definition.paths.debug_items.push(resource);
    }
    Bundle::Simple(definition)
  }

  fn write_stamped(root: &Path, path: &str, content: &str, secs: u64) -> std::io::Result<()> {
    let file = root.join(path.trim_start_matches('/'));
    if let Some(parent) = file.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&file, content)?;
    File::options()
      .write(true)
      .open(&file)?
      .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
  }

  #[test]
  fn captures_hashes_and_stamps() -> std::io::Result<()> {
    let temp = tempfile::tempdir()?;
    write_stamped(temp.path(), "/js/a.js", "var a;", 1_000)?;
    let reader = FsResourceReader::new(temp.path());

    let mut versioner = HashVersioner::default();
    let base = versioner.store("/lib.js", None, "var a;\n");
    versioner.store("/lib.js", Some("fr"), "var a; // fr\n");

    let snapshot = BuildSnapshot {
      hash_algorithm: HashAlgorithmKind::Sha256,
      config_digest: "cfg".into(),
      bundles: vec![BundleSnapshot::capture(
        &bundle("/js/a.js", DebugInclusion::Always),
        &versioner,
        &reader,
      )],
    };
    let lib = snapshot.bundle("/lib.js").expect("lib snapshot");
    assert_eq!(lib.hash.as_deref(), Some(base.as_str()));
    assert_eq!(lib.variant_hashes.len(), 1);
    assert!(snapshot.is_up_to_date("cfg", &reader));

    let path = temp.path().join("out/bundle-mapping.json");
    snapshot.write(&path).expect("write snapshot");
    assert_eq!(BuildSnapshot::load(&path).expect("load snapshot"), snapshot);
    Ok(())
  }

  #[test]
  fn unknown_or_changed_stamps_are_outdated() {
    let reader = MemoryResourceReader::new().with_file("/js/a.js", "var a;");
    let versioner = HashVersioner::default();
    let mut snapshot =
      BundleSnapshot::capture(&bundle("/js/a.js", DebugInclusion::Always), &versioner, &reader);
    assert!(!snapshot.is_up_to_date(&reader));

    snapshot.items[0].last_modified = Some(1);
    assert!(!snapshot.is_up_to_date(&reader));
  }

  #[test]
  fn debug_only_resources_are_stamped() -> std::io::Result<()> {
    let temp = tempfile::tempdir()?;
    write_stamped(temp.path(), "/js/a.js", "var a;", 1_000)?;
    let reader = FsResourceReader::new(temp.path());
    let snapshot = BundleSnapshot::capture(
      &bundle("/js/a.js", DebugInclusion::Only),
      &HashVersioner::default(),
      &reader,
    );
    assert_eq!(snapshot.items.len(), 1);
    assert!(snapshot.is_up_to_date(&reader));

    write_stamped(temp.path(), "/js/a.js", "var a = 1;", 2_000)?;
    assert!(!snapshot.is_up_to_date(&reader));
    Ok(())
  }

  #[test]
  fn license_and_sort_file_edits_are_changes() -> std::io::Result<()> {
    let temp = tempfile::tempdir()?;
    write_stamped(temp.path(), "/js/a.js", "var a;", 1_000)?;
    write_stamped(temp.path(), "/js/.license", "MIT", 1_000)?;
    write_stamped(temp.path(), "/js/.sorting", "a.js", 1_000)?;
    let reader = FsResourceReader::new(temp.path());

    let mut lib = bundle("/js/a.js", DebugInclusion::Always);
    let paths = &mut lib.definition_mut().paths;
    paths.licenses.insert("/js/.license".into());
    paths.sort_files.insert("/js/.sorting".into());
    let snapshot = BundleSnapshot::capture(&lib, &HashVersioner::default(), &reader);
    assert!(snapshot.is_up_to_date(&reader));

    write_stamped(temp.path(), "/js/.license", "Apache-2.0", 2_000)?;
    assert!(!snapshot.is_up_to_date(&reader));

    write_stamped(temp.path(), "/js/.license", "Apache-2.0", 1_000)?;
    assert!(snapshot.is_up_to_date(&reader));
    write_stamped(temp.path(), "/js/.sorting", "b.js\na.js", 2_000)?;
    assert!(!snapshot.is_up_to_date(&reader));
    Ok(())
  }

  #[test]
  fn configuration_digest_must_match() -> std::io::Result<()> {
    let temp = tempfile::tempdir()?;
    write_stamped(temp.path(), "/js/a.js", "var a;", 1_000)?;
    let reader = FsResourceReader::new(temp.path());
    let snapshot = BuildSnapshot {
      hash_algorithm: HashAlgorithmKind::Sha256,
      config_digest: "before".into(),
      bundles: vec![BundleSnapshot::capture(
        &bundle("/js/a.js", DebugInclusion::Always),
        &HashVersioner::default(),
        &reader,
      )],
    };

    assert!(snapshot.is_up_to_date("before", &reader));
    assert!(!snapshot.is_up_to_date("after", &reader));
    Ok(())
  }
}
