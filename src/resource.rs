//! Resource reading collaborators: the filesystem, in-memory trees and generated paths.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use regex::Regex;

use crate::error::ResourceError;

/// Read access to the resources bundles are built from.
///
/// Paths are absolute within the resource root (`/js/lib/a.js`); directory paths end with `/`.
pub trait ResourceReader {
  /// Entry names directly under `dir`. A missing directory lists as empty.
  fn list_names(&self, dir: &str) -> BTreeSet<String>;

  /// Whether `path` denotes a directory.
  fn is_directory(&self, path: &str) -> bool;

  /// Read the text content of `path`.
  fn read(&self, path: &str) -> Result<String, ResourceError>;

  /// Last modification stamp in seconds since the epoch, when known.
  fn last_modified(&self, _path: &str) -> Option<u64> {
    None
  }
}

/// Decides which paths denote generated (non-filesystem) resources.
pub trait GeneratorRegistry {
  /// Returns `true` when the path is served by a generator.
  fn is_generated_path(&self, path: &str) -> bool;
}

/// Registry without any generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGenerators;

impl GeneratorRegistry for NoGenerators {
  fn is_generated_path(&self, _path: &str) -> bool {
    false
  }
}

/// Generator registry keyed by path prefixes such as `jar:` or `messages:`.
#[derive(Debug, Clone)]
pub struct PrefixGeneratorRegistry {
  pattern: Option<Regex>,
}

impl PrefixGeneratorRegistry {
  /// Build a registry from the configured prefixes.
  pub fn new<I, S>(prefixes: I) -> Result<Self, regex::Error>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let alternatives: Vec<String> = prefixes
      .into_iter()
      .map(|prefix| prefix.as_ref().trim().to_string())
      .filter(|prefix| !prefix.is_empty())
      .map(|prefix| regex::escape(&prefix))
      .collect();

    let pattern = if alternatives.is_empty() {
      None
    } else {
      Some(Regex::new(&format!("^(?:{})", alternatives.join("|")))?)
    };

    Ok(Self { pattern })
  }
}

impl GeneratorRegistry for PrefixGeneratorRegistry {
  fn is_generated_path(&self, path: &str) -> bool {
    self
      .pattern
      .as_ref()
      .is_some_and(|pattern| pattern.is_match(path))
  }
}

/// Reads resources below a directory on disk.
#[derive(Debug, Clone)]
pub struct FsResourceReader {
  root: PathBuf,
}

impl FsResourceReader {
  /// Create a reader rooted at `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Root directory of the reader.
  pub fn root(&self) -> &Path {
    &self.root
  }

  fn resolve(&self, path: &str) -> PathBuf {
    let relative = path.trim_start_matches('/');
    if relative.is_empty() {
      self.root.clone()
    } else {
      self.root.join(relative)
    }
  }
}

impl ResourceReader for FsResourceReader {
  fn list_names(&self, dir: &str) -> BTreeSet<String> {
    let Ok(entries) = fs::read_dir(self.resolve(dir)) else {
      return BTreeSet::new();
    };

    entries
      .flatten()
      .map(|entry| entry.file_name().to_string_lossy().to_string())
      .collect()
  }

  fn is_directory(&self, path: &str) -> bool {
    self.resolve(path).is_dir()
  }

  fn read(&self, path: &str) -> Result<String, ResourceError> {
    let resolved = self.resolve(path);
    if resolved.is_dir() {
      return Err(ResourceError::NotFound(path.to_string()));
    }

    fs::read_to_string(&resolved).map_err(|err| {
      if err.kind() == ErrorKind::NotFound {
        ResourceError::NotFound(path.to_string())
      } else {
        ResourceError::Io {
          path: path.to_string(),
          source: err,
        }
      }
    })
  }

  fn last_modified(&self, path: &str) -> Option<u64> {
    let modified = fs::metadata(self.resolve(path)).ok()?.modified().ok()?;
    modified
      .duration_since(UNIX_EPOCH)
      .ok()
      .map(|duration| duration.as_secs())
  }
}

/// In-memory resource tree, with directories derived from the file paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryResourceReader {
  files: BTreeMap<String, String>,
}

impl MemoryResourceReader {
  /// Create an empty tree.
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a file, returning the reader for chaining.
  pub fn with_file(mut self, path: &str, content: &str) -> Self {
    self.insert(path, content);
    self
  }

  /// Add or replace a file.
  pub fn insert(&mut self, path: &str, content: &str) {
    self.files.insert(normalize_file_path(path), content.to_string());
  }

  /// Remove a file.
  pub fn remove(&mut self, path: &str) -> Option<String> {
    self.files.remove(&normalize_file_path(path))
  }
}

fn normalize_file_path(path: &str) -> String {
  format!("/{}", path.trim_start_matches('/'))
}

fn normalize_dir_path(dir: &str) -> String {
  let trimmed = dir.trim_matches('/');
  if trimmed.is_empty() {
    "/".to_string()
  } else {
    format!("/{trimmed}/")
  }
}

impl ResourceReader for MemoryResourceReader {
  fn list_names(&self, dir: &str) -> BTreeSet<String> {
    let prefix = normalize_dir_path(dir);
    self
      .files
      .keys()
      .filter_map(|path| path.strip_prefix(&prefix))
      .filter_map(|rest| rest.split('/').next())
      .filter(|name| !name.is_empty())
      .map(str::to_string)
      .collect()
  }

  fn is_directory(&self, path: &str) -> bool {
    let prefix = normalize_dir_path(path);
    self.files.keys().any(|file| file.starts_with(&prefix))
  }

  fn read(&self, path: &str) -> Result<String, ResourceError> {
    self
      .files
      .get(&normalize_file_path(path))
      .cloned()
      .ok_or_else(|| ResourceError::NotFound(path.to_string()))
  }
}
