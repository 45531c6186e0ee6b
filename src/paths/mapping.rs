//! Classification of raw mapping specifications.

use serde::{Deserialize, Serialize};

const DIR_PATH_SUFFIX: &str = "/";
const RECURSIVE_PATH_SUFFIX: &str = "/**";

/// Kind of a path mapping, derived from its suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathMappingKind {
  /// A single resource.
  Asset,
  /// Direct children of a directory.
  Directory,
  /// Every descendant of a directory.
  RecursiveDirectory,
}

/// A mapping spec such as `/js/lib/**`, `/js/app/` or `/js/main.js`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
  raw: String,
  path: String,
  kind: PathMappingKind,
}

impl PathMapping {
  /// Classify a raw mapping.
  pub fn parse(raw: &str) -> Self {
    let raw = raw.trim();
    let (path, kind) = if let Some(dir) = raw.strip_suffix(RECURSIVE_PATH_SUFFIX) {
      (format!("{dir}/"), PathMappingKind::RecursiveDirectory)
    } else if raw.ends_with(DIR_PATH_SUFFIX) {
      (raw.to_string(), PathMappingKind::Directory)
    } else {
      (raw.to_string(), PathMappingKind::Asset)
    };

    Self {
      raw: raw.to_string(),
      path,
      kind,
    }
  }

  /// Mapping as written in the configuration.
  pub fn raw(&self) -> &str {
    &self.raw
  }

  /// Mapped path; directories keep a trailing `/` and lose the `**`.
  pub fn path(&self) -> &str {
    &self.path
  }

  /// Kind of mapping.
  pub fn kind(&self) -> PathMappingKind {
    self.kind
  }

  /// Whether `path` is covered by this mapping.
  pub fn accept(&self, path: &str) -> bool {
    match self.kind {
      PathMappingKind::Asset => path == self.path,
      PathMappingKind::Directory => path
        .strip_prefix(self.path.as_str())
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/')),
      PathMappingKind::RecursiveDirectory => path
        .strip_prefix(self.path.as_str())
        .is_some_and(|rest| !rest.is_empty()),
    }
  }
}
