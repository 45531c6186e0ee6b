//! Filters deciding which bundles a build processes.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{BundleError, Result};

/// Selection filter applied to bundle names.
pub trait BundleInclusion {
  /// Returns `true` when the bundle should be built.
  fn is_included(&self, bundle_name: &str) -> bool;
}

/// Selection file layout.
#[derive(Debug, Default, Deserialize)]
struct BundleSelectionFile {
  #[serde(default)]
  include: Vec<String>,
  #[serde(default)]
  exclude: Vec<String>,
}

/// Include/exclude rules over bundle names; a rule `a` also covers `a/...`.
#[derive(Debug, Clone, Default)]
pub struct BundleSelection {
  include: Option<BTreeSet<String>>,
  exclude: BTreeSet<String>,
}

impl BundleSelection {
  /// Selection built from explicit rule lists.
  pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
    Self::from(BundleSelectionFile { include, exclude })
  }

  /// Load a JSON selection file; a missing file selects everything.
  pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
      Ok(contents) => contents,
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
        return Ok(Self::default());
      }
      Err(source) => {
        return Err(BundleError::ConfigIo {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let file: BundleSelectionFile =
      serde_json::from_str(&contents).map_err(|err| BundleError::ConfigParse {
        path: path.to_path_buf(),
        message: err.to_string(),
      })?;
    Ok(Self::from(file))
  }

  /// Whether `bundle_name` passes the rules; exclusions win.
  pub fn is_included(&self, bundle_name: &str) -> bool {
    let candidate = bundle_name.trim().trim_matches('/');
    if self
      .exclude
      .iter()
      .any(|rule| scope_matches(rule, candidate))
    {
      return false;
    }

    match &self.include {
      Some(include) => include.iter().any(|rule| scope_matches(rule, candidate)),
      None => true,
    }
  }

  /// Whether no rule is active.
  pub fn is_unfiltered(&self) -> bool {
    self.include.is_none() && self.exclude.is_empty()
  }
}

impl BundleInclusion for BundleSelection {
  fn is_included(&self, bundle_name: &str) -> bool {
    BundleSelection::is_included(self, bundle_name)
  }
}

impl From<BundleSelectionFile> for BundleSelection {
  fn from(file: BundleSelectionFile) -> Self {
    let include = normalise_list(file.include);
    let exclude = normalise_list(file.exclude);

    Self {
      include: (!include.is_empty()).then_some(include),
      exclude,
    }
  }
}

fn normalise_list(values: impl IntoIterator<Item = String>) -> BTreeSet<String> {
  values
    .into_iter()
    .map(|value| value.trim().trim_matches('/').to_string())
    .filter(|value| !value.is_empty())
    .collect()
}

fn scope_matches(rule: &str, candidate: &str) -> bool {
  candidate == rule
    || candidate
      .strip_prefix(rule)
      .is_some_and(|suffix| suffix.starts_with('/'))
}
