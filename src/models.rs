//! Data structures shared by path resolution, assembly and serving.

use serde::{Deserialize, Serialize};

use crate::error::{BundleError, Result};

/// Whether a bundle participates in debug mode, production mode or both.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugInclusion {
  /// Served in both modes.
  #[default]
  Always,
  /// Served only in debug mode.
  Only,
  /// Never served in debug mode.
  Never,
}

impl DebugInclusion {
  /// Build the inclusion from the two configuration flags.
  pub fn from_flags(bundle: &str, debug_only: bool, debug_never: bool) -> Result<Self> {
    match (debug_only, debug_never) {
      (true, true) => Err(BundleError::ConflictingDebugInclusion(bundle.to_string())),
      (true, false) => Ok(Self::Only),
      (false, true) => Ok(Self::Never),
      (false, false) => Ok(Self::Always),
    }
  }
}

/// Rendering rules of a bundle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionPattern {
  /// Global bundles are rendered on every page.
  pub global: bool,
  /// Tie-break among global bundles, ascending.
  pub inclusion_order: i32,
  /// Debug mode participation.
  pub debug_inclusion: DebugInclusion,
}

impl InclusionPattern {
  /// Create a new inclusion pattern.
  pub fn new(global: bool, inclusion_order: i32, debug_inclusion: DebugInclusion) -> Self {
    Self {
      global,
      inclusion_order,
      debug_inclusion,
    }
  }

  /// The path belongs in the production list.
  pub fn includes_in_production(&self) -> bool {
    self.debug_inclusion != DebugInclusion::Only
  }

  /// The path belongs in the debug list.
  pub fn includes_in_debug(&self) -> bool {
    self.debug_inclusion != DebugInclusion::Never
  }

  /// Whether the bundle is served in the given mode.
  pub fn is_served(&self, debug: bool) -> bool {
    if debug {
      self.includes_in_debug()
    } else {
      self.includes_in_production()
    }
  }
}

/// A concrete resource path, tagged with its bundle for generated resources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundlePath {
  /// Resolved path or URL.
  pub path: String,
  /// Owning bundle id, set for generated/virtual resources.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bundle: Option<String>,
}

impl BundlePath {
  /// A plain resource path.
  pub fn new(path: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      bundle: None,
    }
  }

  /// A generated resource owned by `bundle`.
  pub fn generated(path: impl Into<String>, bundle: impl Into<String>) -> Self {
    Self {
      path: path.into(),
      bundle: Some(bundle.into()),
    }
  }
}

impl std::fmt::Display for BundlePath {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.path)
  }
}
