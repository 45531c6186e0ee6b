//! Error types raised while configuring and building bundles.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the engine.
pub type Result<T> = std::result::Result<T, BundleError>;

/// Boxed error produced by a post-processor.
pub type ProcessorFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures raised while reading a single resource.
#[derive(Debug, Error)]
pub enum ResourceError {
  /// The resource does not exist.
  #[error("resource not found: {0}")]
  NotFound(String),
  /// The resource exists but could not be read.
  #[error("failed to read resource {path}: {source}")]
  Io {
    /// Resource path that failed.
    path: String,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
}

/// Errors raised by the bundle build engine.
#[derive(Debug, Error)]
pub enum BundleError {
  /// A mapping has no recognised suffix or extension.
  #[error("wrong mapping [{mapping}] for bundle [{bundle}], please check configuration")]
  InvalidMapping {
    /// Bundle owning the mapping.
    bundle: String,
    /// Offending mapping.
    mapping: String,
  },

  /// A bundle id doesn't end with the configured extension.
  #[error("the extension of bundle {bundle} - {id} doesn't match the allowed extension '{extension}'")]
  InvalidExtension {
    /// Bundle name.
    bundle: String,
    /// Bundle id.
    id: String,
    /// Expected extension.
    extension: String,
  },

  /// A bundle id is located under a reserved root.
  #[error("for the bundle {bundle}, the bundle id '{id}' is not allowed because it starts with '{root}'")]
  ReservedRoot {
    /// Bundle name.
    bundle: String,
    /// Bundle id.
    id: String,
    /// Reserved prefix.
    root: String,
  },

  /// Two bundles were configured with the same name.
  #[error("duplicate bundle name: {0}")]
  DuplicateName(String),

  /// An orphan resource path collides with a configured bundle id.
  #[error("duplicate bundle id resulted from orphan mapping of: {0}")]
  DuplicateBundlePath(String),

  /// The dependency declaration of a bundle is invalid.
  #[error("dependency error in bundle '{bundle}': {reason}")]
  Dependency {
    /// Root bundle being resolved.
    bundle: String,
    /// Description of the problem.
    reason: String,
  },

  /// The debug inclusion flags of a bundle contradict each other.
  #[error("bundle '{0}' can't be both debug-only and debug-never")]
  ConflictingDebugInclusion(String),

  /// A variant set is malformed.
  #[error("invalid variant set '{dimension}': {reason}")]
  InvalidVariantSet {
    /// Variant dimension.
    dimension: String,
    /// Description of the problem.
    reason: String,
  },

  /// A configured post-processor key is not registered.
  #[error("unknown post-processor '{key}' configured for bundle '{bundle}'")]
  UnknownPostProcessor {
    /// Bundle name.
    bundle: String,
    /// Unknown key.
    key: String,
  },

  /// A post-processor failed while processing a bundle.
  #[error("post-processor '{processor}' failed for bundle '{bundle}': {source}")]
  PostProcess {
    /// Bundle id.
    bundle: String,
    /// Failing processor.
    processor: String,
    /// Error returned by the processor.
    #[source]
    source: ProcessorFailure,
  },

  /// A resource required to configure a bundle couldn't be read.
  #[error("bundle '{bundle}': {source}")]
  Resource {
    /// Bundle name.
    bundle: String,
    /// Underlying resource error.
    #[source]
    source: ResourceError,
  },

  /// No bundle is registered under the given id or name.
  #[error("unknown bundle: {0}")]
  UnknownBundle(String),

  /// A bundle was asked for its production URL before being built.
  #[error("the hash of bundle '{0}' must be computed before accessing its url")]
  NotBuilt(String),

  /// The configuration file couldn't be read.
  #[error("failed to read {}: {source}", path.display())]
  ConfigIo {
    /// Configuration path.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },

  /// The configuration file couldn't be parsed.
  #[error("failed to parse {}: {message}", path.display())]
  ConfigParse {
    /// Configuration path.
    path: PathBuf,
    /// Parser message.
    message: String,
  },

  /// Output could not be written.
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

impl BundleError {
  pub(crate) fn dependency(bundle: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::Dependency {
      bundle: bundle.into(),
      reason: reason.into(),
    }
  }
}
