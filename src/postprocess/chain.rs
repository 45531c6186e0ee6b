use std::sync::Arc;

use crate::error::{BundleError, Result};
use crate::postprocess::status::BundleProcessingStatus;

/// Transforms content at file or bundle level.
///
/// Processors may read the status, and record discovered variants on it.
pub trait PostProcessor: Send + Sync {
  /// Name used in logs and errors.
  fn name(&self) -> &str;

  /// Process `content`, returning the new content.
  fn process(&self, status: &mut BundleProcessingStatus<'_>, content: String) -> anyhow::Result<String>;
}

/// Ordered list of post-processors applied one after the other.
#[derive(Clone, Default)]
pub struct PostProcessorChain {
  processors: Vec<Arc<dyn PostProcessor>>,
}

impl PostProcessorChain {
  /// Create a chain from processors.
  pub fn new(processors: Vec<Arc<dyn PostProcessor>>) -> Self {
    Self { processors }
  }

  /// Chain holding a single processor.
  pub fn single(processor: impl PostProcessor + 'static) -> Self {
    Self::new(vec![Arc::new(processor)])
  }

  /// Whether the chain has no processor.
  pub fn is_empty(&self) -> bool {
    self.processors.is_empty()
  }

  /// Names of the processors, in order.
  pub fn names(&self) -> Vec<&str> {
    self.processors.iter().map(|processor| processor.name()).collect()
  }

  /// Fold `content` through the chain; the first failure aborts.
  pub fn run(&self, status: &mut BundleProcessingStatus<'_>, content: String) -> Result<String> {
    self
      .processors
      .iter()
      .try_fold(content, |content, processor| {
        processor
          .process(status, content)
          .map_err(|err| BundleError::PostProcess {
            bundle: status.bundle_id().to_string(),
            processor: processor.name().to_string(),
            source: err.into(),
          })
      })
  }
}

impl std::fmt::Debug for PostProcessorChain {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_list().entries(self.names()).finish()
  }
}
