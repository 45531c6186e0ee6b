use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{BundleError, Result};
use crate::postprocess::builtin::{CharsetCleaner, LicenseIncluder};
use crate::postprocess::chain::{PostProcessor, PostProcessorChain};

/// Post-processors addressable by configuration key.
#[derive(Clone, Default)]
pub struct PostProcessorRegistry {
  processors: BTreeMap<String, Arc<dyn PostProcessor>>,
}

impl PostProcessorRegistry {
  /// Empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Registry holding the `license` and `charset-cleaner` processors.
  pub fn with_builtins() -> Result<Self> {
    let cleaner = CharsetCleaner::new().map_err(|err| BundleError::PostProcess {
      bundle: String::new(),
      processor: "charset-cleaner".into(),
      source: err.into(),
    })?;

    let mut registry = Self::new();
    registry.register("license", Arc::new(LicenseIncluder));
    registry.register("charset-cleaner", Arc::new(cleaner));
    Ok(registry)
  }

  /// Register `processor` under `key`, replacing any previous entry.
  pub fn register(&mut self, key: &str, processor: Arc<dyn PostProcessor>) {
    self.processors.insert(key.to_string(), processor);
  }

  /// Build a chain from configured keys; an empty list yields `None` so defaults apply.
  pub fn chain(&self, bundle: &str, keys: &[String]) -> Result<Option<PostProcessorChain>> {
    if keys.is_empty() {
      return Ok(None);
    }

    keys
      .iter()
      .map(|key| {
        self
          .processors
          .get(key.trim())
          .cloned()
          .ok_or_else(|| BundleError::UnknownPostProcessor {
            bundle: bundle.to_string(),
            key: key.clone(),
          })
      })
      .collect::<Result<Vec<_>>>()
      .map(|processors| Some(PostProcessorChain::new(processors)))
  }
}

impl std::fmt::Debug for PostProcessorRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_set().entries(self.processors.keys()).finish()
  }
}
