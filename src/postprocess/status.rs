use std::collections::BTreeSet;

use crate::error::Result;
use crate::resource::ResourceReader;
use crate::variant::{VariantDimensions, VariantMap, VariantSet, merge_dimensions};

/// Granularity of the content handed to a post-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingPhase {
  /// A single resource before concatenation.
  File,
  /// The concatenated bundle.
  Bundle,
}

/// Mutable context of one bundle build, threaded through every post-processor call.
pub struct BundleProcessingStatus<'a> {
  bundle_id: String,
  licenses: BTreeSet<String>,
  reader: &'a dyn ResourceReader,
  phase: ProcessingPhase,
  current_path: Option<String>,
  current_variants: Option<VariantMap>,
  searching_post_processor_variants: bool,
  discovered_variants: VariantDimensions,
}

impl<'a> BundleProcessingStatus<'a> {
  /// Fresh status for the build of `bundle_id`.
  pub fn new(bundle_id: &str, licenses: BTreeSet<String>, reader: &'a dyn ResourceReader) -> Self {
    Self {
      bundle_id: bundle_id.to_string(),
      licenses,
      reader,
      phase: ProcessingPhase::File,
      current_path: None,
      current_variants: None,
      searching_post_processor_variants: true,
      discovered_variants: VariantDimensions::new(),
    }
  }

  /// Id of the bundle being built.
  pub fn bundle_id(&self) -> &str {
    &self.bundle_id
  }

  /// License files of the bundle being built.
  pub fn licenses(&self) -> &BTreeSet<String> {
    &self.licenses
  }

  pub(crate) fn replace_licenses(&mut self, licenses: BTreeSet<String>) -> BTreeSet<String> {
    std::mem::replace(&mut self.licenses, licenses)
  }

  /// Reader the bundle is built from.
  pub fn reader(&self) -> &'a dyn ResourceReader {
    self.reader
  }

  /// Current phase.
  pub fn phase(&self) -> ProcessingPhase {
    self.phase
  }

  pub(crate) fn set_phase(&mut self, phase: ProcessingPhase) {
    self.phase = phase;
  }

  /// Path being processed: a resource in the file phase, the bundle id in the bundle phase.
  pub fn current_path(&self) -> Option<&str> {
    self.current_path.as_deref()
  }

  pub(crate) fn set_current_path(&mut self, path: &str) {
    self.current_path = Some(path.to_string());
  }

  /// Variant selection being assembled; `None` for the unvaried artifact.
  pub fn current_variants(&self) -> Option<&VariantMap> {
    self.current_variants.as_ref()
  }

  /// Value of one dimension in the current selection.
  pub fn variant(&self, dimension: &str) -> Option<&str> {
    self
      .current_variants
      .as_ref()
      .and_then(|variants| variants.get(dimension))
      .map(String::as_str)
  }

  pub(crate) fn set_current_variants(&mut self, variants: Option<VariantMap>) {
    self.current_variants = variants;
  }

  /// Whether this pass looks for variants contributed by post-processors.
  pub fn is_searching_post_processor_variants(&self) -> bool {
    self.searching_post_processor_variants
  }

  pub(crate) fn set_searching_post_processor_variants(&mut self, searching: bool) {
    self.searching_post_processor_variants = searching;
  }

  /// Declare a variant dimension the content needs.
  pub fn add_discovered_variant(&mut self, set: VariantSet) -> Result<()> {
    let contribution = VariantDimensions::from([(set.dimension().to_string(), set)]);
    self.discovered_variants = merge_dimensions(&self.discovered_variants, &contribution)?;
    Ok(())
  }

  /// Dimensions discovered so far.
  pub fn discovered_variants(&self) -> &VariantDimensions {
    &self.discovered_variants
  }

  pub(crate) fn take_discovered_variants(&mut self) -> VariantDimensions {
    std::mem::take(&mut self.discovered_variants)
  }
}

impl std::fmt::Debug for BundleProcessingStatus<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BundleProcessingStatus")
      .field("bundle_id", &self.bundle_id)
      .field("phase", &self.phase)
      .field("current_path", &self.current_path)
      .field("current_variants", &self.current_variants)
      .field("searching", &self.searching_post_processor_variants)
      .field("discovered_variants", &self.discovered_variants)
      .finish()
  }
}
