//! Bundles built from configuration, split into global and context bundles.

mod definition;
mod factory;

pub use definition::{Bundle, BundleDefinition, CompositeBundle};
pub use factory::BundleFactory;

use crate::error::{BundleError, Result};

/// Every bundle of a build, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct BundleSet {
  bundles: Vec<Bundle>,
  global: Vec<usize>,
  context: Vec<usize>,
}

impl BundleSet {
  /// Index `bundles`; global bundles are ordered by inclusion order, then declaration order.
  pub fn new(bundles: Vec<Bundle>) -> Self {
    let (mut global, context): (Vec<usize>, Vec<usize>) =
      (0..bundles.len()).partition(|idx| bundles[*idx].definition().inclusion.global);
    global.sort_by_key(|idx| bundles[*idx].definition().inclusion.inclusion_order);

    Self {
      bundles,
      global,
      context,
    }
  }

  /// Number of top-level bundles.
  pub fn len(&self) -> usize {
    self.bundles.len()
  }

  /// Whether the set holds no bundle.
  pub fn is_empty(&self) -> bool {
    self.bundles.is_empty()
  }

  /// Bundles in declaration order.
  pub fn iter(&self) -> impl Iterator<Item = &Bundle> {
    self.bundles.iter()
  }

  /// Mutable bundles in declaration order.
  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Bundle> {
    self.bundles.iter_mut()
  }

  /// Bundle served under `id`.
  pub fn get(&self, id: &str) -> Option<&Bundle> {
    self.bundles.iter().find(|bundle| bundle.id() == id)
  }

  /// Bundle served under `id`, or [`BundleError::UnknownBundle`].
  pub fn require(&self, id: &str) -> Result<&Bundle> {
    self
      .get(id)
      .ok_or_else(|| BundleError::UnknownBundle(id.to_string()))
  }

  /// Bundle configured as `name`.
  pub fn by_name(&self, name: &str) -> Option<&Bundle> {
    self.bundles.iter().find(|bundle| bundle.name() == name)
  }

  /// Global bundles in inclusion order.
  pub fn global_bundles(&self) -> impl Iterator<Item = &Bundle> {
    self.global.iter().map(|idx| &self.bundles[*idx])
  }

  /// Bundles rendered on request, in declaration order.
  pub fn context_bundles(&self) -> impl Iterator<Item = &Bundle> {
    self.context.iter().map(|idx| &self.bundles[*idx])
  }
}
