use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{BundleError, Result};

/// Declared variant dimensions of a bundle, keyed (and therefore ordered) by dimension name.
pub type VariantDimensions = BTreeMap<String, VariantSet>;

/// One concrete selection across variant dimensions.
pub type VariantMap = BTreeMap<String, String>;

/// The values a bundle may take along one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSet {
  dimension: String,
  default_value: String,
  values: Vec<String>,
}

impl VariantSet {
  /// Create a variant set; the default must be one of the values.
  pub fn new<I, S>(dimension: &str, default_value: &str, values: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut unique: Vec<String> = Vec::new();
    for value in values {
      let value = value.into();
      if !unique.contains(&value) {
        unique.push(value);
      }
    }

    if !unique.iter().any(|value| value == default_value) {
      return Err(BundleError::InvalidVariantSet {
        dimension: dimension.to_string(),
        reason: format!("the default variant '{default_value}' doesn't exist in {unique:?}"),
      });
    }

    Ok(Self {
      dimension: dimension.to_string(),
      default_value: default_value.to_string(),
      values: unique,
    })
  }

  /// Dimension name.
  pub fn dimension(&self) -> &str {
    &self.dimension
  }

  /// Value used when a request doesn't select one.
  pub fn default_value(&self) -> &str {
    &self.default_value
  }

  /// Values in declaration order.
  pub fn values(&self) -> &[String] {
    &self.values
  }

  /// Whether `value` is declared.
  pub fn contains(&self, value: &str) -> bool {
    self.values.iter().any(|candidate| candidate == value)
  }

  fn union(&self, other: &VariantSet) -> Result<VariantSet> {
    if self.default_value != other.default_value {
      return Err(BundleError::InvalidVariantSet {
        dimension: self.dimension.clone(),
        reason: format!(
          "the merged variant sets don't have the same default value ('{}' and '{}')",
          self.default_value, other.default_value
        ),
      });
    }

    let mut merged = self.clone();
    for value in &other.values {
      if !merged.contains(value) {
        merged.values.push(value.clone());
      }
    }
    Ok(merged)
  }
}

/// Union of two dimension maps; shared dimensions get the union of their values.
pub fn merge_dimensions(a: &VariantDimensions, b: &VariantDimensions) -> Result<VariantDimensions> {
  let mut merged = a.clone();
  for (dimension, set) in b {
    let next = match merged.get(dimension) {
      Some(existing) => existing.union(set)?,
      None => set.clone(),
    };
    merged.insert(dimension.clone(), next);
  }
  Ok(merged)
}
