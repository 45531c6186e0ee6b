use crate::variant::key::variant_key;
use crate::variant::set::{VariantDimensions, VariantMap, VariantSet};

/// Best declared value of `set` for a requested value.
///
/// Exact matches win, then progressively shorter `_`-separated prefixes (`fr_CA` → `fr`),
/// then the default of the set.
pub fn available_variant<'s>(set: &'s VariantSet, requested: &str) -> &'s str {
  let mut candidate = requested;
  loop {
    if let Some(found) = set.values().iter().find(|value| *value == candidate) {
      return found;
    }
    match candidate.rfind('_') {
      Some(idx) => candidate = &candidate[..idx],
      None => return set.default_value(),
    }
  }
}

/// Selection the bundle actually serves for a runtime request.
///
/// Returns `None` when the bundle declares no dimension or when the request says nothing about
/// any declared dimension, meaning the unvaried artifact should be used.
pub fn available_variant_map(declared: &VariantDimensions, requested: &VariantMap) -> Option<VariantMap> {
  if declared.is_empty() || !declared.keys().any(|dimension| requested.contains_key(dimension)) {
    return None;
  }

  Some(
    declared
      .iter()
      .map(|(dimension, set)| {
        let value = match requested.get(dimension) {
          Some(value) => available_variant(set, value),
          None => set.default_value(),
        };
        (dimension.clone(), value.to_string())
      })
      .collect(),
  )
}

/// Most specific declared variant key consistent with `requested`.
pub fn resolve_best_match(declared: &VariantDimensions, requested: &VariantMap) -> Option<String> {
  let available = available_variant_map(declared, requested)?;
  variant_key(Some(&available))
}
