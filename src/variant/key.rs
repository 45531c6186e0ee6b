use crate::variant::set::{VariantDimensions, VariantMap};

/// Separator between the values of a variant key.
pub const VARIANT_SEPARATOR: &str = "@";

/// Every concrete selection of `dimensions`, followed by the unvaried `None` selection.
///
/// Dimensions are combined in name order and values in declaration order, so the result is
/// stable for identical declarations.
pub fn enumerate(dimensions: &VariantDimensions) -> Vec<Option<VariantMap>> {
  let mut combinations: Vec<VariantMap> = Vec::new();

  for (dimension, set) in dimensions {
    if combinations.is_empty() {
      combinations = set
        .values()
        .iter()
        .map(|value| VariantMap::from([(dimension.clone(), value.clone())]))
        .collect();
      continue;
    }

    combinations = combinations
      .iter()
      .flat_map(|current| {
        set.values().iter().map(move |value| {
          let mut next = current.clone();
          next.insert(dimension.clone(), value.clone());
          next
        })
      })
      .collect();
  }

  let mut variants: Vec<Option<VariantMap>> = combinations.into_iter().map(Some).collect();
  variants.push(None);
  variants
}

/// Canonical key of `variants` over `dimensions`.
///
/// Dimensions are taken in lexicographic order; a dimension missing from the map contributes
/// an empty segment. `None` stays `None`, the unvaried artifact.
pub fn key_of<'d, I>(variants: Option<&VariantMap>, dimensions: I) -> Option<String>
where
  I: IntoIterator<Item = &'d str>,
{
  let variants = variants?;
  let mut ordered: Vec<&str> = dimensions.into_iter().collect();
  ordered.sort_unstable();
  ordered.dedup();

  let segments: Vec<&str> = ordered
    .into_iter()
    .map(|dimension| variants.get(dimension).map(String::as_str).unwrap_or(""))
    .collect();
  Some(segments.join(VARIANT_SEPARATOR))
}

/// Canonical key of a selection over its own dimensions.
pub fn variant_key(variants: Option<&VariantMap>) -> Option<String> {
  key_of(variants, variants?.keys().map(String::as_str))
}

/// Name of the artifact storing `variant_key` of `bundle_id`.
///
/// `/js/lib.js` with `fr@summer` becomes `/js/lib@fr@summer.js`; generated resources get the
/// key appended instead.
pub fn variant_bundle_name(bundle_id: &str, variant_key: Option<&str>, generated: bool) -> String {
  let Some(key) = variant_key.filter(|key| !key.is_empty()) else {
    return bundle_id.to_string();
  };

  let stem_end = bundle_id
    .rfind('.')
    .filter(|idx| !generated && !bundle_id[*idx..].contains('/'));
  match stem_end {
    Some(idx) => format!(
      "{}{VARIANT_SEPARATOR}{key}{}",
      &bundle_id[..idx],
      &bundle_id[idx..]
    ),
    None => format!("{bundle_id}{VARIANT_SEPARATOR}{key}"),
  }
}
