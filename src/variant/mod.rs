//! Variant dimensions, their combinations and runtime resolution.

mod key;
mod resolve;
mod set;

pub use key::{VARIANT_SEPARATOR, enumerate, key_of, variant_bundle_name, variant_key};
pub use resolve::{available_variant, available_variant_map, resolve_best_match};
pub use set::{VariantDimensions, VariantMap, VariantSet, merge_dimensions};
