//! Resolution of bundle mappings into ordered resource paths.
//!
//! The work is split the same way the expansion happens: mapping classification, sort file
//! parsing and path normalisation are independent helpers that the resolver drives.

mod mapping;
mod normalize;
mod resolver;
mod sorting;

pub use mapping::{PathMapping, PathMappingKind};
pub use normalize::{as_dir_path, as_path, join_paths};
pub use resolver::{LICENSE_FILE_NAME, PathResolver, ResolvedPaths};
pub use sorting::{SORT_FILE_NAME, parse_sort_file};
