//! Parsing of per-directory `.sorting` files.

use std::collections::BTreeSet;

use crate::paths::normalize::{join_paths, normalize_name};

/// Name of the file listing the explicit order of a directory.
pub const SORT_FILE_NAME: &str = ".sorting";

/// Turn sort file content into ordered paths below `dir`.
///
/// Names that are not present in `available` are ignored. Every matched name is removed from
/// `available` so that the caller only appends the remaining entries afterwards. Names ending
/// with `extension` yield file paths, anything else a sub-directory path ending with `/`.
pub fn parse_sort_file(
  content: &str,
  available: &mut BTreeSet<String>,
  dir: &str,
  extension: &str,
  generated: bool,
) -> Vec<String> {
  let mut resources = Vec::new();

  for line in content.lines() {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
      continue;
    }

    let name = normalize_name(line);
    let Some(matched) = available
      .iter()
      .find(|candidate| normalize_name(candidate) == name)
      .cloned()
    else {
      continue;
    };

    available.remove(&matched);
    if name.ends_with(extension) {
      resources.push(join_paths(dir, &name, generated));
    } else {
      resources.push(join_paths(dir, &format!("{name}/"), generated));
    }
  }

  resources
}
