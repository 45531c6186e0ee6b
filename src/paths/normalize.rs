//! Canonical forms for resource paths.

/// Produce the canonical form of a resource path.
///
/// The result always uses forward slashes, starts with a single `/` and never contains `//`
/// or `./` segments, so that paths discovered on every platform compare equal.
pub fn as_path(path: &str) -> String {
  let unified = path.replace('\\', "/");
  let segments: Vec<&str> = unified
    .split('/')
    .filter(|segment| !segment.is_empty() && *segment != ".")
    .collect();
  format!("/{}", segments.join("/"))
}

/// Canonical form of a directory path, always ending with `/`.
pub fn as_dir_path(path: &str) -> String {
  let path = as_path(path);
  if path == "/" { path } else { format!("{path}/") }
}

/// Normalise a single name read from a sort file.
pub fn normalize_name(name: &str) -> String {
  name.replace('\\', "/").trim_matches('/').to_string()
}

/// Join a directory and an entry name.
///
/// Generated directories keep their raw form since they don't denote filesystem locations.
pub fn join_paths(dir: &str, name: &str, generated: bool) -> String {
  let name = name.trim_start_matches('/');
  if generated {
    if dir.ends_with('/') || dir.ends_with(':') {
      format!("{dir}{name}")
    } else {
      format!("{dir}/{name}")
    }
  } else if name.ends_with('/') {
    as_dir_path(&format!("{dir}/{name}"))
  } else {
    as_path(&format!("{dir}/{name}"))
  }
}
