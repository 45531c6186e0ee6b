const BOM: char = '\u{feff}';

/// Prepare raw resource text for joining.
///
/// Line separators become `\n` and a trailing newline is added when missing. A leading BOM is
/// kept only on the first resource of an artifact.
pub(crate) fn prepare_resource(raw: String, first: bool) -> String {
  let raw = if !first && raw.starts_with(BOM) {
    raw[BOM.len_utf8()..].to_string()
  } else {
    raw
  };

  let mut content = if raw.contains('\r') {
    raw.replace("\r\n", "\n").replace('\r', "\n")
  } else {
    raw
  };

  if !content.ends_with('\n') {
    content.push('\n');
  }
  content
}
