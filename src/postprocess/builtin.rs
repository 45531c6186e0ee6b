use anyhow::Context;
use regex::Regex;
use tracing::debug;

use crate::postprocess::chain::PostProcessor;
use crate::postprocess::status::{BundleProcessingStatus, ProcessingPhase};

/// Prepends the bundle's license files to the joined content.
#[derive(Debug, Default, Clone, Copy)]
pub struct LicenseIncluder;

impl PostProcessor for LicenseIncluder {
  fn name(&self) -> &str {
    "license"
  }

  fn process(&self, status: &mut BundleProcessingStatus<'_>, content: String) -> anyhow::Result<String> {
    if status.phase() != ProcessingPhase::Bundle || status.licenses().is_empty() {
      return Ok(content);
    }

    let mut header = String::new();
    for path in status.licenses() {
      debug!(bundle = status.bundle_id(), license = %path, "adding license");
      let text = status
        .reader()
        .read(path)
        .with_context(|| format!("reading license file {path}"))?;
      header.push_str(&text);
      if !text.ends_with('\n') {
        header.push('\n');
      }
    }

    header.push_str(&content);
    Ok(header)
  }
}

/// Keeps only the first `@charset` rule of a stylesheet.
#[derive(Debug, Clone)]
pub struct CharsetCleaner {
  pattern: Regex,
}

impl CharsetCleaner {
  /// Create the cleaner.
  pub fn new() -> anyhow::Result<Self> {
    let pattern = Regex::new(r#"(?i)@charset\s+["'][^"']*["']\s*;[ \t]*\n?"#)?;
    Ok(Self { pattern })
  }
}

impl PostProcessor for CharsetCleaner {
  fn name(&self) -> &str {
    "charset-cleaner"
  }

  fn process(&self, _status: &mut BundleProcessingStatus<'_>, content: String) -> anyhow::Result<String> {
    let mut seen = false;
    let cleaned = self.pattern.replace_all(&content, |captures: &regex::Captures<'_>| {
      if seen {
        String::new()
      } else {
        seen = true;
        captures[0].to_string()
      }
    });
    Ok(cleaned.into_owned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::resource::MemoryResourceReader;
  use std::collections::BTreeSet;

  #[test]
  fn license_is_prepended_in_bundle_phase_only() {
    let reader = MemoryResourceReader::new().with_file("/js/lib/.license", "(c) Acme");
    let licenses = BTreeSet::from(["/js/lib/.license".to_string()]);
    let mut status = BundleProcessingStatus::new("/lib.js", licenses, &reader);

    let untouched = LicenseIncluder.process(&mut status, "a();\n".into()).unwrap();
    assert_eq!(untouched, "a();\n");

    status.set_phase(ProcessingPhase::Bundle);
    let content = LicenseIncluder.process(&mut status, "a();\n".into()).unwrap();
    assert_eq!(content, "(c) Acme\na();\n");
  }

  #[test]
  fn every_license_ends_its_own_line() {
    let reader = MemoryResourceReader::new()
      .with_file("/js/a/.license", "(c) Acme\n")
      .with_file("/js/b/.license", "MIT");
    let licenses = BTreeSet::from(["/js/a/.license".to_string(), "/js/b/.license".to_string()]);
    let mut status = BundleProcessingStatus::new("/lib.js", licenses, &reader);
    status.set_phase(ProcessingPhase::Bundle);

    let content = LicenseIncluder.process(&mut status, "a();\n".into()).unwrap();
    assert_eq!(content, "(c) Acme\nMIT\na();\n");
  }

  #[test]
  fn missing_license_fails() {
    let reader = MemoryResourceReader::new();
    let licenses = BTreeSet::from(["/gone/.license".to_string()]);
    let mut status = BundleProcessingStatus::new("/lib.js", licenses, &reader);
    status.set_phase(ProcessingPhase::Bundle);

    assert!(LicenseIncluder.process(&mut status, String::new()).is_err());
  }

  #[test]
  fn charset_cleaner_keeps_first_rule() {
    let reader = MemoryResourceReader::new();
    let mut status = BundleProcessingStatus::new("/all.css", BTreeSet::new(), &reader);
    let cleaner = CharsetCleaner::new().unwrap();

    let css = "@charset \"UTF-8\";\na{}\n@charset 'UTF-8';\nb{}\n";
    let cleaned = cleaner.process(&mut status, css.into()).unwrap();
    assert_eq!(cleaned, "@charset \"UTF-8\";\na{}\nb{}\n");
  }
}
