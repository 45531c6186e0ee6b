//! Joining of bundle resources and post-processing, once per variant.
//!
//! A bundle is assembled in at most two passes. The first pass lets post-processors report
//! variant dimensions the content needs; when any new dimension shows up it is merged into the
//! bundle and every variant is assembled again.

mod content;

use tracing::{debug, warn};

use crate::bundle_set::{Bundle, BundleDefinition, CompositeBundle};
use crate::config::PostProcessorsConfig;
use crate::error::{ResourceError, Result};
use crate::postprocess::{
  BundleProcessingStatus, PostProcessorChain, PostProcessorRegistry, ProcessingPhase,
};
use crate::resource::ResourceReader;
use crate::variant::{VariantMap, enumerate, merge_dimensions, variant_bundle_name, variant_key};

use content::prepare_resource;

const MAX_PASSES: usize = 2;

/// Engine-level chains used when a bundle doesn't configure its own.
#[derive(Debug, Clone, Default)]
pub struct PostProcessorDefaults {
  /// Per-resource chain of simple bundles.
  pub unit: PostProcessorChain,
  /// Joined-content chain of simple bundles.
  pub bundle: PostProcessorChain,
  /// Per-child chain of composite bundles.
  pub composite_unit: PostProcessorChain,
  /// Joined-content chain of composite bundles.
  pub composite_bundle: PostProcessorChain,
}

impl PostProcessorDefaults {
  /// Resolve the configured default chains.
  pub fn from_config(registry: &PostProcessorRegistry, config: &PostProcessorsConfig) -> Result<Self> {
    let chain = |keys: &[String]| -> Result<PostProcessorChain> {
      Ok(registry.chain("<defaults>", keys)?.unwrap_or_default())
    };

    Ok(Self {
      unit: chain(&config.unit)?,
      bundle: chain(&config.bundle)?,
      composite_unit: chain(&config.composite_unit)?,
      composite_bundle: chain(&config.composite_bundle)?,
    })
  }
}

/// Content of one bundle for one variant selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
  /// Bundle id.
  pub bundle_id: String,
  /// Variant key; `None` for the unvaried artifact.
  pub variant_key: Option<String>,
  /// Selection the artifact was assembled for.
  pub variants: Option<VariantMap>,
  /// Storage name, the bundle id with the variant key inserted.
  pub name: String,
  /// Joined, post-processed content.
  pub content: String,
}

/// Assembles bundles read through a [`ResourceReader`].
pub struct AssemblyPipeline<'a> {
  reader: &'a dyn ResourceReader,
  defaults: &'a PostProcessorDefaults,
}

impl<'a> AssemblyPipeline<'a> {
  /// Create a pipeline.
  pub fn new(reader: &'a dyn ResourceReader, defaults: &'a PostProcessorDefaults) -> Self {
    Self { reader, defaults }
  }

  /// Assemble every variant of `bundle`.
  ///
  /// Variants discovered by post-processors are merged into the bundle definition.
  pub fn assemble(&self, bundle: &mut Bundle) -> Result<Vec<Artifact>> {
    let bundle_id = bundle.id().to_string();
    let mut status = BundleProcessingStatus::new(&bundle_id, bundle.licenses(), self.reader);
    let mut artifacts = Vec::new();

    for pass in 0..MAX_PASSES {
      let searching = pass == 0;
      status.set_searching_post_processor_variants(searching);
      artifacts = self.assemble_variants(bundle, &mut status)?;

      let discovered = status.take_discovered_variants();
      if !searching || discovered.is_empty() {
        break;
      }

      let definition = bundle.definition_mut();
      let merged = merge_dimensions(&definition.variants, &discovered)?;
      if merged == definition.variants {
        break;
      }
      debug!(
        bundle = %bundle_id,
        dimensions = ?discovered.keys().collect::<Vec<_>>(),
        "post-processors discovered variants, assembling again"
      );
      definition.variants = merged;
    }

    Ok(artifacts)
  }

  fn assemble_variants(
    &self,
    bundle: &Bundle,
    status: &mut BundleProcessingStatus<'_>,
  ) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();
    for variants in enumerate(&bundle.definition().variants) {
      status.set_current_variants(variants.clone());
      let content = self.join(bundle, status)?;
      let key = variant_key(variants.as_ref());
      artifacts.push(Artifact {
        bundle_id: bundle.id().to_string(),
        name: variant_bundle_name(bundle.id(), key.as_deref(), false),
        variant_key: key,
        variants,
        content,
      });
    }
    Ok(artifacts)
  }

  fn join(&self, bundle: &Bundle, status: &mut BundleProcessingStatus<'_>) -> Result<String> {
    match bundle {
      Bundle::Simple(definition) => self.join_simple(definition, status),
      Bundle::Composite(composite) => self.join_composite(composite, status),
    }
  }

  fn join_simple(
    &self,
    definition: &BundleDefinition,
    status: &mut BundleProcessingStatus<'_>,
  ) -> Result<String> {
    let unit = definition
      .unit_post_processor
      .as_ref()
      .unwrap_or(&self.defaults.unit);
    let mut joined = String::new();
    let mut first = true;

    for path in definition.joined_paths() {
      let raw = match self.reader.read(&path.path) {
        Ok(raw) => raw,
        Err(ResourceError::NotFound(_)) => {
          warn!(
            bundle = %definition.id,
            path = %path,
            "a mapped resource was not found, please check your configuration"
          );
          continue;
        }
        Err(err) => {
          warn!(bundle = %definition.id, error = %err, "skipping unreadable resource");
          continue;
        }
      };
      debug!(bundle = %definition.id, path = %path, "adding resource");

      status.set_current_path(&path.path);
      status.set_phase(ProcessingPhase::File);
      let content = prepare_resource(raw, first);
      first = false;
      joined.push_str(&unit.run(status, content)?);
    }

    status.set_phase(ProcessingPhase::Bundle);
    status.set_current_path(&definition.id);
    definition
      .bundle_post_processor
      .as_ref()
      .unwrap_or(&self.defaults.bundle)
      .run(status, joined)
  }

  fn join_composite(
    &self,
    composite: &CompositeBundle,
    status: &mut BundleProcessingStatus<'_>,
  ) -> Result<String> {
    let definition = &composite.definition;
    let unit = definition
      .unit_post_processor
      .as_ref()
      .unwrap_or(&self.defaults.composite_unit);
    let mut joined = String::new();

    for child in &composite.children {
      if !child.definition().inclusion.includes_in_production() {
        debug!(bundle = %definition.id, child = %child.id(), "skipping debug-only child");
        continue;
      }

      let outer = status.replace_licenses(child.licenses());
      let content = self.join(child, status);
      status.replace_licenses(outer);
      let content = content?;

      status.set_phase(ProcessingPhase::File);
      status.set_current_path(child.id());
      joined.push_str(&unit.run(status, content)?);
    }

    status.set_phase(ProcessingPhase::Bundle);
    status.set_current_path(&definition.id);
    definition
      .bundle_post_processor
      .as_ref()
      .unwrap_or(&self.defaults.composite_bundle)
      .run(status, joined)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::BundleError;
  use crate::models::{DebugInclusion, InclusionPattern};
  use crate::paths::{PathMapping, PathResolver};
  use crate::postprocess::PostProcessor;
  use crate::resource::{MemoryResourceReader, NoGenerators};
  use crate::variant::VariantSet;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  struct Marker(&'static str);

  impl PostProcessor for Marker {
    fn name(&self) -> &str {
      "marker"
    }

    fn process(&self, _status: &mut BundleProcessingStatus<'_>, content: String) -> anyhow::Result<String> {
      Ok(format!("{content}{}\n", self.0))
    }
  }

  #[derive(Default)]
  struct Counting(AtomicUsize);

  impl PostProcessor for Counting {
    fn name(&self) -> &str {
      "counting"
    }

    fn process(&self, _status: &mut BundleProcessingStatus<'_>, content: String) -> anyhow::Result<String> {
      self.0.fetch_add(1, Ordering::SeqCst);
      Ok(content)
    }
  }

  struct BrowserSniffer;

  impl PostProcessor for BrowserSniffer {
    fn name(&self) -> &str {
      "browser-sniffer"
    }

    fn process(&self, status: &mut BundleProcessingStatus<'_>, content: String) -> anyhow::Result<String> {
      if status.is_searching_post_processor_variants() && content.contains("@ie6") {
        status.add_discovered_variant(VariantSet::new("browser", "other", ["other", "ie6"])?)?;
      }
      Ok(match status.variant("browser") {
        Some("ie6") => content.replace("@ie6", "zoom: 1;"),
        _ => content.replace("@ie6", ""),
      })
    }
  }

  /// Reports a new dimension on every call, whatever the pass.
  #[derive(Default)]
  struct RestlessDiscoverer(AtomicUsize);

  impl PostProcessor for RestlessDiscoverer {
    fn name(&self) -> &str {
      "restless-discoverer"
    }

    fn process(&self, status: &mut BundleProcessingStatus<'_>, content: String) -> anyhow::Result<String> {
      let call = self.0.fetch_add(1, Ordering::SeqCst);
      status.add_discovered_variant(VariantSet::new(&format!("axis{call}"), "a", ["a", "b"])?)?;
      Ok(content)
    }
  }

  /// Memory reader whose `broken` path fails with an I/O error.
  struct BrokenReader {
    files: MemoryResourceReader,
    broken: &'static str,
  }

  impl ResourceReader for BrokenReader {
    fn list_names(&self, dir: &str) -> std::collections::BTreeSet<String> {
      self.files.list_names(dir)
    }

    fn is_directory(&self, path: &str) -> bool {
      self.files.is_directory(path)
    }

    fn read(&self, path: &str) -> std::result::Result<String, ResourceError> {
      if path == self.broken {
        return Err(ResourceError::Io {
          path: path.to_string(),
          source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
      }
      self.files.read(path)
    }
  }

  struct Failing;

  impl PostProcessor for Failing {
    fn name(&self) -> &str {
      "failing"
    }

    fn process(&self, _status: &mut BundleProcessingStatus<'_>, _content: String) -> anyhow::Result<String> {
      anyhow::bail!("cannot parse")
    }
  }

  fn simple(
    reader: &MemoryResourceReader,
    id: &str,
    mappings: &[&str],
    debug_inclusion: DebugInclusion,
  ) -> BundleDefinition {
    let inclusion = InclusionPattern::new(false, 0, debug_inclusion);
    let mut definition = BundleDefinition::new(id, id, ".js", inclusion);
    definition.mappings = mappings.iter().map(|m| PathMapping::parse(m)).collect();
    definition.paths = PathResolver::new(reader, &NoGenerators, ".js")
      .resolve(id, id, &definition.mappings, inclusion)
      .unwrap();
    definition
  }

  fn lib_reader() -> MemoryResourceReader {
    MemoryResourceReader::new()
      .with_file("/js/lib/b.js", "var b;")
      .with_file("/js/lib/a.js", "var a;\r\n")
      .with_file("/js/lib/sub/c.js", "var c;")
  }

  #[test]
  fn joins_resources_in_resolved_order_then_runs_bundle_chain_once() {
    let reader = lib_reader();
    let counting = Arc::new(Counting::default());
    let defaults = PostProcessorDefaults {
      bundle: PostProcessorChain::new(vec![
        counting.clone() as Arc<dyn PostProcessor>,
        Arc::new(Marker("// end")),
      ]),
      ..PostProcessorDefaults::default()
    };
    let mut bundle = Bundle::Simple(simple(&reader, "/lib.js", &["/js/lib/**"], DebugInclusion::Always));

    let artifacts = AssemblyPipeline::new(&reader, &defaults).assemble(&mut bundle).unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].variant_key, None);
    assert_eq!(artifacts[0].name, "/lib.js");
    assert_eq!(artifacts[0].content, "var a;\nvar b;\nvar c;\n// end\n");
    assert_eq!(counting.0.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn bundle_chain_overrides_defaults_and_unit_chain_runs_per_file() {
    let reader = lib_reader();
    let defaults = PostProcessorDefaults {
      bundle: PostProcessorChain::single(Marker("// default")),
      ..PostProcessorDefaults::default()
    };
    let mut definition = simple(&reader, "/lib.js", &["/js/lib/"], DebugInclusion::Always);
    definition.unit_post_processor = Some(PostProcessorChain::single(Marker("// unit")));
    definition.bundle_post_processor = Some(PostProcessorChain::new(Vec::new()));
    let mut bundle = Bundle::Simple(definition);

    let artifacts = AssemblyPipeline::new(&reader, &defaults).assemble(&mut bundle).unwrap();
    assert_eq!(artifacts[0].content, "var a;\n// unit\nvar b;\n// unit\n");
  }

  #[test]
  fn declared_variants_produce_one_artifact_each() {
    let reader = lib_reader();
    let defaults = PostProcessorDefaults::default();
    let mut definition = simple(&reader, "/lib.js", &["/js/lib/a.js"], DebugInclusion::Always);
    definition.variants.insert(
      "locale".into(),
      VariantSet::new("locale", "en", ["en", "fr"]).unwrap(),
    );
    let mut bundle = Bundle::Simple(definition);

    let artifacts = AssemblyPipeline::new(&reader, &defaults).assemble(&mut bundle).unwrap();
    let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["/lib@en.js", "/lib@fr.js", "/lib.js"]);
  }

  #[test]
  fn discovered_variants_trigger_a_second_pass() {
    let reader = MemoryResourceReader::new().with_file("/css/a.css", "a { @ie6 }");
    let counting = Arc::new(Counting::default());
    let defaults = PostProcessorDefaults {
      unit: PostProcessorChain::new(vec![
        Arc::new(BrowserSniffer) as Arc<dyn PostProcessor>,
        counting.clone(),
      ]),
      ..PostProcessorDefaults::default()
    };
    let inclusion = InclusionPattern::default();
    let mut definition = BundleDefinition::new("/all.css", "all", ".css", inclusion);
    definition.paths.items.push(crate::models::BundlePath::new("/css/a.css"));
    let mut bundle = Bundle::Simple(definition);

    let artifacts = AssemblyPipeline::new(&reader, &defaults).assemble(&mut bundle).unwrap();
    let keys: Vec<Option<&str>> = artifacts.iter().map(|a| a.variant_key.as_deref()).collect();
    assert_eq!(keys, vec![Some("other"), Some("ie6"), None]);
    assert_eq!(artifacts[1].content, "a { zoom: 1; }\n");
    assert_eq!(artifacts[1].name, "/all@ie6.css");
    assert_eq!(artifacts[2].content, "a {  }\n");
    assert!(bundle.definition().variants.contains_key("browser"));
    // one unvaried run in the discovery pass, three in the final pass
    assert_eq!(counting.0.load(Ordering::SeqCst), 4);
  }

  #[test]
  fn variants_found_in_the_final_pass_are_ignored() {
    let reader = lib_reader();
    let discoverer = Arc::new(RestlessDiscoverer::default());
    let defaults = PostProcessorDefaults {
      bundle: PostProcessorChain::new(vec![discoverer.clone() as Arc<dyn PostProcessor>]),
      ..PostProcessorDefaults::default()
    };
    let mut bundle = Bundle::Simple(simple(&reader, "/lib.js", &["/js/lib/a.js"], DebugInclusion::Always));

    let artifacts = AssemblyPipeline::new(&reader, &defaults).assemble(&mut bundle).unwrap();
    let dimensions: Vec<&str> = bundle.definition().variants.keys().map(String::as_str).collect();
    assert_eq!(dimensions, vec!["axis0"]);
    assert_eq!(artifacts.len(), 3);
    // one unvaried call in the discovery pass, three in the final pass, nothing after
    assert_eq!(discoverer.0.load(Ordering::SeqCst), 4);
  }

  #[test]
  fn unreadable_resources_are_skipped() {
    let files = lib_reader();
    let defaults = PostProcessorDefaults::default();
    let mut bundle = Bundle::Simple(simple(&files, "/lib.js", &["/js/lib/**"], DebugInclusion::Always));
    let reader = BrokenReader {
      files,
      broken: "/js/lib/b.js",
    };

    let artifacts = AssemblyPipeline::new(&reader, &defaults).assemble(&mut bundle).unwrap();
    assert_eq!(artifacts[0].content, "var a;\nvar c;\n");
  }

  #[test]
  fn missing_resources_are_skipped() {
    let mut reader = lib_reader();
    let defaults = PostProcessorDefaults::default();
    let mut bundle = Bundle::Simple(simple(&reader, "/lib.js", &["/js/lib/"], DebugInclusion::Always));
    reader.remove("/js/lib/a.js");

    let artifacts = AssemblyPipeline::new(&reader, &defaults).assemble(&mut bundle).unwrap();
    assert_eq!(artifacts[0].content, "var b;\n");
  }

  #[test]
  fn composites_join_children_and_skip_debug_only_ones() {
    let reader = lib_reader().with_file("/js/debug/log.js", "log();");
    let defaults = PostProcessorDefaults {
      bundle: PostProcessorChain::single(Marker("// child")),
      composite_unit: PostProcessorChain::single(Marker("// joined child")),
      composite_bundle: PostProcessorChain::single(Marker("// composite")),
      ..PostProcessorDefaults::default()
    };
    let children = vec![
      Bundle::Simple(simple(&reader, "/a.js", &["/js/lib/a.js"], DebugInclusion::Always)),
      Bundle::Simple(simple(&reader, "/log.js", &["/js/debug/"], DebugInclusion::Only)),
      Bundle::Simple(simple(&reader, "/b.js", &["/js/lib/b.js"], DebugInclusion::Never)),
    ];
    let mut bundle = Bundle::Composite(CompositeBundle {
      definition: BundleDefinition::new("/all.js", "all", ".js", InclusionPattern::default()),
      children,
    });

    let artifacts = AssemblyPipeline::new(&reader, &defaults).assemble(&mut bundle).unwrap();
    assert_eq!(
      artifacts[0].content,
      "var a;\n// child\n// joined child\nvar b;\n// child\n// joined child\n// composite\n"
    );
  }

  #[test]
  fn post_processor_failures_abort_the_bundle() {
    let reader = lib_reader();
    let defaults = PostProcessorDefaults {
      unit: PostProcessorChain::single(Failing),
      ..PostProcessorDefaults::default()
    };
    let mut bundle = Bundle::Simple(simple(&reader, "/lib.js", &["/js/lib/"], DebugInclusion::Always));

    let err = AssemblyPipeline::new(&reader, &defaults).assemble(&mut bundle).unwrap_err();
    assert!(matches!(
      err,
      BundleError::PostProcess { bundle, processor, .. } if bundle == "/lib.js" && processor == "failing"
    ));
  }
}
