//! Build orchestrator: assembles every selected bundle, hashes the artifacts and serves paths.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::bundle_set::{Bundle, BundleFactory, BundleSet};
use crate::config::EngineConfig;
use crate::error::{BundleError, Result};
use crate::hash::HashVersioner;
use crate::models::BundlePath;
use crate::pipeline::{AssemblyPipeline, PostProcessorDefaults};
use crate::postprocess::PostProcessorRegistry;
use crate::resource::{GeneratorRegistry, ResourceReader};
use crate::selection::BundleInclusion;
use crate::snapshot::{BuildSnapshot, BundleSnapshot};
use crate::variant::{VariantMap, resolve_best_match};

/// One stored artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArtifact {
  /// Storage name, the bundle id with the variant key inserted.
  pub name: String,
  /// Joined, post-processed content.
  pub content: String,
  /// Cache-busting token of the content.
  pub hash: String,
}

/// Artifacts keyed by bundle id and variant key; `None` is the unvaried artifact.
pub type BuildOutput = BTreeMap<(String, Option<String>), BuiltArtifact>;

/// High-level helper building bundles and answering path requests.
pub struct BundleBuilder<'a> {
  config: &'a EngineConfig,
  reader: &'a dyn ResourceReader,
  bundles: BundleSet,
  defaults: PostProcessorDefaults,
  versioner: HashVersioner,
  config_digest: String,
}

impl<'a> BundleBuilder<'a> {
  /// Create the bundles described by `config`.
  pub fn new(
    config: &'a EngineConfig,
    reader: &'a dyn ResourceReader,
    generators: &dyn GeneratorRegistry,
    registry: &PostProcessorRegistry,
  ) -> Result<Self> {
    let bundles = BundleFactory::new(config, reader, generators, registry).build()?;
    let defaults = PostProcessorDefaults::from_config(registry, &config.post_processors)?;
    info!(bundles = bundles.len(), "bundles configured");

    Ok(Self {
      config,
      reader,
      bundles,
      defaults,
      versioner: HashVersioner::new(config.hash_algorithm.algorithm()),
      config_digest: config.digest()?,
    })
  }

  /// Configured bundles.
  pub fn bundles(&self) -> &BundleSet {
    &self.bundles
  }

  /// Digest of the configuration the bundles were created from.
  pub fn config_digest(&self) -> &str {
    &self.config_digest
  }

  /// Hashes of the built artifacts.
  pub fn versioner(&self) -> &HashVersioner {
    &self.versioner
  }

  /// Assemble and hash every selected bundle.
  ///
  /// Bundles with an alternate production URL are not built.
  pub fn build_all<S: BundleInclusion>(&mut self, selection: &S) -> Result<BuildOutput> {
    let pipeline = AssemblyPipeline::new(self.reader, &self.defaults);
    let mut output = BuildOutput::new();

    for bundle in self.bundles.iter_mut() {
      let definition = bundle.definition();
      if !selection.is_included(&definition.name) {
        debug!(bundle = %definition.name, "bundle not selected, skipping");
        continue;
      }
      if let Some(url) = &definition.alternate_production_url {
        debug!(bundle = %definition.name, url = %url, "bundle served from an alternate url");
        continue;
      }

      let bundle_id = definition.id.clone();
      self.versioner.clear(&bundle_id);
      for artifact in pipeline.assemble(bundle)? {
        let hash = self.versioner.store(
          &bundle_id,
          artifact.variant_key.as_deref(),
          &artifact.content,
        );
        output.insert(
          (bundle_id.clone(), artifact.variant_key),
          BuiltArtifact {
            name: artifact.name,
            content: artifact.content,
            hash,
          },
        );
      }
    }

    info!(artifacts = output.len(), "build finished");
    Ok(output)
  }

  /// Paths a page requesting `bundle_id` renders: its dependencies, then the bundle itself.
  ///
  /// Debug mode lists individual resources; production mode lists one versioned URL per bundle.
  pub fn resolve_paths(&self, bundle_id: &str, debug: bool, variants: &VariantMap) -> Result<Vec<BundlePath>> {
    let bundle = self.bundles.require(bundle_id)?;
    let mut paths = Vec::new();

    for name in &bundle.definition().resolved_dependencies {
      let dependency = self
        .bundles
        .by_name(name)
        .ok_or_else(|| BundleError::UnknownBundle(name.clone()))?;
      self.push_bundle_paths(dependency, debug, variants, &mut paths)?;
    }
    self.push_bundle_paths(bundle, debug, variants, &mut paths)?;
    Ok(paths)
  }

  /// Paths of every global bundle, in inclusion order.
  pub fn global_bundle_paths(&self, debug: bool, variants: &VariantMap) -> Result<Vec<BundlePath>> {
    let mut paths = Vec::new();
    for bundle in self.bundles.global_bundles() {
      self.push_bundle_paths(bundle, debug, variants, &mut paths)?;
    }
    Ok(paths)
  }

  /// Production URL of `bundle_id` for a request selecting `variants`.
  pub fn production_url(&self, bundle_id: &str, variants: &VariantMap) -> Result<String> {
    let definition = self.bundles.require(bundle_id)?.definition();
    if let Some(url) = &definition.alternate_production_url {
      return Ok(url.clone());
    }
    let key = resolve_best_match(&definition.variants, variants);
    self.versioner.url_path(&definition.id, key.as_deref())
  }

  /// Serializable record of the current state.
  pub fn snapshot(&self) -> BuildSnapshot {
    BuildSnapshot {
      hash_algorithm: self.config.hash_algorithm,
      config_digest: self.config_digest.clone(),
      bundles: self
        .bundles
        .iter()
        .map(|bundle| BundleSnapshot::capture(bundle, &self.versioner, self.reader))
        .collect(),
    }
  }

  fn push_bundle_paths(
    &self,
    bundle: &Bundle,
    debug: bool,
    variants: &VariantMap,
    paths: &mut Vec<BundlePath>,
  ) -> Result<()> {
    if !bundle.definition().inclusion.is_served(debug) {
      return Ok(());
    }

    if debug {
      paths.extend(bundle.debug_paths());
    } else {
      paths.push(BundlePath::new(self.production_url(bundle.id(), variants)?));
    }
    Ok(())
  }
}

/// Write every artifact to `<out_dir>/<hash>[.<variant key>]/<bundle id>`.
pub fn write_artifacts(output: &BuildOutput, out_dir: &Path) -> Result<Vec<PathBuf>> {
  let mut written = Vec::with_capacity(output.len());
  for ((bundle_id, variant_key), artifact) in output {
    let prefix = match variant_key {
      Some(key) if !key.is_empty() => format!("{}.{key}", artifact.hash),
      _ => artifact.hash.clone(),
    };
    let destination = out_dir
      .join(prefix)
      .join(bundle_id.trim_start_matches('/'));
    if let Some(parent) = destination.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&destination, &artifact.content)?;
    debug!(path = %destination.display(), "artifact written");
    written.push(destination);
  }
  Ok(written)
}
