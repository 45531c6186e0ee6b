//! `bundle-engine` command line: builds configured bundles and prints served paths.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use bundle_engine::logging::{LogLevel, init_logging};
use bundle_engine::{
  BuildSnapshot, BundleBuilder, BundleSelection, EngineConfig, FsResourceReader,
  PostProcessorRegistry, PrefixGeneratorRegistry, VariantMap, write_artifacts,
};
use clap::{Args, Parser, Subcommand};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "bundle-engine", version, about = "Join, post-process and version JS/CSS bundles")]
struct Cli {
  /// Output verbosity: silent, error, warn, info or debug.
  #[arg(long, global = true, default_value_t = LogLevel::Info)]
  log_level: LogLevel,

  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Build every selected bundle and write the artifacts.
  Build(BuildArgs),
  /// Print the paths a page renders for a bundle.
  Paths(PathsArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
  /// Engine configuration (JSON or YAML).
  #[arg(long, short)]
  config: PathBuf,

  /// Resource root, overriding the configured one.
  #[arg(long)]
  root: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct BuildArgs {
  #[command(flatten)]
  source: SourceArgs,

  /// Output directory, overriding the configured one.
  #[arg(long)]
  out: Option<PathBuf>,

  /// Snapshot file, defaults to the configured mapping file in the output directory.
  #[arg(long)]
  mapping: Option<PathBuf>,

  /// Skip the build when the snapshot shows no resource changed.
  #[arg(long)]
  incremental: bool,
}

#[derive(Debug, Args)]
struct PathsArgs {
  #[command(flatten)]
  source: SourceArgs,

  /// Bundle id, such as `/js/lib.js`.
  #[arg(long)]
  bundle: String,

  /// List individual resources instead of versioned bundle URLs.
  #[arg(long)]
  debug: bool,

  /// Requested variant as `dimension=value`; repeatable.
  #[arg(long = "variant", value_parser = parse_variant)]
  variants: Vec<(String, String)>,
}

struct Workspace {
  config: EngineConfig,
  base_dir: PathBuf,
  reader: FsResourceReader,
  generators: PrefixGeneratorRegistry,
  registry: PostProcessorRegistry,
  selection: BundleSelection,
}

impl Workspace {
  fn open(source: &SourceArgs) -> Result<Self> {
    let config = EngineConfig::load(&source.config)
      .with_context(|| format!("loading configuration {}", source.config.display()))?;
    let base_dir = source
      .config
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_default();

    let root = source
      .root
      .clone()
      .unwrap_or_else(|| config.resource_root_path(&base_dir));
    let selection = match config.selection_file_path(&base_dir) {
      Some(path) => BundleSelection::load_from_path(&path)
        .with_context(|| format!("loading selection {}", path.display()))?,
      None => BundleSelection::default(),
    };

    Ok(Self {
      reader: FsResourceReader::new(root),
      generators: PrefixGeneratorRegistry::new(&config.generator_prefixes)
        .context("compiling generator prefixes")?,
      registry: PostProcessorRegistry::with_builtins()?,
      config,
      base_dir,
      selection,
    })
  }

  fn builder(&self) -> Result<BundleBuilder<'_>> {
    BundleBuilder::new(&self.config, &self.reader, &self.generators, &self.registry)
      .context("configuring bundles")
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.log_level);

  match cli.command {
    Command::Build(args) => build(args),
    Command::Paths(args) => paths(args),
  }
}

fn build(args: BuildArgs) -> Result<()> {
  let workspace = Workspace::open(&args.source)?;
  let out_dir = args
    .out
    .unwrap_or_else(|| workspace.config.output_dir_path(&workspace.base_dir));
  let mapping = args
    .mapping
    .unwrap_or_else(|| out_dir.join(&workspace.config.mapping_file));

  if args.incremental && mapping.exists() {
    let previous = BuildSnapshot::load(&mapping)
      .with_context(|| format!("reading snapshot {}", mapping.display()))?;
    let digest = workspace.config.digest().context("hashing configuration")?;
    if previous.is_up_to_date(&digest, &workspace.reader) {
      info!(snapshot = %mapping.display(), "bundles are up to date");
      return Ok(());
    }
  }

  let mut builder = workspace.builder()?;
  let output = builder
    .build_all(&workspace.selection)
    .context("building bundles")?;
  let written = write_artifacts(&output, &out_dir)
    .with_context(|| format!("writing artifacts to {}", out_dir.display()))?;
  builder
    .snapshot()
    .write(&mapping)
    .with_context(|| format!("writing snapshot {}", mapping.display()))?;

  info!(
    artifacts = written.len(),
    root = %workspace.reader.root().display(),
    out = %out_dir.display(),
    "bundles written"
  );
  Ok(())
}

fn paths(args: PathsArgs) -> Result<()> {
  let workspace = Workspace::open(&args.source)?;
  let mut builder = workspace.builder()?;
  if !args.debug {
    builder
      .build_all(&workspace.selection)
      .context("building bundles")?;
  }

  let variants: VariantMap = args.variants.into_iter().collect();
  let paths = builder
    .resolve_paths(&args.bundle, args.debug, &variants)
    .with_context(|| format!("resolving paths of {}", args.bundle))?;
  for path in paths {
    println!("{path}");
  }
  Ok(())
}

fn parse_variant(raw: &str) -> Result<(String, String)> {
  let (dimension, value) = raw
    .split_once('=')
    .ok_or_else(|| anyhow!("expected dimension=value, got '{raw}'"))?;
  Ok((dimension.trim().to_string(), value.trim().to_string()))
}
