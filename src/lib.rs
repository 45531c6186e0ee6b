#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod builder;
pub mod bundle_set;
pub mod config;
pub mod dependency;
pub mod error;
pub mod hash;
pub mod logging;
pub mod models;
pub mod paths;
pub mod pipeline;
pub mod postprocess;
pub mod resource;
pub mod selection;
pub mod snapshot;
pub mod variant;

pub use builder::{BuildOutput, BuiltArtifact, BundleBuilder, write_artifacts};
pub use bundle_set::{Bundle, BundleDefinition, BundleFactory, BundleSet, CompositeBundle};
pub use config::{BundleConfig, EngineConfig, PostProcessorsConfig, ResourceType, VariantSetConfig};
pub use dependency::{DependencyNode, DependencyResolver};
pub use error::{BundleError, ResourceError, Result};
pub use hash::{Blake3Hash, HashAlgorithm, HashAlgorithmKind, HashVersioner, Sha256Hash};
pub use models::{BundlePath, DebugInclusion, InclusionPattern};
pub use paths::{PathMapping, PathMappingKind, PathResolver, ResolvedPaths};
pub use pipeline::{Artifact, AssemblyPipeline, PostProcessorDefaults};
pub use postprocess::{
  BundleProcessingStatus, PostProcessor, PostProcessorChain, PostProcessorRegistry,
  ProcessingPhase,
};
pub use resource::{
  FsResourceReader, GeneratorRegistry, MemoryResourceReader, NoGenerators,
  PrefixGeneratorRegistry, ResourceReader,
};
pub use selection::{BundleInclusion, BundleSelection};
pub use snapshot::{BuildSnapshot, BundleSnapshot, ResourceStamp};
pub use variant::{VariantDimensions, VariantMap, VariantSet, resolve_best_match};
