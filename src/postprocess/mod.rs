//! Post-processors applied to single resources and to joined bundles.

mod builtin;
mod chain;
mod registry;
mod status;

pub use builtin::{CharsetCleaner, LicenseIncluder};
pub use chain::{PostProcessor, PostProcessorChain};
pub use registry::PostProcessorRegistry;
pub use status::{BundleProcessingStatus, ProcessingPhase};
