#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]

pub mod cache;
pub mod context;
pub mod naming;
pub mod registry;
pub mod stages;
pub mod testing;

pub use cache::{ArtifactValidator, StageCache};
pub use context::{DenovoIndex, PipelineContext, PipelineParams};
pub use naming::{ArtifactNamer, Persistence};
pub use registry::{RetentionPolicy, TempFileRegistry};
pub use stages::junctions::MissingAnnotation;
pub use stages::mapping::TranscriptIndexOverride;
pub use stages::merge::MergeWithoutMappings;
