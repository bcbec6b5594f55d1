#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]

pub mod artifact;
pub mod handle;
pub mod junctions;
pub mod reference;

pub use artifact::{ArtifactPath, FileFormat, JUNCTION_KEYS_EXT};
pub use handle::{MapHandle, MissingArtifact, QualityEncoding, TrimSpec};
pub use junctions::{Junction, JunctionSet};
pub use reference::ReferenceIndex;
