//! The external-collaborator boundary: narrow request/response contracts
//! for the mapping engine and its sibling tools, a subprocess-backed
//! implementation driving the `gem-*` executables, and the gzip utility
//! applied to final artifacts.

#![deny(
    future_incompatible,
    nonstandard_style,
    rust_2018_compatibility,
    rust_2021_compatibility,
    rust_2018_idioms,
    unused
)]

pub mod compress;
pub mod process;
pub mod toolchain;

pub use process::GemToolchain;
pub use toolchain::{
    ComputeTranscriptomeRequest, EngineError, ExtractJunctionsRequest, MapRequest, PairAlignRequest,
    SplitMapRequest, Toolchain, TranscriptMapRequest, TranscriptomeFiles,
};
