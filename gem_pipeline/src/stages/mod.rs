//! Pipeline stages. Each stage computes its target path, consults the
//! stage cache, invokes the external engine on a miss, and registers
//! whatever it creates with the temp-file registry.

pub mod junctions;
pub mod mapping;
pub mod merge;
pub mod postprocess;
pub mod transcriptome;

/// Mismatch rate for the mapping stage variants.
pub const MAPPING_MISMATCH_RATE: f64 = 0.06;

/// Mismatch rate for junction discovery, stricter than mapping.
pub const JUNCTION_MISMATCH_RATE: f64 = 0.04;

/// Strata explored past the first during junction discovery.
pub const JUNCTION_STRATA_AFTER_FIRST: u32 = 0;

/// Junction pairs separated by more than this span are discarded before
/// persistence.
pub const MAX_JUNCTION_SPAN: u64 = 500_000;

/// Insert-size bound for paired-end reconciliation.
pub const MAX_INSERT_SIZE: u64 = 100_000;

/// Transcript mapping decodes all strata.
pub const MIN_DECODED_STRATA: u32 = 0;
