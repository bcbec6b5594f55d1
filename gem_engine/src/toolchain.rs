//! Contracts for every external collaborator the orchestrator invokes.
//!
//! Each operation is an opaque blocking call: the orchestrator hands over
//! input paths and parameters, the collaborator produces its output file
//! (or an in-memory junction set) and returns. Parallelism lives entirely
//! behind these contracts, steered by the per-request thread count.

use anyhow::Result;
use gem_types::{JunctionSet, MapHandle, QualityEncoding, TrimSpec};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// An external tool exited unsuccessfully. The run is over; intermediate
/// state may be inconsistent, so no retry is attempted.
#[derive(Debug, thiserror::Error)]
#[error("external tool `{tool}` failed: {status}")]
pub struct EngineError {
    pub tool: String,
    pub status: ExitStatus,
}

/// Direct mapping of reads against the reference index.
#[derive(Clone, Copy, Debug)]
pub struct MapRequest<'a> {
    pub input: &'a Path,
    pub index: &'a Path,
    pub output: &'a Path,
    pub mismatch_rate: f64,
    pub delta: u32,
    pub trim: Option<TrimSpec>,
    pub quality: QualityEncoding,
    pub threads: usize,
}

/// Split mapping across splice junctions. An optional junctions file
/// constrains the split sites the mapper considers.
#[derive(Clone, Copy, Debug)]
pub struct SplitMapRequest<'a> {
    pub input: &'a Path,
    pub index: &'a Path,
    pub output: &'a Path,
    pub junctions: Option<&'a Path>,
    pub mismatch_rate: f64,
    pub trim: Option<TrimSpec>,
    pub quality: QualityEncoding,
    pub threads: usize,
}

/// Mapping against one or more transcript indices. Indices and key tables
/// are parallel lists; a read may be explained by any of them.
#[derive(Clone, Copy, Debug)]
pub struct TranscriptMapRequest<'a> {
    pub input: &'a Path,
    pub indices: &'a [PathBuf],
    pub keys: &'a [PathBuf],
    pub output: &'a Path,
    pub mismatch_rate: f64,
    pub delta: u32,
    pub min_decoded_strata: u32,
    pub trim: Option<TrimSpec>,
    pub quality: QualityEncoding,
    pub threads: usize,
}

/// Junction discovery from read evidence. `merge_with` is folded into the
/// result; `coverage` gates which candidates are retained.
#[derive(Clone, Debug)]
pub struct ExtractJunctionsRequest<'a> {
    pub input: &'a Path,
    pub index: &'a Path,
    pub mismatch_rate: f64,
    pub threads: usize,
    pub strata_after_first: u32,
    pub coverage: u32,
    pub merge_with: JunctionSet,
}

/// Synthetic transcriptome computation from a persisted junction set,
/// bounded by the maximum fragment length.
#[derive(Clone, Copy, Debug)]
pub struct ComputeTranscriptomeRequest<'a> {
    pub max_length: u64,
    pub index: &'a Path,
    pub junctions: &'a Path,
    pub gtf_junctions: &'a Path,
}

/// Output of a transcriptome computation: the synthetic sequence and the
/// key table mapping transcript coordinates back to the genome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptomeFiles {
    pub sequence: PathBuf,
    pub keys: PathBuf,
}

/// Paired-end reconciliation of an alignment stream.
#[derive(Clone, Copy, Debug)]
pub struct PairAlignRequest<'a> {
    pub input: &'a MapHandle,
    pub index: &'a Path,
    pub output: &'a Path,
    pub max_insert_size: u64,
    pub quality: QualityEncoding,
    pub threads: usize,
}

/// The full set of external services the pipeline consumes. One
/// implementation drives the real `gem-*` executables; tests substitute a
/// recording double.
pub trait Toolchain {
    fn map(&self, request: MapRequest<'_>) -> Result<MapHandle>;

    fn split_map(&self, request: SplitMapRequest<'_>) -> Result<MapHandle>;

    fn transcript_map(&self, request: TranscriptMapRequest<'_>) -> Result<MapHandle>;

    fn extract_junctions(&self, request: ExtractJunctionsRequest<'_>) -> Result<JunctionSet>;

    /// Derive the junction set encoded in a GTF annotation.
    fn junctions_from_annotation(&self, annotation: &Path) -> Result<JunctionSet>;

    fn compute_transcriptome(
        &self,
        request: ComputeTranscriptomeRequest<'_>,
    ) -> Result<TranscriptomeFiles>;

    /// Build a search index over a sequence file. Returns the index path;
    /// the indexer also leaves a `.log` companion next to it.
    fn build_index(&self, sequence: &Path, output: &Path, threads: usize) -> Result<PathBuf>;

    /// Merge two or more alignment streams into one ordered output. A
    /// single input degenerates to a copy. The record order is total and
    /// deterministic for identical inputs.
    fn merge(&self, inputs: &[MapHandle], output: &Path, threads: usize) -> Result<MapHandle>;

    fn pair_align(&self, request: PairAlignRequest<'_>) -> Result<MapHandle>;

    fn score(
        &self,
        input: &MapHandle,
        index: &Path,
        output: &Path,
        threads: usize,
    ) -> Result<MapHandle>;

    /// Convert an alignment stream to the textual intermediate format.
    fn map_to_sam(
        &self,
        input: &MapHandle,
        index: &Path,
        output: &Path,
        threads: usize,
    ) -> Result<PathBuf>;

    /// Convert (and optionally coordinate-sort) the textual intermediate
    /// into the binary container.
    fn sam_to_bam(&self, sam: &Path, output: &Path, sort: bool) -> Result<()>;
}
