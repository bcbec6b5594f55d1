//! Test doubles and fixtures for exercising the orchestrator without the
//! real engine. The recording toolchain produces small real files so cache
//! checks and handle opening behave exactly as in production, and counts
//! every invocation so resume tests can assert that no recomputation
//! happened.

use crate::context::{PipelineContext, PipelineParams};
use anyhow::Result;
use gem_engine::{
    ComputeTranscriptomeRequest, ExtractJunctionsRequest, MapRequest, PairAlignRequest,
    SplitMapRequest, Toolchain, TranscriptMapRequest, TranscriptomeFiles,
};
use gem_types::{ArtifactPath, FileFormat, JunctionSet, MapHandle, QualityEncoding};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Number of times each engine operation ran.
#[derive(Debug, Default)]
pub struct EngineCounters {
    pub map: AtomicUsize,
    pub split_map: AtomicUsize,
    pub transcript_map: AtomicUsize,
    pub extract_junctions: AtomicUsize,
    pub junctions_from_annotation: AtomicUsize,
    pub compute_transcriptome: AtomicUsize,
    pub build_index: AtomicUsize,
    pub merge: AtomicUsize,
    pub pair_align: AtomicUsize,
    pub score: AtomicUsize,
    pub map_to_sam: AtomicUsize,
    pub sam_to_bam: AtomicUsize,
}

impl EngineCounters {
    /// Total invocations across all operations.
    pub fn total(&self) -> usize {
        [
            &self.map,
            &self.split_map,
            &self.transcript_map,
            &self.extract_junctions,
            &self.junctions_from_annotation,
            &self.compute_transcriptome,
            &self.build_index,
            &self.merge,
            &self.pair_align,
            &self.score,
            &self.map_to_sam,
            &self.sam_to_bam,
        ]
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .sum()
    }
}

/// In-memory engine double.
#[derive(Default)]
pub struct RecordingToolchain {
    counters: Arc<EngineCounters>,
    annotation_junctions: JunctionSet,
    denovo_junctions: JunctionSet,
    transcript_index_lists: Arc<Mutex<Vec<Vec<PathBuf>>>>,
    transcript_key_lists: Arc<Mutex<Vec<Vec<PathBuf>>>>,
    sam_threads: Arc<Mutex<Vec<usize>>>,
}

impl RecordingToolchain {
    pub fn new() -> RecordingToolchain {
        RecordingToolchain::default()
    }

    /// Configure the junction sets the double reports for annotation
    /// parsing and read-evidence extraction.
    pub fn with_junctions(
        annotation_junctions: JunctionSet,
        denovo_junctions: JunctionSet,
    ) -> RecordingToolchain {
        RecordingToolchain {
            annotation_junctions,
            denovo_junctions,
            ..RecordingToolchain::default()
        }
    }

    pub fn counters(&self) -> Arc<EngineCounters> {
        Arc::clone(&self.counters)
    }

    /// Index lists seen by transcript mapping, one entry per call.
    pub fn transcript_index_lists(&self) -> Arc<Mutex<Vec<Vec<PathBuf>>>> {
        Arc::clone(&self.transcript_index_lists)
    }

    /// Key-table lists seen by transcript mapping, one entry per call.
    pub fn transcript_key_lists(&self) -> Arc<Mutex<Vec<Vec<PathBuf>>>> {
        Arc::clone(&self.transcript_key_lists)
    }

    /// Thread counts seen by SAM conversion, one entry per call.
    pub fn sam_threads(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.sam_threads)
    }

    fn produce(path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Toolchain for RecordingToolchain {
    fn map(&self, request: MapRequest<'_>) -> Result<MapHandle> {
        self.counters.map.fetch_add(1, Ordering::Relaxed);
        Self::produce(request.output, "mapped\n")?;
        MapHandle::open(request.output, FileFormat::Map, request.quality)
    }

    fn split_map(&self, request: SplitMapRequest<'_>) -> Result<MapHandle> {
        self.counters.split_map.fetch_add(1, Ordering::Relaxed);
        Self::produce(request.output, "split-mapped\n")?;
        MapHandle::open(request.output, FileFormat::Map, request.quality)
    }

    fn transcript_map(&self, request: TranscriptMapRequest<'_>) -> Result<MapHandle> {
        self.counters.transcript_map.fetch_add(1, Ordering::Relaxed);
        self.transcript_index_lists
            .lock()
            .unwrap()
            .push(request.indices.to_vec());
        self.transcript_key_lists
            .lock()
            .unwrap()
            .push(request.keys.to_vec());
        Self::produce(request.output, "transcript-mapped\n")?;
        MapHandle::open(request.output, FileFormat::Map, request.quality)
    }

    fn extract_junctions(&self, request: ExtractJunctionsRequest<'_>) -> Result<JunctionSet> {
        self.counters.extract_junctions.fetch_add(1, Ordering::Relaxed);
        let mut junctions = self.denovo_junctions.clone();
        junctions.merge(request.merge_with);
        Ok(junctions)
    }

    fn junctions_from_annotation(&self, _annotation: &Path) -> Result<JunctionSet> {
        self.counters
            .junctions_from_annotation
            .fetch_add(1, Ordering::Relaxed);
        Ok(self.annotation_junctions.clone())
    }

    fn compute_transcriptome(
        &self,
        request: ComputeTranscriptomeRequest<'_>,
    ) -> Result<TranscriptomeFiles> {
        self.counters
            .compute_transcriptome
            .fetch_add(1, Ordering::Relaxed);
        let sequence = request.junctions.appended(FileFormat::Fasta.extension());
        let keys = request.junctions.appended(FileFormat::Keys.extension());
        Self::produce(&sequence, ">transcript_1\nACGTACGT\n")?;
        Self::produce(&keys, "transcript_1\tchr1\n")?;
        Ok(TranscriptomeFiles { sequence, keys })
    }

    fn build_index(&self, _sequence: &Path, output: &Path, _threads: usize) -> Result<PathBuf> {
        self.counters.build_index.fetch_add(1, Ordering::Relaxed);
        Self::produce(output, "index\n")?;
        Self::produce(&output.companion(FileFormat::Log), "indexed\n")?;
        Ok(output.to_path_buf())
    }

    fn merge(&self, inputs: &[MapHandle], output: &Path, _threads: usize) -> Result<MapHandle> {
        self.counters.merge.fetch_add(1, Ordering::Relaxed);
        // Concatenate in input order so the output is deterministic for
        // identical inputs.
        let mut contents = String::new();
        for input in inputs {
            contents.push_str(&fs::read_to_string(input.path())?);
        }
        Self::produce(output, &contents)?;
        let quality = inputs.first().map(MapHandle::quality).unwrap_or_default();
        MapHandle::open(output, FileFormat::Map, quality)
    }

    fn pair_align(&self, request: PairAlignRequest<'_>) -> Result<MapHandle> {
        self.counters.pair_align.fetch_add(1, Ordering::Relaxed);
        Self::produce(request.output, "paired\n")?;
        MapHandle::open(request.output, FileFormat::Map, request.quality)
    }

    fn score(
        &self,
        input: &MapHandle,
        _index: &Path,
        output: &Path,
        _threads: usize,
    ) -> Result<MapHandle> {
        self.counters.score.fetch_add(1, Ordering::Relaxed);
        Self::produce(output, "scored\n")?;
        MapHandle::open(output, FileFormat::Map, input.quality())
    }

    fn map_to_sam(
        &self,
        _input: &MapHandle,
        _index: &Path,
        output: &Path,
        threads: usize,
    ) -> Result<PathBuf> {
        self.counters.map_to_sam.fetch_add(1, Ordering::Relaxed);
        self.sam_threads.lock().unwrap().push(threads);
        Self::produce(output, "@HD\tVN:1.6\n")?;
        Ok(output.to_path_buf())
    }

    fn sam_to_bam(&self, _sam: &Path, output: &Path, _sort: bool) -> Result<()> {
        self.counters.sam_to_bam.fetch_add(1, Ordering::Relaxed);
        Self::produce(output, "BAM\u{1}")?;
        Ok(())
    }
}

/// Write the fixture files a run needs (reference index, annotation,
/// reads) into `dir` and return matching parameters for run "sample1".
pub fn scaffold(dir: &Path) -> PipelineParams {
    let index = dir.join("genome.gem");
    let annotation = dir.join("genes.gtf");
    fs::write(&index, "reference index\n").unwrap();
    fs::write(
        &annotation,
        "chr1\thavana\texon\t100\t200\t.\t+\t.\tgene_id \"g1\";\n",
    )
    .unwrap();
    fs::write(dir.join("reads.fastq"), "@read1\nACGT\n+\nIIII\n").unwrap();

    PipelineParams {
        name: "sample1".to_string(),
        index,
        output_dir: dir.to_path_buf(),
        annotation: Some(annotation),
        threads: 2,
        junction_coverage: 4,
        max_fragment_length: 100,
        transcript_index: None,
        transcript_keys: None,
        quality: QualityEncoding::Offset33,
        delta: 1,
        retention: Default::default(),
        validator: Default::default(),
    }
}

/// Build a context over the given double, panicking on configuration
/// errors; tests exercising those errors call `PipelineContext::new`
/// directly.
pub fn context_with(params: PipelineParams, toolchain: RecordingToolchain) -> PipelineContext {
    PipelineContext::new(params, Box::new(toolchain)).unwrap()
}
