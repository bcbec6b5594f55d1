//! Terminal stages: paired-end reconciliation with scoring, and
//! conversion into the binary alignment container.

use crate::context::PipelineContext;
use crate::naming::Persistence;
use crate::registry::remove_artifact;
use crate::stages::MAX_INSERT_SIZE;
use anyhow::Result;
use gem_engine::{compress, PairAlignRequest};
use gem_types::{ArtifactPath, FileFormat, MapHandle};
use log::{info, warn};
use std::cmp::max;
use std::time::Instant;

impl PipelineContext {
    /// Reconcile read pairs and score the result into the run's final
    /// alignment artifact. The output is a persistent result the caller
    /// owns; it is never registered for deletion. With `compress`, the
    /// scored output is gzipped in place and the returned handle points at
    /// the compressed artifact.
    pub fn pair_align(&mut self, input: &MapHandle, compress_output: bool) -> Result<MapHandle> {
        info!("running pair aligner");
        let final_out = self.artifact_path("", FileFormat::Map, Persistence::Final);
        let expected = if compress_output {
            final_out.appended("gz")
        } else {
            final_out.clone()
        };
        if self.cache.should_skip(&expected) {
            warn!("pair-alignment exists, skipping: {}", expected.display());
            return MapHandle::open(&expected, FileFormat::Map, self.quality);
        }

        let timer = Instant::now();
        let paired_tmp = self.artifact_path("paired", FileFormat::Map, Persistence::Temporary);
        let paired = self.toolchain.pair_align(PairAlignRequest {
            input,
            index: self.index.path(),
            output: &paired_tmp,
            max_insert_size: MAX_INSERT_SIZE,
            quality: self.quality,
            threads: self.threads,
        })?;
        let scored = self
            .toolchain
            .score(&paired, self.index.path(), &final_out, self.threads)?;
        info!("pair-align and scoring finished in {:.2?}", timer.elapsed());

        if compress_output {
            info!("compressing final mapping");
            let timer = Instant::now();
            let compressed = compress::gzip(&final_out)?;
            info!("results compressed in {:.2?}", timer.elapsed());
            return MapHandle::open(&compressed, FileFormat::Map, self.quality);
        }
        Ok(scored)
    }

    /// Convert an alignment stream into the binary container, optionally
    /// coordinate-sorted, going through a textual intermediate that is
    /// discarded as soon as the conversion lands.
    pub fn create_bam(&mut self, input: &MapHandle, sort: bool) -> Result<()> {
        info!("converting to sam/bam");
        let bam_out = self.artifact_path("", FileFormat::Bam, Persistence::Final);
        if self.cache.should_skip(&bam_out) {
            warn!("BAM exists, skipping conversion: {}", bam_out.display());
            return Ok(());
        }

        let timer = Instant::now();
        let sam_tmp = self.artifact_path("", FileFormat::Sam, Persistence::Temporary);
        let threads = max(1, self.threads / 2);
        let sam = self
            .toolchain
            .map_to_sam(input, self.index.path(), &sam_tmp, threads)?;
        self.toolchain.sam_to_bam(&sam, &bam_out, sort)?;
        remove_artifact(&sam);
        info!("BAM file created in {:.2?}", timer.elapsed());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{context_with, scaffold, RecordingToolchain};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_pair_align_produces_final_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = RecordingToolchain::new();
        let counters = toolchain.counters();
        let mut ctx = context_with(scaffold(dir.path()), toolchain);
        let reads = dir.path().join("reads.fastq");

        let merged = ctx.split_mapping_step(&reads, "split", None).unwrap();
        let scored = ctx.pair_align(&merged, false).unwrap();

        assert_eq!(scored.path(), dir.path().join("sample1.map"));
        assert!(scored.path().exists());
        assert_eq!(counters.pair_align.load(Ordering::Relaxed), 1);
        assert_eq!(counters.score.load(Ordering::Relaxed), 1);
        // The final artifact is not registered for deletion.
        assert!(!ctx
            .temp_files()
            .paths()
            .contains(&dir.path().join("sample1.map")));
    }

    #[test]
    fn test_pair_align_compress_then_skip() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = RecordingToolchain::new();
        let counters = toolchain.counters();
        let mut ctx = context_with(scaffold(dir.path()), toolchain);
        let reads = dir.path().join("reads.fastq");

        let merged = ctx.split_mapping_step(&reads, "split", None).unwrap();
        let compressed = ctx.pair_align(&merged, true).unwrap();

        assert_eq!(compressed.path(), dir.path().join("sample1.map.gz"));
        assert!(compressed.path().exists());
        assert!(!dir.path().join("sample1.map").exists());
        assert_eq!(counters.pair_align.load(Ordering::Relaxed), 1);

        // Re-invocation with the compressed artifact present skips
        // realignment entirely.
        let reopened = ctx.pair_align(&merged, true).unwrap();
        assert_eq!(reopened.path(), compressed.path());
        assert_eq!(counters.pair_align.load(Ordering::Relaxed), 1);
        assert_eq!(counters.score.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_create_bam_discards_sam_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = RecordingToolchain::new();
        let counters = toolchain.counters();
        let mut ctx = context_with(scaffold(dir.path()), toolchain);
        let reads = dir.path().join("reads.fastq");

        let merged = ctx.split_mapping_step(&reads, "split", None).unwrap();
        ctx.create_bam(&merged, true).unwrap();

        assert!(dir.path().join("sample1.bam").exists());
        assert!(!dir.path().join("sample1.sam").exists());
        assert_eq!(counters.map_to_sam.load(Ordering::Relaxed), 1);
        assert_eq!(counters.sam_to_bam.load(Ordering::Relaxed), 1);

        ctx.create_bam(&merged, true).unwrap();
        assert_eq!(counters.map_to_sam.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_create_bam_halves_threads() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = RecordingToolchain::new();
        let threads_seen = toolchain.sam_threads();
        let mut params = scaffold(dir.path());
        params.threads = 5;
        let mut ctx = context_with(params, toolchain);
        let reads = dir.path().join("reads.fastq");

        let merged = ctx.split_mapping_step(&reads, "split", None).unwrap();
        ctx.create_bam(&merged, false).unwrap();
        assert_eq!(*threads_seen.lock().unwrap(), vec![2]);

        let toolchain = RecordingToolchain::new();
        let threads_seen = toolchain.sam_threads();
        let mut params = scaffold(dir.path());
        params.name = "sample2".to_string();
        params.threads = 1;
        let mut ctx = context_with(params, toolchain);
        let merged = ctx.split_mapping_step(&reads, "split", None).unwrap();
        ctx.create_bam(&merged, false).unwrap();
        assert_eq!(*threads_seen.lock().unwrap(), vec![1]);
    }
}
