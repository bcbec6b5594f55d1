//! De-novo transcriptome construction: junction discovery, synthetic
//! transcriptome computation, and indexing.

use crate::context::{DenovoIndex, PipelineContext};
use crate::naming::Persistence;
use crate::stages::{JUNCTION_MISMATCH_RATE, JUNCTION_STRATA_AFTER_FIRST, MAX_JUNCTION_SPAN};
use anyhow::Result;
use gem_engine::{ComputeTranscriptomeRequest, ExtractJunctionsRequest};
use gem_types::{ArtifactPath, FileFormat};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

impl PipelineContext {
    /// Build a supplementary transcriptome from de-novo junctions and
    /// index it, so transcript mapping can consult it alongside the
    /// annotation-derived index. Sets the context's de-novo index and key
    /// table together on success.
    ///
    /// The mapping performed during junction discovery is scaffolding: its
    /// files are registered as temporaries, but it never appears in the
    /// mapping log.
    pub fn create_denovo_transcriptome(&mut self, input: &Path) -> Result<PathBuf> {
        let index_out = self.artifact_path(
            "denovo_transcripts",
            FileFormat::GemIndex,
            Persistence::Temporary,
        );
        let junctions_out = self.artifact_path("all", FileFormat::Junctions, Persistence::Temporary);
        let sequence_out = junctions_out.appended(FileFormat::Fasta.extension());
        let keys_out = junctions_out.appended(FileFormat::Keys.extension());

        if self.cache.should_skip(&index_out) && self.cache.should_skip(&keys_out) {
            warn!(
                "transcriptome index and keys found, skipping build: {}",
                index_out.display()
            );
            // The ancillary files of the prior build still belong to this
            // run's lifetime.
            self.temp_files.register(sequence_out);
            self.temp_files.register(keys_out.clone());
            self.temp_files.register(index_out.companion(FileFormat::Log));
            self.denovo = Some(DenovoIndex {
                index: index_out.clone(),
                keys: keys_out,
            });
            return Ok(index_out);
        }

        let (gtf_junctions, gtf_source) = self.gtf_junctions()?;

        let timer = Instant::now();
        info!("extracting de-novo junctions");
        self.temp_files.register(sequence_out);
        self.temp_files.register(keys_out);
        let junctions = self.toolchain.extract_junctions(ExtractJunctionsRequest {
            input,
            index: self.index.path(),
            mismatch_rate: JUNCTION_MISMATCH_RATE,
            threads: self.threads,
            strata_after_first: JUNCTION_STRATA_AFTER_FIRST,
            coverage: self.junction_coverage,
            merge_with: gtf_junctions,
        })?;
        info!("{} junctions in total", junctions.len());
        junctions
            .filter_by_distance(MAX_JUNCTION_SPAN)
            .write_junctions(&junctions_out)?;
        info!("de-novo junctions extracted in {:.2?}", timer.elapsed());

        let timer = Instant::now();
        info!("computing de-novo transcriptome");
        let transcriptome = self
            .toolchain
            .compute_transcriptome(ComputeTranscriptomeRequest {
                max_length: self.max_fragment_length,
                index: self.index.path(),
                junctions: &junctions_out,
                gtf_junctions: &gtf_source,
            })?;
        info!("transcriptome generated in {:.2?}", timer.elapsed());

        let timer = Instant::now();
        info!("indexing de-novo transcriptome");
        let index = self
            .toolchain
            .build_index(&transcriptome.sequence, &index_out, self.threads)?;
        info!("transcriptome indexed in {:.2?}", timer.elapsed());
        self.temp_files.register(index.companion(FileFormat::Log));

        self.denovo = Some(DenovoIndex {
            index: index.clone(),
            keys: transcriptome.keys,
        });
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{context_with, scaffold, RecordingToolchain};
    use gem_types::{Junction, JunctionSet};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_build_sets_denovo_pair() {
        let dir = tempfile::tempdir().unwrap();
        let denovo: JunctionSet = [Junction::new("chr1", 10, 500)].into_iter().collect();
        let toolchain = RecordingToolchain::with_junctions(JunctionSet::new(), denovo);
        let counters = toolchain.counters();
        let mut ctx = context_with(scaffold(dir.path()), toolchain);
        let reads = dir.path().join("reads.fastq");

        let index = ctx.create_denovo_transcriptome(&reads).unwrap();
        assert_eq!(index, dir.path().join("sample1_denovo_transcripts.gem"));

        let pair = ctx.denovo().unwrap();
        assert_eq!(pair.index, index);
        assert_eq!(pair.keys, dir.path().join("sample1_all.junctions.keys"));
        assert_eq!(counters.extract_junctions.load(Ordering::Relaxed), 1);
        assert_eq!(counters.compute_transcriptome.load(Ordering::Relaxed), 1);
        assert_eq!(counters.build_index.load(Ordering::Relaxed), 1);

        // Discovery output is scaffolding, not a pipeline result.
        assert!(ctx.mappings().is_empty());

        // Byproducts are owned by the run.
        let registered = ctx.temp_files().paths();
        assert!(registered.contains(&dir.path().join("sample1_all.junctions.fa")));
        assert!(registered.contains(&dir.path().join("sample1_all.junctions.keys")));
        assert!(registered.contains(&dir.path().join("sample1_denovo_transcripts.log")));
    }

    #[test]
    fn test_existing_index_and_keys_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sample1_denovo_transcripts.gem"), "index").unwrap();
        std::fs::write(dir.path().join("sample1_all.junctions.keys"), "keys").unwrap();

        let toolchain = RecordingToolchain::new();
        let counters = toolchain.counters();
        let mut ctx = context_with(scaffold(dir.path()), toolchain);
        let reads = dir.path().join("reads.fastq");

        let index = ctx.create_denovo_transcriptome(&reads).unwrap();
        assert_eq!(index, dir.path().join("sample1_denovo_transcripts.gem"));
        assert!(ctx.denovo().is_some());
        assert_eq!(counters.total(), 0);

        let registered = ctx.temp_files().paths();
        assert!(registered.contains(&dir.path().join("sample1_all.junctions.fa")));
        assert!(registered.contains(&dir.path().join("sample1_denovo_transcripts.log")));
    }

    #[test]
    fn test_index_without_keys_triggers_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sample1_denovo_transcripts.gem"), "index").unwrap();

        let toolchain = RecordingToolchain::new();
        let counters = toolchain.counters();
        let mut ctx = context_with(scaffold(dir.path()), toolchain);
        let reads = dir.path().join("reads.fastq");

        ctx.create_denovo_transcriptome(&reads).unwrap();
        assert_eq!(counters.build_index.load(Ordering::Relaxed), 1);
    }
}
