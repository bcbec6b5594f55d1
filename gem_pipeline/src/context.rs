//! Run configuration and accumulated state.

use crate::cache::{ArtifactValidator, StageCache};
use crate::naming::{ArtifactNamer, Persistence};
use crate::registry::{RetentionPolicy, TempFileRegistry};
use anyhow::{Context, Result};
use gem_engine::Toolchain;
use gem_types::{
    ArtifactPath, FileFormat, MapHandle, QualityEncoding, ReferenceIndex, JUNCTION_KEYS_EXT,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a run is configured with, collected up front. Validation
/// happens once, at context construction; stages can then assume a sound
/// environment.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PipelineParams {
    /// Run name; the prefix of every artifact the run produces.
    pub name: String,
    /// Reference search index.
    pub index: PathBuf,
    /// Directory receiving all artifacts. Created if absent.
    pub output_dir: PathBuf,
    /// GTF annotation with known transcripts.
    pub annotation: Option<PathBuf>,
    /// Thread count handed to every engine invocation.
    pub threads: usize,
    /// Minimum read support for retaining a de-novo junction.
    pub junction_coverage: u32,
    /// Fragment length bound for transcriptome computation.
    pub max_fragment_length: u64,
    /// Transcript index override; defaults to `<annotation>.gem`.
    pub transcript_index: Option<PathBuf>,
    /// Transcript key table override; defaults next to the annotation.
    pub transcript_keys: Option<PathBuf>,
    /// Base quality encoding of the input reads.
    pub quality: QualityEncoding,
    /// Mapping tolerance delta passed through to the engine.
    pub delta: u32,
    /// Keep or remove intermediate artifacts.
    #[serde(default)]
    pub retention: RetentionPolicy,
    /// How the stage cache judges a prior output.
    #[serde(default)]
    pub validator: ArtifactValidator,
}

/// De-novo transcriptome index and its key table. The two are only ever
/// set together; a half-built pair never becomes visible.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DenovoIndex {
    pub index: PathBuf,
    pub keys: PathBuf,
}

/// One run of the pipeline: configuration, the stage-result log, and
/// ownership of every temporary artifact. Single-threaded by design; a
/// multi-run environment gives each run its own context and output
/// directory.
pub struct PipelineContext {
    pub(crate) name: String,
    pub(crate) index: ReferenceIndex,
    pub(crate) output_dir: PathBuf,
    pub(crate) annotation: Option<PathBuf>,
    pub(crate) threads: usize,
    pub(crate) junction_coverage: u32,
    pub(crate) max_fragment_length: u64,
    pub(crate) transcript_index: Option<PathBuf>,
    pub(crate) transcript_keys: Option<PathBuf>,
    pub(crate) quality: QualityEncoding,
    pub(crate) delta: u32,
    pub(crate) namer: ArtifactNamer,
    pub(crate) cache: StageCache,
    pub(crate) temp_files: TempFileRegistry,
    /// Ordered log of the alignment streams produced so far. Merge
    /// consumes and replaces it.
    pub(crate) mappings: Vec<MapHandle>,
    pub(crate) junctions_file: Option<PathBuf>,
    pub(crate) denovo: Option<DenovoIndex>,
    pub(crate) toolchain: Box<dyn Toolchain>,
}

impl PipelineContext {
    pub fn new(params: PipelineParams, toolchain: Box<dyn Toolchain>) -> Result<PipelineContext> {
        let PipelineParams {
            name,
            index,
            output_dir,
            annotation,
            threads,
            junction_coverage,
            max_fragment_length,
            transcript_index,
            transcript_keys,
            quality,
            delta,
            retention,
            validator,
        } = params;

        fs::create_dir_all(&output_dir)
            .with_context(|| format!("creating output directory {}", output_dir.display()))?;
        let index = ReferenceIndex::new(index);
        index.validate()?;

        // Once defaulted, the transcript index and key table are immutable
        // for the run. An explicitly configured index drives the key-table
        // default; otherwise both derive from the annotation.
        let transcript_keys = transcript_keys.or_else(|| {
            transcript_index
                .as_deref()
                .or(annotation.as_deref())
                .map(|p| p.with_extension(JUNCTION_KEYS_EXT))
        });
        let transcript_index = transcript_index.or_else(|| {
            annotation
                .as_deref()
                .map(|a| a.appended(FileFormat::GemIndex.extension()))
        });

        Ok(PipelineContext {
            namer: ArtifactNamer::new(&output_dir, &name),
            cache: StageCache::with_validator(validator),
            temp_files: TempFileRegistry::new(retention),
            mappings: Vec::new(),
            junctions_file: None,
            denovo: None,
            name,
            index,
            output_dir,
            annotation,
            threads,
            junction_coverage,
            max_fragment_length,
            transcript_index,
            transcript_keys,
            quality,
            delta,
            toolchain,
        })
    }

    /// Compute a stage's target path; temporary targets are registered for
    /// deletion as a side effect, final ones never are.
    pub(crate) fn artifact_path(
        &mut self,
        suffix: &str,
        format: FileFormat,
        persistence: Persistence,
    ) -> PathBuf {
        let path = self.namer.name(suffix, format);
        if persistence == Persistence::Temporary {
            self.temp_files.register(path.clone());
        }
        path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn quality(&self) -> QualityEncoding {
        self.quality
    }

    pub fn transcript_index(&self) -> Option<&Path> {
        self.transcript_index.as_deref()
    }

    pub fn transcript_keys(&self) -> Option<&Path> {
        self.transcript_keys.as_deref()
    }

    /// The alignment streams produced so far, in stage order.
    pub fn mappings(&self) -> &[MapHandle] {
        &self.mappings
    }

    /// The junction set currently steering split mapping, if any.
    pub fn junctions_file(&self) -> Option<&Path> {
        self.junctions_file.as_deref()
    }

    pub fn denovo(&self) -> Option<&DenovoIndex> {
        self.denovo.as_ref()
    }

    pub fn temp_files(&self) -> &TempFileRegistry {
        &self.temp_files
    }

    /// Delete all registered intermediate artifacts, honoring the
    /// retention policy. Invoked once, at the end of a run; dropping the
    /// context without calling it triggers the same release.
    pub fn cleanup(&mut self) {
        self.temp_files.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scaffold, RecordingToolchain};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_transcript_defaults_from_annotation() {
        let dir = tempfile::tempdir().unwrap();
        let params = scaffold(dir.path());
        let ctx = PipelineContext::new(params, Box::new(RecordingToolchain::new())).unwrap();

        assert_eq!(
            ctx.transcript_index(),
            Some(dir.path().join("genes.gtf.gem").as_path())
        );
        assert_eq!(
            ctx.transcript_keys(),
            Some(dir.path().join("genes.junctions.keys").as_path())
        );
    }

    #[test]
    fn test_explicit_transcript_index_derives_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = scaffold(dir.path());
        params.annotation = None;
        params.transcript_index = Some(dir.path().join("custom.gem"));
        let ctx = PipelineContext::new(params, Box::new(RecordingToolchain::new())).unwrap();

        assert_eq!(
            ctx.transcript_keys(),
            Some(dir.path().join("custom.junctions.keys").as_path())
        );
    }

    #[test]
    fn test_explicit_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = scaffold(dir.path());
        params.transcript_index = Some(dir.path().join("custom.gem"));
        params.transcript_keys = Some(dir.path().join("custom.keys"));
        let ctx = PipelineContext::new(params, Box::new(RecordingToolchain::new())).unwrap();

        assert_eq!(
            ctx.transcript_index(),
            Some(dir.path().join("custom.gem").as_path())
        );
        assert_eq!(
            ctx.transcript_keys(),
            Some(dir.path().join("custom.keys").as_path())
        );
    }

    #[test]
    fn test_missing_index_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = scaffold(dir.path());
        params.index = dir.path().join("absent.gem");
        assert!(PipelineContext::new(params, Box::new(RecordingToolchain::new())).is_err());
    }

    #[test]
    fn test_output_dir_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = scaffold(dir.path());
        params.output_dir = dir.path().join("nested/out");
        let ctx = PipelineContext::new(params, Box::new(RecordingToolchain::new())).unwrap();
        assert!(ctx.output_dir().is_dir());
    }

    #[test]
    fn test_no_annotation_no_transcript_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = scaffold(dir.path());
        params.annotation = None;
        let ctx = PipelineContext::new(params, Box::new(RecordingToolchain::new())).unwrap();
        assert_eq!(ctx.transcript_index(), None);
        assert_eq!(ctx.transcript_keys(), None);
    }
}
