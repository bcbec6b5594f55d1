//! Merging the accumulated alignment streams into one ordered artifact.

use crate::context::PipelineContext;
use crate::naming::Persistence;
use crate::registry::{remove_artifact, RetentionPolicy};
use anyhow::{ensure, Result};
use gem_types::{FileFormat, MapHandle};
use log::{info, warn};
use std::time::Instant;

/// Merge was invoked before any mapping stage produced a result. Merging
/// nothing would fabricate output, so this is a contract violation.
#[derive(Debug, thiserror::Error)]
#[error("merge requires at least one accumulated mapping")]
pub struct MergeWithoutMappings;

impl PipelineContext {
    /// Merge all accumulated mappings into one ordered stream and retire
    /// the inputs. Afterwards the mapping log holds exactly the merged
    /// handle, whether the merge ran or was skipped, so resumed runs end
    /// in the same state as fresh ones. A single accumulated mapping
    /// degenerates to an engine-side copy.
    pub fn merge(&mut self, suffix: &str) -> Result<MapHandle> {
        ensure!(!self.mappings.is_empty(), MergeWithoutMappings);

        let target = self.artifact_path(suffix, FileFormat::Map, Persistence::Temporary);
        if self.cache.should_skip(&target) {
            warn!("merge target exists, skipping merge: {}", target.display());
            let merged = MapHandle::open(&target, FileFormat::Map, self.quality)?;
            self.mappings = vec![merged.clone()];
            return Ok(merged);
        }

        let timer = Instant::now();
        info!(
            "merging {} mappings into {}",
            self.mappings.len(),
            target.display()
        );
        let merged = self.toolchain.merge(&self.mappings, &target, self.threads)?;

        let inputs = std::mem::take(&mut self.mappings);
        if self.temp_files.policy() == RetentionPolicy::Remove {
            for mapping in &inputs {
                info!("removing temporary mapping {}", mapping.path().display());
                remove_artifact(mapping.path());
            }
        }
        self.mappings.push(merged.clone());
        info!("merge finished in {:.2?}", timer.elapsed());
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_with, scaffold, RecordingToolchain};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_merge_without_mappings_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context_with(scaffold(dir.path()), RecordingToolchain::new());

        let err = ctx.merge("merged").unwrap_err();
        assert!(err.downcast_ref::<MergeWithoutMappings>().is_some());
    }

    #[test]
    fn test_merge_consumes_and_replaces_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = RecordingToolchain::new();
        let counters = toolchain.counters();
        let mut ctx = context_with(scaffold(dir.path()), toolchain);
        let reads = dir.path().join("reads.fastq");

        let split = ctx.split_mapping_step(&reads, "split", None).unwrap();
        let transcript = ctx
            .transcript_mapping_step(&reads, "split", None, None)
            .unwrap();
        assert_eq!(ctx.mappings().len(), 2);

        let merged = ctx.merge("merged").unwrap();
        assert_eq!(merged.path(), dir.path().join("sample1_merged.map"));
        assert_eq!(ctx.mappings(), &[merged.clone()]);
        assert_eq!(counters.merge.load(Ordering::Relaxed), 1);

        // Inputs are retired once merged.
        assert!(!split.path().exists());
        assert!(!transcript.path().exists());
        assert!(merged.path().exists());
    }

    #[test]
    fn test_merge_retains_inputs_under_keep_policy() {
        let dir = tempfile::tempdir().unwrap();
        let mut params = scaffold(dir.path());
        params.retention = crate::registry::RetentionPolicy::Keep;
        let mut ctx = context_with(params, RecordingToolchain::new());
        let reads = dir.path().join("reads.fastq");

        let split = ctx.split_mapping_step(&reads, "split", None).unwrap();
        ctx.mapping_step(&reads, "direct", None).unwrap();
        ctx.merge("merged").unwrap();

        assert!(split.path().exists());
    }

    #[test]
    fn test_merge_skip_reopens_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = RecordingToolchain::new();
        let counters = toolchain.counters();
        let mut ctx = context_with(scaffold(dir.path()), toolchain);
        let reads = dir.path().join("reads.fastq");

        std::fs::write(dir.path().join("sample1_merged.map"), "merged\n").unwrap();
        ctx.split_mapping_step(&reads, "split", None).unwrap();

        let merged = ctx.merge("merged").unwrap();
        assert_eq!(merged.path(), dir.path().join("sample1_merged.map"));
        assert_eq!(ctx.mappings(), &[merged]);
        assert_eq!(counters.merge.load(Ordering::Relaxed), 0);
    }
}
