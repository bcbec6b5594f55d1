//! The three mapping stage variants: direct, split, and transcript.
//!
//! All three share one protocol: compute the target path, reuse it on a
//! cache hit, otherwise invoke the engine; either way the resulting handle
//! is appended to the context's mapping log and returned.

use crate::context::PipelineContext;
use crate::naming::Persistence;
use crate::stages::{MAPPING_MISMATCH_RATE, MIN_DECODED_STRATA};
use anyhow::{Context, Result};
use gem_engine::{MapRequest, SplitMapRequest, TranscriptMapRequest};
use gem_types::{FileFormat, MapHandle, TrimSpec, JUNCTION_KEYS_EXT};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Explicit transcript index selection for a single mapping step. With no
/// key table, it is derived from the index path.
#[derive(Clone, Copy, Debug)]
pub struct TranscriptIndexOverride<'a> {
    pub index: &'a Path,
    pub keys: Option<&'a Path>,
}

impl PipelineContext {
    /// Map reads directly against the reference.
    pub fn mapping_step(
        &mut self,
        input: &Path,
        suffix: &str,
        trim: Option<TrimSpec>,
    ) -> Result<MapHandle> {
        let target = self.artifact_path(suffix, FileFormat::Map, Persistence::Temporary);
        if self.cache.should_skip(&target) {
            warn!(
                "mapping target exists, skipping mapping step: {}",
                target.display()
            );
            return self.reuse_mapping(&target);
        }
        let timer = Instant::now();
        debug!("mapping {} into {}", input.display(), target.display());
        let mapping = self.toolchain.map(MapRequest {
            input,
            index: self.index.path(),
            output: &target,
            mismatch_rate: MAPPING_MISMATCH_RATE,
            delta: self.delta,
            trim,
            quality: self.quality,
            threads: self.threads,
        })?;
        self.mappings.push(mapping.clone());
        info!("mapping step finished in {:.2?}", timer.elapsed());
        Ok(mapping)
    }

    /// Map reads across splice junctions. Uses the active junction set if
    /// one has been created; otherwise the mapper discovers split sites on
    /// its own.
    pub fn split_mapping_step(
        &mut self,
        input: &Path,
        suffix: &str,
        trim: Option<TrimSpec>,
    ) -> Result<MapHandle> {
        let target = self.artifact_path(suffix, FileFormat::Map, Persistence::Temporary);
        if self.cache.should_skip(&target) {
            warn!(
                "split-mapping target exists, skipping split-mapping step: {}",
                target.display()
            );
            return self.reuse_mapping(&target);
        }
        let timer = Instant::now();
        debug!(
            "split-mapping {} into {}",
            input.display(),
            target.display()
        );
        let mapping = self.toolchain.split_map(SplitMapRequest {
            input,
            index: self.index.path(),
            output: &target,
            junctions: self.junctions_file.as_deref(),
            mismatch_rate: MAPPING_MISMATCH_RATE,
            trim,
            quality: self.quality,
            threads: self.threads,
        })?;
        self.mappings.push(mapping.clone());
        info!("split-mapping step finished in {:.2?}", timer.elapsed());
        Ok(mapping)
    }

    /// Map reads against transcript models. With no override, both the
    /// annotation-derived index and (if built) the de-novo index are
    /// consulted, so a read can be explained by known or novel junctions.
    pub fn transcript_mapping_step(
        &mut self,
        input: &Path,
        suffix: &str,
        index_override: Option<TranscriptIndexOverride<'_>>,
        trim: Option<TrimSpec>,
    ) -> Result<MapHandle> {
        let target = self.artifact_path(
            &format!("{suffix}_transcript"),
            FileFormat::Map,
            Persistence::Temporary,
        );
        if self.cache.should_skip(&target) {
            warn!(
                "transcript-mapping target exists, skipping transcript-mapping step: {}",
                target.display()
            );
            return self.reuse_mapping(&target);
        }

        let (indices, keys): (Vec<PathBuf>, Vec<PathBuf>) = match index_override {
            Some(overridden) => {
                let keys = match overridden.keys {
                    Some(keys) => keys.to_path_buf(),
                    None => overridden.index.with_extension(JUNCTION_KEYS_EXT),
                };
                (vec![overridden.index.to_path_buf()], vec![keys])
            }
            None => {
                let index = self
                    .transcript_index
                    .clone()
                    .context("transcript mapping requires an annotation or an explicit index")?;
                let key_table = self
                    .transcript_keys
                    .clone()
                    .context("transcript mapping requires a transcript key table")?;
                let mut indices = vec![index];
                let mut keys = vec![key_table];
                if let Some(denovo) = &self.denovo {
                    indices.push(denovo.index.clone());
                    keys.push(denovo.keys.clone());
                }
                (indices, keys)
            }
        };

        let timer = Instant::now();
        debug!(
            "transcript-mapping {} into {}",
            input.display(),
            target.display()
        );
        let mapping = self.toolchain.transcript_map(TranscriptMapRequest {
            input,
            indices: &indices,
            keys: &keys,
            output: &target,
            mismatch_rate: MAPPING_MISMATCH_RATE,
            delta: self.delta,
            min_decoded_strata: MIN_DECODED_STRATA,
            trim,
            quality: self.quality,
            threads: self.threads,
        })?;
        self.mappings.push(mapping.clone());
        info!("transcript-mapping step finished in {:.2?}", timer.elapsed());
        Ok(mapping)
    }

    /// Cache hit: reopen the prior output and log it like a fresh result.
    fn reuse_mapping(&mut self, target: &Path) -> Result<MapHandle> {
        let mapping = MapHandle::open(target, FileFormat::Map, self.quality)?;
        self.mappings.push(mapping.clone());
        Ok(mapping)
    }
}
