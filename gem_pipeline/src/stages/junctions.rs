//! Junction preparation: annotation-derived sets and their merge with
//! junctions discovered de novo from the input reads.

use crate::context::PipelineContext;
use crate::naming::Persistence;
use crate::stages::{JUNCTION_MISMATCH_RATE, JUNCTION_STRATA_AFTER_FIRST, MAX_JUNCTION_SPAN};
use anyhow::Result;
use gem_engine::ExtractJunctionsRequest;
use gem_types::{ArtifactPath, FileFormat, JunctionSet};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// The stage needs a GTF annotation but the run was configured without one.
#[derive(Debug, thiserror::Error)]
#[error("stage requires a GTF annotation but none was configured")]
pub struct MissingAnnotation;

impl PipelineContext {
    /// Load or derive the annotation's junction set.
    ///
    /// Extraction from a large annotation is expensive and shared across
    /// runs against the same annotation, hence three tiers: a junctions
    /// file next to the annotation, a previously derived file in the
    /// output directory, and finally fresh extraction.
    pub fn gtf_junctions(&mut self) -> Result<(JunctionSet, PathBuf)> {
        let timer = Instant::now();
        let annotation = self.annotation.clone().ok_or(MissingAnnotation)?;

        let adjacent = annotation.appended(FileFormat::Junctions.extension());
        let (junctions, source) = if self.cache.should_skip(&adjacent) {
            // Annotation-adjacent sets belong to the annotation, not the
            // run, and are never registered for deletion.
            info!("loading existing junctions from {}", adjacent.display());
            (JunctionSet::from_junctions_file(&adjacent)?, adjacent)
        } else {
            let derived = self.artifact_path("gtf", FileFormat::Junctions, Persistence::Temporary);
            if self.cache.should_skip(&derived) {
                info!("loading existing junctions from {}", derived.display());
                (JunctionSet::from_junctions_file(&derived)?, derived)
            } else {
                info!("extracting junctions from {}", annotation.display());
                let junctions = self.toolchain.junctions_from_annotation(&annotation)?;
                junctions.write_junctions(&derived)?;
                (junctions, derived)
            }
        };
        info!("{} junctions from annotation", junctions.len());
        info!("annotation junctions prepared in {:.2?}", timer.elapsed());
        Ok((junctions, source))
    }

    /// Discover junctions from the input reads, merge them with the
    /// annotation set, filter distant pairs, persist, and make the result
    /// the active junction file for subsequent split mapping.
    pub fn create_denovo_junctions(&mut self, input: &Path) -> Result<PathBuf> {
        let target = self.artifact_path("all", FileFormat::Junctions, Persistence::Temporary);
        if self.cache.should_skip(&target) {
            warn!("junctions found, skipping extraction: {}", target.display());
            self.junctions_file = Some(target.clone());
            return Ok(target);
        }

        let (gtf_junctions, _) = self.gtf_junctions()?;

        let timer = Instant::now();
        info!("extracting de-novo junctions");
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
            .write_junctions(&target)?;
        self.junctions_file = Some(target.clone());
        info!("junctions extracted in {:.2?}", timer.elapsed());
        Ok(target)
    }
}
