//! Subprocess-backed toolchain driving the external `gem-*` executables.
//!
//! Each invocation is assembled, launched with inherited stdio (the tools'
//! own progress output is the user's feed), and awaited to completion. A
//! non-zero exit status is fatal for the run.

use crate::toolchain::{
    ComputeTranscriptomeRequest, EngineError, ExtractJunctionsRequest, MapRequest,
    PairAlignRequest, SplitMapRequest, Toolchain, TranscriptMapRequest, TranscriptomeFiles,
};
use anyhow::{ensure, Context, Result};
use gem_types::{ArtifactPath, FileFormat, JunctionSet, MapHandle, QualityEncoding};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

const MAPPER: &str = "gem-mapper";
const RNA_MAPPER: &str = "gem-rna-mapper";
const RNA_TOOLS: &str = "gem-rna-tools";
const INDEXER: &str = "gem-indexer";
const MAP_2_MAP: &str = "gem-map-2-map";
const MAP_2_SAM: &str = "gem-2-sam";
const SAMTOOLS: &str = "samtools";

/// Toolchain implementation that shells out to the GEM executables, looked
/// up on `PATH` or under an explicit binaries directory.
#[derive(Clone, Debug, Default)]
pub struct GemToolchain {
    binaries_dir: Option<PathBuf>,
}

impl GemToolchain {
    pub fn new() -> GemToolchain {
        GemToolchain::default()
    }

    pub fn with_binaries_dir(dir: impl Into<PathBuf>) -> GemToolchain {
        GemToolchain {
            binaries_dir: Some(dir.into()),
        }
    }

    fn command(&self, tool: &str) -> Command {
        match &self.binaries_dir {
            Some(dir) => Command::new(dir.join(tool)),
            None => Command::new(tool),
        }
    }

    fn run(&self, tool: &str, command: &mut Command) -> Result<()> {
        debug!("running {command:?}");
        let status = command
            .status()
            .with_context(|| format!("failed to launch `{tool}`"))?;
        ensure!(
            status.success(),
            EngineError {
                tool: tool.to_string(),
                status,
            }
        );
        Ok(())
    }
}

impl Toolchain for GemToolchain {
    fn map(&self, request: MapRequest<'_>) -> Result<MapHandle> {
        let mut command = self.command(MAPPER);
        command
            .arg("-I")
            .arg(request.index)
            .arg("-i")
            .arg(request.input)
            .arg("-o")
            .arg(request.output)
            .args(["-m", &request.mismatch_rate.to_string()])
            .args(["-d", &request.delta.to_string()])
            .args(["-q", &request.quality.to_string()])
            .args(["-T", &request.threads.to_string()]);
        if let Some(trim) = request.trim {
            command.args(["--trim", &trim.to_string()]);
        }
        self.run(MAPPER, &mut command)?;
        MapHandle::open(request.output, FileFormat::Map, request.quality)
    }

    fn split_map(&self, request: SplitMapRequest<'_>) -> Result<MapHandle> {
        let mut command = self.command(RNA_MAPPER);
        command
            .arg("-I")
            .arg(request.index)
            .arg("-i")
            .arg(request.input)
            .arg("-o")
            .arg(request.output)
            .args(["-m", &request.mismatch_rate.to_string()])
            .args(["-q", &request.quality.to_string()])
            .args(["-T", &request.threads.to_string()]);
        if let Some(junctions) = request.junctions {
            command.arg("--junctions").arg(junctions);
        }
        if let Some(trim) = request.trim {
            command.args(["--trim", &trim.to_string()]);
        }
        self.run(RNA_MAPPER, &mut command)?;
        MapHandle::open(request.output, FileFormat::Map, request.quality)
    }

    fn transcript_map(&self, request: TranscriptMapRequest<'_>) -> Result<MapHandle> {
        let mut command = self.command(RNA_MAPPER);
        command
            .arg("-i")
            .arg(request.input)
            .arg("-o")
            .arg(request.output);
        for index in request.indices {
            command.arg("-I").arg(index);
        }
        for keys in request.keys {
            command.arg("--keys").arg(keys);
        }
        command
            .args(["-m", &request.mismatch_rate.to_string()])
            .args(["-d", &request.delta.to_string()])
            .args([
                "--min-decoded-strata",
                &request.min_decoded_strata.to_string(),
            ])
            .args(["-q", &request.quality.to_string()])
            .args(["-T", &request.threads.to_string()]);
        if let Some(trim) = request.trim {
            command.args(["--trim", &trim.to_string()]);
        }
        self.run(RNA_MAPPER, &mut command)?;
        MapHandle::open(request.output, FileFormat::Map, request.quality)
    }

    fn extract_junctions(&self, request: ExtractJunctionsRequest<'_>) -> Result<JunctionSet> {
        let scratch = NamedTempFile::new().context("creating junction scratch file")?;
        let mut command = self.command(RNA_TOOLS);
        command
            .arg("extract-junctions")
            .arg("-I")
            .arg(request.index)
            .arg("-i")
            .arg(request.input)
            .arg("-o")
            .arg(scratch.path())
            .args(["-m", &request.mismatch_rate.to_string()])
            .args(["--strata-after-first", &request.strata_after_first.to_string()])
            .args(["--coverage", &request.coverage.to_string()])
            .args(["-T", &request.threads.to_string()]);
        self.run(RNA_TOOLS, &mut command)?;
        let mut junctions = JunctionSet::from_junctions_file(scratch.path())?;
        junctions.merge(request.merge_with);
        Ok(junctions)
    }

    fn junctions_from_annotation(&self, annotation: &Path) -> Result<JunctionSet> {
        let scratch = NamedTempFile::new().context("creating junction scratch file")?;
        let mut command = self.command(RNA_TOOLS);
        command
            .arg("gtf-junctions")
            .arg("-a")
            .arg(annotation)
            .arg("-o")
            .arg(scratch.path());
        self.run(RNA_TOOLS, &mut command)?;
        JunctionSet::from_junctions_file(scratch.path())
    }

    fn compute_transcriptome(
        &self,
        request: ComputeTranscriptomeRequest<'_>,
    ) -> Result<TranscriptomeFiles> {
        let mut command = self.command(RNA_TOOLS);
        command
            .arg("compute-transcriptome")
            .args(["--max-length", &request.max_length.to_string()])
            .arg("-I")
            .arg(request.index)
            .arg("--junctions")
            .arg(request.junctions)
            .arg("--gtf-junctions")
            .arg(request.gtf_junctions);
        self.run(RNA_TOOLS, &mut command)?;
        // The tool writes the sequence and key table next to the junction set.
        Ok(TranscriptomeFiles {
            sequence: request.junctions.appended(FileFormat::Fasta.extension()),
            keys: request.junctions.appended(FileFormat::Keys.extension()),
        })
    }

    fn build_index(&self, sequence: &Path, output: &Path, threads: usize) -> Result<PathBuf> {
        let mut command = self.command(INDEXER);
        command
            .arg("-i")
            .arg(sequence)
            .arg("-o")
            .arg(output)
            .args(["-T", &threads.to_string()]);
        self.run(INDEXER, &mut command)?;
        Ok(output.to_path_buf())
    }

    fn merge(&self, inputs: &[MapHandle], output: &Path, threads: usize) -> Result<MapHandle> {
        let quality = inputs
            .first()
            .map(MapHandle::quality)
            .unwrap_or(QualityEncoding::Offset33);
        let mut command = self.command(MAP_2_MAP);
        command
            .arg("--merge")
            .arg("-o")
            .arg(output)
            .args(["-T", &threads.to_string()]);
        for input in inputs {
            command.arg("-i").arg(input.path());
        }
        self.run(MAP_2_MAP, &mut command)?;
        MapHandle::open(output, FileFormat::Map, quality)
    }

    fn pair_align(&self, request: PairAlignRequest<'_>) -> Result<MapHandle> {
        let mut command = self.command(MAP_2_MAP);
        command
            .arg("--pair-align")
            .arg("-I")
            .arg(request.index)
            .arg("-i")
            .arg(request.input.path())
            .arg("-o")
            .arg(request.output)
            .args(["--max-insert-size", &request.max_insert_size.to_string()])
            .args(["-q", &request.quality.to_string()])
            .args(["-T", &request.threads.to_string()]);
        self.run(MAP_2_MAP, &mut command)?;
        MapHandle::open(request.output, FileFormat::Map, request.quality)
    }

    fn score(
        &self,
        input: &MapHandle,
        index: &Path,
        output: &Path,
        threads: usize,
    ) -> Result<MapHandle> {
        let mut command = self.command(MAP_2_MAP);
        command
            .arg("--score")
            .arg("-I")
            .arg(index)
            .arg("-i")
            .arg(input.path())
            .arg("-o")
            .arg(output)
            .args(["-T", &threads.to_string()]);
        self.run(MAP_2_MAP, &mut command)?;
        MapHandle::open(output, FileFormat::Map, input.quality())
    }

    fn map_to_sam(
        &self,
        input: &MapHandle,
        index: &Path,
        output: &Path,
        threads: usize,
    ) -> Result<PathBuf> {
        let mut command = self.command(MAP_2_SAM);
        command
            .arg("-I")
            .arg(index)
            .arg("-i")
            .arg(input.path())
            .arg("-o")
            .arg(output)
            .args(["-q", &input.quality().to_string()])
            .args(["-T", &threads.to_string()]);
        self.run(MAP_2_SAM, &mut command)?;
        Ok(output.to_path_buf())
    }

    fn sam_to_bam(&self, sam: &Path, output: &Path, sort: bool) -> Result<()> {
        let mut command = self.command(SAMTOOLS);
        if sort {
            command.arg("sort").arg("-o").arg(output).arg(sam);
        } else {
            command.arg("view").arg("-b").arg("-o").arg(output).arg(sam);
        }
        self.run(SAMTOOLS, &mut command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_reports_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = GemToolchain::with_binaries_dir(dir.path());
        let err = toolchain
            .build_index(Path::new("in.fa"), Path::new("out.gem"), 1)
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to launch"), "{err:#}");
    }

    #[test]
    fn test_failing_tool_reports_engine_error() {
        let toolchain = GemToolchain::new();
        let mut command = Command::new("sh");
        command.args(["-c", "exit 3"]);
        let err = toolchain.run("sh", &mut command).unwrap_err();
        let engine_err = err.downcast_ref::<EngineError>().unwrap();
        assert_eq!(engine_err.tool, "sh");
    }
}
