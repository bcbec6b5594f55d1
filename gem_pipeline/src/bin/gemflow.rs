//! Command-line driver for the canonical stage order: split-map, junction
//! discovery, de-novo transcriptome, transcript-map, merge, pair-align,
//! BAM conversion, cleanup.

use anyhow::Result;
use clap::Parser;
use gem_engine::GemToolchain;
use gem_pipeline::{PipelineContext, PipelineParams, RetentionPolicy};
use gem_types::{QualityEncoding, TrimSpec};
use itertools::Itertools;
use std::path::PathBuf;
use std::process::ExitCode;

/// RNA-seq mapping pipeline against a GEM reference index.
///
/// Finished stage outputs found in the output directory are reused, so an
/// interrupted run can simply be restarted with the same arguments.
#[derive(Parser, Debug)]
#[clap(name = "gemflow", version)]
struct Args {
    /// Input reads (FASTQ, possibly interleaved).
    #[clap(long, short = 'i')]
    input: PathBuf,

    /// GEM reference index.
    #[clap(long, short = 'I')]
    index: PathBuf,

    /// GTF annotation with known transcripts.
    #[clap(long, short = 'a')]
    annotation: Option<PathBuf>,

    /// Run name used as the prefix of every artifact; defaults to the
    /// input file stem.
    #[clap(long, short = 'n')]
    name: Option<String>,

    /// Output directory, created if missing.
    #[clap(long, short = 'o', default_value = ".")]
    output_dir: PathBuf,

    /// Threads handed to the external engine.
    #[clap(long, short = 'T', default_value_t = 2)]
    threads: usize,

    /// Minimum read support for retaining a de-novo junction.
    #[clap(long, default_value_t = 4)]
    junction_coverage: u32,

    /// Fragment length bound for the de-novo transcriptome.
    #[clap(long, default_value_t = 100)]
    max_length: u64,

    /// Transcript index override; defaults to `<annotation>.gem`.
    #[clap(long)]
    transcript_index: Option<PathBuf>,

    /// Transcript key table override.
    #[clap(long)]
    transcript_keys: Option<PathBuf>,

    /// Base quality offset of the reads (33 or 64).
    #[clap(long, default_value = "33")]
    quality: QualityEncoding,

    /// Mapping tolerance delta.
    #[clap(long, default_value_t = 1)]
    delta: u32,

    /// Bases trimmed from either end of every read, as 'left,right'.
    #[clap(long)]
    trim: Option<TrimSpec>,

    /// Keep intermediate files instead of removing them at the end.
    #[clap(long)]
    keep_temp: bool,

    /// Gzip the final pair-aligned output.
    #[clap(long)]
    compress: bool,

    /// Skip coordinate sorting of the final BAM.
    #[clap(long)]
    no_sort: bool,

    /// Directory holding the gem-* executables; defaults to PATH lookup.
    #[clap(long)]
    gem_binaries: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ERROR: {}", err.chain().join("\n\tCaused by: "));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let name = match args.name {
        Some(name) => name,
        None => args
            .input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run".to_string()),
    };
    let params = PipelineParams {
        name,
        index: args.index,
        output_dir: args.output_dir,
        annotation: args.annotation,
        threads: args.threads,
        junction_coverage: args.junction_coverage,
        max_fragment_length: args.max_length,
        transcript_index: args.transcript_index,
        transcript_keys: args.transcript_keys,
        quality: args.quality,
        delta: args.delta,
        retention: if args.keep_temp {
            RetentionPolicy::Keep
        } else {
            RetentionPolicy::Remove
        },
        validator: Default::default(),
    };
    let toolchain = match args.gem_binaries {
        Some(dir) => GemToolchain::with_binaries_dir(dir),
        None => GemToolchain::new(),
    };

    let mut pipeline = PipelineContext::new(params, Box::new(toolchain))?;
    pipeline.split_mapping_step(&args.input, "split", args.trim)?;
    pipeline.create_denovo_junctions(&args.input)?;
    pipeline.create_denovo_transcriptome(&args.input)?;
    pipeline.transcript_mapping_step(&args.input, "denovo", None, args.trim)?;
    let merged = pipeline.merge("merged")?;
    let paired = pipeline.pair_align(&merged, args.compress)?;
    pipeline.create_bam(&paired, !args.no_sort)?;
    pipeline.cleanup();
    Ok(())
}
