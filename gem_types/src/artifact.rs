//! Structured descriptors for the on-disk artifacts the pipeline traffics in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Extension used for transcript junction key tables, e.g. `genes.junctions.keys`.
pub const JUNCTION_KEYS_EXT: &str = "junctions.keys";

/// Format tag of a pipeline artifact. Doubles as its file extension.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// GEM alignment stream.
    Map,
    /// Tab-separated splice junction triples.
    Junctions,
    /// GEM search index.
    GemIndex,
    /// Binary alignment container.
    Bam,
    /// Textual alignment intermediate.
    Sam,
    /// Nucleotide sequence.
    Fasta,
    /// Transcript key table.
    Keys,
    /// Indexer log.
    Log,
}

impl FileFormat {
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Map => "map",
            FileFormat::Junctions => "junctions",
            FileFormat::GemIndex => "gem",
            FileFormat::Bam => "bam",
            FileFormat::Sam => "sam",
            FileFormat::Fasta => "fa",
            FileFormat::Keys => "keys",
            FileFormat::Log => "log",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Path derivation for companion artifacts. All extension handling goes
/// through these two operations so that no call site slices fixed-length
/// suffixes out of path strings.
pub trait ArtifactPath {
    /// Replace the final extension with the given format's extension:
    /// `sample_denovo_transcripts.gem` -> `sample_denovo_transcripts.log`.
    fn companion(&self, format: FileFormat) -> PathBuf;

    /// Append a further dotted extension, keeping the existing one:
    /// `genes.gtf` -> `genes.gtf.junctions`.
    fn appended(&self, ext: &str) -> PathBuf;
}

impl ArtifactPath for Path {
    fn companion(&self, format: FileFormat) -> PathBuf {
        self.with_extension(format.extension())
    }

    fn appended(&self, ext: &str) -> PathBuf {
        let mut name = self.as_os_str().to_os_string();
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    }
}
