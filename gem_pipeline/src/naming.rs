//! Deterministic naming of stage artifacts.

use gem_types::FileFormat;
use std::path::{Path, PathBuf};

/// Whether an artifact outlives the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persistence {
    /// A result the caller owns; never registered for deletion.
    Final,
    /// Owned by the run; registered and deleted at cleanup.
    Temporary,
}

/// Builds `<output_dir>/<run_name>[_<suffix>].<ext>` paths. The scheme is
/// deterministic on purpose: it is the on-disk protocol that resumed runs
/// rely on for cache-hit detection. Suffix uniqueness within a run is the
/// caller's contract.
#[derive(Clone, Debug)]
pub struct ArtifactNamer {
    output_dir: PathBuf,
    run_name: String,
}

impl ArtifactNamer {
    pub fn new(output_dir: impl Into<PathBuf>, run_name: impl Into<String>) -> ArtifactNamer {
        ArtifactNamer {
            output_dir: output_dir.into(),
            run_name: run_name.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// An empty suffix omits the underscore segment entirely.
    pub fn name(&self, suffix: &str, format: FileFormat) -> PathBuf {
        let file = if suffix.is_empty() {
            format!("{}.{}", self.run_name, format.extension())
        } else {
            format!("{}_{}.{}", self.run_name, suffix, format.extension())
        };
        self.output_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_suffixed_name() {
        let namer = ArtifactNamer::new("out", "sample1");
        assert_eq!(
            namer.name("split", FileFormat::Map),
            PathBuf::from("out/sample1_split.map")
        );
        assert_eq!(
            namer.name("gtf", FileFormat::Junctions),
            PathBuf::from("out/sample1_gtf.junctions")
        );
    }

    #[test]
    fn test_empty_suffix_omits_separator() {
        let namer = ArtifactNamer::new("out", "sample1");
        assert_eq!(
            namer.name("", FileFormat::Map),
            PathBuf::from("out/sample1.map")
        );
        assert_eq!(
            namer.name("", FileFormat::Bam),
            PathBuf::from("out/sample1.bam")
        );
    }
}
