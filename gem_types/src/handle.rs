//! Handles to on-disk alignment streams and the small value types that
//! travel with every engine invocation.

use crate::artifact::FileFormat;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Base quality encoding of the input reads.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QualityEncoding {
    #[default]
    Offset33,
    Offset64,
}

impl QualityEncoding {
    pub fn offset(self) -> u8 {
        match self {
            QualityEncoding::Offset33 => 33,
            QualityEncoding::Offset64 => 64,
        }
    }
}

impl fmt::Display for QualityEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset-{}", self.offset())
    }
}

impl FromStr for QualityEncoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<QualityEncoding> {
        match s {
            "33" | "offset-33" => Ok(QualityEncoding::Offset33),
            "64" | "offset-64" => Ok(QualityEncoding::Offset64),
            _ => anyhow::bail!("unknown quality encoding '{s}', expected 33 or 64"),
        }
    }
}

/// Number of bases clipped from either end of a read before mapping.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrimSpec {
    pub left: u32,
    pub right: u32,
}

impl fmt::Display for TrimSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.left, self.right)
    }
}

impl FromStr for TrimSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<TrimSpec> {
        let Some((left, right)) = s.split_once(',') else {
            anyhow::bail!("trim must be of the form 'left,right', got '{s}'");
        };
        Ok(TrimSpec {
            left: left.trim().parse()?,
            right: right.trim().parse()?,
        })
    }
}

/// An alignment-stream artifact was expected on disk but is not there.
#[derive(Debug, thiserror::Error)]
#[error("alignment artifact \"{}\" does not exist", .path.display())]
pub struct MissingArtifact {
    pub path: PathBuf,
}

/// Opaque reference to an on-disk alignment artifact. Every mapping and
/// merge stage produces one; the next stage (or cleanup) consumes it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MapHandle {
    path: PathBuf,
    format: FileFormat,
    quality: QualityEncoding,
}

impl MapHandle {
    /// Open an existing artifact. Fails if the path is not present, so a
    /// handle always refers to something a later stage can actually read.
    pub fn open(path: &Path, format: FileFormat, quality: QualityEncoding) -> Result<MapHandle> {
        ensure!(
            path.exists(),
            MissingArtifact {
                path: path.to_path_buf(),
            }
        );
        Ok(MapHandle {
            path: path.to_path_buf(),
            format,
            quality,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn quality(&self) -> QualityEncoding {
        self.quality
    }
}

impl fmt::Display for MapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.path.display(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quality_parsing() {
        assert_eq!(
            "33".parse::<QualityEncoding>().unwrap(),
            QualityEncoding::Offset33
        );
        assert_eq!(
            "offset-64".parse::<QualityEncoding>().unwrap(),
            QualityEncoding::Offset64
        );
        assert!("solexa".parse::<QualityEncoding>().is_err());
        assert_eq!(QualityEncoding::Offset64.to_string(), "offset-64");
    }

    #[test]
    fn test_trim_parsing() {
        assert_eq!(
            "0,20".parse::<TrimSpec>().unwrap(),
            TrimSpec { left: 0, right: 20 }
        );
        assert!("20".parse::<TrimSpec>().is_err());
        assert!("a,b".parse::<TrimSpec>().is_err());
    }

    #[test]
    fn test_open_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.map");

        let err = MapHandle::open(&path, FileFormat::Map, QualityEncoding::Offset33).unwrap_err();
        assert!(err.downcast_ref::<MissingArtifact>().is_some());

        std::fs::write(&path, "alignment\n").unwrap();
        let handle = MapHandle::open(&path, FileFormat::Map, QualityEncoding::Offset33).unwrap();
        assert_eq!(handle.path(), path);
        assert_eq!(handle.format(), FileFormat::Map);
    }
}
