//! Reference index metadata.

use crate::artifact::FileFormat;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The reference search index is produced before the pipeline runs and is
/// never written by it.
#[derive(Debug, thiserror::Error)]
#[error("reference index \"{}\" does not exist", .path.display())]
pub struct MissingIndex {
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
#[error("reference index \"{}\" does not carry the .{expected} extension", .path.display())]
pub struct NotAnIndex {
    pub path: PathBuf,
    pub expected: &'static str,
}

/// Location of the reference search index handed to every mapping and
/// extraction call. Opaque beyond its path.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReferenceIndex {
    path: PathBuf,
}

impl ReferenceIndex {
    pub fn new(path: impl Into<PathBuf>) -> ReferenceIndex {
        ReferenceIndex { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check that the index file is present and plausibly a GEM index.
    /// A failure here is fatal at context construction.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.path.is_file(),
            MissingIndex {
                path: self.path.clone(),
            }
        );
        let expected = FileFormat::GemIndex.extension();
        ensure!(
            self.path.extension().is_some_and(|ext| ext == expected),
            NotAnIndex {
                path: self.path.clone(),
                expected,
            }
        );
        Ok(())
    }
}
