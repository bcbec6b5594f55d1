//! Ownership of intermediate artifacts.
//!
//! Every temporary file created during a run is registered here.
//! Registration is purely additive; paths leave the registry only by being
//! deleted from disk. Cleanup is best-effort: a file that is already gone
//! is not an event, a file that cannot be removed is a warning, and neither
//! fails the run.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Governs what happens to registered temporaries at the end of the run.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    #[default]
    Remove,
    Keep,
}

/// Best-effort removal with the cleanup semantics above.
pub(crate) fn remove_artifact(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("could not remove {}: {e}", path.display()),
    }
}

#[derive(Debug)]
pub struct TempFileRegistry {
    files: Vec<PathBuf>,
    policy: RetentionPolicy,
    released: bool,
}

impl TempFileRegistry {
    pub fn new(policy: RetentionPolicy) -> TempFileRegistry {
        TempFileRegistry {
            files: Vec::new(),
            policy,
            released: false,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    pub fn register(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }

    /// Delete every registered file that still exists. A no-op under
    /// `RetentionPolicy::Keep`.
    pub fn cleanup(&mut self) {
        self.released = true;
        if self.policy == RetentionPolicy::Keep {
            return;
        }
        for path in &self.files {
            if path.exists() {
                info!("removing intermediate file {}", path.display());
            }
            remove_artifact(path);
        }
    }
}

impl Drop for TempFileRegistry {
    // Release on every exit path: a run that errors out before reaching its
    // explicit cleanup still drops its temporaries.
    fn drop(&mut self) {
        if !self.released {
            self.cleanup();
        }
    }
}
