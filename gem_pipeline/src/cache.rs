//! Stage memoization: existence of a stage's target artifact is taken as
//! proof of prior successful completion.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How the cache decides a prior output is complete.
///
/// `Existence` reproduces the historical behavior: a zero-byte or truncated
/// artifact left behind by a crash mid-write is misidentified as complete.
/// `NonEmpty` additionally rejects empty files. Neither attempts repair; a
/// suspect artifact is trusted or rejected, never rewritten.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactValidator {
    #[default]
    Existence,
    NonEmpty,
}

/// Decides whether a stage must execute or may reuse a prior run's output.
/// This is the pipeline's sole resumability mechanism.
#[derive(Clone, Copy, Debug, Default)]
pub struct StageCache {
    validator: ArtifactValidator,
}

impl StageCache {
    pub fn new() -> StageCache {
        StageCache::default()
    }

    pub fn with_validator(validator: ArtifactValidator) -> StageCache {
        StageCache { validator }
    }

    /// True when the target already satisfies the stage. The caller reuses
    /// the artifact and reports a skip, not an error.
    pub fn should_skip(&self, target: &Path) -> bool {
        match self.validator {
            ArtifactValidator::Existence => target.exists(),
            ArtifactValidator::NonEmpty => {
                fs::metadata(target).map(|m| m.len() > 0).unwrap_or(false)
            }
        }
    }
}
