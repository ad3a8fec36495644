//! Parallel staging
//!
//! Uses Rayon to stage independent applications at once. Each job parses
//! and rewrites its own descriptor, so nothing is shared between them.

use std::path::PathBuf;

use rayon::prelude::*;

use super::{StagedApp, Stager};
use crate::error::StageError;

/// Stage every `(application, staged directory)` pair
///
/// Results come back in input order; one failure does not stop the others.
pub fn stage_all(stager: &Stager, jobs: &[(PathBuf, PathBuf)]) -> Vec<Result<StagedApp, StageError>> {
    jobs.par_iter()
        .map(|(app, staged)| stager.stage(app, staged))
        .collect()
}
