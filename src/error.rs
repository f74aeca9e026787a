// Exit codes for autocommit.
//
//   0 = committed and pushed, or nothing to commit
//   1 = general error (config, bad arguments to git)
//   2 = usage error (clap)
//   3 = working directory not found
//   4 = stage failed
//   5 = commit failed
//   6 = push failed
//   7 = deadline passed

use std::path::PathBuf;

use thiserror::Error;

use crate::gitops::GitFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    DirectoryNotFound = 3,
    Stage = 4,
    Commit = 5,
    Push = 6,
    Timeout = 7,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Stage,
    Commit,
    Push,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Step::Stage => "stage",
            Step::Commit => "commit",
            Step::Push => "push",
        })
    }
}

#[derive(Debug, Error)]
pub enum AutoCommitError {
    #[error("working directory {} does not exist or is not a directory", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("stage failed: {0}")]
    Stage(GitFailure),
    #[error("commit failed: {0}")]
    Commit(GitFailure),
    #[error("push failed (local commit kept): {0}")]
    Push(GitFailure),
    #[error("{step} timed out: {failure}")]
    Timeout { step: Step, failure: GitFailure },
}

impl AutoCommitError {
    /// Map a failed git step to its error kind.
    pub fn from_step(step: Step, failure: GitFailure) -> Self {
        if failure.timed_out {
            return Self::Timeout { step, failure };
        }
        match step {
            Step::Stage => Self::Stage(failure),
            Step::Commit => Self::Commit(failure),
            Step::Push => Self::Push(failure),
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::DirectoryNotFound(_) => ExitCode::DirectoryNotFound,
            Self::Stage(_) => ExitCode::Stage,
            Self::Commit(_) => ExitCode::Commit,
            Self::Push(_) => ExitCode::Push,
            Self::Timeout { .. } => ExitCode::Timeout,
        }
    }
}
