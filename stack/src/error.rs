//! The command layer's own error type: every subsystem error folds in
//! here, tagged with whether it's an expected, user-facing outcome (report
//! and exit with a specific code) or a bug that should crash the process.

use stack_invoke::ExitCode;

/// Everything a command handler can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A Git operation failed.
    #[error(transparent)]
    Git(#[from] stack_git::Error),

    /// The metadata store failed outright (not a business-logic rejection).
    #[error(transparent)]
    Store(#[from] stack_store::store::Error),

    /// A branch-tracking invariant was violated.
    #[error(transparent)]
    Branches(#[from] stack_store::branches::Error),

    /// The continuation queue failed.
    #[error(transparent)]
    Continuations(#[from] stack_store::continuations::Error),

    /// Loading or querying the branch graph failed.
    #[error(transparent)]
    Graph(#[from] stack_graph::Error),

    /// Restacking failed.
    #[error(transparent)]
    Restack(#[from] stack_restack::Error),

    /// Submitting failed.
    #[error(transparent)]
    Submit(#[from] stack_submit::SubmitError),

    /// Syncing failed.
    #[error(transparent)]
    Sync(#[from] stack_submit::SyncError),

    /// A forge adapter rejected an operation.
    #[error(transparent)]
    Forge(#[from] stack_forge::Error),

    /// This repository hasn't been initialized with `stack repo init`.
    #[error("this repository is not initialized; run `stack repo init` first")]
    Uninitialized,

    /// No trunk branch could be determined.
    #[error("could not determine the trunk branch; pass `--trunk` to `stack repo init`")]
    NoTrunk,

    /// The requested branch isn't tracked.
    #[error("branch {0:?} is not tracked; run `stack branch track` first")]
    NotTracked(String),

    /// A tracked branch with this name already exists.
    #[error("branch {0:?} is already tracked")]
    AlreadyExists(String),

    /// The command needs a branch name but `HEAD` is detached.
    #[error("HEAD is detached; check out a tracked branch first")]
    DetachedHead,

    /// The operation needed a clean restack first.
    #[error("branch {0:?} needs a restack; run `stack branch restack` first")]
    NeedsRestack(String),

    /// A rebase stopped on conflicts and needs the user's attention.
    #[error("rebase of {branch:?} stopped due to conflicts; resolve them and run `stack rebase continue`, or `stack rebase abort` to cancel")]
    RebaseInterrupted {
        /// The branch whose rebase was interrupted.
        branch: String,
    },

    /// The branch has commits that aren't merged into trunk; pass `--force`.
    #[error("branch {0:?} is not merged into trunk; pass --force to delete it anyway")]
    UnmergedBranch(String),

    /// A user-facing validation error specific to one command, with its
    /// own message (e.g. folding a branch with no base).
    #[error("{0}")]
    Invalid(String),
}

impl Error {
    /// If this is an expected, user-facing outcome, the exit code to report
    /// (after printing the error). `None` means this should be treated as
    /// an unexpected failure and propagated as a crash.
    pub fn user_exit_code(&self) -> Option<i32> {
        match self {
            Error::Uninitialized
            | Error::NoTrunk
            | Error::NotTracked(_)
            | Error::AlreadyExists(_)
            | Error::DetachedHead
            | Error::NeedsRestack(_)
            | Error::UnmergedBranch(_)
            | Error::Invalid(_) => Some(1),

            Error::RebaseInterrupted { .. } => Some(2),

            Error::Git(stack_git::Error::DetachedHead { .. }) => Some(1),
            Error::Git(stack_git::Error::RebaseInterrupted { .. }) => Some(2),

            Error::Branches(stack_store::branches::Error::Cycle { .. }) => Some(1),
            Error::Branches(stack_store::branches::Error::UnknownBase(_)) => Some(1),

            Error::Restack(stack_restack::Error::Interrupted { branch, .. }) => {
                let _ = branch;
                Some(2)
            }
            Error::Restack(stack_restack::Error::NotTracked(_)) => Some(1),

            Error::Graph(stack_graph::Error::NotTracked(_)) => Some(1),
            Error::Graph(stack_graph::Error::NonLinear(_)) => Some(1),

            Error::Submit(stack_submit::SubmitError::NotTracked(_))
            | Error::Submit(stack_submit::SubmitError::NeedsRestack(_)) => Some(1),

            Error::Forge(stack_forge::Error::NotAuthenticated(_))
            | Error::Forge(stack_forge::Error::NoMatchingForge(_)) => Some(1),

            _ => None,
        }
    }
}

/// Convert a command result into the `(eyre fatal) / (reported exit code)`
/// split every handler returns, printing the error to stderr when it's a
/// normal, expected outcome.
pub fn report(result: Result<(), Error>) -> stack_invoke::EyreExitOr<()> {
    match result {
        Ok(()) => Ok(Ok(())),
        Err(err) => match err.user_exit_code() {
            Some(code) => {
                eprintln!("error: {err}");
                Ok(Err(ExitCode(code)))
            }
            None => Err(err.into()),
        },
    }
}
