//! The command-line surface for the stacked-branch workflow tool.

#![warn(missing_docs)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// The forge to submit changes to.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ForgeKind {
    /// Treat the pushed Git branch itself as the unit of review.
    Branch,
    /// Create and update GitHub pull requests via the `gh` CLI.
    Github,
}

/// Options shared by every command that submits or restacks more than one
/// branch at a time.
#[derive(Args, Debug, Default)]
pub struct SubmitOptions {
    /// Override the change's title instead of deriving it from the
    /// branch's commit messages.
    #[clap(long = "title")]
    pub title: Option<String>,

    /// Override the change's body.
    #[clap(long = "body")]
    pub body: Option<String>,

    /// Only update changes that already exist; never create new ones.
    #[clap(long = "update-only", conflicts_with = "no_publish")]
    pub update_only: bool,

    /// Push only; don't touch the forge at all.
    #[clap(long = "no-publish")]
    pub no_publish: bool,

    /// The forge to submit to. Auto-detected from the remote URL if not set.
    #[clap(short = 'F', long = "forge")]
    pub forge_kind: Option<ForgeKind>,

    /// Skip posting or refreshing the stack navigation comment.
    #[clap(long = "no-nav-comment")]
    pub no_nav_comment: bool,
}

/// `repo` subcommands.
#[derive(Debug, Subcommand)]
pub enum RepoCommand {
    /// Start tracking this repository: record its trunk branch and push remote.
    Init {
        /// The trunk branch name. Auto-detected if not given.
        #[clap(long = "trunk")]
        trunk: Option<String>,

        /// The remote to push branches to and submit changes against.
        #[clap(long = "remote")]
        remote: Option<String>,
    },

    /// Update trunk from the remote and reconcile every tracked branch
    /// against it.
    Sync {
        /// Restack every surviving tracked branch once the sync completes.
        #[clap(long = "restack")]
        restack: bool,
    },

    /// Restack every tracked branch in the repository.
    Restack,
}

/// `branch` subcommands.
#[derive(Debug, Subcommand)]
pub enum BranchCommand {
    /// Start tracking the current (or named) branch.
    Track {
        /// The branch to track. Defaults to the current branch.
        name: Option<String>,

        /// The branch (must already be tracked) this one is based on.
        /// Defaults to trunk.
        #[clap(long = "base")]
        base: Option<String>,
    },

    /// Stop tracking a branch, without deleting it.
    Untrack {
        /// The branch to untrack. Defaults to the current branch.
        name: Option<String>,
    },

    /// Check out a tracked branch.
    Checkout {
        /// The branch to check out.
        name: String,
    },

    /// Create a new branch on top of the current one and track it.
    Create {
        /// The new branch's name.
        name: String,

        /// Commit staged changes onto the new branch immediately.
        #[clap(short = 'm', long = "message")]
        message: Option<String>,
    },

    /// Delete a tracked branch, locally and from the store.
    Delete {
        /// The branch to delete.
        name: String,

        /// Delete even if the branch has unmerged commits.
        #[clap(short = 'f', long = "force")]
        force: bool,
    },

    /// Fold a branch's commits into its base, removing the branch boundary.
    Fold {
        /// The branch to fold. Defaults to the current branch.
        name: Option<String>,
    },

    /// Split a branch into two at a given commit.
    Split {
        /// The branch to split. Defaults to the current branch.
        name: Option<String>,

        /// The commit at which to split: everything up to and including
        /// this commit stays under the original name.
        #[clap(long = "at")]
        at: String,

        /// The name of the new branch holding the commits above `--at`.
        #[clap(long = "name")]
        new_name: String,
    },

    /// Squash a branch's own commits into a single commit.
    Squash {
        /// The branch to squash. Defaults to the current branch.
        name: Option<String>,

        /// The message for the resulting commit. Defaults to the
        /// branch's first commit message.
        #[clap(short = 'm', long = "message")]
        message: Option<String>,
    },

    /// Check out a branch and amend its tip commit interactively.
    Edit {
        /// The branch to edit. Defaults to the current branch.
        name: Option<String>,
    },

    /// Rename a tracked branch.
    Rename {
        /// The branch's current name. Defaults to the current branch.
        name: Option<String>,

        /// The branch's new name.
        new_name: String,
    },

    /// Restack a single tracked branch onto its base.
    Restack {
        /// The branch to restack. Defaults to the current branch.
        name: Option<String>,
    },

    /// Change a tracked branch's base.
    Onto {
        /// The branch to move. Defaults to the current branch.
        name: Option<String>,

        /// The new base branch. Omit to re-base directly onto trunk.
        new_base: Option<String>,
    },

    /// Submit a single branch for review.
    Submit {
        /// The branch to submit. Defaults to the current branch.
        name: Option<String>,

        /// Options shared with other submit commands.
        #[clap(flatten)]
        submit_options: SubmitOptions,
    },
}

/// `commit` subcommands.
#[derive(Debug, Subcommand)]
pub enum CommitCommand {
    /// Commit staged changes onto the current branch.
    Create {
        /// The commit message.
        #[clap(short = 'm', long = "message")]
        message: String,
    },

    /// Amend the current branch's tip commit.
    Amend {
        /// Replace the commit message. Keeps the existing message if omitted.
        #[clap(short = 'm', long = "message")]
        message: Option<String>,
    },

    /// Split the tip commit of the current branch into two, at a given path.
    Split {
        /// Paths to carve out into the first of the two resulting commits.
        paths: Vec<PathBuf>,

        /// The message for the first commit.
        #[clap(long = "message-1")]
        message_first: String,

        /// The message for the second commit.
        #[clap(long = "message-2")]
        message_second: String,
    },

    /// Commit staged changes as a fixup of an earlier commit.
    Fixup {
        /// The commit being fixed up.
        target: String,
    },
}

/// Options shared by the `stack`/`upstack`/`downstack` command groups.
#[derive(Debug, Subcommand)]
pub enum ScopeCommand {
    /// Submit every branch in scope for review, base-first.
    Submit {
        /// Options shared with other submit commands.
        #[clap(flatten)]
        submit_options: SubmitOptions,
    },

    /// Restack every branch in scope.
    Restack,

    /// Check out the tip of the scope for interactive editing.
    Edit,
}

/// `rebase` subcommands, driving `RebaseRescue`.
#[derive(Debug, Subcommand)]
pub enum RebaseCommand {
    /// Resume a restack that stopped on a conflict.
    Continue,

    /// Abandon a restack that stopped on a conflict.
    Abort,
}

/// The full set of top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Operations on the tracked repository as a whole.
    #[clap(subcommand)]
    Repo(RepoCommand),

    /// Operations on a single tracked branch.
    #[clap(subcommand)]
    Branch(BranchCommand),

    /// Operations on the current branch's commits.
    #[clap(subcommand)]
    Commit(CommitCommand),

    /// Operations over a branch's whole connected stack.
    #[clap(subcommand)]
    Stack(ScopeCommand),

    /// Operations over a branch and everything above it.
    #[clap(subcommand)]
    Upstack(ScopeCommand),

    /// Operations over a branch's downstack chain.
    #[clap(subcommand)]
    Downstack(ScopeCommand),

    /// Resuming or abandoning an interrupted rebase.
    #[clap(subcommand)]
    Rebase(RebaseCommand),

    /// Move to the next branch up in the current stack.
    Up {
        /// If the current branch has more than one child, pick this index.
        #[clap(long = "pick")]
        pick: Option<usize>,
    },

    /// Move to the branch this one is based on.
    Down,

    /// Move to the top of the current stack.
    Top,

    /// Move to the bottom of the current stack (just above trunk).
    Bottom,

    /// Check out the trunk branch.
    Trunk,

    /// Render the tracked stacks as a graph.
    Log,

    /// Print the repository's trunk and remote configuration.
    Info,
}

/// Arguments that apply to every invocation.
#[derive(Debug, Parser)]
pub struct GlobalArgs {
    /// Change to the given directory before executing the rest of the program.
    #[clap(value_parser, short = 'C', global = true)]
    pub working_directory: Option<PathBuf>,
}

/// Stacked-branch workflow for Git.
#[derive(Debug, Parser)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Opts {
    /// Global arguments.
    #[clap(flatten)]
    pub global_args: GlobalArgs,

    /// The subcommand to run.
    #[clap(subcommand)]
    pub command: Command,
}
