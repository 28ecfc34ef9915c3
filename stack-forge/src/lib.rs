//! The abstract forge adapter boundary: how a tracked branch's commits get
//! turned into something a teammate can review, and how this tool finds
//! out whether that review has been merged.
//!
//! Two concrete adapters ship here. [`branch_forge::BranchForge`] treats
//! the pushed Git branch itself as the unit of review, useful when there's
//! no external service (and in tests). [`github::GithubForge`] shells out
//! to the `gh` CLI rather than embedding a GraphQL client, for the same
//! reason `stack-git` shells out to `git`: it tracks whatever the user has
//! installed and authenticated, instead of duplicating that logic.

#![warn(missing_docs)]

pub mod branch_forge;
pub mod github;

use std::collections::HashMap;

use stack_git::{BranchName, GitDriver, NonZeroOid};
use stack_store::ForgeKind;

/// Errors from a forge adapter.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying Git operation (typically a push) failed.
    #[error(transparent)]
    Git(#[from] stack_git::Error),

    /// Invoking the forge's CLI tool failed to spawn or returned a
    /// non-zero exit code.
    #[error("`{command}` failed: {message}")]
    Cli { command: String, message: String },

    /// The forge's CLI output could not be parsed.
    #[error("could not parse output of `{command}`: {source}")]
    MalformedOutput {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// No authentication token was available for this forge.
    #[error("not authenticated with {0}")]
    NotAuthenticated(String),

    /// The remote repository could not be matched to any known forge.
    #[error("remote url {0:?} does not match any supported forge")]
    NoMatchingForge(String),
}

type Result<T> = std::result::Result<T, Error>;

/// A change (pull request, merge request, or a plain pushed branch)
/// identified with a forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRef {
    /// The forge's own identifier for the change (a PR number, for GitHub).
    pub id: String,
    /// A human-facing URL for the change, if the forge has one.
    pub url: Option<String>,
}

/// Content for creating or updating a change.
#[derive(Debug, Clone)]
pub struct ChangeDraft<'a> {
    /// The branch name on the remote.
    pub branch: &'a str,
    /// The branch (or trunk) this change should be reviewed against.
    pub base: &'a str,
    /// The change's title.
    pub title: &'a str,
    /// The change's body/description.
    pub body: &'a str,
}

/// A forge adapter: knows how to recognize its own remotes and how to open
/// a [`RemoteRepo`] handle onto one.
pub trait Forge: Send + Sync {
    /// Which [`ForgeKind`] this adapter implements.
    fn kind(&self) -> ForgeKind;

    /// Whether `remote_url` (as printed by `git remote get-url`) belongs to
    /// this forge.
    fn match_remote_url(&self, remote_url: &str) -> bool;

    /// Confirm this forge's CLI/credentials are usable before attempting
    /// any operation against it.
    fn load_authentication_token(&self) -> Result<Option<String>>;

    /// Open a handle onto the repository `remote_name` points at.
    fn open_repository(
        &self,
        driver: &GitDriver,
        remote_name: &str,
    ) -> Result<Box<dyn RemoteRepo>>;
}

/// A single repository on a forge, opened against a particular local
/// [`GitDriver`] and remote name. `Send + Sync` so a batch of independent
/// per-branch queries against it can be run from a worker pool.
pub trait RemoteRepo: Send + Sync {
    /// Push `branch` to this remote, with an optional compare-and-swap
    /// lease against the last known remote tip.
    fn push_branch(
        &self,
        branch: &BranchName,
        expected_remote_oid: Option<NonZeroOid>,
    ) -> Result<()>;

    /// Create a new change from `draft`.
    fn submit_change(&self, draft: &ChangeDraft<'_>) -> Result<ChangeRef>;

    /// Update an existing change's base/title/body.
    fn update_change(&self, change_id: &str, draft: &ChangeDraft<'_>) -> Result<()>;

    /// For each change id, whether it has been merged.
    fn changes_are_merged(&self, change_ids: &[String]) -> Result<HashMap<String, bool>>;

    /// Find an existing change whose source branch is `branch`, if any.
    fn find_change_by_branch(&self, branch: &str) -> Result<Option<ChangeRef>>;

    /// Post a new comment on `change_id`, returning the new comment's id.
    fn post_change_comment(&self, change_id: &str, body: &str) -> Result<String>;

    /// Replace the body of a previously posted comment.
    fn update_change_comment(&self, change_id: &str, comment_id: &str, body: &str) -> Result<()>;
}

/// Choose the first registered forge whose [`Forge::match_remote_url`]
/// matches `remote_url`, falling back to [`branch_forge::BranchForge`] if
/// none of `forges` claim it.
pub fn select_forge<'a>(
    forges: &'a [Box<dyn Forge>],
    remote_url: &str,
) -> &'a dyn Forge {
    forges
        .iter()
        .find(|forge| forge.match_remote_url(remote_url))
        .map(Box::as_ref)
        .unwrap_or(&branch_forge::BRANCH_FORGE)
}
