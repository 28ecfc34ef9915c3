//! On-disk JSON shapes stored under `refs/spice/data`.

use serde::{Deserialize, Serialize};
use stack_git::NonZeroOid;

/// Which code-review forge a branch's change metadata belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForgeKind {
    /// The remote Git branch itself is the unit of review (no external forge).
    Branch,
    /// GitHub pull requests, via the `gh` CLI.
    Github,
}

/// A branch's relationship to whatever forge it was submitted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMetadata {
    pub forge: ForgeKind,
    pub change_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_comment_id: Option<String>,
}

/// A single branch tracked by this tool, and its place in the stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedBranch {
    /// The branch's own name.
    pub name: String,

    /// The name of the branch directly below this one in the stack
    /// (`None` only for branches based directly on trunk).
    pub base: Option<String>,

    /// The commit id of `base` (or of trunk) as of the last successful
    /// restack, used to detect staleness and to compute the range of
    /// commits belonging to this branch.
    pub base_hash: NonZeroOid,

    /// The name of this branch on the remote, if it has ever been pushed,
    /// which may differ from `name` if the user renamed the local branch
    /// after submitting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_branch: Option<String>,

    /// Forge-specific submission metadata, set the first time the branch
    /// is submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<ChangeMetadata>,

    /// Branches that used to sit downstack from this one and were merged
    /// into it by a sync operation, kept so their own `base` pointers can
    /// still be resolved historically.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_downstack: Vec<String>,
}

/// A deferred command to resume once an interrupted rebase is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Continuation {
    /// The argv of the top-level command to re-invoke.
    pub command: Vec<String>,
    /// The branch the interrupted operation was acting on.
    pub branch: String,
}

/// Store-wide metadata, largely a schema version marker so future releases
/// can detect and migrate older on-disk layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoMetadata {
    pub schema_version: u32,
}

impl Default for RepoMetadata {
    fn default() -> Self {
        RepoMetadata { schema_version: 1 }
    }
}
