//! Replaying a tracked branch's commits onto its base's current tip.

use stack_git::{GitDriver, NonZeroOid, RebaseOptions};
use stack_graph::BranchGraph;
use stack_store::{MetadataStore, TrackedBranch};
use tracing::instrument;

/// Errors from restacking.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A Git operation failed outright (not a conflict).
    #[error(transparent)]
    Git(#[from] stack_git::Error),

    /// Reading or writing tracked-branch metadata failed.
    #[error(transparent)]
    Store(#[from] stack_store::store::Error),

    /// A branch-tracking invariant was violated.
    #[error(transparent)]
    Branches(#[from] stack_store::branches::Error),

    /// Loading the branch graph failed.
    #[error(transparent)]
    Graph(#[from] stack_graph::Error),

    /// Reading or writing the continuation queue failed.
    #[error(transparent)]
    Continuations(#[from] stack_store::continuations::Error),

    /// The requested branch is not tracked.
    #[error("branch {0:?} is not tracked")]
    NotTracked(String),

    /// A rebase stopped on conflicts partway through. The caller must
    /// resolve them and run the rescue continuation, or abort.
    #[error("rebase of {branch:?} stopped due to conflicts in: {}", .conflicted_paths.join(", "))]
    Interrupted {
        /// The branch whose rebase was interrupted.
        branch: String,
        /// Paths with unresolved conflicts.
        conflicted_paths: Vec<String>,
    },
}

type Result<T> = std::result::Result<T, Error>;

/// Whether a branch needed any work done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestackOutcome {
    /// The branch's `base_hash` already matched its base's current tip.
    AlreadyUpToDate,
    /// The branch was rebased onto its base's current tip.
    Restacked,
}

/// Rebase `branch`'s commits onto its base's current tip (or trunk's, if it
/// has no base), and record the new `base_hash`. Checks out `branch` as a
/// side effect. No-op if the branch is already up to date.
#[instrument(skip(driver, store, branch))]
pub fn restack_branch(
    driver: &GitDriver,
    store: &MetadataStore,
    trunk_name: &str,
    branch: &TrackedBranch,
) -> Result<(TrackedBranch, RestackOutcome)> {
    let base_ref = branch.base.as_deref().unwrap_or(trunk_name);
    let new_base_tip = driver.resolve_ref(base_ref)?;

    if new_base_tip == branch.base_hash {
        return Ok((branch.clone(), RestackOutcome::AlreadyUpToDate));
    }

    driver.checkout(&branch.name)?;
    let old_base_hash = branch.base_hash;
    let rebase_result = driver.rebase(
        old_base_hash.as_str(),
        &RebaseOptions {
            onto: Some(new_base_tip.to_string()),
            quiet: true,
            ..RebaseOptions::default()
        },
    );
    match rebase_result {
        Ok(()) => {}
        Err(stack_git::Error::RebaseInterrupted {
            conflicted_paths, ..
        }) => {
            return Err(Error::Interrupted {
                branch: branch.name.clone(),
                conflicted_paths,
            });
        }
        Err(err) => return Err(err.into()),
    }

    let mut updated = branch.clone();
    updated.base_hash = new_base_tip;
    stack_store::upsert_branch(store, updated.clone())?;
    Ok((updated, RestackOutcome::Restacked))
}

/// Look up `name` in the store and restack it.
pub fn restack_by_name(
    driver: &GitDriver,
    store: &MetadataStore,
    trunk_name: &str,
    name: &str,
) -> Result<(TrackedBranch, RestackOutcome)> {
    let branch =
        stack_store::get_branch(store, name)?.ok_or_else(|| Error::NotTracked(name.to_owned()))?;
    restack_branch(driver, store, trunk_name, &branch)
}

/// Restack every branch in the connected stack containing `name`, base-first,
/// stopping at the first conflict.
#[instrument(skip(driver, store))]
pub fn restack_stack(
    driver: &GitDriver,
    store: &MetadataStore,
    trunk_name: &str,
    name: &str,
) -> Result<Vec<TrackedBranch>> {
    let graph = BranchGraph::load(store)?;
    let ordered = graph.list_stack(name)?;
    restack_ordered(driver, store, trunk_name, &ordered)
}

/// Restack `name` and every branch transitively above it, base-first.
#[instrument(skip(driver, store))]
pub fn restack_upstack(
    driver: &GitDriver,
    store: &MetadataStore,
    trunk_name: &str,
    name: &str,
) -> Result<Vec<TrackedBranch>> {
    let graph = BranchGraph::load(store)?;
    let target = graph
        .lookup(name)
        .ok_or_else(|| Error::NotTracked(name.to_owned()))?;
    let mut ordered = vec![target];
    ordered.extend(graph.list_upstack(name));
    restack_ordered(driver, store, trunk_name, &ordered)
}

/// Restack every tracked branch in the repository, in topological order.
#[instrument(skip(driver, store))]
pub fn restack_repo(
    driver: &GitDriver,
    store: &MetadataStore,
    trunk_name: &str,
) -> Result<Vec<TrackedBranch>> {
    let graph = BranchGraph::load(store)?;
    let ordered = graph.toposort();
    restack_ordered(driver, store, trunk_name, &ordered)
}

fn restack_ordered(
    driver: &GitDriver,
    store: &MetadataStore,
    trunk_name: &str,
    ordered: &[&TrackedBranch],
) -> Result<Vec<TrackedBranch>> {
    let mut restacked = Vec::new();
    for (i, branch) in ordered.iter().enumerate() {
        match restack_branch(driver, store, trunk_name, branch) {
            Ok((updated, _)) => restacked.push(updated),
            Err(Error::Interrupted {
                branch: interrupted_branch,
                conflicted_paths,
            }) => {
                for remaining in &ordered[i + 1..] {
                    stack_store::continuations::push_continuation(
                        store,
                        stack_store::Continuation {
                            command: vec!["restack".to_owned()],
                            branch: remaining.name.clone(),
                        },
                    )?;
                }
                return Err(Error::Interrupted {
                    branch: interrupted_branch,
                    conflicted_paths,
                });
            }
            Err(err) => return Err(err),
        }
    }
    Ok(restacked)
}

/// Change a tracked branch's base to another tracked branch (`stack branch
/// onto`), then restack it onto the new base's current tip.
#[instrument(skip(driver, store))]
pub fn branch_onto(
    driver: &GitDriver,
    store: &MetadataStore,
    trunk_name: &str,
    name: &str,
    new_base: Option<&str>,
) -> Result<(TrackedBranch, RestackOutcome)> {
    let graph = BranchGraph::load(store)?;
    if let Some(new_base) = new_base {
        if graph.would_create_cycle(name, new_base) {
            return Err(stack_store::branches::Error::Cycle {
                name: name.to_owned(),
                base: new_base.to_owned(),
            }
            .into());
        }
    }
    let mut branch =
        stack_store::get_branch(store, name)?.ok_or_else(|| Error::NotTracked(name.to_owned()))?;
    branch.base = new_base.map(str::to_owned);
    // Force the rebase: pretend the recorded base is wherever the branch
    // actually forked from, so `restack_branch` replays every commit onto
    // the new target rather than treating it as already up to date.
    let fork_point: NonZeroOid = driver.fork_point(&branch.name, trunk_name)?;
    branch.base_hash = fork_point;
    stack_store::upsert_branch(store, branch.clone())?;
    restack_branch(driver, store, trunk_name, &branch)
}
