//! Reconciling the local stack with a remote: updating trunk, detecting
//! which tracked branches have been merged, propagating their history onto
//! whatever sat above them, and deleting them.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;
use stack_forge::RemoteRepo;
use stack_git::GitDriver;
use stack_graph::BranchGraph;
use stack_store::{MetadataStore, TrackedBranch};
use tracing::instrument;

/// Errors from syncing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A Git operation failed.
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

    /// The forge adapter rejected an operation.
    #[error(transparent)]
    Forge(#[from] stack_forge::Error),

    /// The worker pool used to fan out per-branch merge-status checks
    /// couldn't be started.
    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Restacking the surviving stack after a sync failed.
    #[error(transparent)]
    Restack(#[from] stack_restack::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// What a sync actually did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Branches that were found merged and deleted.
    pub deleted: Vec<String>,
    /// Branches the forge reports merged, but whose local head has since
    /// diverged from what was actually merged; left tracked untouched.
    pub diverged: Vec<String>,
}

fn run_checked(driver: &GitDriver, args: &[&str]) -> Result<()> {
    let output = driver
        .run_info()
        .run_silent(args, Default::default())
        .map_err(stack_git::Error::from)?;
    if output.success() {
        Ok(())
    } else {
        Err(stack_git::Error::CommandFailed {
            args: args.join(" "),
            exit_code: output.exit_code,
            stderr: output.stderr_string(),
        }
        .into())
    }
}

fn pull_rebase_autostash(driver: &GitDriver, remote_name: &str, trunk_name: &str) -> Result<()> {
    run_checked(
        driver,
        &["pull", "--quiet", "--rebase", "--autostash", remote_name, trunk_name],
    )
}

/// Update the local trunk branch from `remote_name`, picking the least
/// disruptive operation available: rebase-pull if trunk is checked out
/// here, a direct fetch-into-ref if it's purely behind, or a temporary
/// switch-pull-switch-back otherwise. Never touches trunk if it's checked
/// out in another worktree.
#[instrument(skip(driver))]
pub fn update_trunk(driver: &GitDriver, remote_name: &str, trunk_name: &str) -> Result<()> {
    let current = driver.current_branch().ok();
    let checked_out_here = current.as_ref().map(|b| b.as_str()) == Some(trunk_name);

    if !checked_out_here {
        let checked_out_elsewhere = driver
            .list_local_branches()?
            .iter()
            .any(|b| b.name.as_str() == trunk_name && b.worktree_path.is_some());
        if checked_out_elsewhere {
            tracing::warn!(
                %trunk_name,
                "trunk is checked out in another worktree; leaving it untouched"
            );
            return Ok(());
        }
    }

    if checked_out_here {
        return pull_rebase_autostash(driver, remote_name, trunk_name);
    }

    driver.fetch(remote_name, None)?;
    let remote_ref = format!("{remote_name}/{trunk_name}");
    if driver.is_ancestor(trunk_name, &remote_ref)? {
        let refspec = format!("{trunk_name}:{trunk_name}");
        driver.fetch(remote_name, Some(&refspec))?;
        return Ok(());
    }

    driver.checkout(trunk_name)?;
    pull_rebase_autostash(driver, remote_name, trunk_name)?;
    if let Some(previous) = current {
        driver.checkout(previous.as_str())?;
    }
    Ok(())
}

/// Whether `branch` has been merged, and whether its local head has
/// diverged from what the forge reports as merged.
fn branch_merge_status(
    driver: &GitDriver,
    forge: Option<&dyn RemoteRepo>,
    by_change_id: &HashMap<String, bool>,
    trunk_name: &str,
    branch: &TrackedBranch,
) -> Result<(bool, bool)> {
    if forge.is_some() {
        if let Some(change) = &branch.change {
            return match by_change_id.get(&change.change_id) {
                Some(true) => {
                    let head_matches = driver.is_ancestor(&branch.name, trunk_name)?;
                    Ok((true, !head_matches))
                }
                Some(false) | None => Ok((false, false)),
            };
        }
    }
    let merged = driver.is_ancestor(&branch.name, trunk_name).unwrap_or(false);
    Ok((merged, false))
}

/// Run a full sync: update trunk, detect merged branches, propagate
/// `merged_downstack` history onto their direct upstack children, delete
/// what was merged (locally and its remote-tracking ref), and optionally
/// restack everything that's left.
#[instrument(skip(driver, store, forge))]
pub fn sync_repo(
    driver: &GitDriver,
    store: &MetadataStore,
    forge: Option<&dyn RemoteRepo>,
    remote_name: &str,
    trunk_name: &str,
    restack_after: bool,
) -> Result<SyncReport> {
    update_trunk(driver, remote_name, trunk_name)?;

    let graph = BranchGraph::load(store)?;
    let ordered = graph.toposort();

    let change_ids: Vec<String> = ordered
        .iter()
        .filter_map(|branch| branch.change.as_ref().map(|c| c.change_id.clone()))
        .collect();
    let by_change_id = match forge {
        Some(forge_repo) if !change_ids.is_empty() => forge_repo.changes_are_merged(&change_ids)?,
        _ => HashMap::new(),
    };

    // Every branch's merge status is independent of every other's (a local
    // ancestry check, plus a lookup into the already-fetched
    // `by_change_id` map), so fan them out across a worker pool rather than
    // checking one at a time.
    let pool = rayon::ThreadPoolBuilder::new().build()?;
    let statuses: Vec<(bool, bool)> = pool.install(|| {
        ordered
            .par_iter()
            .map(|branch| branch_merge_status(driver, forge, &by_change_id, trunk_name, branch))
            .collect::<Result<Vec<_>>>()
    })?;

    let mut report = SyncReport::default();
    let mut merged_names: HashSet<String> = HashSet::new();
    for (branch, (merged, diverged)) in ordered.iter().zip(statuses) {
        if diverged {
            tracing::warn!(
                branch = %branch.name,
                "forge reports this branch merged but its local head has diverged from it; leaving it tracked"
            );
            report.diverged.push(branch.name.clone());
            continue;
        }
        if merged {
            merged_names.insert(branch.name.clone());
        }
    }

    // Re-home surviving children and fold each merged branch's change-id
    // (plus whatever it already inherited) into them, in topological order
    // so a chain of consecutive merges accumulates correctly.
    for branch in &ordered {
        if !merged_names.contains(&branch.name) {
            continue;
        }
        let mut history = branch.merged_downstack.clone();
        if let Some(change) = &branch.change {
            history.push(change.change_id.clone());
        }
        for child in graph.list_above(&branch.name) {
            if merged_names.contains(&child.name) {
                continue;
            }
            let mut updated = child.clone();
            updated.base = branch.base.clone();
            let mut child_history = history.clone();
            child_history.extend(updated.merged_downstack.clone());
            updated.merged_downstack = child_history;
            stack_store::upsert_branch(store, updated)?;
        }
    }

    for branch in &ordered {
        if !merged_names.contains(&branch.name) {
            continue;
        }
        if let Ok(current) = driver.current_branch() {
            if current.as_str() == branch.name {
                driver.checkout(trunk_name)?;
            }
        }
        stack_store::delete_branch(store, &branch.name)?;
        driver.delete_branch(&branch.name.clone().into())?;
        let remote_ref = format!("refs/remotes/{remote_name}/{}", branch.name);
        if driver.resolve_ref(&remote_ref).is_ok() {
            let _ = driver
                .run_info()
                .run_silent(&["update-ref", "-d", &remote_ref], Default::default());
        }
        report.deleted.push(branch.name.clone());
    }

    if restack_after {
        stack_restack::restack_repo(driver, store, trunk_name)?;
    }

    Ok(report)
}
