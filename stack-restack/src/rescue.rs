//! Resuming (or abandoning) a restack that stopped on a rebase conflict.

use stack_git::{GitDriver, RebaseState};
use stack_store::MetadataStore;
use tracing::instrument;

use crate::restack::{self, Error};

type Result<T> = std::result::Result<T, Error>;

/// Finish the Git rebase currently paused in the working tree (the caller
/// is expected to have already staged conflict resolutions), record the
/// branch's new `base_hash`, and then drain any queued continuations for
/// the rest of the stack.
///
/// Returns the branches that were successfully restacked as a result. If
/// another conflict is hit partway through the queue, the remaining
/// branches are re-queued and `Error::Interrupted` is returned again.
#[instrument(skip(driver, store))]
pub fn continue_rebase(
    driver: &GitDriver,
    store: &MetadataStore,
    trunk_name: &str,
) -> Result<Vec<stack_store::TrackedBranch>> {
    if driver.rebase_state()? == RebaseState::None {
        return Err(stack_git::Error::NoRebaseInProgress.into());
    }

    let resuming_branch = driver.current_branch()?;
    match driver.rebase_continue() {
        Ok(()) => {}
        Err(stack_git::Error::RebaseInterrupted {
            conflicted_paths, ..
        }) => {
            return Err(Error::Interrupted {
                branch: resuming_branch.to_string(),
                conflicted_paths,
            });
        }
        Err(err) => return Err(err.into()),
    }

    let mut completed = Vec::new();
    if let Some(mut branch) = stack_store::get_branch(store, resuming_branch.as_str())? {
        let base_ref = branch.base.clone().unwrap_or_else(|| trunk_name.to_owned());
        branch.base_hash = driver.resolve_ref(&base_ref)?;
        stack_store::upsert_branch(store, branch.clone())?;
        completed.push(branch);
    }

    while let Some(continuation) = stack_store::take_continuation(store)? {
        match restack::restack_by_name(driver, store, trunk_name, &continuation.branch) {
            Ok((updated, _)) => completed.push(updated),
            Err(err) => {
                // Put this branch back at the front of the queue so the
                // next `continue_rebase` picks up where this one left off.
                stack_store::push_continuation_front(store, continuation)?;
                return Err(err);
            }
        }
    }

    Ok(completed)
}

/// Abandon the paused rebase and drop any queued restack continuations,
/// leaving the branch exactly where it was before the restack began.
#[instrument(skip(driver, store))]
pub fn abort(driver: &GitDriver, store: &MetadataStore) -> Result<()> {
    driver.rebase_abort()?;
    stack_store::take_all_continuations(store)?;
    Ok(())
}
