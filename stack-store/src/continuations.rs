//! The FIFO queue of deferred commands used by `RebaseRescue` to resume a
//! multi-step operation once the user has resolved a rebase conflict.

use crate::model::Continuation;
use crate::store::{self, MetadataStore};

const CONTINUATIONS_PATH: &str = "continuations.json";

/// Errors from the continuation queue.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying store operation failed.
    #[error(transparent)]
    Store(#[from] store::Error),
}

type Result<T> = std::result::Result<T, Error>;

/// Append `continuation` to the end of the queue.
pub fn push_continuation(store: &MetadataStore, continuation: Continuation) -> Result<()> {
    store.retry_transaction("queue continuation", 3, move |txn| {
        let mut queue: Vec<Continuation> = txn.get(CONTINUATIONS_PATH)?.unwrap_or_default();
        queue.push(continuation.clone());
        txn.put(CONTINUATIONS_PATH, &queue)?;
        Ok(())
    })?;
    Ok(())
}

/// Put `continuation` back at the front of the queue, for a branch whose
/// restack attempt failed after it was already dequeued.
pub fn push_continuation_front(store: &MetadataStore, continuation: Continuation) -> Result<()> {
    store.retry_transaction("requeue continuation", 3, move |txn| {
        let mut queue: Vec<Continuation> = txn.get(CONTINUATIONS_PATH)?.unwrap_or_default();
        queue.insert(0, continuation.clone());
        txn.put(CONTINUATIONS_PATH, &queue)?;
        Ok(())
    })?;
    Ok(())
}

/// Remove and return the queue's oldest entry, or `None` if it's empty.
pub fn take_continuation(store: &MetadataStore) -> Result<Option<Continuation>> {
    let mut taken = None;
    store.retry_transaction("dequeue continuation", 3, |txn| {
        let mut queue: Vec<Continuation> = txn.get(CONTINUATIONS_PATH)?.unwrap_or_default();
        if queue.is_empty() {
            taken = None;
            return Ok(());
        }
        taken = Some(queue.remove(0));
        txn.put(CONTINUATIONS_PATH, &queue)?;
        Ok(())
    })?;
    Ok(taken)
}

/// Drain the entire queue, oldest first.
pub fn take_all_continuations(store: &MetadataStore) -> Result<Vec<Continuation>> {
    let mut drained = Vec::new();
    store.retry_transaction("drain continuations", 3, |txn| {
        let queue: Vec<Continuation> = txn.get(CONTINUATIONS_PATH)?.unwrap_or_default();
        drained = queue;
        txn.put(CONTINUATIONS_PATH, &Vec::<Continuation>::new())?;
        Ok(())
    })?;
    Ok(drained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_git::testing::ScratchRepo;

    #[test]
    fn fifo_ordering() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        push_continuation(
            &store,
            Continuation {
                command: vec!["stack".to_owned(), "restack".to_owned()],
                branch: "feat1".to_owned(),
            },
        )?;
        push_continuation(
            &store,
            Continuation {
                command: vec!["stack".to_owned(), "restack".to_owned()],
                branch: "feat2".to_owned(),
            },
        )?;

        let first = take_continuation(&store)?.expect("queue should not be empty");
        assert_eq!(first.branch, "feat1");
        let second = take_continuation(&store)?.expect("queue should not be empty");
        assert_eq!(second.branch, "feat2");
        assert!(take_continuation(&store)?.is_none());
        Ok(())
    }

    #[test]
    fn take_all_drains_queue() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        for branch in ["feat1", "feat2", "feat3"] {
            push_continuation(
                &store,
                Continuation {
                    command: vec!["stack".to_owned()],
                    branch: branch.to_owned(),
                },
            )?;
        }

        let all = take_all_continuations(&store)?;
        assert_eq!(all.len(), 3);
        assert!(take_all_continuations(&store)?.is_empty());
        Ok(())
    }
}
