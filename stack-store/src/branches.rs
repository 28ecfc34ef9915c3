//! Branch-tracking convenience layer over [`MetadataStore`], enforcing the
//! data model's invariants (a tracked branch's base is either trunk or
//! another tracked branch, and the base chain never cycles).

use std::collections::HashSet;

use crate::model::TrackedBranch;
use crate::store::{self, MetadataStore};

/// Errors from the branch-tracking layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying store operation failed.
    #[error(transparent)]
    Store(#[from] store::Error),

    /// A branch's `base` names a branch that isn't tracked.
    #[error("base branch {0:?} is not tracked")]
    UnknownBase(String),

    /// Setting a branch's base would create a cycle in the stack.
    #[error("tracking {name:?} with base {base:?} would create a cycle")]
    Cycle { name: String, base: String },
}

type Result<T> = std::result::Result<T, Error>;

fn branch_path(name: &str) -> String {
    format!("branches/{name}.json")
}

/// Look up a single tracked branch by name.
pub fn get_branch(store: &MetadataStore, name: &str) -> Result<Option<TrackedBranch>> {
    Ok(store.get(&branch_path(name))?)
}

/// All tracked branches, in no particular order.
pub fn list_branches(store: &MetadataStore) -> Result<Vec<TrackedBranch>> {
    let mut branches = Vec::new();
    for path in store.list("branches")? {
        if let Some(branch) = store.get::<TrackedBranch>(&path)? {
            branches.push(branch);
        }
    }
    Ok(branches)
}

fn check_base(store: &MetadataStore, name: &str, base: &str) -> Result<()> {
    if name == base {
        return Err(Error::Cycle {
            name: name.to_owned(),
            base: base.to_owned(),
        });
    }
    let mut seen: HashSet<String> = HashSet::from([name.to_owned()]);
    let mut current = base.to_owned();
    loop {
        if !seen.insert(current.clone()) {
            return Err(Error::Cycle {
                name: name.to_owned(),
                base: base.to_owned(),
            });
        }
        match get_branch(store, &current)? {
            Some(branch) => match branch.base {
                Some(next) => current = next,
                None => return Ok(()),
            },
            None => return Err(Error::UnknownBase(current)),
        }
    }
}

/// Create or update a tracked branch, validating that its `base` (if any)
/// names an existing tracked branch and doesn't introduce a cycle.
pub fn upsert_branch(store: &MetadataStore, branch: TrackedBranch) -> Result<()> {
    if let Some(base) = &branch.base {
        check_base(store, &branch.name, base)?;
    }
    let path = branch_path(&branch.name);
    store.retry_transaction("track branch", 3, move |txn| {
        txn.put(path.clone(), &branch)?;
        Ok(())
    })?;
    Ok(())
}

/// Stop tracking `name`. Does not touch other branches' `base` pointers;
/// callers that need to re-home downstack branches first (e.g. the sync
/// engine) must do so before calling this.
pub fn delete_branch(store: &MetadataStore, name: &str) -> Result<()> {
    let path = branch_path(name);
    store.retry_transaction("untrack branch", 3, move |txn| {
        txn.delete(path.clone());
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_git::testing::ScratchRepo;
    use stack_git::NonZeroOid;
    use std::str::FromStr;

    fn zero_oid() -> NonZeroOid {
        NonZeroOid::from_str("1111111111111111111111111111111111111111").unwrap()
    }

    #[test]
    fn rejects_unknown_base() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        let branch = TrackedBranch {
            name: "feat2".to_owned(),
            base: Some("feat1".to_owned()),
            base_hash: zero_oid(),
            upstream_branch: None,
            change: None,
            merged_downstack: Vec::new(),
        };
        let result = upsert_branch(&store, branch);
        assert!(matches!(result, Err(Error::UnknownBase(name)) if name == "feat1"));
        Ok(())
    }

    #[test]
    fn rejects_self_cycle() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        let branch = TrackedBranch {
            name: "feat1".to_owned(),
            base: Some("feat1".to_owned()),
            base_hash: zero_oid(),
            upstream_branch: None,
            change: None,
            merged_downstack: Vec::new(),
        };
        let result = upsert_branch(&store, branch);
        assert!(matches!(result, Err(Error::Cycle { .. })));
        Ok(())
    }

    #[test]
    fn accepts_a_valid_stack() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        upsert_branch(
            &store,
            TrackedBranch {
                name: "feat1".to_owned(),
                base: None,
                base_hash: zero_oid(),
                upstream_branch: None,
                change: None,
                merged_downstack: Vec::new(),
            },
        )?;
        upsert_branch(
            &store,
            TrackedBranch {
                name: "feat2".to_owned(),
                base: Some("feat1".to_owned()),
                base_hash: zero_oid(),
                upstream_branch: None,
                change: None,
                merged_downstack: Vec::new(),
            },
        )?;

        assert_eq!(list_branches(&store)?.len(), 2);
        Ok(())
    }
}
