//! An in-memory view over the tracked-branch stack.
//!
//! There is no long-lived, cached graph object: [`BranchGraph::load`]
//! re-reads the full set of tracked branches from the metadata store on
//! every call and builds a fresh arena. Snapshots are immutable; callers
//! that mutate the stack (restack, fold, sync) go back through
//! `stack-store` and then reload.

#![warn(missing_docs)]

use std::collections::HashMap;

use stack_git::{GitDriver, NonZeroOid};
use stack_store::{MetadataStore, TrackedBranch};
use tracing::instrument;

/// Errors from building or querying a [`BranchGraph`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Loading tracked branches out of the metadata store failed.
    #[error(transparent)]
    Store(#[from] stack_store::store::Error),

    /// Loading tracked branches out of the metadata store failed (branch layer).
    #[error(transparent)]
    Branches(#[from] stack_store::branches::Error),

    /// A Git operation needed to check staleness failed.
    #[error(transparent)]
    Git(#[from] stack_git::Error),

    /// The named branch is not tracked.
    #[error("branch {0:?} is not tracked")]
    NotTracked(String),

    /// The stack requested as a linear ordering actually forks.
    #[error(transparent)]
    NonLinear(#[from] NonLinearStackError),
}

/// Returned by [`BranchGraph::list_stack_linear`] when the stack containing
/// the given branch actually branches (more than one child anywhere in it),
/// so a single linear ordering doesn't exist.
#[derive(Debug, thiserror::Error)]
#[error("stack containing {branch:?} is not linear: {forked_at:?} has multiple children")]
pub struct NonLinearStackError {
    /// The branch the caller asked about.
    pub branch: String,
    /// The branch where the stack forks into more than one child.
    pub forked_at: String,
}

type Result<T> = std::result::Result<T, Error>;

/// Whether a tracked branch's recorded base commit still matches reality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestackStatus {
    /// `base_hash` matches the current tip of the branch's base (or trunk).
    UpToDate,
    /// The base has moved since this branch's `base_hash` was recorded,
    /// whether by this tool or by an external rebase/commit.
    NeedsRestack,
}

/// An in-memory snapshot of every tracked branch, arranged for graph
/// traversal.
pub struct BranchGraph {
    arena: Vec<TrackedBranch>,
    index: HashMap<String, usize>,
}

impl BranchGraph {
    /// Load a fresh snapshot of every tracked branch from `store`.
    #[instrument(skip(store))]
    pub fn load(store: &MetadataStore) -> Result<Self> {
        let arena: Vec<TrackedBranch> = stack_store::list_branches(store)?;
        let index = arena
            .iter()
            .enumerate()
            .map(|(i, branch)| (branch.name.clone(), i))
            .collect();
        Ok(BranchGraph { arena, index })
    }

    /// All tracked branches, in arbitrary order.
    pub fn branches(&self) -> impl Iterator<Item = &TrackedBranch> {
        self.arena.iter()
    }

    /// Look up a tracked branch by name.
    pub fn lookup(&self, name: &str) -> Option<&TrackedBranch> {
        self.index.get(name).map(|&i| &self.arena[i])
    }

    fn require(&self, name: &str) -> Result<&TrackedBranch> {
        self.lookup(name)
            .ok_or_else(|| Error::NotTracked(name.to_owned()))
    }

    /// The tracked branches whose `base` is directly `name`.
    pub fn list_above(&self, name: &str) -> Vec<&TrackedBranch> {
        let mut children: Vec<&TrackedBranch> = self
            .arena
            .iter()
            .filter(|branch| branch.base.as_deref() == Some(name))
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        children
    }

    /// Every branch transitively above `name` (its descendants), nearest
    /// first, in a deterministic breadth-first order.
    pub fn list_upstack(&self, name: &str) -> Vec<&TrackedBranch> {
        let mut result = Vec::new();
        let mut frontier = vec![name.to_owned()];
        while let Some(current) = frontier.pop() {
            let mut children = self.list_above(&current);
            children.sort_by(|a, b| a.name.cmp(&b.name));
            for child in children {
                result.push(child);
                frontier.push(child.name.clone());
            }
        }
        result
    }

    /// The chain of branches `name` is based on, nearest first, stopping at
    /// (but not including) trunk.
    pub fn list_downstack(&self, name: &str) -> Vec<&TrackedBranch> {
        let mut result = Vec::new();
        let mut current = self.lookup(name).and_then(|branch| branch.base.clone());
        while let Some(base_name) = current {
            match self.lookup(&base_name) {
                Some(branch) => {
                    result.push(branch);
                    current = branch.base.clone();
                }
                None => break,
            }
        }
        result
    }

    /// The lowest tracked branch in `name`'s stack, i.e. the one based
    /// directly on trunk. Returns `name` itself if it is already based on
    /// trunk.
    pub fn find_bottom<'a>(&'a self, name: &str) -> Result<&'a TrackedBranch> {
        let start = self.require(name)?;
        match self.list_downstack(name).last() {
            Some(bottom) => Ok(bottom),
            None => Ok(start),
        }
    }

    /// Every tracked branch in the same connected stack as `name`
    /// (downstack chain, `name` itself, and every upstack descendant),
    /// ordered base-first.
    pub fn list_stack(&self, name: &str) -> Result<Vec<&TrackedBranch>> {
        let bottom = self.find_bottom(name)?;
        let mut result = vec![bottom];
        result.extend(self.list_upstack(&bottom.name));
        Ok(result)
    }

    /// Like [`list_stack`](Self::list_stack), but errors if any branch in
    /// the stack has more than one direct child, since callers of this
    /// method want a single unambiguous top-to-bottom ordering.
    pub fn list_stack_linear(&self, name: &str) -> Result<Vec<&TrackedBranch>> {
        let stack = self.list_stack(name)?;
        for branch in &stack {
            let children = self.list_above(&branch.name);
            if children.len() > 1 {
                return Err(NonLinearStackError {
                    branch: name.to_owned(),
                    forked_at: branch.name.clone(),
                }
                .into());
            }
        }
        Ok(stack)
    }

    /// A deterministic topological ordering of every tracked branch, bases
    /// before their dependents.
    pub fn toposort(&self) -> Vec<&TrackedBranch> {
        let mut roots: Vec<&TrackedBranch> = self
            .arena
            .iter()
            .filter(|branch| match &branch.base {
                Some(base) => !self.index.contains_key(base),
                None => true,
            })
            .collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name));

        let mut result = Vec::new();
        let mut queue: std::collections::VecDeque<String> =
            roots.iter().map(|b| b.name.clone()).collect();
        result.extend(roots);
        while let Some(current) = queue.pop_front() {
            for child in self.list_above(&current) {
                result.push(child);
                queue.push_back(child.name.clone());
            }
        }
        result
    }

    /// Whether `name`'s `base_hash` still matches the actual current tip of
    /// its base branch (or `trunk_name` if it has none), detecting both
    /// restacks this tool hasn't performed yet and restacks/rebases done
    /// silently by the user outside this tool.
    ///
    /// If the base has moved but `name`'s own history already contains that
    /// new tip (i.e. the user rebased it externally, by hand), this
    /// silently records the new `base_hash` in `store` and reports
    /// [`RestackStatus::UpToDate`] rather than asking for a redundant
    /// rebase.
    #[instrument(skip(self, driver, store))]
    pub fn check_restacked(
        &self,
        driver: &GitDriver,
        store: &MetadataStore,
        trunk_name: &str,
        name: &str,
    ) -> Result<RestackStatus> {
        let branch = self.require(name)?;
        let base_ref = branch.base.as_deref().unwrap_or(trunk_name);
        let current_base_tip = driver.resolve_ref(base_ref)?;
        if current_base_tip == branch.base_hash {
            return Ok(RestackStatus::UpToDate);
        }

        if driver.merge_base(&branch.name, base_ref)? == current_base_tip {
            let mut updated = branch.clone();
            updated.base_hash = current_base_tip;
            stack_store::upsert_branch(store, updated)?;
            return Ok(RestackStatus::UpToDate);
        }

        Ok(RestackStatus::NeedsRestack)
    }

    /// Whether setting `name`'s base to `new_base` would create a cycle,
    /// checked against this in-memory snapshot (no store round-trip).
    pub fn would_create_cycle(&self, name: &str, new_base: &str) -> bool {
        if name == new_base {
            return true;
        }
        let mut current = new_base.to_owned();
        let mut seen = std::collections::HashSet::new();
        seen.insert(name.to_owned());
        loop {
            if !seen.insert(current.clone()) {
                return true;
            }
            match self.lookup(&current) {
                Some(branch) => match &branch.base {
                    Some(base) => current = base.clone(),
                    None => return false,
                },
                None => return false,
            }
        }
    }
}

/// The object id a branch's base resolves to right now: either another
/// tracked branch's tip, or trunk's tip.
pub fn resolve_base_oid(
    driver: &GitDriver,
    trunk_name: &str,
    base: Option<&str>,
) -> std::result::Result<NonZeroOid, stack_git::Error> {
    driver.resolve_ref(base.unwrap_or(trunk_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_git::testing::ScratchRepo;
    use stack_store::MetadataStore;

    fn track(store: &MetadataStore, driver: &GitDriver, name: &str, base: Option<&str>) {
        let base_hash = resolve_base_oid(driver, "main", base).unwrap();
        stack_store::upsert_branch(
            store,
            TrackedBranch {
                name: name.to_owned(),
                base: base.map(str::to_owned),
                base_hash,
                upstream_branch: None,
                change: None,
                merged_downstack: Vec::new(),
            },
        )
        .unwrap();
    }

    #[test]
    fn traverses_a_three_deep_stack() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        repo.commit_on_new_branch("feat1", "one")?;
        repo.commit_on_new_branch("feat2", "two")?;
        repo.commit_on_new_branch("feat3", "three")?;
        repo.driver.checkout("main")?;

        let store = MetadataStore::new(&repo.driver);
        track(&store, &repo.driver, "feat1", None);
        track(&store, &repo.driver, "feat2", Some("feat1"));
        track(&store, &repo.driver, "feat3", Some("feat2"));

        let graph = BranchGraph::load(&store)?;
        assert_eq!(
            graph.list_upstack("feat1").iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            vec!["feat2", "feat3"]
        );
        assert_eq!(
            graph.list_downstack("feat3").iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            vec!["feat2", "feat1"]
        );
        assert_eq!(graph.find_bottom("feat3")?.name, "feat1");
        assert_eq!(
            graph.toposort().iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            vec!["feat1", "feat2", "feat3"]
        );
        Ok(())
    }

    #[test]
    fn detects_a_fork_in_the_stack() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        repo.commit_on_new_branch("feat1", "one")?;
        repo.commit_on_new_branch("feat2a", "two a")?;
        repo.driver.checkout("feat1")?;
        repo.commit_on_new_branch("feat2b", "two b")?;

        let store = MetadataStore::new(&repo.driver);
        track(&store, &repo.driver, "feat1", None);
        track(&store, &repo.driver, "feat2a", Some("feat1"));
        track(&store, &repo.driver, "feat2b", Some("feat1"));

        let graph = BranchGraph::load(&store)?;
        assert_eq!(graph.list_above("feat1").len(), 2);
        let result = graph.list_stack_linear("feat2a");
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn check_restacked_detects_staleness() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        repo.commit_on_new_branch("feat1", "one")?;
        repo.driver.checkout("main")?;

        let store = MetadataStore::new(&repo.driver);
        track(&store, &repo.driver, "feat1", None);

        let graph = BranchGraph::load(&store)?;
        assert_eq!(
            graph.check_restacked(&repo.driver, &store, "main", "feat1")?,
            RestackStatus::UpToDate
        );

        // main moves after feat1's base_hash was recorded: this should now
        // read as stale.
        repo.driver.checkout("main")?;
        repo.commit_on_current_branch("advance main further")?;
        let store = MetadataStore::new(&repo.driver);
        let graph = BranchGraph::load(&store)?;
        assert_eq!(
            graph.check_restacked(&repo.driver, &store, "main", "feat1")?,
            RestackStatus::NeedsRestack
        );
        Ok(())
    }

    #[test]
    fn check_restacked_absorbs_an_external_rebase() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        repo.commit_on_new_branch("feat1", "one")?;
        repo.driver.checkout("main")?;
        repo.commit_on_current_branch("advance main")?;

        let store = MetadataStore::new(&repo.driver);
        track(&store, &repo.driver, "feat1", None);

        // The user rebases feat1 onto the new main by hand, outside this
        // tool, so its base_hash is now stale but its own history already
        // contains main's new tip.
        repo.driver.checkout("feat1")?;
        repo.driver
            .rebase("main", &stack_git::RebaseOptions::default())?;

        let graph = BranchGraph::load(&store)?;
        assert_eq!(
            graph.check_restacked(&repo.driver, &store, "main", "feat1")?,
            RestackStatus::UpToDate
        );

        let updated = stack_store::get_branch(&store, "feat1")?.unwrap();
        assert_eq!(updated.base_hash, repo.driver.resolve_ref("main")?);
        Ok(())
    }

    #[test]
    fn would_create_cycle_detects_indirect_cycles() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        repo.commit_on_new_branch("feat1", "one")?;
        repo.commit_on_new_branch("feat2", "two")?;

        let store = MetadataStore::new(&repo.driver);
        track(&store, &repo.driver, "feat1", None);
        track(&store, &repo.driver, "feat2", Some("feat1"));

        let graph = BranchGraph::load(&store)?;
        assert!(graph.would_create_cycle("feat1", "feat2"));
        assert!(!graph.would_create_cycle("feat2", "feat1"));
        Ok(())
    }
}
