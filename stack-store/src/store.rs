//! A small transactional key/value store, content-addressed and persisted
//! entirely as commits on a dedicated ref (`refs/spice/data`), built only
//! from Git's plumbing commands (`hash-object`, `mktree`, `commit-tree`,
//! `update-ref --stdin`). No cached, long-lived state is kept in memory:
//! every read starts from the ref's current value, so concurrent
//! invocations of the tool (or a user editing the ref by hand) are detected
//! rather than silently overwritten.

use std::collections::{BTreeMap, HashMap};

use serde::de::DeserializeOwned;
use serde::Serialize;
use stack_git::{GitDriver, NonZeroOid};

/// The ref this store's history lives on.
pub const METADATA_REF: &str = "refs/spice/data";

const AUTHOR_NAME: &str = "git-spice";
const AUTHOR_EMAIL: &str = "git-spice@localhost";

/// Errors produced by the metadata store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A Git operation underlying the store failed.
    #[error(transparent)]
    Git(#[from] stack_git::Error),

    /// A stored value was not valid JSON, or didn't match the shape the
    /// caller asked to deserialize it as.
    #[error("malformed metadata at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The ref moved between a transaction's `begin` and `commit`. Callers
    /// should re-read and retry.
    #[error("metadata ref was concurrently updated, retry the operation")]
    Conflict,
}

type Result<T> = std::result::Result<T, Error>;

/// A handle onto the metadata store of a single repository.
pub struct MetadataStore<'a> {
    driver: &'a GitDriver,
}

impl<'a> MetadataStore<'a> {
    /// Open the store backed by `driver`'s repository.
    pub fn new(driver: &'a GitDriver) -> Self {
        MetadataStore { driver }
    }

    /// The commit the metadata ref currently points at, or `None` if the
    /// store has never been written to.
    fn current_commit(&self) -> Result<Option<NonZeroOid>> {
        match self.driver.resolve_ref(METADATA_REF) {
            Ok(oid) => Ok(Some(oid)),
            Err(stack_git::Error::CommandFailed { .. }) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn read_tree_entries(&self, commit: NonZeroOid) -> Result<HashMap<String, NonZeroOid>> {
        let args = ["ls-tree", "-r", commit.as_str()];
        let output = self
            .driver
            .run_info()
            .run_silent(&args, Default::default())
            .map_err(stack_git::Error::from)?;
        if !output.success() {
            return Err(stack_git::Error::CommandFailed {
                args: args.join(" "),
                exit_code: output.exit_code,
                stderr: output.stderr_string(),
            }
            .into());
        }
        let mut entries = HashMap::new();
        for line in output.stdout_string().lines() {
            // `<mode> <type> <oid>\t<path>`
            let (meta, path) = line.split_once('\t').unwrap_or((line, ""));
            let oid = meta
                .split_whitespace()
                .nth(2)
                .unwrap_or_default()
                .parse::<NonZeroOid>()
                .map_err(stack_git::Error::from)?;
            entries.insert(path.to_owned(), oid);
        }
        Ok(entries)
    }

    fn read_blob(&self, oid: NonZeroOid) -> Result<Vec<u8>> {
        let args = ["cat-file", "blob", oid.as_str()];
        let output = self
            .driver
            .run_info()
            .run_silent(&args, Default::default())
            .map_err(stack_git::Error::from)?;
        if !output.success() {
            return Err(stack_git::Error::CommandFailed {
                args: args.join(" "),
                exit_code: output.exit_code,
                stderr: output.stderr_string(),
            }
            .into());
        }
        Ok(output.stdout)
    }

    fn read_value<T: DeserializeOwned>(&self, path: &str, oid: NonZeroOid) -> Result<T> {
        let bytes = self.read_blob(oid)?;
        serde_json::from_slice(&bytes).map_err(|source| Error::Malformed {
            path: path.to_owned(),
            source,
        })
    }

    /// Read a single value out of the store's current snapshot without
    /// opening a transaction.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let commit = match self.current_commit()? {
            Some(commit) => commit,
            None => return Ok(None),
        };
        let entries = self.read_tree_entries(commit)?;
        match entries.get(path) {
            Some(oid) => Ok(Some(self.read_value(path, *oid)?)),
            None => Ok(None),
        }
    }

    /// List the stored paths under `prefix` (a directory, e.g. `"branches"`).
    pub fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let commit = match self.current_commit()? {
            Some(commit) => commit,
            None => return Ok(Vec::new()),
        };
        let entries = self.read_tree_entries(commit)?;
        let prefixed = format!("{prefix}/");
        Ok(entries
            .keys()
            .filter(|path| path.starts_with(&prefixed))
            .cloned()
            .collect())
    }

    /// Begin a transaction against the store's current snapshot.
    pub fn begin(&self) -> Result<Transaction<'_, 'a>> {
        let base_commit = self.current_commit()?;
        let base_entries = match base_commit {
            Some(commit) => self.read_tree_entries(commit)?,
            None => HashMap::new(),
        };
        Ok(Transaction {
            store: self,
            base_commit,
            base_entries,
            staged: HashMap::new(),
        })
    }

    /// Run `f` against a fresh transaction, retrying up to `attempts` times
    /// if the commit races against a concurrent writer.
    pub fn retry_transaction<F>(&self, message: &str, attempts: u32, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Transaction<'_, 'a>) -> Result<()>,
    {
        let mut last_err = Error::Conflict;
        for _ in 0..attempts.max(1) {
            let mut txn = self.begin()?;
            f(&mut txn)?;
            match txn.commit(message) {
                Ok(()) => return Ok(()),
                Err(Error::Conflict) => {
                    last_err = Error::Conflict;
                    continue;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err)
    }
}

/// A staged set of writes against a [`MetadataStore`] snapshot.
pub struct Transaction<'store, 'driver> {
    store: &'store MetadataStore<'driver>,
    base_commit: Option<NonZeroOid>,
    base_entries: HashMap<String, NonZeroOid>,
    staged: HashMap<String, Option<Vec<u8>>>,
}

impl<'store, 'driver> Transaction<'store, 'driver> {
    /// Read a value as it stands within this transaction (reflecting any
    /// prior `put`/`delete` calls made on it).
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        if let Some(staged) = self.staged.get(path) {
            return match staged {
                Some(bytes) => Ok(Some(serde_json::from_slice(bytes).map_err(|source| {
                    Error::Malformed {
                        path: path.to_owned(),
                        source,
                    }
                })?)),
                None => Ok(None),
            };
        }
        match self.base_entries.get(path) {
            Some(oid) => Ok(Some(self.store.read_value(path, *oid)?)),
            None => Ok(None),
        }
    }

    /// Stage a write of `value` at `path`.
    pub fn put<T: Serialize>(&mut self, path: impl Into<String>, value: &T) -> Result<()> {
        let path = path.into();
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| Error::Malformed {
            path: path.clone(),
            source,
        })?;
        self.staged.insert(path, Some(bytes));
        Ok(())
    }

    /// Stage a delete of `path`.
    pub fn delete(&mut self, path: impl Into<String>) {
        self.staged.insert(path.into(), None);
    }

    /// List paths under `prefix`, combining the base snapshot with staged changes.
    pub fn list(&self, prefix: &str) -> Vec<String> {
        let prefixed = format!("{prefix}/");
        let mut paths: std::collections::BTreeSet<String> = self
            .base_entries
            .keys()
            .filter(|path| path.starts_with(&prefixed))
            .cloned()
            .collect();
        for (path, staged) in &self.staged {
            if !path.starts_with(&prefixed) {
                continue;
            }
            match staged {
                Some(_) => {
                    paths.insert(path.clone());
                }
                None => {
                    paths.remove(path);
                }
            }
        }
        paths.into_iter().collect()
    }

    /// Materialize the staged writes as a new commit on [`METADATA_REF`],
    /// failing with [`Error::Conflict`] if the ref moved since `begin`.
    pub fn commit(self, message: &str) -> Result<()> {
        let driver = self.store.driver;
        let mut final_entries: BTreeMap<String, NonZeroOid> = self
            .base_entries
            .into_iter()
            .collect::<BTreeMap<_, _>>();

        for (path, staged) in self.staged {
            match staged {
                Some(bytes) => {
                    let oid = driver.hash_object(&bytes)?;
                    final_entries.insert(path, oid);
                }
                None => {
                    final_entries.remove(&path);
                }
            }
        }

        let tree = build_tree(driver, &final_entries)?;
        let parents: Vec<NonZeroOid> = self.base_commit.into_iter().collect();
        let new_commit =
            driver.commit_tree_as(tree, &parents, message, AUTHOR_NAME, AUTHOR_EMAIL)?;

        let ref_name = METADATA_REF.into();
        match driver.set_ref(&ref_name, new_commit, self.base_commit) {
            Ok(()) => Ok(()),
            Err(stack_git::Error::RefConcurrentlyModified { .. }) => Err(Error::Conflict),
            Err(err) => Err(err.into()),
        }
    }
}

fn build_tree(driver: &GitDriver, entries: &BTreeMap<String, NonZeroOid>) -> Result<NonZeroOid> {
    let mut files: BTreeMap<String, NonZeroOid> = BTreeMap::new();
    let mut groups: BTreeMap<String, BTreeMap<String, NonZeroOid>> = BTreeMap::new();

    for (path, oid) in entries {
        match path.split_once('/') {
            Some((dir, rest)) => {
                groups
                    .entry(dir.to_owned())
                    .or_default()
                    .insert(rest.to_owned(), *oid);
            }
            None => {
                files.insert(path.clone(), *oid);
            }
        }
    }

    let mut lines = String::new();
    for (name, oid) in &files {
        lines.push_str(&format!("100644 blob {oid}\t{name}\n"));
    }
    for (dir, sub_entries) in &groups {
        let sub_oid = build_tree(driver, &sub_entries)?;
        lines.push_str(&format!("040000 tree {sub_oid}\t{dir}\n"));
    }
    Ok(driver.mktree(&lines)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_git::testing::ScratchRepo;

    #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
    struct Dummy {
        value: u32,
    }

    #[test]
    fn round_trips_a_value() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        let mut txn = store.begin()?;
        txn.put("branches/feat1.json", &Dummy { value: 1 })?;
        txn.commit("add feat1")?;

        let value: Option<Dummy> = store.get("branches/feat1.json")?;
        assert_eq!(value, Some(Dummy { value: 1 }));
        Ok(())
    }

    #[test]
    fn detects_concurrent_modification() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        let mut first = store.begin()?;
        first.put("branches/feat1.json", &Dummy { value: 1 })?;

        let mut second = store.begin()?;
        second.put("branches/feat2.json", &Dummy { value: 2 })?;
        second.commit("add feat2")?;

        let result = first.commit("add feat1");
        assert!(matches!(result, Err(Error::Conflict)));
        Ok(())
    }

    #[test]
    fn delete_removes_a_value() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        let mut txn = store.begin()?;
        txn.put("branches/feat1.json", &Dummy { value: 1 })?;
        txn.commit("add feat1")?;

        let mut txn = store.begin()?;
        txn.delete("branches/feat1.json");
        txn.commit("remove feat1")?;

        let value: Option<Dummy> = store.get("branches/feat1.json")?;
        assert_eq!(value, None);
        Ok(())
    }

    #[test]
    fn list_reflects_staged_changes() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let store = MetadataStore::new(&repo.driver);

        let mut txn = store.begin()?;
        txn.put("branches/feat1.json", &Dummy { value: 1 })?;
        txn.put("branches/feat2.json", &Dummy { value: 2 })?;
        assert_eq!(txn.list("branches").len(), 2);
        txn.delete("branches/feat1.json");
        assert_eq!(txn.list("branches").len(), 1);
        txn.commit("add branches")?;

        assert_eq!(store.list("branches")?.len(), 1);
        Ok(())
    }
}
