//! Shared setup every command needs: the metadata store, the configured
//! trunk/remote, and resolving "the branch in question" against the
//! currently checked-out one.

use stack_git::GitDriver;
use stack_store::{MetadataStore, RepoMetadata};

use crate::error::Error;

/// Everything a command body operates against, opened fresh for each
/// invocation (the store re-reads its ref every time, so there's nothing
/// to cache).
pub struct Session<'a> {
    pub driver: &'a GitDriver,
    pub store: MetadataStore<'a>,
    pub trunk: String,
    pub remote: String,
}

impl<'a> Session<'a> {
    /// Open a session, requiring the repository to already be initialized.
    pub fn open(driver: &'a GitDriver) -> Result<Self, Error> {
        let store = MetadataStore::new(driver);
        if store.get::<RepoMetadata>("repo")?.is_none() {
            return Err(Error::Uninitialized);
        }
        let trunk = driver.get_trunk_branch_name().ok_or(Error::NoTrunk)?;
        let remote = driver.get_remote_name();
        Ok(Session {
            driver,
            store,
            trunk,
            remote,
        })
    }

    /// Resolve an optional branch argument to a concrete name, defaulting
    /// to the currently checked-out branch.
    pub fn resolve_name(&self, name: Option<String>) -> Result<String, Error> {
        match name {
            Some(name) => Ok(name),
            None => self
                .driver
                .current_branch()
                .map(|b| b.to_string())
                .map_err(|_| Error::DetachedHead),
        }
    }

    /// Look up a tracked branch by name, erroring if it isn't tracked.
    pub fn require_tracked(&self, name: &str) -> Result<stack_store::TrackedBranch, Error> {
        stack_store::get_branch(&self.store, name)?
            .ok_or_else(|| Error::NotTracked(name.to_owned()))
    }
}

/// Choose a forge adapter for `remote_name`, honoring an explicit
/// `--forge` override, falling back to `select_forge`'s URL-based match.
/// Returns the opened repository handle alongside which forge it belongs
/// to, since [`stack_forge::RemoteRepo`] itself doesn't expose that.
pub fn open_forge(
    driver: &GitDriver,
    remote_name: &str,
    forced: Option<stack_opts::ForgeKind>,
) -> Result<(Box<dyn stack_forge::RemoteRepo>, stack_store::ForgeKind), Error> {
    let forges: Vec<Box<dyn stack_forge::Forge>> = vec![Box::new(stack_forge::github::GITHUB_FORGE)];

    let forge: &dyn stack_forge::Forge = match forced {
        Some(stack_opts::ForgeKind::Branch) => &stack_forge::branch_forge::BRANCH_FORGE,
        Some(stack_opts::ForgeKind::Github) => &stack_forge::github::GITHUB_FORGE,
        None => {
            let remote_url = driver.remote_url(remote_name)?;
            stack_forge::select_forge(&forges, &remote_url)
        }
    };

    let kind = forge.kind();
    if forge.load_authentication_token()?.is_none() && kind != stack_store::ForgeKind::Branch {
        return Err(stack_forge::Error::NotAuthenticated(format!("{kind:?}")).into());
    }

    Ok((forge.open_repository(driver, remote_name)?, kind))
}
