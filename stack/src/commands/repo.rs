//! `repo` subcommands: initializing a repository, syncing trunk, restacking
//! everything.

use stack_git::GitDriver;
use stack_opts::RepoCommand;
use stack_store::{MetadataStore, RepoMetadata};
use tracing::info;

use crate::context::{self, Session};
use crate::error::Error;

pub fn run(driver: &GitDriver, cmd: RepoCommand) -> Result<(), Error> {
    match cmd {
        RepoCommand::Init { trunk, remote } => init(driver, trunk, remote),
        RepoCommand::Sync { restack } => sync(driver, restack),
        RepoCommand::Restack => restack_repo(driver),
    }
}

fn init(driver: &GitDriver, trunk: Option<String>, remote: Option<String>) -> Result<(), Error> {
    let trunk = match trunk {
        Some(trunk) => trunk,
        None => driver.get_trunk_branch_name().ok_or(Error::NoTrunk)?,
    };
    driver.resolve_ref(&trunk)?;
    driver.set_trunk_branch_name(&trunk)?;

    let remote = remote.unwrap_or_else(|| "origin".to_owned());
    driver.set_remote_name(&remote)?;

    let store = MetadataStore::new(driver);
    if store.get::<RepoMetadata>("repo")?.is_none() {
        store.retry_transaction("initialize repository", 3, |txn| {
            txn.put("repo", &RepoMetadata::default())?;
            Ok(())
        })?;
    }

    info!(%trunk, %remote, "repository initialized");
    println!("Initialized with trunk {trunk:?} and remote {remote:?}.");
    Ok(())
}

fn sync(driver: &GitDriver, restack_after: bool) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let forge = context::open_forge(driver, &session.remote, None)
        .ok()
        .map(|(repo, _kind)| repo);
    let report = stack_submit::sync_repo(
        driver,
        &session.store,
        forge.as_deref(),
        &session.remote,
        &session.trunk,
        restack_after,
    )?;

    for name in &report.deleted {
        println!("Deleted merged branch {name:?}.");
    }
    for name in &report.diverged {
        println!("Branch {name:?} looks merged but has diverged locally; left tracked.");
    }
    Ok(())
}

fn restack_repo(driver: &GitDriver) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let restacked = stack_restack::restack_repo(driver, &session.store, &session.trunk)?;
    for branch in restacked {
        println!("Restacked {:?}.", branch.name);
    }
    Ok(())
}
