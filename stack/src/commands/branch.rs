//! `branch` subcommands: everything that acts on a single tracked branch.

use stack_git::{BranchName, GitDriver};
use stack_graph::BranchGraph;
use stack_opts::BranchCommand;
use stack_store::TrackedBranch;
use stack_submit::{PublishMode, SubmitOptions as EngineSubmitOptions};

use crate::context::{self, Session};
use crate::error::Error;

pub fn run(driver: &GitDriver, cmd: BranchCommand) -> Result<(), Error> {
    match cmd {
        BranchCommand::Track { name, base } => track(driver, name, base),
        BranchCommand::Untrack { name } => untrack(driver, name),
        BranchCommand::Checkout { name } => checkout(driver, name),
        BranchCommand::Create { name, message } => create(driver, name, message),
        BranchCommand::Delete { name, force } => delete(driver, name, force),
        BranchCommand::Fold { name } => fold(driver, name),
        BranchCommand::Split { name, at, new_name } => split(driver, name, at, new_name),
        BranchCommand::Squash { name, message } => squash(driver, name, message),
        BranchCommand::Edit { name } => edit(driver, name),
        BranchCommand::Rename { name, new_name } => rename(driver, name, new_name),
        BranchCommand::Restack { name } => restack(driver, name),
        BranchCommand::Onto { name, new_base } => onto(driver, name, new_base),
        BranchCommand::Submit {
            name,
            submit_options,
        } => submit(driver, name, submit_options),
    }
}

fn track(driver: &GitDriver, name: Option<String>, base: Option<String>) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    if stack_store::get_branch(&session.store, &name)?.is_some() {
        return Err(Error::AlreadyExists(name));
    }
    if let Some(base) = &base {
        session.require_tracked(base)?;
    }
    let base_hash = stack_graph::resolve_base_oid(driver, &session.trunk, base.as_deref())?;
    stack_store::upsert_branch(
        &session.store,
        TrackedBranch {
            name: name.clone(),
            base,
            base_hash,
            upstream_branch: None,
            change: None,
            merged_downstack: Vec::new(),
        },
    )?;
    println!("Tracking {name:?}.");
    Ok(())
}

fn untrack(driver: &GitDriver, name: Option<String>) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    session.require_tracked(&name)?;
    stack_store::delete_branch(&session.store, &name)?;
    println!("Untracked {name:?}.");
    Ok(())
}

fn checkout(driver: &GitDriver, name: String) -> Result<(), Error> {
    let session = Session::open(driver)?;
    session.require_tracked(&name)?;
    driver.checkout(&name)?;
    Ok(())
}

fn create(driver: &GitDriver, name: String, message: Option<String>) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let current = driver.current_branch().map_err(|_| Error::DetachedHead)?;
    let base = if current.as_str() == session.trunk {
        None
    } else {
        session.require_tracked(current.as_str())?;
        Some(current.to_string())
    };
    let target = driver.head_oid()?;
    driver.create_branch(&BranchName::new(name.clone()), target)?;
    driver.checkout(&name)?;
    stack_store::upsert_branch(
        &session.store,
        TrackedBranch {
            name: name.clone(),
            base,
            base_hash: target,
            upstream_branch: None,
            change: None,
            merged_downstack: Vec::new(),
        },
    )?;
    if let Some(message) = message {
        driver.commit(&message)?;
    }
    println!("Created and tracked {name:?}.");
    Ok(())
}

fn delete(driver: &GitDriver, name: String, force: bool) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let branch = session.require_tracked(&name)?;
    if !force && !driver.is_ancestor(&name, &session.trunk).unwrap_or(false) {
        return Err(Error::UnmergedBranch(name));
    }
    if let Ok(current) = driver.current_branch() {
        if current.as_str() == name {
            driver.checkout(&session.trunk)?;
        }
    }

    // Re-home every direct child onto this branch's own base, so deleting a
    // mid-stack branch doesn't leave children pointing at a base that no
    // longer exists.
    let graph = BranchGraph::load(&session.store)?;
    let children: Vec<TrackedBranch> = graph.list_above(&name).into_iter().cloned().collect();
    for child in children {
        let mut updated = child;
        updated.base = branch.base.clone();
        stack_store::upsert_branch(&session.store, updated)?;
    }

    stack_store::delete_branch(&session.store, &name)?;
    driver.delete_branch(&BranchName::new(name.clone()))?;
    println!("Deleted {name:?}.");
    Ok(())
}

/// Merge a branch's commits into its base, removing the boundary between
/// them: the base ref fast-forwards to the branch's tip, the branch's own
/// direct children are re-homed onto the base, and the branch stops being
/// tracked.
fn fold(driver: &GitDriver, name: Option<String>) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    let branch = session.require_tracked(&name)?;
    let base_name = branch.base.clone().ok_or_else(|| {
        Error::Invalid(format!(
            "{name:?} is based directly on trunk and can't be folded"
        ))
    })?;

    let graph = BranchGraph::load(&session.store)?;
    let children: Vec<TrackedBranch> = graph
        .list_above(&name)
        .into_iter()
        .cloned()
        .collect();

    let tip = driver.resolve_ref(&name)?;
    let base_current = driver.resolve_ref(&base_name)?;
    driver.set_ref(
        &BranchName::new(base_name.clone()).to_local_ref(),
        tip,
        Some(base_current),
    )?;

    for child in children {
        let mut updated = child;
        updated.base = Some(base_name.clone());
        stack_store::upsert_branch(&session.store, updated)?;
    }
    stack_store::delete_branch(&session.store, &name)?;

    if let Ok(current) = driver.current_branch() {
        if current.as_str() == name && driver.get_auto_switch_branches() {
            driver.checkout(&base_name)?;
        }
    }
    driver.delete_branch(&BranchName::new(name.clone()))?;
    println!("Folded {name:?} into {base_name:?}.");
    Ok(())
}

/// Split a branch into two at a given commit: everything up to and
/// including `at` keeps the original name, everything above becomes
/// `new_name`, based on the original.
fn split(driver: &GitDriver, name: Option<String>, at: String, new_name: String) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    session.require_tracked(&name)?;
    if stack_store::get_branch(&session.store, &new_name)?.is_some() {
        return Err(Error::AlreadyExists(new_name));
    }

    let split_oid = driver.resolve_ref(&at)?;
    let tip = driver.resolve_ref(&name)?;
    if !driver.is_ancestor(&at, &name)? {
        return Err(Error::Invalid(format!(
            "{at:?} is not an ancestor of {name:?}"
        )));
    }

    let graph = BranchGraph::load(&session.store)?;
    let previous_children: Vec<TrackedBranch> =
        graph.list_above(&name).into_iter().cloned().collect();

    driver.create_branch(&BranchName::new(new_name.clone()), tip)?;
    driver.set_ref(&BranchName::new(name.clone()).to_local_ref(), split_oid, Some(tip))?;

    stack_store::upsert_branch(
        &session.store,
        TrackedBranch {
            name: new_name.clone(),
            base: Some(name.clone()),
            base_hash: split_oid,
            upstream_branch: None,
            change: None,
            merged_downstack: Vec::new(),
        },
    )?;

    for child in previous_children {
        let mut updated = child;
        updated.base = Some(new_name.clone());
        stack_store::upsert_branch(&session.store, updated)?;
    }

    if let Ok(current) = driver.current_branch() {
        if current.as_str() == name && driver.get_auto_switch_branches() {
            driver.checkout(&new_name)?;
        }
    }
    println!("Split {name:?} at {at:?} into {name:?} and {new_name:?}.");
    Ok(())
}

/// Combine a branch's own commits (everything above its recorded base)
/// into a single commit.
fn squash(driver: &GitDriver, name: Option<String>, message: Option<String>) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    let branch = session.require_tracked(&name)?;

    let base_ref = branch.base.clone().unwrap_or_else(|| session.trunk.clone());
    let message = match message {
        Some(message) => message,
        None => {
            let range_message = driver.commit_message_range(&base_ref, &name)?;
            range_message
                .lines()
                .next()
                .unwrap_or(&name)
                .to_owned()
        }
    };

    driver.checkout(&name)?;
    driver.reset_soft(branch.base_hash)?;
    driver.commit(&message)?;
    println!("Squashed {name:?} into a single commit.");
    Ok(())
}

fn edit(driver: &GitDriver, name: Option<String>) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    session.require_tracked(&name)?;
    driver.checkout(&name)?;
    Ok(())
}

fn rename(driver: &GitDriver, name: Option<String>, new_name: String) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    let branch = session.require_tracked(&name)?;
    if stack_store::get_branch(&session.store, &new_name)?.is_some() {
        return Err(Error::AlreadyExists(new_name));
    }

    let graph = BranchGraph::load(&session.store)?;
    let children: Vec<TrackedBranch> = graph.list_above(&name).into_iter().cloned().collect();

    driver.rename_branch(&BranchName::new(name.clone()), &BranchName::new(new_name.clone()))?;

    let mut renamed = branch;
    renamed.name = new_name.clone();
    stack_store::upsert_branch(&session.store, renamed)?;
    stack_store::delete_branch(&session.store, &name)?;

    for child in children {
        let mut updated = child;
        updated.base = Some(new_name.clone());
        stack_store::upsert_branch(&session.store, updated)?;
    }
    println!("Renamed {name:?} to {new_name:?}.");
    Ok(())
}

fn restack(driver: &GitDriver, name: Option<String>) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    let (updated, outcome) =
        stack_restack::restack_by_name(driver, &session.store, &session.trunk, &name)?;
    match outcome {
        stack_restack::RestackOutcome::AlreadyUpToDate => {
            println!("{:?} is already up to date.", updated.name);
        }
        stack_restack::RestackOutcome::Restacked => {
            println!("Restacked {:?}.", updated.name);
        }
    }
    Ok(())
}

fn onto(driver: &GitDriver, name: Option<String>, new_base: Option<String>) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    if let Some(new_base) = &new_base {
        session.require_tracked(new_base)?;
    }
    let (updated, _outcome) = stack_restack::branch_onto(
        driver,
        &session.store,
        &session.trunk,
        &name,
        new_base.as_deref(),
    )?;
    println!(
        "Moved {:?} onto {}.",
        updated.name,
        updated.base.as_deref().unwrap_or(&session.trunk)
    );
    Ok(())
}

fn submit(
    driver: &GitDriver,
    name: Option<String>,
    submit_options: stack_opts::SubmitOptions,
) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = session.resolve_name(name)?;
    let branch = session.require_tracked(&name)?;

    let forced = submit_options.forge_kind;
    let (repo, forge_kind) = context::open_forge(driver, &session.remote, forced)?;

    let publish_mode = if submit_options.no_publish {
        PublishMode::Skip
    } else if submit_options.update_only {
        PublishMode::UpdateOnly
    } else {
        PublishMode::Create
    };
    let engine_options = EngineSubmitOptions {
        title: submit_options.title.as_deref(),
        body: submit_options.body.as_deref(),
        base_override: None,
        publish_mode,
        nav_comment: !submit_options.no_nav_comment,
    };

    let updated = stack_submit::submit_branch(
        driver,
        &session.store,
        repo.as_ref(),
        forge_kind,
        &session.remote,
        &session.trunk,
        &branch,
        &engine_options,
    )?;
    match &updated.change {
        Some(change) => println!("Submitted {name:?} as {:?}.", change.change_id),
        None => println!("Pushed {name:?}."),
    }
    Ok(())
}
