//! `stack`/`upstack`/`downstack` subcommands: operations over more than a
//! single branch at a time, scoped by a branch's place in its connected
//! stack.

use stack_git::GitDriver;
use stack_opts::ScopeCommand;
use stack_submit::PublishMode;

use crate::context::{self, Session};
use crate::error::Error;

/// Which set of branches a scoped command applies to, relative to the
/// currently checked-out one.
#[derive(Debug, Clone, Copy)]
pub enum Scope {
    /// The whole connected stack: downstack chain, the branch, and its
    /// upstack descendants.
    Stack,
    /// The branch and everything transitively above it.
    Upstack,
    /// The branch's downstack chain, trunk-ward first, then the branch
    /// itself.
    Downstack,
}

pub fn run(driver: &GitDriver, scope: Scope, cmd: ScopeCommand) -> Result<(), Error> {
    match cmd {
        ScopeCommand::Submit { submit_options } => submit(driver, scope, submit_options),
        ScopeCommand::Restack => restack(driver, scope),
        ScopeCommand::Edit => edit(driver, scope),
    }
}

fn current_branch(driver: &GitDriver) -> Result<String, Error> {
    driver
        .current_branch()
        .map(|b| b.to_string())
        .map_err(|_| Error::DetachedHead)
}

fn restack(driver: &GitDriver, scope: Scope) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = current_branch(driver)?;
    session.require_tracked(&name)?;

    let restacked = match scope {
        Scope::Stack => stack_restack::restack_stack(driver, &session.store, &session.trunk, &name)?,
        Scope::Upstack => {
            stack_restack::restack_upstack(driver, &session.store, &session.trunk, &name)?
        }
        Scope::Downstack => {
            let graph = stack_graph::BranchGraph::load(&session.store)?;
            let mut ordered: Vec<String> = graph
                .list_downstack(&name)
                .into_iter()
                .map(|b| b.name.clone())
                .collect();
            ordered.reverse();
            ordered.push(name.clone());
            let mut restacked = Vec::with_capacity(ordered.len());
            for branch_name in &ordered {
                let (updated, _) =
                    stack_restack::restack_by_name(driver, &session.store, &session.trunk, branch_name)?;
                restacked.push(updated);
            }
            restacked
        }
    };

    for branch in restacked {
        println!("Restacked {:?}.", branch.name);
    }
    Ok(())
}

fn submit(
    driver: &GitDriver,
    scope: Scope,
    submit_options: stack_opts::SubmitOptions,
) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = current_branch(driver)?;
    session.require_tracked(&name)?;

    let (repo, forge_kind) =
        context::open_forge(driver, &session.remote, submit_options.forge_kind)?;
    let publish_mode = if submit_options.no_publish {
        PublishMode::Skip
    } else if submit_options.update_only {
        PublishMode::UpdateOnly
    } else {
        PublishMode::Create
    };
    let engine_options = stack_submit::SubmitOptions {
        title: submit_options.title.as_deref(),
        body: submit_options.body.as_deref(),
        base_override: None,
        publish_mode,
        nav_comment: !submit_options.no_nav_comment,
    };

    let submitted = match scope {
        Scope::Stack => stack_submit::submit_stack(
            driver,
            &session.store,
            repo.as_ref(),
            forge_kind,
            &session.remote,
            &session.trunk,
            &name,
            &engine_options,
        )?,
        Scope::Upstack => stack_submit::submit_upstack(
            driver,
            &session.store,
            repo.as_ref(),
            forge_kind,
            &session.remote,
            &session.trunk,
            &name,
            &engine_options,
        )?,
        Scope::Downstack => stack_submit::submit_downstack(
            driver,
            &session.store,
            repo.as_ref(),
            forge_kind,
            &session.remote,
            &session.trunk,
            &name,
            &engine_options,
        )?,
    };

    for branch in submitted {
        match &branch.change {
            Some(change) => println!("Submitted {:?} as {:?}.", branch.name, change.change_id),
            None => println!("Pushed {:?}.", branch.name),
        }
    }
    Ok(())
}

fn edit(driver: &GitDriver, scope: Scope) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = current_branch(driver)?;
    session.require_tracked(&name)?;

    let graph = stack_graph::BranchGraph::load(&session.store)?;
    let target = match scope {
        Scope::Stack => graph.list_stack_linear(&name)?.last().map(|b| b.name.clone()),
        Scope::Upstack => graph.list_upstack(&name).last().map(|b| b.name.clone()),
        Scope::Downstack => Some(name.clone()),
    }
    .unwrap_or(name);

    driver.checkout(&target)?;
    Ok(())
}
