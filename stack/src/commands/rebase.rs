//! `rebase` subcommands: resuming or abandoning a restack that stopped on a
//! conflict.

use stack_git::GitDriver;
use stack_opts::RebaseCommand;

use crate::context::Session;
use crate::error::Error;

pub fn run(driver: &GitDriver, cmd: RebaseCommand) -> Result<(), Error> {
    match cmd {
        RebaseCommand::Continue => continue_rebase(driver),
        RebaseCommand::Abort => abort(driver),
    }
}

fn continue_rebase(driver: &GitDriver) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let completed = stack_restack::continue_rebase(driver, &session.store, &session.trunk)?;
    for branch in completed {
        println!("Restacked {:?}.", branch.name);
    }
    Ok(())
}

fn abort(driver: &GitDriver) -> Result<(), Error> {
    let session = Session::open(driver)?;
    stack_restack::abort(driver, &session.store)?;
    println!("Rebase aborted.");
    Ok(())
}
