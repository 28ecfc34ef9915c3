//! Command handlers, one module per group in [`stack_opts::Command`].

pub mod branch;
pub mod commit;
pub mod nav;
pub mod rebase;
pub mod repo;
pub mod scope;

use stack_git::GitDriver;
use stack_opts::Command;

use crate::error::Error;

/// Run the parsed top-level command against an open repository.
pub fn dispatch(driver: &GitDriver, command: Command) -> Result<(), Error> {
    match command {
        Command::Repo(cmd) => repo::run(driver, cmd),
        Command::Branch(cmd) => branch::run(driver, cmd),
        Command::Commit(cmd) => commit::run(driver, cmd),
        Command::Stack(cmd) => scope::run(driver, scope::Scope::Stack, cmd),
        Command::Upstack(cmd) => scope::run(driver, scope::Scope::Upstack, cmd),
        Command::Downstack(cmd) => scope::run(driver, scope::Scope::Downstack, cmd),
        Command::Rebase(cmd) => rebase::run(driver, cmd),
        Command::Up { pick } => nav::up(driver, pick),
        Command::Down => nav::down(driver),
        Command::Top => nav::top(driver),
        Command::Bottom => nav::bottom(driver),
        Command::Trunk => nav::trunk(driver),
        Command::Log => nav::log(driver),
        Command::Info => nav::info(driver),
    }
}
