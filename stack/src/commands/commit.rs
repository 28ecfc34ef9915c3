//! `commit` subcommands: operating on the current branch's own commits.

use std::path::PathBuf;

use stack_git::GitDriver;
use stack_opts::CommitCommand;

use crate::context::Session;
use crate::error::Error;

pub fn run(driver: &GitDriver, cmd: CommitCommand) -> Result<(), Error> {
    match cmd {
        CommitCommand::Create { message } => create(driver, message),
        CommitCommand::Amend { message } => amend(driver, message),
        CommitCommand::Split {
            paths,
            message_first,
            message_second,
        } => split(driver, paths, message_first, message_second),
        CommitCommand::Fixup { target } => fixup(driver, target),
    }
}

fn require_on_tracked_branch(driver: &GitDriver) -> Result<Session<'_>, Error> {
    let session = Session::open(driver)?;
    let current = driver.current_branch().map_err(|_| Error::DetachedHead)?;
    session.require_tracked(current.as_str())?;
    Ok(session)
}

fn create(driver: &GitDriver, message: String) -> Result<(), Error> {
    require_on_tracked_branch(driver)?;
    driver.commit(&message)?;
    Ok(())
}

fn amend(driver: &GitDriver, message: Option<String>) -> Result<(), Error> {
    require_on_tracked_branch(driver)?;
    driver.amend(message.as_deref())?;
    Ok(())
}

fn run_checked(driver: &GitDriver, args: &[&str]) -> Result<(), Error> {
    let output = driver
        .run_info()
        .run_silent(args, Default::default())
        .map_err(stack_git::Error::from)?;
    if output.success() {
        Ok(())
    } else {
        Err(stack_git::Error::CommandFailed {
            args: args.join(" "),
            exit_code: output.exit_code,
            stderr: output.stderr_string(),
        }
        .into())
    }
}

/// Split the tip commit into two: `paths` go into the first commit, the
/// rest of the tip's changes go into the second.
fn split(
    driver: &GitDriver,
    paths: Vec<PathBuf>,
    message_first: String,
    message_second: String,
) -> Result<(), Error> {
    require_on_tracked_branch(driver)?;
    if paths.is_empty() {
        return Err(Error::Invalid(
            "commit split needs at least one path for the first commit".to_owned(),
        ));
    }

    let parent = driver.resolve_ref("HEAD^").map_err(|_| {
        Error::Invalid("the tip commit has no parent to split against".to_owned())
    })?;

    // Uncommit the tip, leaving its changes staged, then carve `paths` back
    // out into their own commit before committing everything else.
    driver.reset_soft(parent)?;
    run_checked(driver, &["reset", "--quiet"])?;

    let path_strings: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let mut add_args: Vec<&str> = vec!["add", "--"];
    add_args.extend(path_strings.iter().map(String::as_str));
    run_checked(driver, &add_args)?;
    driver.commit(&message_first)?;

    run_checked(driver, &["add", "--all"])?;
    driver.commit(&message_second)?;
    Ok(())
}

fn fixup(driver: &GitDriver, target: String) -> Result<(), Error> {
    require_on_tracked_branch(driver)?;
    let target_oid = driver.resolve_ref(&target)?;
    driver.commit(&format!("fixup! {target_oid}"))?;
    Ok(())
}
