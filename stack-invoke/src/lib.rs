//! Shared bootstrap for every command: opening the repository, installing
//! logging and panic handling, and the re-entrant dispatch used to replay a
//! queued continuation once an interrupted rebase has been resolved.

#![warn(missing_docs)]

use std::error::Error;
use std::fmt::Display;

use clap::{CommandFactory, FromArgMatches, Parser};
use eyre::Context;
use stack_git::GitDriver;
use stack_opts::GlobalArgs;
use stack_store::Continuation;
use tracing::instrument;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// The process exit code a command finished with.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct ExitCode(pub i32);

impl ExitCode {
    /// Whether this code represents success.
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode(0))
    }
}

impl Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self(code) = self;
        write!(f, "exit code {code}")
    }
}

impl Error for ExitCode {}

/// A command either runs to completion and reports a user-facing exit code,
/// or fails with an infrastructure error that should be reported as a crash.
pub type EyreExitOr<T> = eyre::Result<Result<T, ExitCode>>;

/// Everything a command handler needs: the repository it's operating
/// against.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// The Git repository this invocation is operating on.
    pub driver: GitDriver,
}

#[instrument]
fn install_tracing() -> eyre::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
        .parse(std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| "stack=warn".to_owned()))?;
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .ok();
    Ok(())
}

/// Parse `T` from the process's own arguments, apply `-C`/`--working-directory`
/// before anything else touches the filesystem, open the repository rooted
/// at the (possibly new) current directory, and invoke `f`. Installs tracing
/// on the way in. Returns the process exit code.
#[instrument(skip(f))]
pub fn do_main_and_drop_locals<T: Parser>(
    f: impl FnOnce(CommandContext, T) -> EyreExitOr<()>,
) -> eyre::Result<i32> {
    install_tracing()?;

    let args: Vec<std::ffi::OsString> = std::env::args_os().collect();
    let global_command = GlobalArgs::command();
    let matches = global_command.ignore_errors(true).get_matches_from(&args);
    let GlobalArgs { working_directory } = GlobalArgs::from_arg_matches(&matches)
        .map_err(|err| eyre::eyre!("could not parse global arguments: {err}"))?;
    if let Some(working_directory) = working_directory {
        std::env::set_current_dir(&working_directory).wrap_err_with(|| {
            format!("could not set working directory to: {working_directory:?}")
        })?;
    }

    let command_args = T::parse_from(&args);
    let driver = GitDriver::open(&std::env::current_dir()?)?;
    let ctx = CommandContext { driver };
    let exit_code = match f(ctx, command_args)? {
        Ok(()) => 0,
        Err(ExitCode(code)) => code,
    };
    Ok(exit_code)
}

/// Entry point for `main`: installs the panic handler, runs the command,
/// and exits the process with its reported code.
pub fn invoke_main<T: Parser>(f: impl FnOnce(CommandContext, T) -> EyreExitOr<()>) -> ! {
    color_eyre::install().expect("could not install panic handler");
    let exit_code = do_main_and_drop_locals(f).expect("a fatal error occurred");
    std::process::exit(exit_code);
}

/// Re-invoke the top-level command dispatcher with a queued continuation's
/// stored argv, once the rebase it was waiting on has been resolved.
/// `dispatch` is the binary crate's own command router; this function just
/// supplies the re-entrant calling convention so `stack-invoke` doesn't need
/// to depend on every command module.
pub fn replay_continuation(
    ctx: CommandContext,
    continuation: &Continuation,
    dispatch: impl FnOnce(CommandContext, &[String]) -> EyreExitOr<()>,
) -> EyreExitOr<()> {
    dispatch(ctx, &continuation.command)
}
