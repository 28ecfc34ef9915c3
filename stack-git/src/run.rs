//! Low-level process invocation of the `git` executable.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};

use itertools::Itertools;
use tracing::instrument;

/// Path to the `git` executable on disk, plus the environment it should be
/// invoked with. Mirrors `git-branchless`'s `GitRunInfo`.
#[derive(Clone)]
pub struct GitRunInfo {
    /// The path to the Git executable.
    pub path_to_git: PathBuf,

    /// The working directory the Git executable should be run in.
    pub working_directory: PathBuf,

    /// Environment variables passed through to the Git process.
    pub env: HashMap<OsString, OsString>,
}

impl std::fmt::Debug for GitRunInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<GitRunInfo path_to_git={:?} working_directory={:?}>",
            self.path_to_git, self.working_directory
        )
    }
}

impl Default for GitRunInfo {
    fn default() -> Self {
        GitRunInfo {
            path_to_git: PathBuf::from("git"),
            working_directory: std::env::current_dir().unwrap_or_default(),
            env: std::env::vars_os().collect(),
        }
    }
}

/// Options controlling how a silent invocation behaves.
#[derive(Default)]
pub struct GitRunOpts {
    /// Bytes to write to the subprocess's stdin. If `None`, stdin is not piped.
    pub stdin: Option<Vec<u8>>,
}

/// The captured result of a silent Git invocation.
#[must_use]
pub struct GitCommandOutput {
    /// The process exit code.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl GitCommandOutput {
    /// Whether the process exited successfully.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Captured stdout, decoded lossily as UTF-8 with trailing whitespace trimmed.
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim_end().to_owned()
    }

    /// Captured stderr, decoded lossily as UTF-8.
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

impl std::fmt::Debug for GitCommandOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<GitCommandOutput exit_code={} stdout={:?} stderr={:?}>",
            self.exit_code,
            self.stdout_string(),
            self.stderr_string()
        )
    }
}

/// An error while spawning or waiting for the Git subprocess itself (not a
/// non-zero exit code, which callers inspect via `GitCommandOutput`).
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// The subprocess failed to spawn.
    #[error("could not spawn `git {args}`: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },
    /// Waiting on the subprocess failed.
    #[error("could not wait on `git {args}`: {source}")]
    Wait {
        args: String,
        #[source]
        source: std::io::Error,
    },
}

impl GitRunInfo {
    /// Clone this `GitRunInfo`, overlaying `extra` on top of its environment.
    /// Used to set a synthetic commit identity for a single invocation
    /// without disturbing the ambient environment.
    pub fn with_extra_env(&self, extra: HashMap<OsString, OsString>) -> Self {
        let mut env = self.env.clone();
        env.extend(extra);
        GitRunInfo {
            path_to_git: self.path_to_git.clone(),
            working_directory: self.working_directory.clone(),
            env,
        }
    }

    fn base_command(&self, args: &[&OsStr]) -> Command {
        let mut command = Command::new(&self.path_to_git);
        command.current_dir(&self.working_directory);
        command.args(args);
        command.env_clear();
        command.envs(self.env.iter());
        command
    }

    fn spawn_writer_thread<R: Read + Send + 'static, W: Write + Send + 'static>(
        stream: Option<R>,
        mut output: W,
    ) -> JoinHandle<()> {
        thread::spawn(move || {
            let stream = match stream {
                Some(stream) => stream,
                None => return,
            };
            let reader = BufReader::new(stream);
            for line in reader.lines().map_while(Result::ok) {
                let _ = writeln!(output, "{line}");
            }
        })
    }

    /// Run Git, streaming its stdout/stderr to the calling process's own
    /// stdout/stderr live. Suitable for user-facing mutating commands such as
    /// `rebase`, `push`, `pull`, `fetch`, where the user should see progress.
    #[instrument]
    pub fn run<S: AsRef<OsStr> + std::fmt::Debug>(
        &self,
        args: &[S],
    ) -> Result<i32, SpawnError> {
        let args_ref: Vec<&OsStr> = args.iter().map(AsRef::as_ref).collect();
        let args_string = args_ref.iter().map(|a| a.to_string_lossy()).join(" ");

        let mut command = self.base_command(&args_ref);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| SpawnError::Spawn {
            args: args_string.clone(),
            source,
        })?;
        let stdout_thread = Self::spawn_writer_thread(child.stdout.take(), std::io::stdout());
        let stderr_thread = Self::spawn_writer_thread(child.stderr.take(), std::io::stderr());
        let status = child.wait().map_err(|source| SpawnError::Wait {
            args: args_string,
            source,
        })?;
        let _ = stdout_thread.join();
        let _ = stderr_thread.join();
        Ok(status.code().unwrap_or(1))
    }

    /// Run Git, capturing its stdout/stderr rather than displaying them.
    /// Suitable for read-only or plumbing invocations (`rev-parse`,
    /// `for-each-ref`, `merge-base`, `hash-object`, ...).
    #[instrument(skip(opts))]
    pub fn run_silent<S: AsRef<OsStr> + std::fmt::Debug>(
        &self,
        args: &[S],
        opts: GitRunOpts,
    ) -> Result<GitCommandOutput, SpawnError> {
        let args_ref: Vec<&OsStr> = args.iter().map(AsRef::as_ref).collect();
        let args_string = args_ref.iter().map(|a| a.to_string_lossy()).join(" ");

        let mut command = self.base_command(&args_ref);
        if opts.stdin.is_some() {
            command.stdin(Stdio::piped());
        }
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|source| SpawnError::Spawn {
            args: args_string.clone(),
            source,
        })?;
        if let Some(stdin) = opts.stdin {
            if let Some(mut child_stdin) = child.stdin.take() {
                let _ = child_stdin.write_all(&stdin);
            }
        }
        let output = child
            .wait_with_output()
            .map_err(|source| SpawnError::Wait {
                args: args_string,
                source,
            })?;
        Ok(GitCommandOutput {
            exit_code: output.status.code().unwrap_or(1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_silent_captures_output() {
        let git_run_info = GitRunInfo {
            path_to_git: PathBuf::from(
                std::env::var("TEST_GIT").unwrap_or_else(|_| "git".to_string()),
            ),
            working_directory: std::env::temp_dir(),
            env: std::env::vars_os().collect(),
        };
        let output = git_run_info
            .run_silent(&["--version"], GitRunOpts::default())
            .unwrap();
        assert!(output.success());
        assert!(output.stdout_string().starts_with("git version"));
    }
}
