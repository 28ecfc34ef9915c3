//! Test-only helpers for spinning up a scratch Git repository backed by a
//! real `git` binary. Mirrors `git-branchless-lib::testing`.

use std::path::PathBuf;

use tempfile::TempDir;

use crate::driver::GitDriver;
use crate::run::{GitRunInfo, GitRunOpts};

/// A disposable Git repository rooted in a temporary directory, plus the
/// [`GitDriver`] open on it. Dropping this removes the directory.
pub struct ScratchRepo {
    _dir: TempDir,
    pub driver: GitDriver,
}

fn path_to_git() -> PathBuf {
    PathBuf::from(std::env::var("TEST_GIT").unwrap_or_else(|_| "git".to_owned()))
}

impl ScratchRepo {
    /// Create a fresh repository with an initial empty commit on `main`,
    /// using a fixed synthetic identity so commit hashes are reproducible
    /// across test runs.
    pub fn new() -> eyre::Result<Self> {
        let dir = tempfile::tempdir()?;
        let run_info = GitRunInfo {
            path_to_git: path_to_git(),
            working_directory: dir.path().to_owned(),
            env: std::env::vars_os().collect(),
        };

        for args in [
            vec!["init", "--quiet", "--initial-branch=main"],
            vec!["config", "user.name", "Test User"],
            vec!["config", "user.email", "test@example.com"],
            vec!["commit", "--quiet", "--allow-empty", "--message=initial"],
        ] {
            let output = run_info.run_silent(&args, GitRunOpts::default())?;
            if !output.success() {
                eyre::bail!(
                    "scratch repo setup `git {}` failed: {}",
                    args.join(" "),
                    output.stderr_string()
                );
            }
        }

        let driver = GitDriver::open(dir.path())?;
        Ok(ScratchRepo { _dir: dir, driver })
    }

    /// Create a new branch at `HEAD` with one empty commit on top, named
    /// `name`. Returns the new commit's id.
    pub fn commit_on_new_branch(&self, name: &str, message: &str) -> eyre::Result<()> {
        let run_info = self.driver.run_info();
        run_info.run_silent(&["checkout", "-b", name], GitRunOpts::default())?;
        self.commit_on_current_branch(message)
    }

    /// Add one empty commit on top of whatever branch is currently checked out.
    pub fn commit_on_current_branch(&self, message: &str) -> eyre::Result<()> {
        let run_info = self.driver.run_info();
        let output = run_info.run_silent(
            &["commit", "--quiet", "--allow-empty", "--message", message],
            GitRunOpts::default(),
        )?;
        if !output.success() {
            eyre::bail!("commit failed: {}", output.stderr_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_repo_starts_on_main() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        assert_eq!(repo.driver.current_branch()?.as_str(), "main");
        Ok(())
    }

    #[test]
    fn commit_on_new_branch_advances_head() -> eyre::Result<()> {
        let repo = ScratchRepo::new()?;
        let before = repo.driver.head_oid()?;
        repo.commit_on_new_branch("feat1", "add feature 1")?;
        let after = repo.driver.head_oid()?;
        assert_ne!(before, after);
        assert_eq!(repo.driver.current_branch()?.as_str(), "feat1");
        Ok(())
    }
}
