//! `GitDriver`: a typed wrapper over the `git` command-line interface.
//!
//! This crate deliberately does not link `git2` or any other Git plumbing
//! library. Every operation below is implemented by shelling out to the
//! `git` binary located at construction time, matching the invocation style
//! of `git-branchless`'s own `GitRunInfo`, but with a much narrower surface
//! tailored to stacked-branch bookkeeping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use itertools::Itertools;
use tracing::instrument;

use crate::oid::{NonZeroOid, OidError};
use crate::reference::{BranchName, ReferenceName};
use crate::run::{GitCommandOutput, GitRunInfo, GitRunOpts, SpawnError};

/// Errors produced by `GitDriver` operations. One variant per distinct
/// failure mode a caller needs to branch on; everything else collapses into
/// `CommandFailed`, carrying the offending argv and stderr for diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying `git` process could not be spawned or waited on.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// A Git invocation exited non-zero.
    #[error("`git {args}` failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        args: String,
        exit_code: i32,
        stderr: String,
    },

    /// Output from Git could not be parsed as a valid object id.
    #[error(transparent)]
    Oid(#[from] OidError),

    /// Output from Git was not valid UTF-8.
    #[error("output of `git {args}` was not valid UTF-8")]
    DecodeUtf8 { args: String },

    /// `HEAD` does not point at a branch (a detached checkout).
    #[error("HEAD is not on a branch (detached at {oid})")]
    DetachedHead { oid: NonZeroOid },

    /// A ref update's compare-and-swap precondition did not hold.
    #[error("ref {name} was expected to be at {expected:?} but was at {actual:?}")]
    RefConcurrentlyModified {
        name: ReferenceName,
        expected: Option<NonZeroOid>,
        actual: Option<NonZeroOid>,
    },

    /// A rebase stopped partway through due to merge conflicts.
    #[error("rebase stopped due to conflicts in: {}", .conflicted_paths.join(", "))]
    RebaseInterrupted {
        /// Paths with unresolved merge conflicts, from `git status --porcelain=v2`.
        conflicted_paths: Vec<String>,
        /// Stderr of the failing `git rebase` invocation.
        stderr: String,
    },

    /// No rebase or cherry-pick is currently in progress, but one was expected.
    #[error("no rebase is currently in progress")]
    NoRebaseInProgress,
}

type Result<T> = std::result::Result<T, Error>;

fn args_string<S: AsRef<str>>(args: &[S]) -> String {
    args.iter().map(AsRef::as_ref).join(" ")
}

fn check_output(args: &[&str], output: GitCommandOutput) -> Result<GitCommandOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(Error::CommandFailed {
            args: args_string(args),
            exit_code: output.exit_code,
            stderr: output.stderr_string(),
        })
    }
}

/// Where a rebase is currently paused, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseState {
    /// No rebase or cherry-pick is in progress.
    None,
    /// A rebase (`.git/rebase-merge` or `.git/rebase-apply`) is paused.
    InProgress,
}

/// Options controlling a `rebase` invocation.
#[derive(Debug, Clone, Default)]
pub struct RebaseOptions {
    /// Rebase onto this commit/ref instead of the upstream branch.
    pub onto: Option<String>,
    /// Stash uncommitted changes before the rebase, restoring them after.
    pub autostash: bool,
    /// Run non-interactively but preserve the rebase's internal todo-list
    /// machinery (`--interactive` with an automatic editor), needed so a
    /// rebase can be resumed with `rebase --continue` after a conflict.
    pub interactive: bool,
    /// Suppress progress output.
    pub quiet: bool,
}

/// Options controlling a `cherry-pick` invocation.
#[derive(Debug, Clone, Default)]
pub struct CherryPickOptions {
    /// Allow creating an empty commit if the patch is already applied.
    pub allow_empty: bool,
    /// Open an editor to edit the commit message.
    pub edit: bool,
}

/// A local branch together with its worktree, if checked out anywhere.
#[derive(Debug, Clone)]
pub struct LocalBranch {
    pub name: BranchName,
    pub target: NonZeroOid,
    pub worktree_path: Option<PathBuf>,
}

/// A single commit's identity and message, as produced by `git log`.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub oid: NonZeroOid,
    pub summary: String,
}

/// A typed handle onto a single Git repository, driven entirely through
/// `git` subprocess calls.
#[derive(Debug, Clone)]
pub struct GitDriver {
    run_info: GitRunInfo,
    repo_root: PathBuf,
}

impl GitDriver {
    /// Open the repository containing `path` by asking Git to resolve its
    /// top-level working directory.
    #[instrument]
    pub fn open(path: &Path) -> Result<Self> {
        let run_info = GitRunInfo {
            working_directory: path.to_owned(),
            ..GitRunInfo::default()
        };
        let output = run_info.run_silent(&["rev-parse", "--show-toplevel"], GitRunOpts::default())?;
        let output = check_output(&["rev-parse", "--show-toplevel"], output)?;
        let repo_root = PathBuf::from(output.stdout_string());
        Ok(GitDriver {
            run_info: GitRunInfo {
                working_directory: repo_root.clone(),
                ..run_info
            },
            repo_root,
        })
    }

    /// The repository's top-level working directory.
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Access to the raw process runner, for callers (e.g. `stack-store`)
    /// that need plumbing commands this type doesn't expose directly.
    pub fn run_info(&self) -> &GitRunInfo {
        &self.run_info
    }

    fn silent(&self, args: &[&str]) -> Result<GitCommandOutput> {
        let output = self.run_info.run_silent(args, GitRunOpts::default())?;
        check_output(args, output)
    }

    fn silent_allow_failure(&self, args: &[&str]) -> Result<GitCommandOutput> {
        Ok(self.run_info.run_silent(args, GitRunOpts::default())?)
    }

    fn oid_from_output(&self, args: &[&str], output: &GitCommandOutput) -> Result<NonZeroOid> {
        let text = std::str::from_utf8(&output.stdout)
            .map_err(|_| Error::DecodeUtf8 {
                args: args_string(args),
            })?
            .trim();
        Ok(NonZeroOid::from_str(text)?)
    }

    /// Resolve a revision expression (branch, tag, `HEAD`, etc.) to its commit id.
    #[instrument]
    pub fn resolve_ref(&self, revision: &str) -> Result<NonZeroOid> {
        let args = ["rev-parse", "--verify", "--quiet", revision];
        let output = self.silent(&args)?;
        self.oid_from_output(&args, &output)
    }

    /// The commit `HEAD` currently points at.
    pub fn head_oid(&self) -> Result<NonZeroOid> {
        self.resolve_ref("HEAD")
    }

    /// The branch `HEAD` currently points at. Errors if `HEAD` is detached.
    #[instrument]
    pub fn current_branch(&self) -> Result<BranchName> {
        let args = ["symbolic-ref", "--quiet", "--short", "HEAD"];
        let output = self.silent_allow_failure(&args)?;
        if !output.success() {
            let oid = self.head_oid()?;
            return Err(Error::DetachedHead { oid });
        }
        Ok(BranchName::new(output.stdout_string()))
    }

    /// All local branches, together with the worktree each is checked out
    /// in (if any).
    #[instrument]
    pub fn list_local_branches(&self) -> Result<Vec<LocalBranch>> {
        let args = [
            "for-each-ref",
            "--format=%(refname:short) %(objectname)",
            "refs/heads/",
        ];
        let output = self.silent(&args)?;

        let worktrees = self.list_worktree_branches()?;

        let mut branches = Vec::new();
        for line in output.stdout_string().lines() {
            let (name, oid) = line
                .split_once(' ')
                .ok_or_else(|| Error::DecodeUtf8 {
                    args: args_string(&args),
                })?;
            let target = NonZeroOid::from_str(oid)?;
            let name = BranchName::new(name);
            let worktree_path = worktrees.get(name.as_str()).cloned();
            branches.push(LocalBranch {
                name,
                target,
                worktree_path,
            });
        }
        Ok(branches)
    }

    fn list_worktree_branches(&self) -> Result<HashMap<String, PathBuf>> {
        let args = ["worktree", "list", "--porcelain"];
        let output = self.silent(&args)?;

        let mut result = HashMap::new();
        let mut current_path: Option<PathBuf> = None;
        for line in output.stdout_string().lines() {
            if let Some(path) = line.strip_prefix("worktree ") {
                current_path = Some(PathBuf::from(path));
            } else if let Some(branch_ref) = line.strip_prefix("branch refs/heads/") {
                if let Some(path) = current_path.clone() {
                    result.insert(branch_ref.to_owned(), path);
                }
            }
        }
        Ok(result)
    }

    /// List commits in `base..tip`, nearest first. If `first_parent` is set,
    /// follow only the first parent at each merge.
    #[instrument]
    pub fn list_commits(
        &self,
        base: &str,
        tip: &str,
        first_parent: bool,
    ) -> Result<Vec<CommitInfo>> {
        let range = format!("{base}..{tip}");
        let mut args = vec!["log", "--format=%H %s"];
        if first_parent {
            args.push("--first-parent");
        }
        args.push(&range);
        let output = self.silent(&args)?;

        let mut commits = Vec::new();
        for line in output.stdout_string().lines() {
            let (oid, summary) = line.split_once(' ').unwrap_or((line, ""));
            commits.push(CommitInfo {
                oid: NonZeroOid::from_str(oid)?,
                summary: summary.to_owned(),
            });
        }
        Ok(commits)
    }

    /// The concatenated commit messages (subject + body) in `base..tip`.
    #[instrument]
    pub fn commit_message_range(&self, base: &str, tip: &str) -> Result<String> {
        let range = format!("{base}..{tip}");
        let args = ["log", "--format=%B", &range];
        let output = self.silent(&args)?;
        Ok(output.stdout_string())
    }

    /// Whether `ancestor` is an ancestor of (or equal to) `descendant`.
    #[instrument]
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let args = ["merge-base", "--is-ancestor", ancestor, descendant];
        let output = self.run_info.run_silent(&args, GitRunOpts::default())?;
        match output.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            _ => Err(Error::CommandFailed {
                args: args_string(&args),
                exit_code: output.exit_code,
                stderr: output.stderr_string(),
            }),
        }
    }

    /// The number of commits in `base..tip`.
    #[instrument]
    pub fn commit_count(&self, base: &str, tip: &str) -> Result<usize> {
        let range = format!("{base}..{tip}");
        let args = ["rev-list", "--count", &range];
        let output = self.silent(&args)?;
        output
            .stdout_string()
            .parse()
            .map_err(|_| Error::DecodeUtf8 {
                args: args_string(&args),
            })
    }

    /// The best common ancestor of `a` and `b`.
    #[instrument]
    pub fn merge_base(&self, a: &str, b: &str) -> Result<NonZeroOid> {
        let args = ["merge-base", a, b];
        let output = self.silent(&args)?;
        self.oid_from_output(&args, &output)
    }

    /// The fork point of `branch` against `upstream`: the commit `branch`
    /// diverged from, accounting for history `upstream` has since discarded
    /// via rebase (uses the reflog of `upstream`, falling back to a plain
    /// merge-base when no reflog entry applies).
    #[instrument]
    pub fn fork_point(&self, branch: &str, upstream: &str) -> Result<NonZeroOid> {
        let args = ["merge-base", "--fork-point", upstream, branch];
        let output = self.run_info.run_silent(&args, GitRunOpts::default())?;
        if output.success() && !output.stdout.is_empty() {
            return self.oid_from_output(&args, &output);
        }
        self.merge_base(branch, upstream)
    }

    /// Peel `revision` to the commit it ultimately refers to.
    pub fn peel(&self, revision: &str) -> Result<NonZeroOid> {
        self.resolve_ref(&format!("{revision}^{{commit}}"))
    }

    /// Create a new local branch `name` pointing at `target`.
    #[instrument]
    pub fn create_branch(&self, name: &BranchName, target: NonZeroOid) -> Result<()> {
        self.silent(&["branch", name.as_str(), target.as_str()])?;
        Ok(())
    }

    /// Delete the local branch `name`, regardless of whether it's merged.
    #[instrument]
    pub fn delete_branch(&self, name: &BranchName) -> Result<()> {
        self.silent(&["branch", "-D", name.as_str()])?;
        Ok(())
    }

    /// Rename the local branch `from` to `to`.
    #[instrument]
    pub fn rename_branch(&self, from: &BranchName, to: &BranchName) -> Result<()> {
        self.silent(&["branch", "-m", from.as_str(), to.as_str()])?;
        Ok(())
    }

    /// Atomically update `reference` to `new_target`, failing if its current
    /// value does not match `expected` (compare-and-swap). `expected: None`
    /// asserts the ref does not currently exist.
    #[instrument]
    pub fn set_ref(
        &self,
        reference: &ReferenceName,
        new_target: NonZeroOid,
        expected: Option<NonZeroOid>,
    ) -> Result<()> {
        let old_value = match expected {
            Some(oid) => oid.to_string(),
            None => "0".repeat(40),
        };
        let args = [
            "update-ref",
            reference.as_str(),
            new_target.as_str(),
            &old_value,
        ];
        let output = self.run_info.run_silent(&args, GitRunOpts::default())?;
        if output.success() {
            return Ok(());
        }
        let actual = self.resolve_ref(reference.as_str()).ok();
        Err(Error::RefConcurrentlyModified {
            name: reference.clone(),
            expected,
            actual,
        })
    }

    /// Check out `revision`, detaching `HEAD` if it is not a branch name.
    #[instrument]
    pub fn checkout(&self, revision: &str) -> Result<()> {
        self.silent(&["checkout", "--quiet", revision])?;
        Ok(())
    }

    /// Move the current branch's tip to `target`, updating the working tree
    /// and index (`git reset --hard`).
    #[instrument]
    pub fn reset_hard(&self, target: NonZeroOid) -> Result<()> {
        self.silent(&["reset", "--hard", target.as_str()])?;
        Ok(())
    }

    /// Move the current branch's tip to `target`, leaving the index and
    /// working tree untouched (`git reset --soft`), so the commits between
    /// the old and new tip become uncommitted changes staged for a new
    /// commit.
    #[instrument]
    pub fn reset_soft(&self, target: NonZeroOid) -> Result<()> {
        self.silent(&["reset", "--soft", target.as_str()])?;
        Ok(())
    }

    /// Record a new commit on the current branch from whatever is staged,
    /// using `message` verbatim as the commit message.
    #[instrument(skip(message))]
    pub fn commit(&self, message: &str) -> Result<NonZeroOid> {
        self.silent(&["commit", "--quiet", "--message", message])?;
        self.head_oid()
    }

    /// Amend `HEAD`, optionally replacing its message; otherwise keeps the
    /// existing message and only updates the tree.
    #[instrument(skip(message))]
    pub fn amend(&self, message: Option<&str>) -> Result<NonZeroOid> {
        let mut args = vec!["commit", "--quiet", "--amend"];
        match message {
            Some(message) => {
                args.push("--message");
                args.push(message);
            }
            None => args.push("--no-edit"),
        }
        self.silent(&args)?;
        self.head_oid()
    }

    /// Rebase the branch currently checked out onto `upstream`, optionally
    /// replaying commits since `onto` rather than `upstream` itself.
    ///
    /// On conflict, returns `Error::RebaseInterrupted` with the paths that
    /// need resolving; the rebase is left paused on disk for
    /// `rebase_continue`/`rebase_abort`.
    #[instrument]
    pub fn rebase(&self, upstream: &str, options: &RebaseOptions) -> Result<()> {
        let mut args = vec!["rebase".to_owned()];
        if options.quiet {
            args.push("--quiet".to_owned());
        }
        if options.autostash {
            args.push("--autostash".to_owned());
        }
        if options.interactive {
            args.push("--committer-date-is-author-date".to_owned());
        }
        if let Some(onto) = &options.onto {
            args.push("--onto".to_owned());
            args.push(onto.clone());
        }
        args.push(upstream.to_owned());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run_info.run_silent(&arg_refs, GitRunOpts::default())?;
        if output.success() {
            return Ok(());
        }
        if self.rebase_state()? == RebaseState::InProgress {
            let conflicted_paths = self.conflicted_paths()?;
            return Err(Error::RebaseInterrupted {
                conflicted_paths,
                stderr: output.stderr_string(),
            });
        }
        Err(Error::CommandFailed {
            args: args_string(&arg_refs),
            exit_code: output.exit_code,
            stderr: output.stderr_string(),
        })
    }

    /// Resume a rebase paused by conflicts, after the caller has staged
    /// resolutions.
    #[instrument]
    pub fn rebase_continue(&self) -> Result<()> {
        if self.rebase_state()? == RebaseState::None {
            return Err(Error::NoRebaseInProgress);
        }
        let args = ["rebase", "--continue"];
        let output = self.run_info.run_silent(&args, GitRunOpts::default())?;
        if output.success() {
            return Ok(());
        }
        if self.rebase_state()? == RebaseState::InProgress {
            let conflicted_paths = self.conflicted_paths()?;
            return Err(Error::RebaseInterrupted {
                conflicted_paths,
                stderr: output.stderr_string(),
            });
        }
        Err(Error::CommandFailed {
            args: args_string(&args),
            exit_code: output.exit_code,
            stderr: output.stderr_string(),
        })
    }

    /// Abandon a paused rebase, restoring the branch to its pre-rebase state.
    #[instrument]
    pub fn rebase_abort(&self) -> Result<()> {
        if self.rebase_state()? == RebaseState::None {
            return Err(Error::NoRebaseInProgress);
        }
        self.silent(&["rebase", "--abort"])?;
        Ok(())
    }

    /// Whether a rebase is currently paused in this repository.
    #[instrument]
    pub fn rebase_state(&self) -> Result<RebaseState> {
        let rebase_merge = self.repo_root.join(".git").join("rebase-merge");
        let rebase_apply = self.repo_root.join(".git").join("rebase-apply");
        if rebase_merge.exists() || rebase_apply.exists() {
            Ok(RebaseState::InProgress)
        } else {
            Ok(RebaseState::None)
        }
    }

    fn conflicted_paths(&self) -> Result<Vec<String>> {
        let args = ["status", "--porcelain=v2"];
        let output = self.silent(&args)?;
        let mut paths = Vec::new();
        for line in output.stdout_string().lines() {
            // Unmerged entries use record type `u`; see git-status(1).
            if let Some(rest) = line.strip_prefix("u ") {
                if let Some(path) = rest.split_whitespace().last() {
                    paths.push(path.to_owned());
                }
            }
        }
        Ok(paths)
    }

    /// The URL configured for `remote`.
    #[instrument]
    pub fn remote_url(&self, remote: &str) -> Result<String> {
        let args = ["remote", "get-url", remote];
        let output = self.silent(&args)?;
        Ok(output.stdout_string())
    }

    /// Fetch `refspec` (or the remote's default refspecs if `None`) from `remote`.
    #[instrument]
    pub fn fetch(&self, remote: &str, refspec: Option<&str>) -> Result<()> {
        let mut args = vec!["fetch", "--quiet", remote];
        if let Some(refspec) = refspec {
            args.push(refspec);
        }
        self.silent(&args)?;
        Ok(())
    }

    /// Pull (fetch + fast-forward merge) the current branch's upstream.
    #[instrument]
    pub fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.silent(&["pull", "--quiet", "--ff-only", remote, branch])?;
        Ok(())
    }

    /// Push `branch` to `remote`, optionally force-pushing with a
    /// compare-and-swap lease against `expected_remote_oid`.
    #[instrument]
    pub fn push(
        &self,
        remote: &str,
        branch: &BranchName,
        expected_remote_oid: Option<NonZeroOid>,
    ) -> Result<()> {
        let refspec = format!("{branch}:refs/heads/{branch}");
        let mut args = vec!["push".to_owned(), remote.to_owned()];
        match expected_remote_oid {
            Some(oid) => args.push(format!("--force-with-lease={branch}:{oid}")),
            None => args.push("--force-with-lease".to_owned()),
        }
        args.push(refspec);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.silent(&arg_refs)?;
        Ok(())
    }

    /// Save the working tree and index to the stash, returning the stash
    /// commit's id, or `None` if there was nothing to stash.
    #[instrument]
    pub fn stash_create(&self) -> Result<Option<NonZeroOid>> {
        let args = ["stash", "create"];
        let output = self.silent(&args)?;
        let text = output.stdout_string();
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(NonZeroOid::from_str(&text)?))
    }

    /// Record a stash entry in the stash reflog (as `git stash store` does),
    /// without touching the working tree.
    #[instrument]
    pub fn stash_store(&self, stash: NonZeroOid, message: &str) -> Result<()> {
        self.silent(&["stash", "store", "--message", message, stash.as_str()])?;
        Ok(())
    }

    /// Apply a previously created stash to the working tree.
    #[instrument]
    pub fn stash_apply(&self, stash: NonZeroOid) -> Result<()> {
        self.silent(&["stash", "apply", stash.as_str()])?;
        Ok(())
    }

    /// Cherry-pick `commit` onto the current `HEAD`.
    #[instrument]
    pub fn cherry_pick(&self, commit: NonZeroOid, options: &CherryPickOptions) -> Result<()> {
        let mut args = vec!["cherry-pick".to_owned()];
        if options.allow_empty {
            args.push("--allow-empty".to_owned());
        }
        if options.edit {
            args.push("--edit".to_owned());
        } else {
            args.push("--no-edit".to_owned());
        }
        args.push(commit.to_string());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.silent(&arg_refs)?;
        Ok(())
    }

    /// The value of `git var GIT_AUTHOR_IDENT`-style identity variables,
    /// used when constructing synthetic commits for `stack-store`.
    #[instrument]
    pub fn var(&self, name: &str) -> Result<String> {
        let args = ["var", name];
        let output = self.silent(&args)?;
        Ok(output.stdout_string())
    }

    /// Hash `content` as a `blob` object, writing it to the object database.
    #[instrument(skip(content))]
    pub fn hash_object(&self, content: &[u8]) -> Result<NonZeroOid> {
        let args = ["hash-object", "-w", "--stdin"];
        let output = self.run_info.run_silent(
            &args,
            GitRunOpts {
                stdin: Some(content.to_vec()),
            },
        )?;
        let output = check_output(&args, output)?;
        self.oid_from_output(&args, &output)
    }

    /// Build a tree object from `mktree`-format input (`<mode> <type> <oid>\t<name>`
    /// lines).
    #[instrument(skip(entries))]
    pub fn mktree(&self, entries: &str) -> Result<NonZeroOid> {
        let args = ["mktree"];
        let output = self.run_info.run_silent(
            &args,
            GitRunOpts {
                stdin: Some(entries.as_bytes().to_vec()),
            },
        )?;
        let output = check_output(&args, output)?;
        self.oid_from_output(&args, &output)
    }

    /// Create a commit object with the given tree, parents, and message,
    /// without touching the index or `HEAD`.
    #[instrument]
    pub fn commit_tree(
        &self,
        tree: NonZeroOid,
        parents: &[NonZeroOid],
        message: &str,
    ) -> Result<NonZeroOid> {
        let mut args = vec!["commit-tree".to_owned(), tree.to_string()];
        for parent in parents {
            args.push("-p".to_owned());
            args.push(parent.to_string());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run_info.run_silent(
            &arg_refs,
            GitRunOpts {
                stdin: Some(message.as_bytes().to_vec()),
            },
        )?;
        let output = check_output(&arg_refs, output)?;
        self.oid_from_output(&arg_refs, &output)
    }

    /// Like [`commit_tree`](Self::commit_tree), but stamped with an explicit
    /// synthetic identity and a fixed zero timestamp rather than the user's
    /// own `user.name`/`user.email` and the current time. Used for metadata
    /// commits on `refs/spice/data`, which should be reproducible and
    /// shouldn't attribute bookkeeping to the user.
    #[instrument]
    pub fn commit_tree_as(
        &self,
        tree: NonZeroOid,
        parents: &[NonZeroOid],
        message: &str,
        author_name: &str,
        author_email: &str,
    ) -> Result<NonZeroOid> {
        let ident = format!("{author_name} <{author_email}>");
        let mut extra_env = HashMap::new();
        extra_env.insert("GIT_AUTHOR_NAME".into(), author_name.into());
        extra_env.insert("GIT_AUTHOR_EMAIL".into(), author_email.into());
        extra_env.insert("GIT_AUTHOR_DATE".into(), "0 +0000".into());
        extra_env.insert("GIT_COMMITTER_NAME".into(), author_name.into());
        extra_env.insert("GIT_COMMITTER_EMAIL".into(), author_email.into());
        extra_env.insert("GIT_COMMITTER_DATE".into(), "0 +0000".into());
        let run_info = self.run_info.with_extra_env(extra_env);

        let mut args = vec!["commit-tree".to_owned(), tree.to_string()];
        for parent in parents {
            args.push("-p".to_owned());
            args.push(parent.to_string());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = run_info.run_silent(
            &arg_refs,
            GitRunOpts {
                stdin: Some(message.as_bytes().to_vec()),
            },
        )?;
        let output = check_output(&arg_refs, output)?;
        tracing::trace!(%ident, "committed metadata snapshot");
        self.oid_from_output(&arg_refs, &output)
    }
}
