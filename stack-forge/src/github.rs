//! A forge adapter for GitHub, implemented entirely by shelling out to the
//! `gh` CLI. This keeps the same "drive an external tool, don't embed a
//! client library" shape `stack-git` uses for Git itself, and means this
//! adapter automatically uses whatever GitHub host and credentials the
//! user already has `gh` configured with.

use std::collections::HashMap;
use std::process::Command;

use regex::Regex;
use serde::Deserialize;
use stack_git::{BranchName, GitDriver, NonZeroOid};
use stack_store::ForgeKind;

use crate::{ChangeDraft, ChangeRef, Error, Forge, RemoteRepo, Result};

fn github_remote_regex() -> Regex {
    Regex::new(r"github\.com[:/](?P<owner>[\w.-]+)/(?P<repo>[\w.-]+?)(\.git)?$")
        .expect("static regex is valid")
}

/// The [`Forge`] implementation for [`ForgeKind::Github`].
#[derive(Debug, Clone, Copy)]
pub struct GithubForge;

/// A ready-to-use static instance, since this adapter holds no state beyond
/// what's passed to `open_repository`.
pub static GITHUB_FORGE: GithubForge = GithubForge;

impl Forge for GithubForge {
    fn kind(&self) -> ForgeKind {
        ForgeKind::Github
    }

    fn match_remote_url(&self, remote_url: &str) -> bool {
        github_remote_regex().is_match(remote_url)
    }

    fn load_authentication_token(&self) -> Result<Option<String>> {
        let output = run_gh(&["auth", "token"])?;
        let token = output.trim();
        if token.is_empty() {
            Ok(None)
        } else {
            Ok(Some(token.to_owned()))
        }
    }

    fn open_repository(
        &self,
        driver: &GitDriver,
        remote_name: &str,
    ) -> Result<Box<dyn RemoteRepo>> {
        let remote_url = driver.remote_url(remote_name)?;
        let captures = github_remote_regex()
            .captures(&remote_url)
            .ok_or_else(|| Error::NoMatchingForge(remote_url.clone()))?;
        let owner = captures["owner"].to_owned();
        let repo = captures["repo"].to_owned();
        Ok(Box::new(GithubRepo {
            driver: driver.clone(),
            remote_name: remote_name.to_owned(),
            slug: format!("{owner}/{repo}"),
        }))
    }
}

struct GithubRepo {
    driver: GitDriver,
    remote_name: String,
    slug: String,
}

fn run_gh(args: &[&str]) -> Result<String> {
    let output = Command::new("gh").args(args).output().map_err(|source| Error::Cli {
        command: format!("gh {}", args.join(" ")),
        message: source.to_string(),
    })?;
    if !output.status.success() {
        return Err(Error::Cli {
            command: format!("gh {}", args.join(" ")),
            message: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Debug, Deserialize)]
struct PullRequestJson {
    number: u64,
    url: Option<String>,
    state: Option<String>,
}

impl GithubRepo {
    fn repo_flag(&self) -> [String; 2] {
        ["--repo".to_owned(), self.slug.clone()]
    }

    fn view(&self, number: &str) -> Result<PullRequestJson> {
        let mut args = vec![
            "pr".to_owned(),
            "view".to_owned(),
            number.to_owned(),
            "--json".to_owned(),
            "number,url,state".to_owned(),
        ];
        args.extend(self.repo_flag());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = run_gh(&arg_refs)?;
        serde_json::from_str(&stdout).map_err(|source| Error::MalformedOutput {
            command: format!("gh {}", arg_refs.join(" ")),
            source,
        })
    }
}

impl RemoteRepo for GithubRepo {
    fn push_branch(
        &self,
        branch: &BranchName,
        expected_remote_oid: Option<NonZeroOid>,
    ) -> Result<()> {
        Ok(self
            .driver
            .push(&self.remote_name, branch, expected_remote_oid)?)
    }

    fn submit_change(&self, draft: &ChangeDraft<'_>) -> Result<ChangeRef> {
        let mut args = vec![
            "pr".to_owned(),
            "create".to_owned(),
            "--head".to_owned(),
            draft.branch.to_owned(),
            "--base".to_owned(),
            draft.base.to_owned(),
            "--title".to_owned(),
            draft.title.to_owned(),
            "--body".to_owned(),
            draft.body.to_owned(),
        ];
        args.extend(self.repo_flag());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = run_gh(&arg_refs)?;
        let url = stdout.trim().to_owned();
        let number = url
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&url)
            .to_owned();
        Ok(ChangeRef {
            id: number,
            url: Some(url),
        })
    }

    fn update_change(&self, change_id: &str, draft: &ChangeDraft<'_>) -> Result<()> {
        let mut args = vec![
            "pr".to_owned(),
            "edit".to_owned(),
            change_id.to_owned(),
            "--base".to_owned(),
            draft.base.to_owned(),
            "--title".to_owned(),
            draft.title.to_owned(),
            "--body".to_owned(),
            draft.body.to_owned(),
        ];
        args.extend(self.repo_flag());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        run_gh(&arg_refs)?;
        Ok(())
    }

    fn changes_are_merged(&self, change_ids: &[String]) -> Result<HashMap<String, bool>> {
        let mut result = HashMap::new();
        for change_id in change_ids {
            let pr = self.view(change_id)?;
            let merged = pr.state.as_deref() == Some("MERGED");
            result.insert(change_id.clone(), merged);
        }
        Ok(result)
    }

    fn find_change_by_branch(&self, branch: &str) -> Result<Option<ChangeRef>> {
        let mut args = vec![
            "pr".to_owned(),
            "list".to_owned(),
            "--head".to_owned(),
            branch.to_owned(),
            "--json".to_owned(),
            "number,url,state".to_owned(),
            "--limit".to_owned(),
            "1".to_owned(),
        ];
        args.extend(self.repo_flag());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = run_gh(&arg_refs)?;
        let prs: Vec<PullRequestJson> =
            serde_json::from_str(&stdout).map_err(|source| Error::MalformedOutput {
                command: format!("gh {}", arg_refs.join(" ")),
                source,
            })?;
        Ok(prs.into_iter().next().map(|pr| ChangeRef {
            id: pr.number.to_string(),
            url: pr.url,
        }))
    }

    fn post_change_comment(&self, change_id: &str, body: &str) -> Result<String> {
        let mut args = vec![
            "pr".to_owned(),
            "comment".to_owned(),
            change_id.to_owned(),
            "--body".to_owned(),
            body.to_owned(),
        ];
        args.extend(self.repo_flag());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let stdout = run_gh(&arg_refs)?;
        Ok(stdout.trim().to_owned())
    }

    fn update_change_comment(&self, _change_id: &str, comment_id: &str, body: &str) -> Result<()> {
        let comment_number = comment_id
            .rsplit("issuecomment-")
            .next()
            .unwrap_or(comment_id);
        let endpoint = format!("repos/{}/issues/comments/{comment_number}", self.slug);
        let body_field = format!("body={body}");
        run_gh(&[
            "api",
            "--method",
            "PATCH",
            &endpoint,
            "-f",
            &body_field,
        ])?;
        Ok(())
    }
}
