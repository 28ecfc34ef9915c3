//! Publishing tracked branches to a remote and to a forge, and keeping the
//! per-change navigation comment in sync across a whole submitted stack.

use rayon::prelude::*;
use stack_forge::{ChangeDraft, RemoteRepo};
use stack_git::{BranchName, GitDriver};
use stack_graph::{BranchGraph, RestackStatus};
use stack_store::{ChangeMetadata, ForgeKind, MetadataStore, TrackedBranch};
use tracing::instrument;

use crate::navigation;

/// Errors from submitting branches.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A Git operation failed.
    #[error(transparent)]
    Git(#[from] stack_git::Error),

    /// Reading or writing tracked-branch metadata failed.
    #[error(transparent)]
    Store(#[from] stack_store::store::Error),

    /// A branch-tracking invariant was violated.
    #[error(transparent)]
    Branches(#[from] stack_store::branches::Error),

    /// Loading the branch graph failed.
    #[error(transparent)]
    Graph(#[from] stack_graph::Error),

    /// The forge adapter rejected an operation.
    #[error(transparent)]
    Forge(#[from] stack_forge::Error),

    /// The worker pool used to fan out per-branch forge queries couldn't be
    /// started.
    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// The requested branch is not tracked.
    #[error("branch {0:?} is not tracked")]
    NotTracked(String),

    /// The branch needs a restack before it can be submitted, so its diff
    /// against its recorded base would be misleading.
    #[error("branch {0:?} needs a restack before it can be submitted")]
    NeedsRestack(String),
}

type Result<T> = std::result::Result<T, Error>;

/// Whether submission is allowed to create a brand-new change request for a
/// branch that doesn't have one yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Create a change request if the branch doesn't have one yet.
    #[default]
    Create,
    /// Push and update an existing change, but never create a new one.
    UpdateOnly,
    /// Push only; don't touch the forge at all.
    Skip,
}

/// Per-branch submit options.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions<'a> {
    /// Override the change's title instead of deriving it from the tracked
    /// branch's commit messages.
    pub title: Option<&'a str>,
    /// Override the change's body.
    pub body: Option<&'a str>,
    /// Review against this branch/trunk instead of the tracked base.
    pub base_override: Option<&'a str>,
    /// Whether a first-time submit may create a new change request.
    pub publish_mode: PublishMode,
    /// Whether navigation comments should be posted/updated after a batch
    /// submit.
    pub nav_comment: bool,
}

fn resolve_title_body(
    driver: &GitDriver,
    base_ref: &str,
    branch: &TrackedBranch,
    options: &SubmitOptions<'_>,
) -> Result<(String, String)> {
    if let Some(title) = options.title {
        return Ok((title.to_owned(), options.body.unwrap_or_default().to_owned()));
    }
    let message = driver.commit_message_range(base_ref, &branch.name)?;
    let mut lines = message.lines();
    let title = lines.next().unwrap_or(&branch.name).to_owned();
    let body = match options.body {
        Some(body) => body.to_owned(),
        None => lines.collect::<Vec<_>>().join("\n").trim().to_owned(),
    };
    Ok((title, body))
}

/// Push `branch` and, depending on `options.publish_mode`, create or update
/// its change request. Returns the branch's updated tracked state.
#[instrument(skip(driver, store, repo, branch, options))]
pub fn submit_branch(
    driver: &GitDriver,
    store: &MetadataStore,
    repo: &dyn RemoteRepo,
    forge_kind: ForgeKind,
    remote_name: &str,
    trunk_name: &str,
    branch: &TrackedBranch,
    options: &SubmitOptions<'_>,
) -> Result<TrackedBranch> {
    let graph = BranchGraph::load(store)?;
    if graph.check_restacked(driver, store, trunk_name, &branch.name)? == RestackStatus::NeedsRestack {
        return Err(Error::NeedsRestack(branch.name.clone()));
    }

    let upstream_branch = branch
        .upstream_branch
        .clone()
        .unwrap_or_else(|| branch.name.clone());
    let upstream = BranchName::new(upstream_branch.clone());
    let expected_remote_oid = driver
        .resolve_ref(&format!("{remote_name}/{upstream_branch}"))
        .ok();
    repo.push_branch(&upstream, expected_remote_oid)?;

    let base_name = options
        .base_override
        .map(str::to_owned)
        .or_else(|| branch.base.clone())
        .unwrap_or_else(|| trunk_name.to_owned());
    let (title, body) = resolve_title_body(driver, &base_name, branch, options)?;
    let draft = ChangeDraft {
        branch: &upstream_branch,
        base: &base_name,
        title: &title,
        body: &body,
    };

    let mut updated = branch.clone();
    updated.upstream_branch = Some(upstream_branch);

    match (&branch.change, options.publish_mode) {
        (Some(change), mode) if mode != PublishMode::Skip => {
            repo.update_change(&change.change_id, &draft)?;
        }
        (None, PublishMode::Create) => {
            let change_ref = repo.submit_change(&draft)?;
            updated.change = Some(ChangeMetadata {
                forge: forge_kind,
                change_id: change_ref.id,
                nav_comment_id: None,
            });
        }
        _ => {}
    }

    stack_store::upsert_branch(store, updated.clone())?;
    Ok(updated)
}

/// Submit every branch in `ordered` (base-first), then refresh the
/// navigation comment on every branch that ended up with a change.
#[instrument(skip(driver, store, repo, ordered, options))]
fn submit_ordered(
    driver: &GitDriver,
    store: &MetadataStore,
    repo: &dyn RemoteRepo,
    forge_kind: ForgeKind,
    remote_name: &str,
    trunk_name: &str,
    ordered: &[&TrackedBranch],
    options: &SubmitOptions<'_>,
) -> Result<Vec<TrackedBranch>> {
    let mut submitted = Vec::with_capacity(ordered.len());
    for branch in ordered {
        let updated = submit_branch(
            driver, store, repo, forge_kind, remote_name, trunk_name, branch, options,
        )?;
        submitted.push(updated);
    }
    if options.nav_comment {
        post_navigation_comments(store, repo, &submitted)?;
    }
    Ok(submitted)
}

/// Post or refresh each submitted branch's navigation comment. Every
/// branch's comment is independent of every other's, so the forge calls are
/// fanned out across a worker pool and only the resulting store writes are
/// applied back sequentially.
fn post_navigation_comments(
    store: &MetadataStore,
    repo: &dyn RemoteRepo,
    submitted: &[TrackedBranch],
) -> Result<()> {
    let graph = BranchGraph::load(store)?;
    let targets: Vec<(TrackedBranch, ChangeMetadata, String)> = submitted
        .iter()
        .filter_map(|branch| {
            let change = branch.change.clone()?;
            let forest = navigation::build_forest(&graph, &branch.name);
            let body = navigation::render_navigation_comment(&forest);
            Some((branch.clone(), change, body))
        })
        .collect();

    let pool = rayon::ThreadPoolBuilder::new().build()?;
    let results: Vec<(TrackedBranch, ChangeMetadata, Option<String>)> = pool.install(|| {
        targets
            .into_par_iter()
            .map(|(branch, change, body)| -> Result<_> {
                match &change.nav_comment_id {
                    Some(comment_id) => {
                        repo.update_change_comment(&change.change_id, comment_id, &body)?;
                        Ok((branch, change, None))
                    }
                    None => {
                        let comment_id = repo.post_change_comment(&change.change_id, &body)?;
                        let comment_id = (!comment_id.is_empty()).then_some(comment_id);
                        Ok((branch, change, comment_id))
                    }
                }
            })
            .collect::<Result<Vec<_>>>()
    })?;

    for (branch, change, comment_id) in results {
        if let Some(comment_id) = comment_id {
            let mut updated = branch;
            updated.change = Some(ChangeMetadata {
                nav_comment_id: Some(comment_id),
                ..change
            });
            stack_store::upsert_branch(store, updated)?;
        }
    }
    Ok(())
}

/// Submit `name`'s entire connected stack (base-first), skipping trunk.
#[instrument(skip(driver, store, repo, options))]
pub fn submit_stack(
    driver: &GitDriver,
    store: &MetadataStore,
    repo: &dyn RemoteRepo,
    forge_kind: ForgeKind,
    remote_name: &str,
    trunk_name: &str,
    name: &str,
    options: &SubmitOptions<'_>,
) -> Result<Vec<TrackedBranch>> {
    let graph = BranchGraph::load(store)?;
    let ordered = graph.list_stack(name)?;
    submit_ordered(
        driver, store, repo, forge_kind, remote_name, trunk_name, &ordered, options,
    )
}

/// Submit `name` and every branch transitively above it, base-first.
#[instrument(skip(driver, store, repo, options))]
pub fn submit_upstack(
    driver: &GitDriver,
    store: &MetadataStore,
    repo: &dyn RemoteRepo,
    forge_kind: ForgeKind,
    remote_name: &str,
    trunk_name: &str,
    name: &str,
    options: &SubmitOptions<'_>,
) -> Result<Vec<TrackedBranch>> {
    let graph = BranchGraph::load(store)?;
    let target = graph
        .lookup(name)
        .ok_or_else(|| Error::NotTracked(name.to_owned()))?;
    let mut ordered = vec![target];
    ordered.extend(graph.list_upstack(name));
    submit_ordered(
        driver, store, repo, forge_kind, remote_name, trunk_name, &ordered, options,
    )
}

/// Submit `name`'s downstack chain (trunk-ward first) and `name` itself.
#[instrument(skip(driver, store, repo, options))]
pub fn submit_downstack(
    driver: &GitDriver,
    store: &MetadataStore,
    repo: &dyn RemoteRepo,
    forge_kind: ForgeKind,
    remote_name: &str,
    trunk_name: &str,
    name: &str,
    options: &SubmitOptions<'_>,
) -> Result<Vec<TrackedBranch>> {
    let graph = BranchGraph::load(store)?;
    let target = graph
        .lookup(name)
        .ok_or_else(|| Error::NotTracked(name.to_owned()))?;
    let mut ordered = graph.list_downstack(name);
    ordered.reverse();
    ordered.push(target);
    submit_ordered(
        driver, store, repo, forge_kind, remote_name, trunk_name, &ordered, options,
    )
}
