use stack_forge::branch_forge::BranchForge;
use stack_forge::Forge;
use stack_git::testing::ScratchRepo;
use stack_git::NonZeroOid;
use stack_store::{ForgeKind, MetadataStore, TrackedBranch};
use stack_submit::{PublishMode, SubmitOptions};

fn track(store: &MetadataStore, base_hash: NonZeroOid, name: &str, base: Option<&str>) {
    stack_store::upsert_branch(
        store,
        TrackedBranch {
            name: name.to_owned(),
            base: base.map(str::to_owned),
            base_hash,
            upstream_branch: None,
            change: None,
            merged_downstack: Vec::new(),
        },
    )
    .unwrap();
}

fn add_origin(local: &ScratchRepo, remote: &ScratchRepo) -> eyre::Result<()> {
    local.driver.run_info().run(&[
        "remote",
        "add",
        "origin",
        &remote.driver.repo_root().display().to_string(),
    ])?;
    Ok(())
}

#[test]
fn submit_branch_pushes_and_creates_a_change() -> eyre::Result<()> {
    let local = ScratchRepo::new()?;
    let remote = ScratchRepo::new()?;
    add_origin(&local, &remote)?;

    let main_head = local.driver.head_oid()?;
    local.commit_on_new_branch("feat1", "add feature 1")?;

    let store = MetadataStore::new(&local.driver);
    track(&store, main_head, "feat1", None);

    let forge = BranchForge;
    let repo = forge.open_repository(&local.driver, "origin")?;
    let branch = stack_store::get_branch(&store, "feat1")?.unwrap();

    let updated = stack_submit::submit_branch(
        &local.driver,
        &store,
        repo.as_ref(),
        ForgeKind::Branch,
        "origin",
        "main",
        &branch,
        &SubmitOptions {
            publish_mode: PublishMode::Create,
            ..Default::default()
        },
    )?;

    assert!(updated.change.is_some());
    assert_eq!(updated.change.as_ref().unwrap().change_id, "feat1");
    assert_eq!(updated.upstream_branch.as_deref(), Some("feat1"));

    let remote_tip = remote.driver.resolve_ref("feat1")?;
    let local_tip = local.driver.resolve_ref("feat1")?;
    assert_eq!(remote_tip, local_tip);

    let stored = stack_store::get_branch(&store, "feat1")?.unwrap();
    assert_eq!(stored.change, updated.change);
    Ok(())
}

#[test]
fn submit_stack_publishes_every_branch_base_first() -> eyre::Result<()> {
    let local = ScratchRepo::new()?;
    let remote = ScratchRepo::new()?;
    add_origin(&local, &remote)?;

    let main_head = local.driver.head_oid()?;
    local.commit_on_new_branch("feat1", "one")?;
    let feat1_head = local.driver.head_oid()?;
    local.commit_on_new_branch("feat2", "two")?;

    let store = MetadataStore::new(&local.driver);
    track(&store, main_head, "feat1", None);
    track(&store, feat1_head, "feat2", Some("feat1"));

    let forge = BranchForge;
    let repo = forge.open_repository(&local.driver, "origin")?;

    let submitted = stack_submit::submit_stack(
        &local.driver,
        &store,
        repo.as_ref(),
        ForgeKind::Branch,
        "origin",
        "main",
        "feat2",
        &SubmitOptions {
            publish_mode: PublishMode::Create,
            nav_comment: true,
            ..Default::default()
        },
    )?;

    assert_eq!(submitted.len(), 2);
    assert_eq!(submitted[0].name, "feat1");
    assert_eq!(submitted[1].name, "feat2");
    assert!(submitted.iter().all(|b| b.change.is_some()));

    // BranchForge has no comment inbox, so no comment-id should be recorded.
    assert!(submitted
        .iter()
        .all(|b| b.change.as_ref().unwrap().nav_comment_id.is_none()));
    Ok(())
}

#[test]
fn submit_branch_rejects_a_stale_branch() -> eyre::Result<()> {
    let local = ScratchRepo::new()?;
    let remote = ScratchRepo::new()?;
    add_origin(&local, &remote)?;

    let main_head = local.driver.head_oid()?;
    local.commit_on_new_branch("feat1", "one")?;
    local.driver.checkout("main")?;
    local.commit_on_current_branch("advance trunk")?;

    let store = MetadataStore::new(&local.driver);
    track(&store, main_head, "feat1", None);

    let forge = BranchForge;
    let repo = forge.open_repository(&local.driver, "origin")?;
    let branch = stack_store::get_branch(&store, "feat1")?.unwrap();

    let result = stack_submit::submit_branch(
        &local.driver,
        &store,
        repo.as_ref(),
        ForgeKind::Branch,
        "origin",
        "main",
        &branch,
        &SubmitOptions::default(),
    );
    assert!(matches!(result, Err(stack_submit::SubmitError::NeedsRestack(name)) if name == "feat1"));
    Ok(())
}
