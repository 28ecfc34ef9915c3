use stack_git::testing::ScratchRepo;
use stack_git::NonZeroOid;
use stack_store::{ChangeMetadata, ForgeKind, MetadataStore, TrackedBranch};

fn track(
    store: &MetadataStore,
    base_hash: NonZeroOid,
    name: &str,
    base: Option<&str>,
    change_id: Option<&str>,
) {
    stack_store::upsert_branch(
        store,
        TrackedBranch {
            name: name.to_owned(),
            base: base.map(str::to_owned),
            base_hash,
            upstream_branch: None,
            change: change_id.map(|id| ChangeMetadata {
                forge: ForgeKind::Branch,
                change_id: id.to_owned(),
                nav_comment_id: None,
            }),
            merged_downstack: Vec::new(),
        },
    )
    .unwrap();
}

#[test]
fn sync_deletes_merged_branches_and_propagates_history() -> eyre::Result<()> {
    let local = ScratchRepo::new()?;
    let remote = ScratchRepo::new()?;
    local.driver.run_info().run(&[
        "remote",
        "add",
        "origin",
        &remote.driver.repo_root().display().to_string(),
    ])?;

    let main_head = local.driver.head_oid()?;
    local.commit_on_new_branch("feat1", "one")?;
    let feat1_head = local.driver.head_oid()?;
    local.commit_on_new_branch("feat2", "two")?;

    local.driver.push("origin", &"feat1".into(), None)?;
    local.driver.fetch("origin", None)?;

    let store = MetadataStore::new(&local.driver);
    track(&store, main_head, "feat1", None, Some("feat1"));
    track(&store, feat1_head, "feat2", Some("feat1"), None);

    // Merge feat1 into main directly on the remote, simulating the review
    // being accepted there.
    let remote_run = remote.driver.run_info();
    remote_run.run_silent(&["checkout", "main"], Default::default())?;
    let output = remote_run.run_silent(
        &["merge", "--no-ff", "--quiet", "-m", "merge feat1", "feat1"],
        Default::default(),
    )?;
    assert!(output.success(), "{}", output.stderr_string());

    local.driver.checkout("main")?;
    let report = stack_submit::sync_repo(&local.driver, &store, None, "origin", "main", false)?;

    assert_eq!(report.deleted, vec!["feat1".to_owned()]);
    assert!(report.diverged.is_empty());

    assert!(stack_store::get_branch(&store, "feat1")?.is_none());
    assert!(local.driver.resolve_ref("feat1").is_err());
    assert!(local
        .driver
        .resolve_ref("refs/remotes/origin/feat1")
        .is_err());

    let feat2_after = stack_store::get_branch(&store, "feat2")?.unwrap();
    assert_eq!(feat2_after.base, None);
    assert_eq!(feat2_after.merged_downstack, vec!["feat1".to_owned()]);
    Ok(())
}

#[test]
fn sync_leaves_unmerged_branches_tracked() -> eyre::Result<()> {
    let local = ScratchRepo::new()?;
    let remote = ScratchRepo::new()?;
    local.driver.run_info().run(&[
        "remote",
        "add",
        "origin",
        &remote.driver.repo_root().display().to_string(),
    ])?;
    local.driver.fetch("origin", None)?;

    let main_head = local.driver.head_oid()?;
    local.commit_on_new_branch("feat1", "one")?;

    let store = MetadataStore::new(&local.driver);
    track(&store, main_head, "feat1", None, None);

    local.driver.checkout("main")?;
    let report = stack_submit::sync_repo(&local.driver, &store, None, "origin", "main", false)?;

    assert!(report.deleted.is_empty());
    assert!(stack_store::get_branch(&store, "feat1")?.is_some());
    Ok(())
}
