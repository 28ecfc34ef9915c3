use stack_git::testing::ScratchRepo;
use stack_git::NonZeroOid;
use stack_restack::RestackOutcome;
use stack_store::{MetadataStore, TrackedBranch};

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

#[test]
fn restack_branch_is_a_no_op_when_up_to_date() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    let main_head = repo.driver.head_oid()?;
    repo.commit_on_new_branch("feat1", "one")?;

    let store = MetadataStore::new(&repo.driver);
    track(&store, main_head, "feat1", None);

    let branch = stack_store::get_branch(&store, "feat1")?.unwrap();
    let (_, outcome) = stack_restack::restack_branch(&repo.driver, &store, "main", &branch)?;
    assert_eq!(outcome, RestackOutcome::AlreadyUpToDate);
    Ok(())
}

#[test]
fn restack_branch_replays_onto_moved_trunk() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    let main_head = repo.driver.head_oid()?;
    repo.commit_on_new_branch("feat1", "one")?;
    repo.driver.checkout("main")?;
    repo.commit_on_current_branch("advance trunk")?;
    let new_main_head = repo.driver.head_oid()?;

    let store = MetadataStore::new(&repo.driver);
    track(&store, main_head, "feat1", None);

    let branch = stack_store::get_branch(&store, "feat1")?.unwrap();
    let (updated, outcome) = stack_restack::restack_branch(&repo.driver, &store, "main", &branch)?;
    assert_eq!(outcome, RestackOutcome::Restacked);
    assert_eq!(updated.base_hash, new_main_head);
    assert!(repo.driver.is_ancestor(&new_main_head.to_string(), "feat1")?);
    Ok(())
}

#[test]
fn restack_stack_propagates_through_a_three_branch_chain() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    let main_head = repo.driver.head_oid()?;
    repo.commit_on_new_branch("feat1", "one")?;
    let feat1_head = repo.driver.head_oid()?;
    repo.commit_on_new_branch("feat2", "two")?;
    let feat2_head = repo.driver.head_oid()?;
    repo.driver.checkout("main")?;
    repo.commit_on_current_branch("advance trunk")?;
    let new_main_head = repo.driver.head_oid()?;

    let store = MetadataStore::new(&repo.driver);
    track(&store, main_head, "feat1", None);
    track(&store, feat1_head, "feat2", Some("feat1"));

    let updated = stack_restack::restack_stack(&repo.driver, &store, "main", "feat2")?;
    assert_eq!(updated.len(), 2);
    assert!(repo.driver.is_ancestor(&new_main_head.to_string(), "feat1")?);
    assert!(repo.driver.is_ancestor("feat1", "feat2")?);

    let feat2_after = stack_store::get_branch(&store, "feat2")?.unwrap();
    assert_ne!(feat2_after.base_hash, feat1_head);
    Ok(())
}

#[test]
fn rescue_abort_restores_pre_restack_state() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    let main_head = repo.driver.head_oid()?;
    repo.commit_on_new_branch("feat1", "one")?;

    // Write conflicting changes on trunk and on feat1 for the same path.
    repo.driver.checkout("main")?;
    std::fs::write(repo.driver.repo_root().join("conflict.txt"), "trunk\n")?;
    repo.driver.run_info().run(&["add", "conflict.txt"])?;
    repo.commit_on_current_branch("trunk change")?;
    let new_main_head = repo.driver.head_oid()?;

    repo.driver.checkout("feat1")?;
    std::fs::write(repo.driver.repo_root().join("conflict.txt"), "feat1\n")?;
    repo.driver.run_info().run(&["add", "conflict.txt"])?;
    repo.commit_on_current_branch("feat1 change")?;
    let feat1_head_before = repo.driver.head_oid()?;

    let store = MetadataStore::new(&repo.driver);
    track(&store, main_head, "feat1", None);

    let branch = stack_store::get_branch(&store, "feat1")?.unwrap();
    let result = stack_restack::restack_branch(&repo.driver, &store, "main", &branch);
    assert!(matches!(
        result,
        Err(stack_restack::Error::Interrupted { .. })
    ));

    stack_restack::abort(&repo.driver, &store)?;
    assert_eq!(repo.driver.head_oid()?, feat1_head_before);

    // metadata for feat1 should be untouched: still pointing at the
    // original trunk commit, not the advanced one.
    let branch_after = stack_store::get_branch(&store, "feat1")?.unwrap();
    assert_eq!(branch_after.base_hash, main_head);
    assert_ne!(branch_after.base_hash, new_main_head);
    Ok(())
}
