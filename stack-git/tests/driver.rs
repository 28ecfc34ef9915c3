use stack_git::testing::ScratchRepo;
use stack_git::RebaseOptions;

#[test]
fn resolve_and_list_branches() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    repo.commit_on_new_branch("feat1", "add feature 1")?;
    repo.driver.checkout("main")?;
    repo.commit_on_new_branch("feat2", "add feature 2")?;

    let branches = repo.driver.list_local_branches()?;
    let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
    assert!(names.contains(&"main"));
    assert!(names.contains(&"feat1"));
    assert!(names.contains(&"feat2"));
    Ok(())
}

#[test]
fn merge_base_and_ancestry() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    let main_oid = repo.driver.head_oid()?;
    repo.commit_on_new_branch("feat1", "add feature 1")?;

    assert!(repo.driver.is_ancestor("main", "feat1")?);
    assert!(!repo.driver.is_ancestor("feat1", "main")?);
    assert_eq!(repo.driver.merge_base("main", "feat1")?, main_oid);
    Ok(())
}

#[test]
fn rebase_onto_moves_commits() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    repo.commit_on_new_branch("feat1", "add feature 1")?;
    repo.driver.checkout("main")?;
    repo.commit_on_new_branch("unrelated", "unrelated change")?;
    let new_base = repo.driver.head_oid()?;

    repo.driver.checkout("feat1")?;
    repo.driver.rebase(
        "unrelated",
        &RebaseOptions {
            quiet: true,
            ..Default::default()
        },
    )?;

    assert!(repo.driver.is_ancestor(&new_base.to_string(), "feat1")?);
    Ok(())
}

#[test]
fn set_ref_cas_semantics() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    let main_head = repo.driver.head_oid()?;
    repo.commit_on_new_branch("feat1", "add feature 1")?;
    let feat1_head = repo.driver.head_oid()?;

    // correct expected value: succeeds, fast-forwarding main to feat1's tip.
    repo.driver
        .set_ref(&"refs/heads/main".into(), feat1_head, Some(main_head))?;
    assert_eq!(repo.driver.resolve_ref("main")?, feat1_head);

    // stale expected value: fails, main is left untouched.
    let result = repo
        .driver
        .set_ref(&"refs/heads/main".into(), main_head, Some(main_head));
    assert!(result.is_err());
    assert_eq!(repo.driver.resolve_ref("main")?, feat1_head);
    Ok(())
}
