use stack_forge::branch_forge::BranchForge;
use stack_forge::{ChangeDraft, Forge};
use stack_git::testing::ScratchRepo;

#[test]
fn push_submit_and_detect_merge() -> eyre::Result<()> {
    let local = ScratchRepo::new()?;
    let remote = ScratchRepo::new()?;

    local.driver.run_info().run(&[
        "remote",
        "add",
        "origin",
        &remote.driver.repo_root().display().to_string(),
    ])?;
    local.commit_on_new_branch("feat1", "add feature 1")?;

    let forge = BranchForge;
    let repo = forge.open_repository(&local.driver, "origin")?;

    repo.push_branch(&"feat1".into(), None)?;
    local.driver.fetch("origin", None)?;

    let change = repo.submit_change(&ChangeDraft {
        branch: "feat1",
        base: "main",
        title: "Add feature 1",
        body: "",
    })?;
    assert_eq!(change.id, "feat1");

    let found = repo.find_change_by_branch("feat1")?;
    assert!(found.is_some());

    // The remote's own main hasn't absorbed feat1 yet.
    let statuses = repo.changes_are_merged(&["feat1".to_owned()])?;
    assert_eq!(statuses.get("feat1"), Some(&false));

    // Merge feat1 into main directly on the remote repository, simulating
    // the review being accepted there, then re-fetch.
    let remote_run = remote.driver.run_info();
    remote_run.run_silent(&["checkout", "main"], Default::default())?;
    let output = remote_run.run_silent(
        &["merge", "--no-ff", "--quiet", "-m", "merge feat1", "feat1"],
        Default::default(),
    )?;
    assert!(output.success(), "{}", output.stderr_string());

    local.driver.fetch("origin", None)?;
    let statuses = repo.changes_are_merged(&["feat1".to_owned()])?;
    assert_eq!(statuses.get("feat1"), Some(&true));
    Ok(())
}
