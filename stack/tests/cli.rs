//! End-to-end smoke tests driving the `stack` binary against a scratch
//! repository, the way `assert_cmd` is meant to be used.

use assert_cmd::Command;
use stack_git::testing::ScratchRepo;

fn stack_cmd(repo: &ScratchRepo) -> Command {
    let mut cmd = Command::cargo_bin("stack").expect("binary built");
    cmd.current_dir(repo.driver.repo_root());
    cmd.env("GIT_AUTHOR_NAME", "Test User");
    cmd.env("GIT_AUTHOR_EMAIL", "test@example.com");
    cmd.env("GIT_COMMITTER_NAME", "Test User");
    cmd.env("GIT_COMMITTER_EMAIL", "test@example.com");
    cmd
}

#[test]
fn init_tracks_and_restacks_a_stack() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    repo.commit_on_new_branch("feat1", "one")?;
    repo.commit_on_new_branch("feat2", "two")?;
    repo.driver.checkout("main")?;

    stack_cmd(&repo)
        .args(["repo", "init", "--trunk", "main"])
        .assert()
        .success();

    stack_cmd(&repo)
        .args(["branch", "track", "feat1"])
        .assert()
        .success();
    stack_cmd(&repo)
        .args(["branch", "track", "feat2", "--base", "feat1"])
        .assert()
        .success();

    // Amend feat1, which leaves feat2 stale.
    repo.driver.checkout("feat1")?;
    repo.commit_on_current_branch("one (amended follow-up)")?;

    stack_cmd(&repo).args(["repo", "restack"]).assert().success();

    let feat1_tip = repo.driver.resolve_ref("feat1")?;
    let feat2_base = repo.driver.resolve_ref("feat2~1")?;
    assert_eq!(feat1_tip, feat2_base);
    Ok(())
}

#[test]
fn rejects_commands_before_repo_init() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    stack_cmd(&repo)
        .args(["branch", "track", "main"])
        .assert()
        .failure()
        .code(1);
    Ok(())
}

#[test]
fn info_reports_trunk_and_remote() -> eyre::Result<()> {
    let repo = ScratchRepo::new()?;
    stack_cmd(&repo)
        .args(["repo", "init", "--trunk", "main", "--remote", "origin"])
        .assert()
        .success();

    let output = stack_cmd(&repo).args(["info"]).output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Trunk:  main"));
    Ok(())
}
