//! The default forge adapter: no external service at all. A branch is
//! "submitted" simply by pushing it, and "merged" means its commit became
//! an ancestor of trunk.

use std::collections::HashMap;

use stack_git::{BranchName, GitDriver, NonZeroOid};
use stack_store::ForgeKind;

use crate::{ChangeDraft, ChangeRef, Error, Forge, RemoteRepo, Result};

/// The stateless [`Forge`] implementation for [`ForgeKind::Branch`].
#[derive(Debug, Clone, Copy)]
pub struct BranchForge;

/// A ready-to-use static instance, since this adapter holds no state.
pub static BRANCH_FORGE: BranchForge = BranchForge;

impl Forge for BranchForge {
    fn kind(&self) -> ForgeKind {
        ForgeKind::Branch
    }

    fn match_remote_url(&self, _remote_url: &str) -> bool {
        // Never claimed implicitly; this is the fallback `select_forge`
        // reaches for when nothing else matches.
        false
    }

    fn load_authentication_token(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn open_repository(
        &self,
        driver: &GitDriver,
        remote_name: &str,
    ) -> Result<Box<dyn RemoteRepo>> {
        Ok(Box::new(BranchRepo {
            driver: driver.clone(),
            remote_name: remote_name.to_owned(),
        }))
    }
}

struct BranchRepo {
    driver: GitDriver,
    remote_name: String,
}

impl RemoteRepo for BranchRepo {
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
        Ok(ChangeRef {
            id: draft.branch.to_owned(),
            url: None,
        })
    }

    fn update_change(&self, _change_id: &str, _draft: &ChangeDraft<'_>) -> Result<()> {
        // The branch's tip already is the change; pushing it (separately,
        // via `push_branch`) is the only update there is.
        Ok(())
    }

    fn changes_are_merged(&self, change_ids: &[String]) -> Result<HashMap<String, bool>> {
        let trunk = self.driver.get_trunk_branch_name().ok_or_else(|| {
            Error::Git(stack_git::Error::CommandFailed {
                args: "config".to_owned(),
                exit_code: 1,
                stderr: "no trunk branch configured".to_owned(),
            })
        })?;
        let remote_trunk = format!("{}/{trunk}", self.remote_name);
        let mut result = HashMap::new();
        for change_id in change_ids {
            let remote_ref = format!("{}/{change_id}", self.remote_name);
            let merged = self
                .driver
                .is_ancestor(&remote_ref, &remote_trunk)
                .unwrap_or(false);
            result.insert(change_id.clone(), merged);
        }
        Ok(result)
    }

    fn find_change_by_branch(&self, branch: &str) -> Result<Option<ChangeRef>> {
        let remote_ref = format!("{}/{branch}", self.remote_name);
        if self.driver.resolve_ref(&remote_ref).is_ok() {
            Ok(Some(ChangeRef {
                id: branch.to_owned(),
                url: None,
            }))
        } else {
            Ok(None)
        }
    }

    fn post_change_comment(&self, _change_id: &str, _body: &str) -> Result<String> {
        // No inbox to post to; callers fold navigation info into the
        // commit message instead when using this adapter.
        Ok(String::new())
    }

    fn update_change_comment(&self, _change_id: &str, _comment_id: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}
