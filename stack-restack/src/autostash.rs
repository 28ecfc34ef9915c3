//! A single stash/restore wrapped around a whole restack operation, rather
//! than Git's own per-rebase `--autostash`, so a working tree stashed at
//! the start of a multi-branch restack stays stashed across a conflict
//! that gets resolved (and the rebase resumed) in a later invocation.

use stack_git::{GitDriver, NonZeroOid};
use tracing::instrument;

/// Holds a stash entry (if one was needed) until it's explicitly restored.
pub struct AutostashGuard {
    stash: Option<NonZeroOid>,
}

impl AutostashGuard {
    /// Stash the working tree and index if they're dirty, leaving the
    /// working tree clean either way.
    #[instrument(skip(driver))]
    pub fn capture(driver: &GitDriver) -> Result<Self, stack_git::Error> {
        let stash = driver.stash_create()?;
        if let Some(oid) = stash {
            driver.stash_store(oid, "stack-restack: autostash")?;
            let head = driver.head_oid()?;
            driver.reset_hard(head)?;
        }
        Ok(AutostashGuard { stash })
    }

    /// Re-apply the stashed changes, if there were any.
    #[instrument(skip(self, driver))]
    pub fn restore(self, driver: &GitDriver) -> Result<(), stack_git::Error> {
        if let Some(oid) = self.stash {
            driver.stash_apply(oid)?;
        }
        Ok(())
    }
}
