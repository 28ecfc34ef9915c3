//! Restacking tracked branches onto their bases, and rescuing a restack
//! that stopped on a rebase conflict.

#![warn(missing_docs)]

pub mod autostash;
pub mod rescue;
pub mod restack;

pub use autostash::AutostashGuard;
pub use restack::{
    branch_onto, restack_branch, restack_by_name, restack_repo, restack_stack, restack_upstack,
    Error, RestackOutcome,
};
pub use rescue::{abort, continue_rebase};
