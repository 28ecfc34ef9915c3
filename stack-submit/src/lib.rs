//! Publishing a tracked stack of branches for review, keeping their
//! navigation comments current, and syncing the stack once branches below
//! it are merged and removed from the remote.

#![warn(missing_docs)]

pub mod navigation;
pub mod submit;
pub mod sync;

pub use navigation::{build_forest, render_navigation_comment, StackedChange, NAV_COMMENT_MARKER};
pub use submit::{
    submit_branch, submit_downstack, submit_stack, submit_upstack, Error as SubmitError,
    PublishMode, SubmitOptions,
};
pub use sync::{sync_repo, update_trunk, Error as SyncError, SyncReport};
