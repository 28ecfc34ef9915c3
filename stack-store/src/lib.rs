//! Transactional metadata storage for tracked branches, persisted as
//! commits on `refs/spice/data` rather than in a side database, so the
//! history of the stack's bookkeeping travels with the repository's own
//! object store (and its reflog).

#![warn(missing_docs)]

pub mod branches;
pub mod continuations;
pub mod model;
pub mod store;

pub use branches::{delete_branch, get_branch, list_branches, upsert_branch};
pub use continuations::{
    push_continuation, push_continuation_front, take_all_continuations, take_continuation,
};
pub use model::{ChangeMetadata, Continuation, ForgeKind, RepoMetadata, TrackedBranch};
pub use store::{MetadataStore, Transaction, METADATA_REF};
