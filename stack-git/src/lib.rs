//! Typed, CLI-driven access to a single Git repository.
//!
//! This crate does not use `git2` or otherwise link against `libgit2`; every
//! operation shells out to the `git` executable. That keeps the rest of the
//! workspace's compatibility surface identical to whatever Git version the
//! user already has installed, at the cost of some process-spawn overhead.

#![warn(missing_docs)]

pub mod config;
pub mod driver;
pub mod oid;
pub mod reference;
pub mod run;
pub mod testing;

pub use driver::{
    CherryPickOptions, CommitInfo, Error, GitDriver, LocalBranch, RebaseOptions, RebaseState,
};
pub use oid::{NonZeroOid, OidError};
pub use reference::{BranchName, ReferenceName};
pub use run::{GitCommandOutput, GitRunInfo, GitRunOpts, SpawnError};
