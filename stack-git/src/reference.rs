//! Reference and branch name types.

use std::fmt::Display;

use crate::oid::NonZeroOid;

/// The fully-qualified name of a reference, like `refs/heads/main`.
#[derive(Clone, Debug, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct ReferenceName(String);

impl ReferenceName {
    /// View this reference name as a string. (Zero-cost conversion.)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strip the `refs/heads/` prefix, if present, returning the bare branch name.
    pub fn branch_name(&self) -> &str {
        self.0.strip_prefix("refs/heads/").unwrap_or(&self.0)
    }
}

impl From<&str> for ReferenceName {
    fn from(s: &str) -> Self {
        ReferenceName(s.to_owned())
    }
}

impl From<String> for ReferenceName {
    fn from(s: String) -> Self {
        ReferenceName(s)
    }
}

impl From<NonZeroOid> for ReferenceName {
    fn from(oid: NonZeroOid) -> Self {
        Self::from(oid.to_string())
    }
}

impl AsRef<str> for ReferenceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ReferenceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A local branch name, e.g. `feat1`. Never contains the `refs/heads/` prefix
/// and is never the trunk branch name (that invariant is enforced by callers,
/// not this type, since "is this trunk" depends on repo configuration).
#[derive(Clone, Debug, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// Construct a branch name from a bare name (no `refs/heads/` prefix).
    pub fn new(name: impl Into<String>) -> Self {
        BranchName(name.into())
    }

    /// View this branch name as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fully-qualified local ref name for this branch.
    pub fn to_local_ref(&self) -> ReferenceName {
        ReferenceName::from(format!("refs/heads/{}", self.0))
    }

    /// The fully-qualified remote-tracking ref name for this branch under `remote`.
    pub fn to_remote_ref(&self, remote: &str) -> ReferenceName {
        ReferenceName::from(format!("refs/remotes/{remote}/{}", self.0))
    }
}

impl Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BranchName {
    fn from(s: &str) -> Self {
        BranchName(s.to_owned())
    }
}

impl From<String> for BranchName {
    fn from(s: String) -> Self {
        BranchName(s)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
