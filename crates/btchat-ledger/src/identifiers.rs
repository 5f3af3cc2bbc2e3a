//! Ledger identifiers
//!
//! Users are keyed by an opaque external [`Address`], posts by a sequential
//! [`PostId`] and comments by a [`CommentId`] local to their post.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque external address identifying a user.
///
/// The ledger performs no format validation beyond rejecting the empty
/// string; addresses compare byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Create an address, rejecting the empty string.
    pub fn new(address: impl Into<String>) -> Result<Self, LedgerError> {
        let address = address.into();
        if address.is_empty() {
            return Err(LedgerError::InvalidAddress);
        }
        Ok(Self(address))
    }

    /// Borrow the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Sequential post identifier, starting at 0.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl PostId {
    /// Position of this post in the post sequence.
    pub fn index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PostId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Comment identifier: the owning post plus a local index starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommentId {
    /// Post the comment belongs to
    pub post_id: PostId,
    /// Position within that post's comment sequence
    pub index: u64,
}

impl CommentId {
    /// Create a comment identifier.
    pub fn new(post_id: PostId, index: u64) -> Self {
        Self { post_id, index }
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.post_id, self.index)
    }
}
