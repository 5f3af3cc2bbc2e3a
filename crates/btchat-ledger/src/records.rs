//! Ledger records and their read views
//!
//! Records are owned by [`LedgerState`](crate::state::LedgerState). Reads hand
//! out the `*View` types, which are detached copies without the internal
//! like sets.

use crate::identifiers::{Address, CommentId, PostId};
use crate::time::Timestamp;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Mutable profile fields of a user, replaced wholesale by profile edits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name
    pub username: String,
    /// Avatar URI
    pub profile_image: Option<String>,
    /// Banner URI
    pub cover_photo: Option<String>,
    /// Free-form biography
    pub bio: Option<String>,
    /// Interest tags in first-seen order
    pub interests: IndexSet<String>,
}

impl Profile {
    /// Profile of a freshly registered user.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }
}

/// Complete replacement for a user's profile.
///
/// Empty optional strings are stored as absent; duplicate interests collapse
/// onto their first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name (must be non-empty)
    pub username: String,
    /// New avatar URI
    pub profile_image: Option<String>,
    /// New biography
    pub bio: Option<String>,
    /// New banner URI
    pub cover_photo: Option<String>,
    /// New interest tags
    pub interests: Vec<String>,
}

impl ProfileUpdate {
    /// Normalize into the stored profile representation.
    pub fn into_profile(self) -> Profile {
        Profile {
            username: self.username,
            profile_image: non_empty(self.profile_image),
            cover_photo: non_empty(self.cover_photo),
            bio: non_empty(self.bio),
            interests: self.interests.into_iter().collect(),
        }
    }
}

/// Treat an empty URI or text as "not set".
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Per-user activity counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    /// Posts authored (including reposts)
    pub post_count: u64,
    /// Likes given to posts and comments
    pub likes_given: u64,
    /// Comments written
    pub comment_count: u64,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Owning address
    pub address: Address,
    /// Editable profile
    pub profile: Profile,
    /// Posts remaining before the external pricing policy applies
    pub free_posts_remaining: u32,
    /// Activity counters
    pub stats: UserStats,
    /// Registration time
    pub registered_at: Timestamp,
}

impl User {
    /// Detached read view of this user.
    pub fn view(&self) -> UserView {
        UserView {
            user_address: self.address.clone(),
            username: self.profile.username.clone(),
            profile_image: self.profile.profile_image.clone(),
            cover_photo: self.profile.cover_photo.clone(),
            bio: self.profile.bio.clone(),
            interests: self.profile.interests.iter().cloned().collect(),
            free_posts_remaining: self.free_posts_remaining,
            stats: self.stats,
            registered_at: self.registered_at,
            is_registered: true,
        }
    }
}

/// Read view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    /// Owning address
    pub user_address: Address,
    /// Display name
    pub username: String,
    /// Avatar URI
    pub profile_image: Option<String>,
    /// Banner URI
    pub cover_photo: Option<String>,
    /// Biography
    pub bio: Option<String>,
    /// Interest tags
    pub interests: Vec<String>,
    /// Remaining free posts
    pub free_posts_remaining: u32,
    /// Activity counters
    pub stats: UserStats,
    /// Registration time
    pub registered_at: Timestamp,
    /// Always true for a returned view
    pub is_registered: bool,
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Identifier within the owning post
    pub id: CommentId,
    /// Author of the comment
    pub commenter: Address,
    /// Comment text
    pub content: String,
    /// Attached media URI
    pub image: Option<String>,
    /// Creation time
    pub timestamp: Timestamp,
    pub(crate) liked_by: BTreeSet<Address>,
}

impl Comment {
    /// Number of likes received.
    pub fn like_count(&self) -> u64 {
        self.liked_by.len() as u64
    }

    /// Whether `address` liked this comment.
    pub fn is_liked_by(&self, address: &Address) -> bool {
        self.liked_by.contains(address)
    }

    /// Detached read view of this comment.
    pub fn view(&self) -> CommentView {
        CommentView {
            id: self.id,
            commenter: self.commenter.clone(),
            content: self.content.clone(),
            image: self.image.clone(),
            timestamp: self.timestamp,
            like_count: self.like_count(),
        }
    }
}

/// Read view of a comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    /// Identifier
    pub id: CommentId,
    /// Author
    pub commenter: Address,
    /// Text
    pub content: String,
    /// Attached media URI
    pub image: Option<String>,
    /// Creation time
    pub timestamp: Timestamp,
    /// Likes received
    pub like_count: u64,
}

/// A post in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Sequence id
    pub id: PostId,
    /// Author
    pub author: Address,
    /// Post text
    pub content: String,
    /// Attached media URI
    pub image: Option<String>,
    /// Creation time
    pub timestamp: Timestamp,
    /// Post this one reposts, if any
    pub original_post_id: Option<PostId>,
    pub(crate) liked_by: BTreeSet<Address>,
    pub(crate) comments: Vec<Comment>,
}

impl Post {
    /// Number of likes received.
    pub fn like_count(&self) -> u64 {
        self.liked_by.len() as u64
    }

    /// Number of comments.
    pub fn comment_count(&self) -> u64 {
        self.comments.len() as u64
    }

    /// Whether `address` liked this post.
    pub fn is_liked_by(&self, address: &Address) -> bool {
        self.liked_by.contains(address)
    }

    /// Whether this post is a repost.
    pub fn is_repost(&self) -> bool {
        self.original_post_id.is_some()
    }

    /// Comments in index order.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Look up a comment by local index.
    pub fn comment(&self, index: u64) -> Option<&Comment> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.comments.get(i))
    }

    /// Detached read view of this post.
    pub fn view(&self) -> PostView {
        PostView {
            id: self.id,
            author: self.author.clone(),
            content: self.content.clone(),
            image: self.image.clone(),
            timestamp: self.timestamp,
            like_count: self.like_count(),
            comment_count: self.comment_count(),
            original_post_id: self.original_post_id,
        }
    }
}

/// Read view of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    /// Sequence id
    pub id: PostId,
    /// Author
    pub author: Address,
    /// Text
    pub content: String,
    /// Attached media URI
    pub image: Option<String>,
    /// Creation time
    pub timestamp: Timestamp,
    /// Likes received
    pub like_count: u64,
    /// Comments received
    pub comment_count: u64,
    /// Post this one reposts, if any
    pub original_post_id: Option<PostId>,
}

/// Result of a committed post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReceipt {
    /// Id assigned to the new post
    pub post_id: PostId,
    /// False when the author had no free posts left and the external
    /// pricing policy applies
    pub used_free_quota: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_normalizes_fields() {
        let update = ProfileUpdate {
            username: "alice".into(),
            profile_image: Some(String::new()),
            bio: Some("hi".into()),
            cover_photo: None,
            interests: vec!["rust".into(), "btc".into(), "rust".into()],
        };
        let profile = update.into_profile();
        assert_eq!(profile.profile_image, None);
        assert_eq!(profile.bio.as_deref(), Some("hi"));
        let interests: Vec<_> = profile.interests.iter().map(String::as_str).collect();
        assert_eq!(interests, ["rust", "btc"]);
    }

    #[test]
    fn user_view_marks_registered() {
        let user = User {
            address: Address::new("0x1").unwrap(),
            profile: Profile::new("alice"),
            free_posts_remaining: 3,
            stats: UserStats::default(),
            registered_at: Timestamp::from_ms(10),
        };
        let view = user.view();
        assert!(view.is_registered);
        assert_eq!(view.user_address, user.address);
        assert_eq!(view.free_posts_remaining, 3);
    }
}
