//! Ledger state and validation
//!
//! [`LedgerState`] owns the user registry and the post sequence. Mutations
//! happen in two steps:
//!
//! 1. `prepare_*` checks caller input against the state and configuration
//!    and builds the [`LedgerFact`] describing the transition.
//! 2. [`LedgerState::apply`] checks the structural invariants of the fact
//!    and only then folds it into the state.
//!
//! Journal replay skips step 1, so limits that come from configuration
//! (lengths, allowances) never invalidate history, while structural
//! invariants (one registration per address, dense ids, one like per
//! address) are enforced on every path.

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::facts::LedgerFact;
use crate::identifiers::{Address, CommentId, PostId};
use crate::records::{non_empty, Comment, Post, Profile, ProfileUpdate, User, UserStats};
use crate::time::Timestamp;
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Users, posts and comments, plus the number of facts folded so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    users: IndexMap<Address, User>,
    posts: Vec<Post>,
    fact_count: u64,
}

impl LedgerState {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state by applying facts in order.
    ///
    /// On failure returns the zero-based position of the offending fact.
    pub fn replay<I>(facts: I) -> std::result::Result<Self, (usize, LedgerError)>
    where
        I: IntoIterator<Item = LedgerFact>,
    {
        let mut state = Self::new();
        for (position, fact) in facts.into_iter().enumerate() {
            state.apply(fact).map_err(|err| (position, err))?;
        }
        Ok(state)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Look up a registered user.
    pub fn user(&self, address: &Address) -> Result<&User> {
        self.users
            .get(address)
            .ok_or_else(|| LedgerError::NotRegistered(address.clone()))
    }

    /// Whether `address` has a user record.
    pub fn is_registered(&self, address: &Address) -> bool {
        self.users.contains_key(address)
    }

    /// Number of registered users.
    pub fn users_count(&self) -> u64 {
        self.users.len() as u64
    }

    /// Registered users in registration order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// Look up a post.
    pub fn post(&self, post_id: PostId) -> Result<&Post> {
        self.posts
            .get(post_id.index())
            .ok_or(LedgerError::PostNotFound(post_id))
    }

    /// Number of posts.
    pub fn posts_count(&self) -> u64 {
        self.posts.len() as u64
    }

    /// Posts `start..start + limit` in id order. Out-of-range windows are empty.
    pub fn posts_range(&self, start: u64, limit: usize) -> &[Post] {
        window(&self.posts, start, limit)
    }

    /// Look up a comment.
    pub fn comment(&self, comment_id: CommentId) -> Result<&Comment> {
        self.post(comment_id.post_id)?
            .comment(comment_id.index)
            .ok_or(LedgerError::CommentNotFound(comment_id))
    }

    /// Comments `start..start + limit` of a post in index order.
    pub fn comments_range(&self, post_id: PostId, start: u64, limit: usize) -> Result<&[Comment]> {
        Ok(window(self.post(post_id)?.comments(), start, limit))
    }

    /// Number of facts folded into this state.
    pub fn fact_count(&self) -> u64 {
        self.fact_count
    }

    // ------------------------------------------------------------------
    // Prepare: caller input -> fact
    // ------------------------------------------------------------------

    /// Prepare a registration.
    pub fn prepare_register_user(
        &self,
        config: &LedgerConfig,
        now: Timestamp,
        address: &Address,
        username: &str,
    ) -> Result<LedgerFact> {
        if self.is_registered(address) {
            return Err(LedgerError::AlreadyRegistered(address.clone()));
        }
        if username.is_empty() {
            return Err(LedgerError::EmptyUsername);
        }
        Ok(LedgerFact::UserRegistered {
            address: address.clone(),
            username: username.to_string(),
            free_posts: config.initial_free_posts,
            registered_at: now,
        })
    }

    /// Prepare a wholesale profile replacement.
    pub fn prepare_edit_profile(
        &self,
        config: &LedgerConfig,
        now: Timestamp,
        address: &Address,
        update: ProfileUpdate,
    ) -> Result<LedgerFact> {
        self.user(address)?;
        if update.username.is_empty() {
            return Err(LedgerError::EmptyUsername);
        }
        if let Some(bio) = &update.bio {
            let length = bio.chars().count();
            if length > config.max_bio_length {
                return Err(LedgerError::bio_too_long(length, config.max_bio_length));
            }
        }
        Ok(LedgerFact::ProfileEdited {
            address: address.clone(),
            profile: update.into_profile(),
            edited_at: now,
        })
    }

    /// Prepare an avatar change. An empty URI clears the avatar.
    pub fn prepare_set_profile_image(
        &self,
        now: Timestamp,
        address: &Address,
        uri: &str,
    ) -> Result<LedgerFact> {
        self.user(address)?;
        Ok(LedgerFact::ProfileImageSet {
            address: address.clone(),
            uri: non_empty(Some(uri.to_string())),
            set_at: now,
        })
    }

    /// Prepare a banner change. An empty URI clears the banner.
    pub fn prepare_set_cover_photo(
        &self,
        now: Timestamp,
        address: &Address,
        uri: &str,
    ) -> Result<LedgerFact> {
        self.user(address)?;
        Ok(LedgerFact::CoverPhotoSet {
            address: address.clone(),
            uri: non_empty(Some(uri.to_string())),
            set_at: now,
        })
    }

    /// Prepare a new post.
    pub fn prepare_create_post(
        &self,
        config: &LedgerConfig,
        now: Timestamp,
        author: &Address,
        content: &str,
        image: Option<&str>,
        original_post_id: Option<PostId>,
    ) -> Result<LedgerFact> {
        self.user(author)?;
        check_content(content, config.max_post_length)?;
        if let Some(original) = original_post_id {
            self.post(original)?;
        }
        Ok(LedgerFact::PostCreated {
            post_id: PostId(self.posts_count()),
            author: author.clone(),
            content: content.to_string(),
            image: non_empty(image.map(str::to_string)),
            original_post_id,
            created_at: now,
        })
    }

    /// Prepare a repost of `post_id`.
    ///
    /// The new post links to the root original, so reposting a repost does
    /// not build chains. Without a comment the original text is reused.
    pub fn prepare_repost(
        &self,
        config: &LedgerConfig,
        now: Timestamp,
        author: &Address,
        post_id: PostId,
        comment: Option<&str>,
    ) -> Result<LedgerFact> {
        self.user(author)?;
        let source = self.post(post_id)?;
        let root = source.original_post_id.unwrap_or(post_id);
        let content = match comment.filter(|c| !c.is_empty()) {
            Some(comment) => comment,
            None => source.content.as_str(),
        };
        self.prepare_create_post(
            config,
            now,
            author,
            content,
            source.image.as_deref(),
            Some(root),
        )
    }

    /// Prepare a post like.
    pub fn prepare_like_post(
        &self,
        now: Timestamp,
        liker: &Address,
        post_id: PostId,
    ) -> Result<LedgerFact> {
        let fact = LedgerFact::PostLiked {
            post_id,
            liker: liker.clone(),
            liked_at: now,
        };
        self.check(&fact)?;
        Ok(fact)
    }

    /// Prepare a comment.
    pub fn prepare_add_comment(
        &self,
        config: &LedgerConfig,
        now: Timestamp,
        commenter: &Address,
        post_id: PostId,
        content: &str,
        image: Option<&str>,
    ) -> Result<LedgerFact> {
        self.user(commenter)?;
        let post = self.post(post_id)?;
        check_content(content, config.max_comment_length)?;
        Ok(LedgerFact::CommentAdded {
            comment_id: CommentId::new(post_id, post.comment_count()),
            commenter: commenter.clone(),
            content: content.to_string(),
            image: non_empty(image.map(str::to_string)),
            created_at: now,
        })
    }

    /// Prepare a comment like.
    pub fn prepare_like_comment(
        &self,
        now: Timestamp,
        liker: &Address,
        comment_id: CommentId,
    ) -> Result<LedgerFact> {
        let fact = LedgerFact::CommentLiked {
            comment_id,
            liker: liker.clone(),
            liked_at: now,
        };
        self.check(&fact)?;
        Ok(fact)
    }

    /// Whether committing `fact` would consume a free post.
    pub fn uses_free_quota(&self, fact: &LedgerFact) -> bool {
        match fact {
            LedgerFact::PostCreated { author, .. } => self
                .users
                .get(author)
                .is_some_and(|user| user.free_posts_remaining > 0),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Apply: fact -> state
    // ------------------------------------------------------------------

    /// Check the structural invariants `fact` must satisfy against this state.
    pub fn check(&self, fact: &LedgerFact) -> Result<()> {
        match fact {
            LedgerFact::UserRegistered {
                address, username, ..
            } => {
                if self.is_registered(address) {
                    return Err(LedgerError::AlreadyRegistered(address.clone()));
                }
                if username.is_empty() {
                    return Err(LedgerError::EmptyUsername);
                }
            }
            LedgerFact::ProfileEdited {
                address, profile, ..
            } => {
                self.user(address)?;
                if profile.username.is_empty() {
                    return Err(LedgerError::EmptyUsername);
                }
            }
            LedgerFact::ProfileImageSet { address, .. }
            | LedgerFact::CoverPhotoSet { address, .. } => {
                self.user(address)?;
            }
            LedgerFact::PostCreated {
                post_id,
                author,
                content,
                original_post_id,
                ..
            } => {
                self.user(author)?;
                if content.is_empty() {
                    return Err(LedgerError::EmptyContent);
                }
                let expected = self.posts_count();
                if post_id.0 != expected {
                    return Err(LedgerError::OutOfSequence {
                        expected,
                        found: post_id.0,
                    });
                }
                if let Some(original) = original_post_id {
                    self.post(*original)?;
                }
            }
            LedgerFact::PostLiked { post_id, liker, .. } => {
                self.user(liker)?;
                if self.post(*post_id)?.is_liked_by(liker) {
                    return Err(LedgerError::AlreadyLiked);
                }
            }
            LedgerFact::CommentAdded {
                comment_id,
                commenter,
                content,
                ..
            } => {
                self.user(commenter)?;
                let expected = self.post(comment_id.post_id)?.comment_count();
                if content.is_empty() {
                    return Err(LedgerError::EmptyContent);
                }
                if comment_id.index != expected {
                    return Err(LedgerError::OutOfSequence {
                        expected,
                        found: comment_id.index,
                    });
                }
            }
            LedgerFact::CommentLiked {
                comment_id, liker, ..
            } => {
                self.user(liker)?;
                if self.comment(*comment_id)?.is_liked_by(liker) {
                    return Err(LedgerError::AlreadyLiked);
                }
            }
        }
        Ok(())
    }

    /// Check `fact` and fold it into the state. Nothing changes on error.
    pub fn apply(&mut self, fact: LedgerFact) -> Result<()> {
        self.check(&fact)?;
        self.apply_checked(fact);
        Ok(())
    }

    /// Fold a fact that already passed [`LedgerState::check`].
    pub(crate) fn apply_checked(&mut self, fact: LedgerFact) {
        self.fact_count += 1;
        match fact {
            LedgerFact::UserRegistered {
                address,
                username,
                free_posts,
                registered_at,
            } => {
                self.users.insert(
                    address.clone(),
                    User {
                        address,
                        profile: Profile::new(username),
                        free_posts_remaining: free_posts,
                        stats: UserStats::default(),
                        registered_at,
                    },
                );
            }
            LedgerFact::ProfileEdited {
                address, profile, ..
            } => {
                if let Some(user) = self.users.get_mut(&address) {
                    user.profile = profile;
                }
            }
            LedgerFact::ProfileImageSet { address, uri, .. } => {
                if let Some(user) = self.users.get_mut(&address) {
                    user.profile.profile_image = uri;
                }
            }
            LedgerFact::CoverPhotoSet { address, uri, .. } => {
                if let Some(user) = self.users.get_mut(&address) {
                    user.profile.cover_photo = uri;
                }
            }
            LedgerFact::PostCreated {
                post_id,
                author,
                content,
                image,
                original_post_id,
                created_at,
            } => {
                if let Some(user) = self.users.get_mut(&author) {
                    user.stats.post_count += 1;
                    user.free_posts_remaining = user.free_posts_remaining.saturating_sub(1);
                }
                self.posts.push(Post {
                    id: post_id,
                    author,
                    content,
                    image,
                    timestamp: created_at,
                    original_post_id,
                    liked_by: BTreeSet::new(),
                    comments: Vec::new(),
                });
            }
            LedgerFact::PostLiked { post_id, liker, .. } => {
                if let Some(user) = self.users.get_mut(&liker) {
                    user.stats.likes_given += 1;
                }
                if let Some(post) = self.posts.get_mut(post_id.index()) {
                    post.liked_by.insert(liker);
                }
            }
            LedgerFact::CommentAdded {
                comment_id,
                commenter,
                content,
                image,
                created_at,
            } => {
                if let Some(user) = self.users.get_mut(&commenter) {
                    user.stats.comment_count += 1;
                }
                if let Some(post) = self.posts.get_mut(comment_id.post_id.index()) {
                    post.comments.push(Comment {
                        id: comment_id,
                        commenter,
                        content,
                        image,
                        timestamp: created_at,
                        liked_by: BTreeSet::new(),
                    });
                }
            }
            LedgerFact::CommentLiked {
                comment_id, liker, ..
            } => {
                if let Some(user) = self.users.get_mut(&liker) {
                    user.stats.likes_given += 1;
                }
                let comment = self
                    .posts
                    .get_mut(comment_id.post_id.index())
                    .and_then(|post| {
                        usize::try_from(comment_id.index)
                            .ok()
                            .and_then(|i| post.comments.get_mut(i))
                    });
                if let Some(comment) = comment {
                    comment.liked_by.insert(liker);
                }
            }
        }
    }
}

fn check_content(content: &str, max: usize) -> Result<()> {
    if content.is_empty() {
        return Err(LedgerError::EmptyContent);
    }
    let length = content.chars().count();
    if length > max {
        return Err(LedgerError::content_too_long(length, max));
    }
    Ok(())
}

fn window<T>(items: &[T], start: u64, limit: usize) -> &[T] {
    let start = usize::try_from(start).unwrap_or(usize::MAX).min(items.len());
    let end = start.saturating_add(limit).min(items.len());
    &items[start..end]
}
