//! Command surface
//!
//! [`LedgerCommand`] is the serializable form of every ledger operation.
//! Transports (the CLI, the actor handle) speak commands so that operation
//! names, arguments and error codes stay identical regardless of how a
//! request reaches the engine.

use crate::identifiers::{Address, CommentId, PostId};
use crate::records::{CommentView, PostReceipt, PostView, ProfileUpdate, UserStats, UserView};
use serde::{Deserialize, Serialize};

/// A request to the ledger engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerCommand {
    /// Create a user record for `address`
    RegisterUser {
        /// Address to register
        address: Address,
        /// Initial display name
        username: String,
    },
    /// Replace a user's profile
    EditProfile {
        /// Registered address
        address: Address,
        /// Replacement profile
        update: ProfileUpdate,
    },
    /// Replace a user's avatar
    SetProfileImage {
        /// Registered address
        address: Address,
        /// New URI, empty to clear
        uri: String,
    },
    /// Replace a user's banner
    SetCoverPhoto {
        /// Registered address
        address: Address,
        /// New URI, empty to clear
        uri: String,
    },
    /// Append a post
    CreatePost {
        /// Author
        address: Address,
        /// Text
        content: String,
        /// Optional media URI
        #[serde(default)]
        image: Option<String>,
        /// Optional reposted post
        #[serde(default)]
        original_post_id: Option<PostId>,
    },
    /// Repost an existing post
    Repost {
        /// Author of the repost
        address: Address,
        /// Post being reposted
        post_id: PostId,
        /// Optional replacement text
        #[serde(default)]
        comment: Option<String>,
    },
    /// Like a post
    LikePost {
        /// Liker
        address: Address,
        /// Post to like
        post_id: PostId,
    },
    /// Append a comment to a post
    AddComment {
        /// Commenter
        address: Address,
        /// Post to comment on
        post_id: PostId,
        /// Text
        content: String,
        /// Optional media URI
        #[serde(default)]
        image: Option<String>,
    },
    /// Like a comment
    LikeComment {
        /// Liker
        address: Address,
        /// Comment to like
        comment_id: CommentId,
    },
    /// Read a user
    GetUserByAddress {
        /// Address to look up
        address: Address,
    },
    /// Read the number of posts
    GetPostsCount,
    /// Read a post
    GetPost {
        /// Post to read
        post_id: PostId,
    },
    /// Read a comment
    GetComment {
        /// Comment to read
        comment_id: CommentId,
    },
    /// Read a user's free post allowance
    GetFreePostsRemaining {
        /// Address to look up
        address: Address,
    },
    /// Read a user's activity counters
    GetUserStats {
        /// Address to look up
        address: Address,
    },
    /// Read a window of posts
    ListPosts {
        /// First post id
        start: u64,
        /// Maximum number of posts
        limit: usize,
    },
    /// Read a window of a post's comments
    ListComments {
        /// Post whose comments to read
        post_id: PostId,
        /// First comment index
        start: u64,
        /// Maximum number of comments
        limit: usize,
    },
}

impl LedgerCommand {
    /// Operation name, matching the ledger's public operation surface.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RegisterUser { .. } => "registerUser",
            Self::EditProfile { .. } => "editProfile",
            Self::SetProfileImage { .. } => "setProfileImage",
            Self::SetCoverPhoto { .. } => "setCoverPhoto",
            Self::CreatePost { .. } => "createPost",
            Self::Repost { .. } => "repost",
            Self::LikePost { .. } => "likePost",
            Self::AddComment { .. } => "addComment",
            Self::LikeComment { .. } => "likeComment",
            Self::GetUserByAddress { .. } => "getUserByAddress",
            Self::GetPostsCount => "getPostsCount",
            Self::GetPost { .. } => "getPost",
            Self::GetComment { .. } => "getComment",
            Self::GetFreePostsRemaining { .. } => "getFreePostsRemaining",
            Self::GetUserStats { .. } => "getUserStats",
            Self::ListPosts { .. } => "listPosts",
            Self::ListComments { .. } => "listComments",
        }
    }

    /// Whether executing this command can change ledger state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::RegisterUser { .. }
                | Self::EditProfile { .. }
                | Self::SetProfileImage { .. }
                | Self::SetCoverPhoto { .. }
                | Self::CreatePost { .. }
                | Self::Repost { .. }
                | Self::LikePost { .. }
                | Self::AddComment { .. }
                | Self::LikeComment { .. }
        )
    }
}

/// Result of a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "value", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// User registered under this address
    Registered(Address),
    /// Profile field(s) updated
    ProfileUpdated,
    /// Post appended
    PostCreated(PostReceipt),
    /// Like recorded
    Liked,
    /// Comment appended
    CommentAdded(CommentId),
    /// User read
    User(UserView),
    /// Post count read
    PostsCount(u64),
    /// Post read
    Post(PostView),
    /// Comment read
    Comment(CommentView),
    /// Free post allowance read
    FreePostsRemaining(u32),
    /// Activity counters read
    Stats(UserStats),
    /// Post window read
    Posts(Vec<PostView>),
    /// Comment window read
    Comments(Vec<CommentView>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_round_trip_as_tagged_json() {
        let json = r#"{"op":"create_post","address":"0xa","content":"Hello World"}"#;
        let command: LedgerCommand = serde_json::from_str(json).unwrap();
        assert_eq!(
            command,
            LedgerCommand::CreatePost {
                address: Address::new("0xa").unwrap(),
                content: "Hello World".into(),
                image: None,
                original_post_id: None,
            }
        );
        assert_eq!(command.name(), "createPost");
        assert!(command.is_mutation());
    }

    #[test]
    fn reads_are_not_mutations() {
        assert!(!LedgerCommand::GetPostsCount.is_mutation());
        assert!(!LedgerCommand::ListPosts { start: 0, limit: 1 }.is_mutation());
    }
}
