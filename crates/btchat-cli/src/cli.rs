//! Argument definitions for the `btchat` binary.

use btchat_ledger::{Address, CommentId, LedgerCommand, PostId, ProfileUpdate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default journal location, relative to the working directory.
pub const DEFAULT_JOURNAL: &str = ".btchat/ledger.jsonl";

#[derive(Debug, Parser)]
#[command(name = "btchat")]
#[command(about = "BTChat - social feed ledger operator tool", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, env = "BTCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Journal file path
    #[arg(short, long, global = true, env = "BTCHAT_JOURNAL", default_value = DEFAULT_JOURNAL)]
    pub journal: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register an address with a display name
    Register { address: Address, username: String },

    /// Profile updates
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Publish a post
    Post {
        address: Address,
        content: String,

        /// Media URI to attach
        #[arg(long)]
        image: Option<String>,

        /// Mark the post as a repost of this post id
        #[arg(long)]
        repost_of: Option<PostId>,
    },

    /// Repost an existing post
    Repost {
        address: Address,
        post_id: PostId,

        /// Replacement text; the original text is reused when omitted
        #[arg(long)]
        comment: Option<String>,
    },

    /// Like a post
    Like { address: Address, post_id: PostId },

    /// Like a comment
    LikeComment {
        address: Address,
        post_id: PostId,
        index: u64,
    },

    /// Comment on a post
    Comment {
        address: Address,
        post_id: PostId,
        content: String,

        /// Media URI to attach
        #[arg(long)]
        image: Option<String>,
    },

    /// Read records
    #[command(subcommand)]
    Show(ShowCommand),

    /// Print the effective configuration
    Config,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Replace the whole profile
    Edit {
        address: Address,

        #[arg(long)]
        username: String,

        #[arg(long)]
        image: Option<String>,

        #[arg(long)]
        bio: Option<String>,

        #[arg(long)]
        cover: Option<String>,

        /// Interest tag, repeatable
        #[arg(long = "interest")]
        interests: Vec<String>,
    },

    /// Set or clear (with an empty URI) the profile image
    Image { address: Address, uri: String },

    /// Set or clear (with an empty URI) the cover photo
    Cover { address: Address, uri: String },
}

#[derive(Debug, Subcommand)]
pub enum ShowCommand {
    /// A registered user
    User { address: Address },

    /// A single post
    Post { post_id: PostId },

    /// A single comment
    Comment { post_id: PostId, index: u64 },

    /// Activity counters of a user
    Stats { address: Address },

    /// Free posts left for a user
    Quota { address: Address },

    /// Number of posts
    Count,

    /// Comments on a post
    Comments {
        post_id: PostId,

        #[arg(long, default_value = "0")]
        start: u64,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Posts with readable timestamps
    Feed {
        #[arg(long, default_value = "0")]
        start: u64,

        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

impl Commands {
    /// The ledger command this invocation maps to, if it maps to one.
    ///
    /// `show feed` and `config` are rendered by the CLI itself.
    pub fn into_ledger_command(self) -> Option<LedgerCommand> {
        let command = match self {
            Commands::Register { address, username } => {
                LedgerCommand::RegisterUser { address, username }
            }
            Commands::Profile(profile) => profile.into_ledger_command(),
            Commands::Post {
                address,
                content,
                image,
                repost_of,
            } => LedgerCommand::CreatePost {
                address,
                content,
                image,
                original_post_id: repost_of,
            },
            Commands::Repost {
                address,
                post_id,
                comment,
            } => LedgerCommand::Repost {
                address,
                post_id,
                comment,
            },
            Commands::Like { address, post_id } => LedgerCommand::LikePost { address, post_id },
            Commands::LikeComment {
                address,
                post_id,
                index,
            } => LedgerCommand::LikeComment {
                address,
                comment_id: CommentId::new(post_id, index),
            },
            Commands::Comment {
                address,
                post_id,
                content,
                image,
            } => LedgerCommand::AddComment {
                address,
                post_id,
                content,
                image,
            },
            Commands::Show(show) => return show.into_ledger_command(),
            Commands::Config => return None,
        };
        Some(command)
    }
}

impl ProfileCommand {
    fn into_ledger_command(self) -> LedgerCommand {
        match self {
            ProfileCommand::Edit {
                address,
                username,
                image,
                bio,
                cover,
                interests,
            } => LedgerCommand::EditProfile {
                address,
                update: ProfileUpdate {
                    username,
                    profile_image: image,
                    bio,
                    cover_photo: cover,
                    interests,
                },
            },
            ProfileCommand::Image { address, uri } => {
                LedgerCommand::SetProfileImage { address, uri }
            }
            ProfileCommand::Cover { address, uri } => LedgerCommand::SetCoverPhoto { address, uri },
        }
    }
}

impl ShowCommand {
    fn into_ledger_command(self) -> Option<LedgerCommand> {
        let command = match self {
            ShowCommand::User { address } => LedgerCommand::GetUserByAddress { address },
            ShowCommand::Post { post_id } => LedgerCommand::GetPost { post_id },
            ShowCommand::Comment { post_id, index } => LedgerCommand::GetComment {
                comment_id: CommentId::new(post_id, index),
            },
            ShowCommand::Stats { address } => LedgerCommand::GetUserStats { address },
            ShowCommand::Quota { address } => LedgerCommand::GetFreePostsRemaining { address },
            ShowCommand::Count => LedgerCommand::GetPostsCount,
            ShowCommand::Comments {
                post_id,
                start,
                limit,
            } => LedgerCommand::ListComments {
                post_id,
                start,
                limit,
            },
            ShowCommand::Feed { .. } => return None,
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("btchat").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn register_maps_to_register_user() {
        let cli = parse(&["register", "0xa11ce", "Alice"]);
        assert_eq!(
            cli.command.into_ledger_command(),
            Some(LedgerCommand::RegisterUser {
                address: Address::new("0xa11ce").unwrap(),
                username: "Alice".into(),
            })
        );
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = parse(&["show", "count", "--journal", "/tmp/j.jsonl", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.journal, PathBuf::from("/tmp/j.jsonl"));
    }

    #[test]
    fn post_with_repost_reference() {
        let cli = parse(&["post", "bob", "quoting", "--repost-of", "3", "--image", "ipfs://x"]);
        assert_eq!(
            cli.command.into_ledger_command(),
            Some(LedgerCommand::CreatePost {
                address: Address::new("bob").unwrap(),
                content: "quoting".into(),
                image: Some("ipfs://x".into()),
                original_post_id: Some(PostId(3)),
            })
        );
    }

    #[test]
    fn profile_edit_collects_interests() {
        let cli = parse(&[
            "profile", "edit", "alice", "--username", "Alice", "--interest", "art", "--interest",
            "rust",
        ]);
        match cli.command.into_ledger_command() {
            Some(LedgerCommand::EditProfile { update, .. }) => {
                assert_eq!(update.username, "Alice");
                assert_eq!(update.interests, vec!["art".to_string(), "rust".to_string()]);
                assert_eq!(update.bio, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn like_comment_builds_comment_id() {
        let cli = parse(&["like-comment", "alice", "2", "1"]);
        assert_eq!(
            cli.command.into_ledger_command(),
            Some(LedgerCommand::LikeComment {
                address: Address::new("alice").unwrap(),
                comment_id: CommentId::new(PostId(2), 1),
            })
        );
    }

    #[test]
    fn feed_and_config_are_local() {
        assert_eq!(parse(&["show", "feed"]).command.into_ledger_command(), None);
        assert_eq!(parse(&["config"]).command.into_ledger_command(), None);
    }

    #[test]
    fn empty_address_is_a_usage_error() {
        assert!(Cli::try_parse_from(["btchat", "register", "", "Alice"]).is_err());
        assert!(Cli::try_parse_from(["btchat", "like", "alice", "not-a-number"]).is_err());
    }
}
