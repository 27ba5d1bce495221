use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Identity;

/// Unique post identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

impl PostId {
    pub fn new() -> Self {
        Self(format!("post-{}", uuid::Uuid::new_v4()))
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Book a post is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedBook {
    pub title: String,
    pub author: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub author_id: Identity,
    pub author_name: String,
    pub content: String,
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: Identity,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub images: Vec<String>,
    pub book: Option<AttachedBook>,
    pub views: u64,
    /// Oldest first.
    pub comments: Vec<Comment>,
    pub created_at: u64,
}

/// What a member submits when writing a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub book: Option<AttachedBook>,
}

/// Listing entry: a post without its comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: PostId,
    pub author_name: String,
    pub title: String,
    pub views: u64,
    pub comment_count: usize,
    pub created_at: u64,
}

impl From<&Post> for PostSummary {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.clone(),
            author_name: post.author_name.clone(),
            title: post.title.clone(),
            views: post.views,
            comment_count: post.comments.len(),
            created_at: post.created_at,
        }
    }
}
