/// Group board: posts and comments visible to admitted members.
///
/// Every call checks the caller against the current group snapshot, so a
/// member who leaves or is removed loses access on the next call. Posts
/// they already wrote stay on the board.
pub mod types;

pub use types::{AttachedBook, Comment, Post, PostDraft, PostId, PostSummary};

use indexmap::IndexMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::GroupError;
use crate::group::access::{can_post, can_view_board};
use crate::group::registry::GroupRegistry;
use crate::group::types::{Group, GroupId};
use crate::types::{now_ms, Caller, Identity};

pub struct GroupBoard {
    registry: Arc<GroupRegistry>,
    posts: Mutex<IndexMap<GroupId, Vec<Post>>>,
}

impl GroupBoard {
    pub fn new(registry: Arc<GroupRegistry>) -> Self {
        Self {
            registry,
            posts: Mutex::new(IndexMap::new()),
        }
    }

    fn readable(&self, group_id: &GroupId, reader: &Identity) -> Result<Arc<Group>, GroupError> {
        let group = self.registry.get_group(group_id)?;
        if !can_view_board(&group, reader) {
            tracing::debug!(group = %group_id, reader = %reader, "board read refused");
            return Err(GroupError::permission("only members can read the board"));
        }
        Ok(group)
    }

    fn writable(&self, group_id: &GroupId, writer: &Identity) -> Result<Arc<Group>, GroupError> {
        let group = self.registry.get_group(group_id)?;
        if !can_post(&group, writer) {
            tracing::debug!(group = %group_id, writer = %writer, "board write refused");
            return Err(GroupError::permission("only members can write to the board"));
        }
        Ok(group)
    }

    /// Publish a post. Title and content must be non-blank.
    pub fn write_post(
        &self,
        group_id: &GroupId,
        author: &Caller,
        draft: PostDraft,
    ) -> Result<Post, GroupError> {
        self.writable(group_id, &author.id)?;
        let title = draft.title.trim();
        let content = draft.content.trim();
        if title.is_empty() {
            return Err(GroupError::validation("post title must not be empty"));
        }
        if content.is_empty() {
            return Err(GroupError::validation("post content must not be empty"));
        }

        let post = Post {
            id: PostId::new(),
            author_id: author.id.clone(),
            author_name: author.display_name.clone(),
            title: title.to_string(),
            content: content.to_string(),
            images: draft.images.into_iter().filter(|i| !i.trim().is_empty()).collect(),
            book: draft.book,
            views: 0,
            comments: Vec::new(),
            created_at: now_ms(),
        };
        let mut posts = self.posts.lock().unwrap_or_else(PoisonError::into_inner);
        posts.entry(group_id.clone()).or_default().push(post.clone());
        tracing::debug!(group = %group_id, post = %post.id, "post published");
        Ok(post)
    }

    /// Post summaries, newest first.
    pub fn posts(
        &self,
        group_id: &GroupId,
        reader: &Identity,
    ) -> Result<Vec<PostSummary>, GroupError> {
        self.readable(group_id, reader)?;
        let posts = self.posts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(posts
            .get(group_id)
            .map(|list| list.iter().rev().map(PostSummary::from).collect())
            .unwrap_or_default())
    }

    /// Full post with comments. Counts as one view.
    pub fn open_post(
        &self,
        group_id: &GroupId,
        reader: &Identity,
        post_id: &PostId,
    ) -> Result<Post, GroupError> {
        self.readable(group_id, reader)?;
        let mut posts = self.posts.lock().unwrap_or_else(PoisonError::into_inner);
        let post = find_post(&mut posts, group_id, post_id)?;
        post.views += 1;
        Ok(post.clone())
    }

    pub fn add_comment(
        &self,
        group_id: &GroupId,
        author: &Caller,
        post_id: &PostId,
        content: &str,
    ) -> Result<Post, GroupError> {
        self.writable(group_id, &author.id)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(GroupError::validation("comment must not be empty"));
        }
        let mut posts = self.posts.lock().unwrap_or_else(PoisonError::into_inner);
        let post = find_post(&mut posts, group_id, post_id)?;
        post.comments.push(Comment {
            author_id: author.id.clone(),
            author_name: author.display_name.clone(),
            content: content.to_string(),
            created_at: now_ms(),
        });
        Ok(post.clone())
    }
}

fn find_post<'a>(
    posts: &'a mut IndexMap<GroupId, Vec<Post>>,
    group_id: &GroupId,
    post_id: &PostId,
) -> Result<&'a mut Post, GroupError> {
    posts
        .get_mut(group_id)
        .and_then(|list| list.iter_mut().find(|p| &p.id == post_id))
        .ok_or_else(|| GroupError::not_found(format!("post {post_id}")))
}
