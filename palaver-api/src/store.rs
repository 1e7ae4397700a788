use async_trait::async_trait;

use crate::{Comment, CommentId, CommentSort, Post, PostId};

/// What the mutation coordinator and the query service require of the
/// persistence layer.
///
/// Single-record writes are atomic. `delete_comments` removes its whole
/// id set in one call, and ids that are already gone are skipped, so a
/// retry after a partial failure is harmless. Implementations return
/// plain `anyhow` errors; domain refusals are decided by the callers.
#[async_trait]
pub trait CommentStore {
    async fn insert_post(&mut self, post: &Post) -> anyhow::Result<()>;
    async fn fetch_post(&mut self, id: PostId) -> anyhow::Result<Option<Post>>;
    async fn count_posts(&mut self) -> anyhow::Result<u64>;
    /// Newest first.
    async fn posts_page(&mut self, offset: u64, limit: u32) -> anyhow::Result<Vec<Post>>;

    async fn insert_comment(&mut self, comment: &Comment) -> anyhow::Result<()>;
    async fn fetch_comment(&mut self, id: CommentId) -> anyhow::Result<Option<Comment>>;
    async fn update_message(&mut self, id: CommentId, message: &str) -> anyhow::Result<()>;
    /// Overwrites both reaction sets with `comment`'s in-memory state.
    async fn update_reactions(&mut self, comment: &Comment) -> anyhow::Result<()>;
    /// Ids of the direct replies to any of `parents`, in no particular
    /// order.
    async fn children_of(&mut self, parents: &[CommentId]) -> anyhow::Result<Vec<CommentId>>;
    async fn delete_comments(&mut self, ids: &[CommentId]) -> anyhow::Result<()>;

    async fn count_comments(&mut self, post: PostId) -> anyhow::Result<u64>;
    /// One page of `post`'s comments in `sort` order, newest first within
    /// equal reaction counts.
    async fn comments_page(
        &mut self,
        post: PostId,
        sort: CommentSort,
        offset: u64,
        limit: u32,
    ) -> anyhow::Result<Vec<Comment>>;
}
