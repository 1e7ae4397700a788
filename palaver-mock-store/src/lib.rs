//! In-memory `CommentStore` for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use palaver_api::{Comment, CommentId, CommentSort, CommentStore, Post, PostId};

/// Backs the store contract with plain maps. Sorting mirrors what the
/// SQL store does, including the newest-first tie-break on reaction
/// sorts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: HashMap<PostId, Post>,
    comments: HashMap<CommentId, Comment>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Direct read access for test assertions.
    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.get(&id)
    }

    pub fn num_comments(&self) -> usize {
        self.comments.len()
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_post(&mut self, post: &Post) -> anyhow::Result<()> {
        self.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn fetch_post(&mut self, id: PostId) -> anyhow::Result<Option<Post>> {
        Ok(self.posts.get(&id).cloned())
    }

    async fn count_posts(&mut self) -> anyhow::Result<u64> {
        Ok(self.posts.len() as u64)
    }

    async fn posts_page(&mut self, offset: u64, limit: u32) -> anyhow::Result<Vec<Post>> {
        let mut posts: Vec<Post> = self.posts.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn insert_comment(&mut self, comment: &Comment) -> anyhow::Result<()> {
        self.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    async fn fetch_comment(&mut self, id: CommentId) -> anyhow::Result<Option<Comment>> {
        Ok(self.comments.get(&id).cloned())
    }

    async fn update_message(&mut self, id: CommentId, message: &str) -> anyhow::Result<()> {
        if let Some(c) = self.comments.get_mut(&id) {
            c.message = message.to_string();
        }
        Ok(())
    }

    async fn update_reactions(&mut self, comment: &Comment) -> anyhow::Result<()> {
        if let Some(c) = self.comments.get_mut(&comment.id) {
            c.favorites = comment.favorites.clone();
            c.dislikes = comment.dislikes.clone();
        }
        Ok(())
    }

    async fn children_of(&mut self, parents: &[CommentId]) -> anyhow::Result<Vec<CommentId>> {
        Ok(self
            .comments
            .values()
            .filter(|c| c.parent.map_or(false, |p| parents.contains(&p)))
            .map(|c| c.id)
            .collect())
    }

    async fn delete_comments(&mut self, ids: &[CommentId]) -> anyhow::Result<()> {
        for id in ids {
            self.comments.remove(id);
        }
        Ok(())
    }

    async fn count_comments(&mut self, post: PostId) -> anyhow::Result<u64> {
        Ok(self.comments.values().filter(|c| c.post == post).count() as u64)
    }

    async fn comments_page(
        &mut self,
        post: PostId,
        sort: CommentSort,
        offset: u64,
        limit: u32,
    ) -> anyhow::Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .comments
            .values()
            .filter(|c| c.post == post)
            .cloned()
            .collect();
        comments.sort_by(|a, b| match sort {
            CommentSort::Newest => b.created_at.cmp(&a.created_at),
            CommentSort::MostLiked => b
                .favorites
                .len()
                .cmp(&a.favorites.len())
                .then(b.created_at.cmp(&a.created_at)),
            CommentSort::MostDisliked => b
                .dislikes
                .len()
                .cmp(&a.dislikes.len())
                .then(b.created_at.cmp(&a.created_at)),
        });
        Ok(comments
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}
