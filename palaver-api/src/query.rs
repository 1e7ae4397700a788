//! Read side: assembles paginated, tree-shaped responses from the flat
//! store.

use anyhow::Context;

use crate::{
    build_comment_tree, CommentStore, Error, PageQuery, Pagination, PostId, PostList, PostPage,
};

/// One post plus one nested page of its comments.
///
/// `total` counts all of the post's comments, independent of the page
/// slice. Sorting and slicing happen on the flat comment list; the tree
/// builder then reattaches whatever replies landed on this page (see
/// `build_comment_tree` for the pseudo-root policy).
pub async fn post_with_comments<S: CommentStore>(
    store: &mut S,
    id: PostId,
    q: &PageQuery,
) -> anyhow::Result<Result<PostPage, Error>> {
    let post = match store
        .fetch_post(id)
        .await
        .with_context(|| format!("fetching post {:?}", id))?
    {
        None => return Ok(Err(Error::PostNotFound(id))),
        Some(p) => p,
    };
    let total = store
        .count_comments(post.id)
        .await
        .with_context(|| format!("counting comments of post {:?}", post.id))?;
    let comments = store
        .comments_page(post.id, q.sort(), q.offset(), q.limit())
        .await
        .with_context(|| format!("fetching comment page of post {:?}", post.id))?;
    Ok(Ok(PostPage {
        pagination: Pagination::new(total, q.page(), q.limit()),
        comments: build_comment_tree(comments),
        post,
    }))
}

/// Paginated post listing, newest first.
pub async fn list_posts<S: CommentStore>(
    store: &mut S,
    q: &PageQuery,
) -> anyhow::Result<PostList> {
    let total = store.count_posts().await.context("counting posts")?;
    let posts = store
        .posts_page(q.offset(), q.limit())
        .await
        .context("fetching posts page")?;
    Ok(PostList {
        posts,
        pagination: Pagination::new(total, q.page(), q.limit()),
    })
}
