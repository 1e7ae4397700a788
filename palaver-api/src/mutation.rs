//! Applies comment mutations to a store, enforcing ownership and the
//! parent/post invariants. Broadcasting the outcome is the caller's job,
//! right after the store write returns, so that subscribers of a post
//! observe events in commit order.
//!
//! All functions return domain refusals in the inner `Result`; the outer
//! one carries store failures only.

use anyhow::Context;

use crate::{
    Comment, CommentId, CommentStore, Error, NewComment, PostId, ReactionCounts, UserId,
};

/// Outcome of a cascading delete: the subtree root plus everything that
/// was removed with it. Only the root is announced to clients, which
/// prune the descendants they already hold.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeletedSubtree {
    pub post: PostId,
    pub root: CommentId,
    pub removed: Vec<CommentId>,
}

pub async fn create_comment<S: CommentStore>(
    store: &mut S,
    author: UserId,
    data: NewComment,
) -> anyhow::Result<Result<Comment, Error>> {
    if let Err(e) = data.validate() {
        return Ok(Err(e));
    }
    if store
        .fetch_post(data.post)
        .await
        .with_context(|| format!("checking post {:?} exists", data.post))?
        .is_none()
    {
        return Ok(Err(Error::PostNotFound(data.post)));
    }
    if let Some(parent) = data.parent {
        match store
            .fetch_comment(parent)
            .await
            .with_context(|| format!("fetching parent comment {:?}", parent))?
        {
            // a reply lives in its parent's post, anything else would let
            // a comment chain escape its post's topic
            Some(p) if p.post == data.post => (),
            _ => return Ok(Err(Error::CommentNotFound(parent))),
        }
    }
    let comment = Comment::new(author, data);
    store
        .insert_comment(&comment)
        .await
        .with_context(|| format!("inserting comment {:?}", comment.id))?;
    Ok(Ok(comment))
}

/// Owner-only: replaces the message, everything else is preserved.
pub async fn update_comment<S: CommentStore>(
    store: &mut S,
    requester: UserId,
    id: CommentId,
    message: String,
) -> anyhow::Result<Result<Comment, Error>> {
    if let Err(e) = crate::validate_required("message", &message) {
        return Ok(Err(e));
    }
    let mut comment = match store
        .fetch_comment(id)
        .await
        .with_context(|| format!("fetching comment {:?}", id))?
    {
        None => return Ok(Err(Error::CommentNotFound(id))),
        Some(c) => c,
    };
    if comment.author != requester {
        return Ok(Err(Error::PermissionDenied));
    }
    store
        .update_message(id, &message)
        .await
        .with_context(|| format!("updating message of comment {:?}", id))?;
    comment.message = message;
    Ok(Ok(comment))
}

/// Owner-only cascading delete. The whole subtree is resolved upfront
/// with breadth-first `children_of` expansions, then removed in a single
/// bulk store call: no per-node round-trips, and no window in which a
/// reply outlives its parent.
pub async fn delete_comment<S: CommentStore>(
    store: &mut S,
    requester: UserId,
    id: CommentId,
) -> anyhow::Result<Result<DeletedSubtree, Error>> {
    let comment = match store
        .fetch_comment(id)
        .await
        .with_context(|| format!("fetching comment {:?}", id))?
    {
        None => return Ok(Err(Error::CommentNotFound(id))),
        Some(c) => c,
    };
    if comment.author != requester {
        return Ok(Err(Error::PermissionDenied));
    }
    let removed = collect_subtree(&mut *store, id)
        .await
        .with_context(|| format!("collecting subtree of comment {:?}", id))?;
    store
        .delete_comments(&removed)
        .await
        .with_context(|| format!("deleting subtree of comment {:?}", id))?;
    Ok(Ok(DeletedSubtree {
        post: comment.post,
        root: id,
        removed,
    }))
}

/// Collect `root` plus all of its transitive replies, breadth first.
/// Parents always precede their children in the returned order.
pub async fn collect_subtree<S: CommentStore>(
    store: &mut S,
    root: CommentId,
) -> anyhow::Result<Vec<CommentId>> {
    let mut all = vec![root];
    let mut frontier = vec![root];
    while !frontier.is_empty() {
        frontier = store
            .children_of(&frontier)
            .await
            .context("expanding one level of replies")?;
        all.extend(frontier.iter().copied());
    }
    Ok(all)
}

/// Any authenticated user may react; see `Comment::toggle_favorite` for
/// the flip semantics. Returns the comment (post id included, for
/// broadcast scoping) along with the recomputed counts.
pub async fn toggle_favorite<S: CommentStore>(
    store: &mut S,
    user: UserId,
    id: CommentId,
) -> anyhow::Result<Result<(Comment, ReactionCounts), Error>> {
    let mut comment = match store
        .fetch_comment(id)
        .await
        .with_context(|| format!("fetching comment {:?}", id))?
    {
        None => return Ok(Err(Error::CommentNotFound(id))),
        Some(c) => c,
    };
    let counts = comment.toggle_favorite(user);
    store
        .update_reactions(&comment)
        .await
        .with_context(|| format!("saving reactions of comment {:?}", id))?;
    Ok(Ok((comment, counts)))
}

pub async fn toggle_dislike<S: CommentStore>(
    store: &mut S,
    user: UserId,
    id: CommentId,
) -> anyhow::Result<Result<(Comment, ReactionCounts), Error>> {
    let mut comment = match store
        .fetch_comment(id)
        .await
        .with_context(|| format!("fetching comment {:?}", id))?
    {
        None => return Ok(Err(Error::CommentNotFound(id))),
        Some(c) => c,
    };
    let counts = comment.toggle_dislike(user);
    store
        .update_reactions(&comment)
        .await
        .with_context(|| format!("saving reactions of comment {:?}", id))?;
    Ok(Ok((comment, counts)))
}
