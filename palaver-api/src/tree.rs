use std::collections::{HashMap, HashSet};

use crate::{Comment, CommentId};

/// A comment together with its replies, as returned to clients. Built
/// per-request from one page of comments and never persisted.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub children: Vec<CommentNode>,
}

/// Rebuild the reply hierarchy of one page of comments.
///
/// The input is the flat, already-sorted page; the output preserves input
/// order both for roots and inside every `children` list. A comment whose
/// parent is not part of the input is surfaced as a root: pagination
/// slices the flat sort order, not the tree, so a reply whose parent fell
/// on another page (or was deleted concurrently) shows up detached.
/// Clients rely on that exact behavior, do not resolve missing parents
/// through the store here.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<CommentNode> {
    let in_page: HashSet<CommentId> = comments.iter().map(|c| c.id).collect();

    // First pass: group every comment under its in-page parent.
    let mut replies: HashMap<CommentId, Vec<Comment>> = HashMap::new();
    let mut roots = Vec::new();
    for c in comments {
        match c.parent {
            Some(p) if p != c.id && in_page.contains(&p) => {
                replies.entry(p).or_insert_with(Vec::new).push(c)
            }
            _ => roots.push(c),
        }
    }

    // Second pass: hang the grouped replies below their parents.
    roots
        .into_iter()
        .map(|c| attach_replies(c, &mut replies))
        .collect()
}

fn attach_replies(comment: Comment, replies: &mut HashMap<CommentId, Vec<Comment>>) -> CommentNode {
    let children = replies
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|c| attach_replies(c, &mut *replies))
        .collect();
    CommentNode { comment, children }
}
