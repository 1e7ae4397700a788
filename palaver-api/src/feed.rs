use crate::{Comment, CommentId, Post, PostId};

/// Server-to-client frames on the live feed. Every event except
/// `post:new` is scoped to one post's topic; `post:new` goes to every
/// connected socket.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "event", content = "data")]
pub enum FeedMessage {
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "post:new")]
    NewPost(Post),
    #[serde(rename = "comment:new")]
    NewComment(Comment),
    #[serde(rename = "comment:update")]
    CommentUpdated(Comment),
    /// Carries only the subtree root; clients prune the descendants
    /// they already hold.
    #[serde(rename = "comment:delete")]
    CommentDeleted(CommentId),
    #[serde(rename = "comment:reaction", rename_all = "camelCase")]
    CommentReaction {
        comment_id: CommentId,
        likes: usize,
        dislikes: usize,
    },
}

/// Client-to-server frames, sent as websocket text messages after the
/// token handshake.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "op", content = "data")]
pub enum ClientMessage {
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "join")]
    JoinPost(PostId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn reaction_events_keep_their_wire_shape() {
        let id = CommentId(Uuid::from_u128(7));
        let json = serde_json::to_value(&FeedMessage::CommentReaction {
            comment_id: id,
            likes: 2,
            dislikes: 1,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "comment:reaction",
                "data": { "commentId": id.0, "likes": 2, "dislikes": 1 },
            })
        );
    }

    #[test]
    fn delete_events_carry_the_root_id() {
        let id = CommentId(Uuid::from_u128(9));
        let json = serde_json::to_value(&FeedMessage::CommentDeleted(id)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "event": "comment:delete", "data": id.0 })
        );
    }

    #[test]
    fn join_frames_parse() {
        let post = PostId(Uuid::from_u128(4));
        let msg: ClientMessage =
            serde_json::from_str(&format!(r#"{{"op":"join","data":"{}"}}"#, post.0)).unwrap();
        assert_eq!(msg, ClientMessage::JoinPost(post));
        let msg: ClientMessage = serde_json::from_str(r#"{"op":"ping"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Ping);
    }
}
