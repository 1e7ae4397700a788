use std::collections::HashSet;

use uuid::Uuid;

use crate::{Error, PostId, Time, UserId, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    pub author: UserId,

    /// None marks a root comment. When set, the parent is a comment of
    /// the same post, so a reply chain can never leave its post.
    pub parent: Option<CommentId>,

    pub message: String,

    /// Users who liked this comment. Disjoint from `dislikes`: the toggle
    /// operations below are the only writers and they clear the opposite
    /// side on every flip.
    pub favorites: HashSet<UserId>,
    pub dislikes: HashSet<UserId>,

    pub created_at: Time,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ReactionCounts {
    pub likes: usize,
    pub dislikes: usize,
}

impl Comment {
    pub fn new(author: UserId, data: NewComment) -> Comment {
        Comment {
            id: CommentId(Uuid::new_v4()),
            post: data.post,
            author,
            parent: data.parent,
            message: data.message,
            favorites: HashSet::new(),
            dislikes: HashSet::new(),
            created_at: chrono::Utc::now(),
        }
    }

    pub fn counts(&self) -> ReactionCounts {
        ReactionCounts {
            likes: self.favorites.len(),
            dislikes: self.dislikes.len(),
        }
    }

    /// Flip `user`'s like. A standing dislike is cleared either way.
    pub fn toggle_favorite(&mut self, user: UserId) -> ReactionCounts {
        self.dislikes.remove(&user);
        if !self.favorites.remove(&user) {
            self.favorites.insert(user);
        }
        self.counts()
    }

    /// Flip `user`'s dislike. A standing like is cleared either way.
    pub fn toggle_dislike(&mut self, user: UserId) -> ReactionCounts {
        self.favorites.remove(&user);
        if !self.dislikes.remove(&user) {
            self.dislikes.insert(user);
        }
        self.counts()
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub message: String,
    #[serde(rename = "postId")]
    pub post: PostId,
    #[serde(default, rename = "parentId")]
    pub parent: Option<CommentId>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_required("message", &self.message)
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct UpdateComment {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment() -> Comment {
        Comment::new(
            UserId::stub(),
            NewComment {
                message: String::from("hello"),
                post: PostId::stub(),
                parent: None,
            },
        )
    }

    fn user(n: u128) -> UserId {
        UserId(Uuid::from_u128(n))
    }

    #[test]
    fn toggling_twice_restores_membership() {
        let mut c = comment();
        let u = user(1);

        assert_eq!(c.toggle_favorite(u).likes, 1);
        assert_eq!(c.toggle_favorite(u).likes, 0);
        assert!(c.favorites.is_empty() && c.dislikes.is_empty());

        assert_eq!(c.toggle_dislike(u).dislikes, 1);
        assert_eq!(c.toggle_dislike(u).dislikes, 0);
        assert!(c.favorites.is_empty() && c.dislikes.is_empty());
    }

    #[test]
    fn like_and_dislike_are_mutually_exclusive() {
        let mut c = comment();
        let u = user(1);

        // Whatever sequence of toggles runs, the user is never in both sets
        let toggles: [fn(&mut Comment, UserId) -> ReactionCounts; 6] = [
            Comment::toggle_favorite,
            Comment::toggle_dislike,
            Comment::toggle_dislike,
            Comment::toggle_favorite,
            Comment::toggle_favorite,
            Comment::toggle_dislike,
        ];
        for toggle in toggles {
            toggle(&mut c, u);
            assert!(!(c.favorites.contains(&u) && c.dislikes.contains(&u)));
        }
    }

    #[test]
    fn disliking_clears_a_standing_like() {
        let mut c = comment();
        let u = user(1);

        c.toggle_favorite(u);
        let counts = c.toggle_dislike(u);
        assert_eq!(
            counts,
            ReactionCounts {
                likes: 0,
                dislikes: 1
            }
        );

        let counts = c.toggle_favorite(u);
        assert_eq!(
            counts,
            ReactionCounts {
                likes: 1,
                dislikes: 0
            }
        );
    }

    #[test]
    fn counts_are_per_user() {
        let mut c = comment();
        c.toggle_favorite(user(1));
        c.toggle_favorite(user(2));
        c.toggle_dislike(user(3));
        assert_eq!(
            c.counts(),
            ReactionCounts {
                likes: 2,
                dislikes: 1
            }
        );
    }
}
