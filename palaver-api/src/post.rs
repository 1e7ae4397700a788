use std::str::FromStr;

use uuid::Uuid;

use crate::{Error, Time, UserId, STUB_UUID};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct PostId(pub Uuid);

impl PostId {
    pub fn stub() -> PostId {
        PostId(STUB_UUID)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Active,
    Inactive,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Active => "active",
            PostStatus::Inactive => "inactive",
        }
    }
}

impl FromStr for PostStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<PostStatus> {
        match s {
            "active" => Ok(PostStatus::Active),
            "inactive" => Ok(PostStatus::Inactive),
            _ => Err(anyhow::anyhow!("unknown post status {s:?}")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub title: String,
    pub description: String,
    pub status: PostStatus,
    pub created_at: Time,
}

impl Post {
    pub fn new(author: UserId, data: NewPost) -> Post {
        Post {
            id: PostId(Uuid::new_v4()),
            author,
            title: data.title,
            description: data.description,
            status: PostStatus::Active,
            created_at: chrono::Utc::now(),
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewPost {
    pub title: String,
    pub description: String,
}

impl NewPost {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_required("title", &self.title)?;
        crate::validate_required("description", &self.description)?;
        Ok(())
    }
}
