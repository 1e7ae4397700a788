use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

use crate::{CommentId, PostId};

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Invalid or missing credentials")]
    Unauthorized,

    #[error("Post not found: {0:?}")]
    PostNotFound(PostId),

    #[error("Comment not found: {0:?}")]
    CommentNotFound(CommentId),

    #[error("Email already used {0}")]
    EmailAlreadyUsed(String),

    #[error("Missing required field {0}")]
    MissingField(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),
}

impl Error {
    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::PostNotFound(_) => StatusCode::NOT_FOUND,
            Error::CommentNotFound(_) => StatusCode::NOT_FOUND,
            Error::EmailAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::MissingField(_) => StatusCode::BAD_REQUEST,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::PermissionDenied => json!({
                "message": "permission denied",
                "type": "permission-denied",
            }),
            Error::Unauthorized => json!({
                "message": "invalid or missing credentials",
                "type": "unauthorized",
            }),
            Error::PostNotFound(p) => json!({
                "message": "post not found",
                "type": "post-not-found",
                "post": p.0,
            }),
            Error::CommentNotFound(c) => json!({
                "message": "comment not found",
                "type": "comment-not-found",
                "comment": c.0,
            }),
            Error::EmailAlreadyUsed(e) => json!({
                "message": "email already used",
                "type": "conflict-email",
                "email": e,
            }),
            Error::MissingField(f) => json!({
                "message": format!("missing required field {f}"),
                "type": "missing-field",
                "field": f,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        Ok(
            match data
                .get("type")
                .and_then(|t| t.as_str())
                .ok_or_else(|| anyhow!("error type is not a string"))?
            {
                "unknown" => Error::Unknown(String::from(
                    data.get("message")
                        .and_then(|msg| msg.as_str())
                        .unwrap_or(""),
                )),
                "permission-denied" => Error::PermissionDenied,
                "unauthorized" => Error::Unauthorized,
                "post-not-found" => Error::PostNotFound(PostId(
                    data.get("post")
                        .and_then(|p| p.as_str())
                        .and_then(|p| Uuid::from_str(p).ok())
                        .ok_or_else(|| anyhow!("error is a post-not-found without a proper id"))?,
                )),
                "comment-not-found" => Error::CommentNotFound(CommentId(
                    data.get("comment")
                        .and_then(|c| c.as_str())
                        .and_then(|c| Uuid::from_str(c).ok())
                        .ok_or_else(|| {
                            anyhow!("error is a comment-not-found without a proper id")
                        })?,
                )),
                "conflict-email" => Error::EmailAlreadyUsed(String::from(
                    data.get("email")
                        .and_then(|e| e.as_str())
                        .ok_or_else(|| anyhow!("error is an email conflict without an email"))?,
                )),
                "missing-field" => Error::MissingField(String::from(
                    data.get("field").and_then(|f| f.as_str()).ok_or_else(|| {
                        anyhow!("error is about a missing field but no field was provided")
                    })?,
                )),
                "null-byte" => Error::NullByteInString(String::from(
                    data.get("string").and_then(|s| s.as_str()).ok_or_else(|| {
                        anyhow!("error is a null-byte-in-string without a string")
                    })?,
                )),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contents_round_trip_through_parse() {
        let errors = [
            Error::Unknown(String::from("boom")),
            Error::PermissionDenied,
            Error::Unauthorized,
            Error::PostNotFound(PostId::stub()),
            Error::CommentNotFound(CommentId::stub()),
            Error::EmailAlreadyUsed(String::from("a@b.c")),
            Error::MissingField(String::from("message")),
            Error::NullByteInString(String::from("a\0b")),
        ];
        for e in errors {
            assert_eq!(Error::parse(&e.contents()).unwrap(), e);
        }
    }

    #[test]
    fn validation_helpers_map_to_400_class_errors() {
        assert_eq!(
            crate::validate_required("message", "").unwrap_err(),
            Error::MissingField(String::from("message"))
        );
        assert_eq!(
            crate::validate_string("a\0b").unwrap_err(),
            Error::NullByteInString(String::from("a\0b"))
        );
        assert!(crate::validate_required("message", "hi").is_ok());
    }
}
