use std::str::FromStr;

use anyhow::{anyhow, Context};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("No {what} with id {id}")]
    NotFound { what: String, id: Uuid },

    #[error("Comment body cannot be empty")]
    EmptyCommentBody,

    #[error("Blog title cannot be empty")]
    EmptyBlogTitle,

    #[error("Uuid already used {0}")]
    UuidAlreadyUsed(Uuid),

    #[error("Invalid Proof of Work")]
    InvalidPow,

    #[error("Name already used {0}")]
    NameAlreadyUsed(String),

    #[error("Null byte in string is not allowed {0:?}")]
    NullByteInString(String),

    #[error("Invalid character in name {0:?}")]
    InvalidName(String),
}

impl Error {
    pub fn not_found(what: &str, id: Uuid) -> Error {
        Error::NotFound {
            what: String::from(what),
            id,
        }
    }

    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::PermissionDenied => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::EmptyCommentBody => StatusCode::BAD_REQUEST,
            Error::EmptyBlogTitle => StatusCode::BAD_REQUEST,
            Error::UuidAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::InvalidPow => StatusCode::BAD_REQUEST,
            Error::NameAlreadyUsed(_) => StatusCode::CONFLICT,
            Error::NullByteInString(_) => StatusCode::BAD_REQUEST,
            Error::InvalidName(_) => StatusCode::BAD_REQUEST,
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
            Error::NotFound { what, id } => json!({
                "message": format!("no such {what}"),
                "type": "not-found",
                "what": what,
                "id": id,
            }),
            Error::EmptyCommentBody => json!({
                "message": "comment body cannot be empty",
                "type": "empty-comment-body",
            }),
            Error::EmptyBlogTitle => json!({
                "message": "blog title cannot be empty",
                "type": "empty-blog-title",
            }),
            Error::UuidAlreadyUsed(u) => json!({
                "message": "uuid conflict",
                "type": "conflict-uuid",
                "uuid": u,
            }),
            Error::InvalidPow => json!({
                "message": "invalid proof-of-work",
                "type": "invalid-pow",
            }),
            Error::NameAlreadyUsed(n) => json!({
                "message": "name already used",
                "type": "conflict-name",
                "name": n,
            }),
            Error::NullByteInString(s) => json!({
                "message": "there was a null byte in argument string",
                "type": "null-byte",
                "string": s,
            }),
            Error::InvalidName(n) => json!({
                "message": "there was an invalid character in a user name",
                "type": "invalid-name",
                "name": n,
            }),
        })
        .expect("serializing error contents")
    }

    pub fn parse(body: &[u8]) -> anyhow::Result<Error> {
        let data: serde_json::Value =
            serde_json::from_slice(body).context("parsing error contents")?;
        let get_str = |field: &str| -> Option<&str> { data.get(field).and_then(|v| v.as_str()) };
        Ok(
            match get_str("type").ok_or_else(|| anyhow!("error type is not a string"))? {
                "unknown" => Error::Unknown(String::from(get_str("message").unwrap_or(""))),
                "permission-denied" => Error::PermissionDenied,
                "not-found" => Error::NotFound {
                    what: String::from(
                        get_str("what").ok_or_else(|| anyhow!("not-found error without a what"))?,
                    ),
                    id: get_str("id")
                        .and_then(|id| Uuid::from_str(id).ok())
                        .ok_or_else(|| anyhow!("not-found error without a proper id"))?,
                },
                "empty-comment-body" => Error::EmptyCommentBody,
                "empty-blog-title" => Error::EmptyBlogTitle,
                "conflict-uuid" => Error::UuidAlreadyUsed(
                    get_str("uuid")
                        .and_then(|uuid| Uuid::from_str(uuid).ok())
                        .ok_or_else(|| anyhow!("error is a uuid conflict without a proper uuid"))?,
                ),
                "invalid-pow" => Error::InvalidPow,
                "conflict-name" => Error::NameAlreadyUsed(String::from(
                    get_str("name")
                        .ok_or_else(|| anyhow!("error is a name conflict without a name"))?,
                )),
                "null-byte" => Error::NullByteInString(String::from(
                    get_str("string")
                        .ok_or_else(|| anyhow!("error is a null-byte-in-string without a string"))?,
                )),
                "invalid-name" => Error::InvalidName(String::from(get_str("name").ok_or_else(
                    || anyhow!("error is about an invalid name but no name was provided"),
                )?)),
                _ => return Err(anyhow!("error contents has unknown type")),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_round_trip_through_json() {
        let errors = vec![
            Error::Unknown(String::from("boom")),
            Error::PermissionDenied,
            Error::not_found("blog", Uuid::new_v4()),
            Error::EmptyCommentBody,
            Error::EmptyBlogTitle,
            Error::UuidAlreadyUsed(Uuid::new_v4()),
            Error::InvalidPow,
            Error::NameAlreadyUsed(String::from("alice")),
            Error::NullByteInString(String::from("a\0b")),
            Error::InvalidName(String::from("b:d")),
        ];
        for e in errors {
            let parsed = Error::parse(&e.contents()).expect("parsing serialized error");
            assert_eq!(e, parsed);
        }
    }
}
