use uuid::Uuid;

use crate::{CommentId, Error, Time, UserId, STUB_UUID};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct BlogId(pub Uuid);

impl BlogId {
    pub fn stub() -> BlogId {
        BlogId(STUB_UUID)
    }
}

/// Denormalized per-blog aggregates, adjusted through atomic deltas only.
///
/// `total_comments` counts every live comment on the blog,
/// `total_parent_comments` only those that are not replies.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct BlogActivity {
    pub total_comments: i64,
    pub total_parent_comments: i64,
    pub total_likes: i64,
    pub total_reads: i64,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Blog {
    pub id: BlogId,
    pub author: UserId,
    pub title: String,
    pub body: String,

    /// Ids of all live comments on this blog, roots and replies alike
    pub comments: Vec<CommentId>,
    pub activity: BlogActivity,

    pub published_at: Time,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewBlog {
    pub title: String,
    pub body: String,
}

impl NewBlog {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.title)?;
        crate::validate_string(&self.body)?;
        if self.title.trim().is_empty() {
            return Err(Error::EmptyBlogTitle);
        }
        Ok(())
    }
}
