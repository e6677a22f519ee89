use uuid::Uuid;

use crate::{BlogId, Error, NotificationId, Time, UserId, STUB_UUID};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn stub() -> CommentId {
        CommentId(STUB_UUID)
    }
}

/// One comment on a blog.
///
/// Invariants: `is_reply` iff `parent` is set; every id in `children` names a
/// comment whose `parent` is this one; the parent/children graph is a finite
/// tree. In practice the tree is two levels deep (comment + reply), but
/// nothing here or in the deletion cascade relies on that.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub blog: BlogId,
    pub author: UserId,
    pub body: String,

    pub parent: Option<CommentId>,
    pub children: Vec<CommentId>,
    pub is_reply: bool,

    pub created_at: Time,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub body: String,

    /// Set when replying to another comment on the same blog
    pub parent: Option<CommentId>,

    /// Id of the notification that announced the comment being replied to;
    /// when set, that notification gets its `reply` field pointed at the
    /// comment created here
    pub pending_notification: Option<NotificationId>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_string(&self.body)?;
        if self.body.trim().is_empty() {
            return Err(Error::EmptyCommentBody);
        }
        Ok(())
    }
}
