use uuid::Uuid;

use crate::{BlogId, CommentId, Time, UserId, STUB_UUID};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    pub fn stub() -> NotificationId {
        NotificationId(STUB_UUID)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Reply,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,

    /// Who this notification is for
    pub recipient: UserId,
    /// Who liked, commented or replied
    pub actor: UserId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog: Option<BlogId>,
    /// The comment this notification announces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<CommentId>,
    /// For replies, the comment that was replied to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replied_on_comment: Option<CommentId>,
    /// Back-reference to the reply a later comment made on `comment`;
    /// cleared, not deleted, when that reply goes away
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<CommentId>,

    pub seen: bool,
    pub created_at: Time,
}

/// Builder for a notification about to be recorded
#[derive(Clone, Debug)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub recipient: UserId,
    pub actor: UserId,
    pub blog: Option<BlogId>,
    pub comment: Option<CommentId>,
    pub replied_on_comment: Option<CommentId>,
}

impl NewNotification {
    pub fn new(kind: NotificationKind, recipient: UserId, actor: UserId) -> NewNotification {
        NewNotification {
            kind,
            recipient,
            actor,
            blog: None,
            comment: None,
            replied_on_comment: None,
        }
    }

    pub fn about_blog(mut self, blog: BlogId) -> NewNotification {
        self.blog = Some(blog);
        self
    }

    pub fn about_comment(mut self, comment: CommentId) -> NewNotification {
        self.comment = Some(comment);
        self
    }

    pub fn replying_to(mut self, parent: CommentId) -> NewNotification {
        self.replied_on_comment = Some(parent);
        self
    }

    pub fn record(self, now: Time) -> Notification {
        Notification {
            id: NotificationId(Uuid::new_v4()),
            kind: self.kind,
            recipient: self.recipient,
            actor: self.actor,
            blog: self.blog,
            comment: self.comment,
            replied_on_comment: self.replied_on_comment,
            reply: None,
            seen: false,
            created_at: now,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFilter {
    All,
    Like,
    Comment,
    Reply,
}

impl NotificationFilter {
    pub fn kind(self) -> Option<NotificationKind> {
        match self {
            NotificationFilter::All => None,
            NotificationFilter::Like => Some(NotificationKind::Like),
            NotificationFilter::Comment => Some(NotificationKind::Comment),
            NotificationFilter::Reply => Some(NotificationKind::Reply),
        }
    }
}

#[derive(Clone, Copy, Debug, serde::Deserialize, serde::Serialize)]
pub struct NotificationQuery {
    pub filter: NotificationFilter,
    /// 1-based page number
    pub page: u64,
    pub page_size: u64,
    /// Number of items the client deleted since it loaded the previous page;
    /// compensates the skip so no notification is silently jumped over
    pub deleted_count: u64,
}

impl NotificationQuery {
    /// Offset into the (newest-first) feed, clamped so client-supplied
    /// adjustments can never push it negative
    pub fn skip(&self) -> u64 {
        (self.page.saturating_sub(1) * self.page_size).saturating_sub(self.deleted_count)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LikeToggle {
    pub liked: bool,
}
