use async_trait::async_trait;

use crate::{
    AuthToken, Blog, BlogId, Comment, CommentId, Notification, NotificationId, NotificationKind,
    Session, User, UserId,
};

/// Atomic increment set for a blog's `activity` counters.
///
/// Applied as a single storage-level delta so concurrent requests never lose
/// updates; never read back and re-written.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ActivityDelta {
    pub total_comments: i64,
    pub total_parent_comments: i64,
    pub total_likes: i64,
    pub total_reads: i64,
}

/// Atomic increment set for a user's `account_info` counters
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AccountDelta {
    pub total_posts: i64,
    pub total_reads: i64,
}

/// Document persistence, as seen by the core components.
///
/// Plumbing failures come back as `anyhow::Error`; semantic outcomes are in
/// the return types (`Option` for a missing document, `bool`/count for how
/// many documents an operation touched). Implementations must make the
/// counter adjustments and `toggle_like` atomic: two concurrent callers may
/// interleave anywhere else, but a delta is never lost and at most one like
/// document exists per (actor, blog).
#[async_trait]
pub trait Store: Send + Sync {
    // Sessions
    async fn create_session(&self, session: Session) -> anyhow::Result<()>;
    async fn recover_session(&self, token: AuthToken) -> anyhow::Result<Option<UserId>>;
    async fn logout_session(&self, token: AuthToken) -> anyhow::Result<bool>;

    // Users
    /// Returns false when the name is already taken
    async fn create_user(&self, user: User) -> anyhow::Result<bool>;
    async fn user_by_id(&self, id: UserId) -> anyhow::Result<Option<User>>;
    async fn user_by_name(&self, name: &str) -> anyhow::Result<Option<User>>;
    async fn adjust_account_info(&self, user: UserId, delta: AccountDelta) -> anyhow::Result<()>;

    // Blogs
    async fn create_blog(&self, blog: Blog) -> anyhow::Result<()>;
    async fn blog_by_id(&self, id: BlogId) -> anyhow::Result<Option<Blog>>;
    async fn delete_blog(&self, id: BlogId) -> anyhow::Result<bool>;
    async fn push_blog_comment(&self, blog: BlogId, comment: CommentId) -> anyhow::Result<()>;
    async fn pull_blog_comment(&self, blog: BlogId, comment: CommentId) -> anyhow::Result<()>;
    async fn adjust_blog_activity(&self, blog: BlogId, delta: ActivityDelta) -> anyhow::Result<()>;

    // Comments
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()>;
    async fn comment_by_id(&self, id: CommentId) -> anyhow::Result<Option<Comment>>;
    async fn delete_comment(&self, id: CommentId) -> anyhow::Result<bool>;
    async fn push_child(&self, parent: CommentId, child: CommentId) -> anyhow::Result<()>;
    async fn pull_child(&self, parent: CommentId, child: CommentId) -> anyhow::Result<()>;
    async fn comments_for_blog(&self, blog: BlogId) -> anyhow::Result<Vec<Comment>>;
    async fn delete_comments_for_blog(&self, blog: BlogId) -> anyhow::Result<u64>;

    // Notifications
    async fn create_notification(&self, notification: Notification) -> anyhow::Result<()>;
    /// Insert-if-absent-else-delete, keyed on (actor, blog, Like). Returns
    /// whether the like exists after the call. This is a single storage
    /// primitive precisely so there is no check-then-act window.
    async fn toggle_like(&self, like: Notification) -> anyhow::Result<bool>;
    async fn delete_notifications_for_comment(&self, comment: CommentId) -> anyhow::Result<u64>;
    /// Unsets (does not delete) the `reply` back-reference of any
    /// notification pointing at `reply`
    async fn clear_reply_links(&self, reply: CommentId) -> anyhow::Result<u64>;
    async fn link_reply(&self, notification: NotificationId, reply: CommentId)
        -> anyhow::Result<()>;
    async fn delete_notifications_for_blog(&self, blog: BlogId) -> anyhow::Result<u64>;
    async fn has_unseen(&self, user: UserId) -> anyhow::Result<bool>;
    /// Newest first, excluding the user's own actions
    async fn notifications_page(
        &self,
        user: UserId,
        kind: Option<NotificationKind>,
        skip: u64,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>>;
    async fn mark_seen(&self, notifications: &[NotificationId]) -> anyhow::Result<()>;
}
