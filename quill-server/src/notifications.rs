use anyhow::Context;
use chrono::Utc;
use quill_api::{
    Blog, Comment, CommentId, NewNotification, Notification, NotificationId, NotificationKind,
    NotificationQuery, Store, UserId,
};

use crate::{counters::CounterSync, Error};

/// Records and maintains the user-facing event feed.
///
/// Notifications are convenience records: wherever a write here is secondary
/// to some primary mutation, its failure is logged and swallowed rather than
/// surfaced.
pub struct NotificationLedger<'a> {
    store: &'a dyn Store,
}

impl<'a> NotificationLedger<'a> {
    pub fn new(store: &'a dyn Store) -> NotificationLedger<'a> {
        NotificationLedger { store }
    }

    /// Toggle the requester's like on a blog. The notification document
    /// doubles as the like marker, so the storage-level
    /// insert-if-absent-else-delete is the whole toggle; the counter
    /// adjustment afterwards is best-effort.
    pub async fn record_like(&self, blog: &Blog, liker: UserId) -> Result<bool, Error> {
        let like = NewNotification::new(NotificationKind::Like, blog.author, liker)
            .about_blog(blog.id)
            .record(Utc::now());
        let liked = self
            .store
            .toggle_like(like)
            .await
            .context("toggling like notification")?;
        let delta = if liked { 1 } else { -1 };
        if let Err(err) = CounterSync::new(self.store).adjust_likes(blog.id, delta).await {
            tracing::error!(?err, blog = ?blog.id, "failed adjusting like counter");
        }
        Ok(liked)
    }

    /// Record that `comment` was posted. When it replies to another comment
    /// the notification goes to that comment's author, not to the blog's;
    /// `pending` is the notification announcing the replied-to comment, and
    /// gets its `reply` field pointed at the new one.
    pub async fn record_comment_or_reply(
        &self,
        comment: &Comment,
        blog_author: UserId,
        parent: Option<&Comment>,
        pending: Option<NotificationId>,
    ) -> anyhow::Result<Notification> {
        let (kind, recipient) = match parent {
            Some(parent) => (NotificationKind::Reply, parent.author),
            None => (NotificationKind::Comment, blog_author),
        };
        let mut notification = NewNotification::new(kind, recipient, comment.author)
            .about_blog(comment.blog)
            .about_comment(comment.id);
        if let Some(parent) = parent {
            notification = notification.replying_to(parent.id);
        }
        let notification = notification.record(comment.created_at);
        self.store
            .create_notification(notification.clone())
            .await
            .context("recording notification")?;
        if let Some(pending) = pending {
            self.store
                .link_reply(pending, comment.id)
                .await
                .context("linking reply into pending notification")?;
        }
        Ok(notification)
    }

    /// Drop everything the ledger knows about a deleted comment:
    /// notifications announcing it are deleted, back-references to it from
    /// other notifications are cleared in place.
    pub async fn delete_by_comment(&self, comment: CommentId) -> anyhow::Result<()> {
        self.store
            .delete_notifications_for_comment(comment)
            .await
            .context("deleting notifications for comment")?;
        self.store
            .clear_reply_links(comment)
            .await
            .context("clearing reply back-references")?;
        Ok(())
    }

    pub async fn has_unseen(&self, user: UserId) -> anyhow::Result<bool> {
        self.store.has_unseen(user).await
    }

    /// One page of the feed, newest first. Fetched notifications are marked
    /// seen as a side effect; the read does not depend on that write.
    pub async fn list_page(
        &self,
        user: UserId,
        query: NotificationQuery,
    ) -> anyhow::Result<Vec<Notification>> {
        let page = self
            .store
            .notifications_page(user, query.filter.kind(), query.skip(), query.page_size as i64)
            .await
            .context("listing notification page")?;
        let unseen: Vec<NotificationId> =
            page.iter().filter(|n| !n.seen).map(|n| n.id).collect();
        if !unseen.is_empty() {
            if let Err(err) = self.store.mark_seen(&unseen).await {
                tracing::error!(?err, user = ?user, "failed marking notification page seen");
            }
        }
        Ok(page)
    }
}
