//! In-memory implementation of the store, for tests.
//!
//! A single mutex around all tables stands in for the storage layer's
//! atomicity guarantees: counter deltas and the like toggle run entirely
//! inside one lock acquisition. The `test_*` methods inject faults so tests
//! can drive the best-effort and partial-failure paths.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use anyhow::anyhow;
use async_trait::async_trait;
use quill_api::{
    AccountDelta, ActivityDelta, AuthToken, Blog, BlogId, Comment, CommentId, Notification,
    NotificationId, NotificationKind, Session, Store, User, UserId,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, User>,
    sessions: HashMap<AuthToken, Session>,
    blogs: HashMap<BlogId, Blog>,
    comments: HashMap<CommentId, Comment>,
    notifications: HashMap<NotificationId, Notification>,

    fail_counters: bool,
    fail_deletes: HashSet<CommentId>,
}

#[derive(Debug, Default)]
pub struct MemoryStore(Mutex<State>);

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Make every subsequent counter adjustment fail
    pub fn test_fail_counters(&self, fail: bool) {
        self.0.lock().unwrap().fail_counters = fail;
    }

    /// Make deletion of one specific comment fail
    pub fn test_fail_delete(&self, comment: CommentId) {
        self.0.lock().unwrap().fail_deletes.insert(comment);
    }

    pub fn test_comment_count(&self) -> usize {
        self.0.lock().unwrap().comments.len()
    }

    pub fn test_notification_count(&self) -> usize {
        self.0.lock().unwrap().notifications.len()
    }

    pub fn test_notification(&self, id: NotificationId) -> Option<Notification> {
        self.0.lock().unwrap().notifications.get(&id).cloned()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_session(&self, session: Session) -> anyhow::Result<()> {
        self.0
            .lock()
            .unwrap()
            .sessions
            .insert(session.token, session);
        Ok(())
    }

    async fn recover_session(&self, token: AuthToken) -> anyhow::Result<Option<UserId>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .sessions
            .get(&token)
            .map(|s| s.user))
    }

    async fn logout_session(&self, token: AuthToken) -> anyhow::Result<bool> {
        Ok(self.0.lock().unwrap().sessions.remove(&token).is_some())
    }

    async fn create_user(&self, user: User) -> anyhow::Result<bool> {
        let mut state = self.0.lock().unwrap();
        if state.users.values().any(|u| u.name == user.name) {
            return Ok(false);
        }
        state.users.insert(user.id, user);
        Ok(true)
    }

    async fn user_by_id(&self, id: UserId) -> anyhow::Result<Option<User>> {
        Ok(self.0.lock().unwrap().users.get(&id).cloned())
    }

    async fn user_by_name(&self, name: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.name == name)
            .cloned())
    }

    async fn adjust_account_info(&self, user: UserId, delta: AccountDelta) -> anyhow::Result<()> {
        let mut state = self.0.lock().unwrap();
        if state.fail_counters {
            return Err(anyhow!("injected counter failure"));
        }
        if let Some(u) = state.users.get_mut(&user) {
            u.account_info.total_posts += delta.total_posts;
            u.account_info.total_reads += delta.total_reads;
        }
        Ok(())
    }

    async fn create_blog(&self, blog: Blog) -> anyhow::Result<()> {
        self.0.lock().unwrap().blogs.insert(blog.id, blog);
        Ok(())
    }

    async fn blog_by_id(&self, id: BlogId) -> anyhow::Result<Option<Blog>> {
        Ok(self.0.lock().unwrap().blogs.get(&id).cloned())
    }

    async fn delete_blog(&self, id: BlogId) -> anyhow::Result<bool> {
        Ok(self.0.lock().unwrap().blogs.remove(&id).is_some())
    }

    async fn push_blog_comment(&self, blog: BlogId, comment: CommentId) -> anyhow::Result<()> {
        if let Some(b) = self.0.lock().unwrap().blogs.get_mut(&blog) {
            b.comments.push(comment);
        }
        Ok(())
    }

    async fn pull_blog_comment(&self, blog: BlogId, comment: CommentId) -> anyhow::Result<()> {
        if let Some(b) = self.0.lock().unwrap().blogs.get_mut(&blog) {
            b.comments.retain(|c| *c != comment);
        }
        Ok(())
    }

    async fn adjust_blog_activity(&self, blog: BlogId, delta: ActivityDelta) -> anyhow::Result<()> {
        let mut state = self.0.lock().unwrap();
        if state.fail_counters {
            return Err(anyhow!("injected counter failure"));
        }
        if let Some(b) = state.blogs.get_mut(&blog) {
            b.activity.total_comments += delta.total_comments;
            b.activity.total_parent_comments += delta.total_parent_comments;
            b.activity.total_likes += delta.total_likes;
            b.activity.total_reads += delta.total_reads;
        }
        Ok(())
    }

    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        self.0.lock().unwrap().comments.insert(comment.id, comment);
        Ok(())
    }

    async fn comment_by_id(&self, id: CommentId) -> anyhow::Result<Option<Comment>> {
        Ok(self.0.lock().unwrap().comments.get(&id).cloned())
    }

    async fn delete_comment(&self, id: CommentId) -> anyhow::Result<bool> {
        let mut state = self.0.lock().unwrap();
        if state.fail_deletes.contains(&id) {
            return Err(anyhow!("injected delete failure"));
        }
        Ok(state.comments.remove(&id).is_some())
    }

    async fn push_child(&self, parent: CommentId, child: CommentId) -> anyhow::Result<()> {
        if let Some(p) = self.0.lock().unwrap().comments.get_mut(&parent) {
            p.children.push(child);
        }
        Ok(())
    }

    async fn pull_child(&self, parent: CommentId, child: CommentId) -> anyhow::Result<()> {
        if let Some(p) = self.0.lock().unwrap().comments.get_mut(&parent) {
            p.children.retain(|c| *c != child);
        }
        Ok(())
    }

    async fn comments_for_blog(&self, blog: BlogId) -> anyhow::Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .0
            .lock()
            .unwrap()
            .comments
            .values()
            .filter(|c| c.blog == blog)
            .cloned()
            .collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn delete_comments_for_blog(&self, blog: BlogId) -> anyhow::Result<u64> {
        let mut state = self.0.lock().unwrap();
        let before = state.comments.len();
        state.comments.retain(|_, c| c.blog != blog);
        Ok((before - state.comments.len()) as u64)
    }

    async fn create_notification(&self, notification: Notification) -> anyhow::Result<()> {
        self.0
            .lock()
            .unwrap()
            .notifications
            .insert(notification.id, notification);
        Ok(())
    }

    async fn toggle_like(&self, like: Notification) -> anyhow::Result<bool> {
        let mut state = self.0.lock().unwrap();
        let existing = state
            .notifications
            .values()
            .find(|n| {
                n.kind == NotificationKind::Like && n.actor == like.actor && n.blog == like.blog
            })
            .map(|n| n.id);
        match existing {
            Some(id) => {
                state.notifications.remove(&id);
                Ok(false)
            }
            None => {
                state.notifications.insert(like.id, like);
                Ok(true)
            }
        }
    }

    async fn delete_notifications_for_comment(&self, comment: CommentId) -> anyhow::Result<u64> {
        let mut state = self.0.lock().unwrap();
        let before = state.notifications.len();
        state.notifications.retain(|_, n| n.comment != Some(comment));
        Ok((before - state.notifications.len()) as u64)
    }

    async fn clear_reply_links(&self, reply: CommentId) -> anyhow::Result<u64> {
        let mut cleared = 0;
        for n in self.0.lock().unwrap().notifications.values_mut() {
            if n.reply == Some(reply) {
                n.reply = None;
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn link_reply(
        &self,
        notification: NotificationId,
        reply: CommentId,
    ) -> anyhow::Result<()> {
        if let Some(n) = self.0.lock().unwrap().notifications.get_mut(&notification) {
            n.reply = Some(reply);
        }
        Ok(())
    }

    async fn delete_notifications_for_blog(&self, blog: BlogId) -> anyhow::Result<u64> {
        let mut state = self.0.lock().unwrap();
        let before = state.notifications.len();
        state.notifications.retain(|_, n| n.blog != Some(blog));
        Ok((before - state.notifications.len()) as u64)
    }

    async fn has_unseen(&self, user: UserId) -> anyhow::Result<bool> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .notifications
            .values()
            .any(|n| n.recipient == user && !n.seen && n.actor != user))
    }

    async fn notifications_page(
        &self,
        user: UserId,
        kind: Option<NotificationKind>,
        skip: u64,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let mut page: Vec<Notification> = self
            .0
            .lock()
            .unwrap()
            .notifications
            .values()
            .filter(|n| n.recipient == user && n.actor != user)
            .filter(|n| kind.map_or(true, |k| n.kind == k))
            .cloned()
            .collect();
        page.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn mark_seen(&self, notifications: &[NotificationId]) -> anyhow::Result<()> {
        let mut state = self.0.lock().unwrap();
        for id in notifications {
            if let Some(n) = state.notifications.get_mut(id) {
                n.seen = true;
            }
        }
        Ok(())
    }
}
