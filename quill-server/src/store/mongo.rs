//! MongoDB-backed implementation of the store.
//!
//! One collection per document kind. Counters are `$inc`-only and the like
//! constraint lives in a unique partial index, so both stay correct under
//! concurrent requests without any read-modify-write.

use anyhow::Context;
use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{options::IndexOptions, Client, Collection, IndexModel};
use quill_api::{
    AccountDelta, ActivityDelta, AuthToken, Blog, BlogId, Comment, CommentId, Notification,
    NotificationId, NotificationKind, Session, Store, User, UserId,
};

const USERS: &str = "users";
const SESSIONS: &str = "sessions";
const BLOGS: &str = "blogs";
const COMMENTS: &str = "comments";
const NOTIFICATIONS: &str = "notifications";

#[derive(Clone)]
pub struct MongoStore {
    db: mongodb::Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<MongoStore> {
        tracing::info!("connecting to mongodb database {db_name:?}");
        let client = Client::with_uri_str(uri)
            .await
            .context("connecting to mongodb")?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .context("pinging mongodb")?;
        let store = MongoStore { db };
        store.ensure_indexes().await.context("creating indexes")?;
        Ok(store)
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn sessions(&self) -> Collection<Session> {
        self.db.collection(SESSIONS)
    }

    fn blogs(&self) -> Collection<Blog> {
        self.db.collection(BLOGS)
    }

    fn comments(&self) -> Collection<Comment> {
        self.db.collection(COMMENTS)
    }

    fn notifications(&self) -> Collection<Notification> {
        self.db.collection(NOTIFICATIONS)
    }

    async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let unique = || IndexOptions::builder().unique(true).build();
        let index = |keys: Document, options: Option<IndexOptions>| {
            IndexModel::builder().keys(keys).options(options).build()
        };

        self.users()
            .create_indexes(vec![
                index(doc! { "id": 1 }, Some(unique())),
                index(doc! { "name": 1 }, Some(unique())),
            ])
            .await
            .context("indexing users")?;
        self.sessions()
            .create_index(index(doc! { "token": 1 }, Some(unique())))
            .await
            .context("indexing sessions")?;
        self.blogs()
            .create_indexes(vec![
                index(doc! { "id": 1 }, Some(unique())),
                index(doc! { "author": 1 }, None),
            ])
            .await
            .context("indexing blogs")?;
        self.comments()
            .create_indexes(vec![
                index(doc! { "id": 1 }, Some(unique())),
                index(doc! { "blog": 1, "created_at": 1 }, None),
            ])
            .await
            .context("indexing comments")?;
        self.notifications()
            .create_indexes(vec![
                index(doc! { "id": 1 }, Some(unique())),
                index(doc! { "recipient": 1, "seen": 1, "created_at": -1 }, None),
                index(doc! { "comment": 1 }, None),
                index(doc! { "reply": 1 }, None),
                // At most one like per (actor, blog): this index, not any
                // application-level check, is the arbiter for toggle_like.
                index(
                    doc! { "actor": 1, "blog": 1, "kind": 1 },
                    Some(
                        IndexOptions::builder()
                            .unique(true)
                            .partial_filter_expression(doc! { "kind": "like" })
                            .build(),
                    ),
                ),
            ])
            .await
            .context("indexing notifications")?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == 11000
    )
}

fn kind_str(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Like => "like",
        NotificationKind::Comment => "comment",
        NotificationKind::Reply => "reply",
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn create_session(&self, session: Session) -> anyhow::Result<()> {
        self.sessions()
            .insert_one(&session)
            .await
            .context("inserting session")?;
        Ok(())
    }

    async fn recover_session(&self, token: AuthToken) -> anyhow::Result<Option<UserId>> {
        Ok(self
            .sessions()
            .find_one(doc! { "token": token.0.to_string() })
            .await
            .context("querying sessions")?
            .map(|s| s.user))
    }

    async fn logout_session(&self, token: AuthToken) -> anyhow::Result<bool> {
        Ok(self
            .sessions()
            .delete_one(doc! { "token": token.0.to_string() })
            .await
            .context("deleting session")?
            .deleted_count
            > 0)
    }

    async fn create_user(&self, user: User) -> anyhow::Result<bool> {
        match self.users().insert_one(&user).await {
            Ok(_) => Ok(true),
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(err) => Err(err).context("inserting user"),
        }
    }

    async fn user_by_id(&self, id: UserId) -> anyhow::Result<Option<User>> {
        self.users()
            .find_one(doc! { "id": id.0.to_string() })
            .await
            .context("querying users")
    }

    async fn user_by_name(&self, name: &str) -> anyhow::Result<Option<User>> {
        self.users()
            .find_one(doc! { "name": name })
            .await
            .context("querying users")
    }

    async fn adjust_account_info(&self, user: UserId, delta: AccountDelta) -> anyhow::Result<()> {
        let mut inc = Document::new();
        if delta.total_posts != 0 {
            inc.insert("account_info.total_posts", delta.total_posts);
        }
        if delta.total_reads != 0 {
            inc.insert("account_info.total_reads", delta.total_reads);
        }
        if inc.is_empty() {
            return Ok(());
        }
        self.users()
            .update_one(doc! { "id": user.0.to_string() }, doc! { "$inc": inc })
            .await
            .context("adjusting account info")?;
        Ok(())
    }

    async fn create_blog(&self, blog: Blog) -> anyhow::Result<()> {
        self.blogs()
            .insert_one(&blog)
            .await
            .context("inserting blog")?;
        Ok(())
    }

    async fn blog_by_id(&self, id: BlogId) -> anyhow::Result<Option<Blog>> {
        self.blogs()
            .find_one(doc! { "id": id.0.to_string() })
            .await
            .context("querying blogs")
    }

    async fn delete_blog(&self, id: BlogId) -> anyhow::Result<bool> {
        Ok(self
            .blogs()
            .delete_one(doc! { "id": id.0.to_string() })
            .await
            .context("deleting blog")?
            .deleted_count
            > 0)
    }

    async fn push_blog_comment(&self, blog: BlogId, comment: CommentId) -> anyhow::Result<()> {
        self.blogs()
            .update_one(
                doc! { "id": blog.0.to_string() },
                doc! { "$push": { "comments": comment.0.to_string() } },
            )
            .await
            .context("pushing comment onto blog")?;
        Ok(())
    }

    async fn pull_blog_comment(&self, blog: BlogId, comment: CommentId) -> anyhow::Result<()> {
        self.blogs()
            .update_one(
                doc! { "id": blog.0.to_string() },
                doc! { "$pull": { "comments": comment.0.to_string() } },
            )
            .await
            .context("pulling comment off blog")?;
        Ok(())
    }

    async fn adjust_blog_activity(&self, blog: BlogId, delta: ActivityDelta) -> anyhow::Result<()> {
        let mut inc = Document::new();
        if delta.total_comments != 0 {
            inc.insert("activity.total_comments", delta.total_comments);
        }
        if delta.total_parent_comments != 0 {
            inc.insert("activity.total_parent_comments", delta.total_parent_comments);
        }
        if delta.total_likes != 0 {
            inc.insert("activity.total_likes", delta.total_likes);
        }
        if delta.total_reads != 0 {
            inc.insert("activity.total_reads", delta.total_reads);
        }
        if inc.is_empty() {
            return Ok(());
        }
        self.blogs()
            .update_one(doc! { "id": blog.0.to_string() }, doc! { "$inc": inc })
            .await
            .context("adjusting blog activity")?;
        Ok(())
    }

    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        self.comments()
            .insert_one(&comment)
            .await
            .context("inserting comment")?;
        Ok(())
    }

    async fn comment_by_id(&self, id: CommentId) -> anyhow::Result<Option<Comment>> {
        self.comments()
            .find_one(doc! { "id": id.0.to_string() })
            .await
            .context("querying comments")
    }

    async fn delete_comment(&self, id: CommentId) -> anyhow::Result<bool> {
        Ok(self
            .comments()
            .delete_one(doc! { "id": id.0.to_string() })
            .await
            .context("deleting comment")?
            .deleted_count
            > 0)
    }

    async fn push_child(&self, parent: CommentId, child: CommentId) -> anyhow::Result<()> {
        self.comments()
            .update_one(
                doc! { "id": parent.0.to_string() },
                doc! { "$push": { "children": child.0.to_string() } },
            )
            .await
            .context("pushing child onto comment")?;
        Ok(())
    }

    async fn pull_child(&self, parent: CommentId, child: CommentId) -> anyhow::Result<()> {
        self.comments()
            .update_one(
                doc! { "id": parent.0.to_string() },
                doc! { "$pull": { "children": child.0.to_string() } },
            )
            .await
            .context("pulling child off comment")?;
        Ok(())
    }

    async fn comments_for_blog(&self, blog: BlogId) -> anyhow::Result<Vec<Comment>> {
        self.comments()
            .find(doc! { "blog": blog.0.to_string() })
            .sort(doc! { "created_at": 1 })
            .await
            .context("querying comments")?
            .try_collect()
            .await
            .context("collecting comments")
    }

    async fn delete_comments_for_blog(&self, blog: BlogId) -> anyhow::Result<u64> {
        Ok(self
            .comments()
            .delete_many(doc! { "blog": blog.0.to_string() })
            .await
            .context("deleting comments of blog")?
            .deleted_count)
    }

    async fn create_notification(&self, notification: Notification) -> anyhow::Result<()> {
        self.notifications()
            .insert_one(&notification)
            .await
            .context("inserting notification")?;
        Ok(())
    }

    async fn toggle_like(&self, like: Notification) -> anyhow::Result<bool> {
        let blog = like
            .blog
            .context("like notification must reference a blog")?;
        let filter = doc! {
            "kind": "like",
            "actor": like.actor.0.to_string(),
            "blog": blog.0.to_string(),
        };
        if self
            .notifications()
            .find_one_and_delete(filter)
            .await
            .context("removing existing like")?
            .is_some()
        {
            return Ok(false);
        }
        match self.notifications().insert_one(&like).await {
            Ok(_) => Ok(true),
            // Lost a race against an identical toggle: the unique index kept
            // the earlier document, which is the state we report.
            Err(err) if is_duplicate_key(&err) => Ok(true),
            Err(err) => Err(err).context("inserting like notification"),
        }
    }

    async fn delete_notifications_for_comment(&self, comment: CommentId) -> anyhow::Result<u64> {
        Ok(self
            .notifications()
            .delete_many(doc! { "comment": comment.0.to_string() })
            .await
            .context("deleting notifications of comment")?
            .deleted_count)
    }

    async fn clear_reply_links(&self, reply: CommentId) -> anyhow::Result<u64> {
        Ok(self
            .notifications()
            .update_many(
                doc! { "reply": reply.0.to_string() },
                doc! { "$unset": { "reply": "" } },
            )
            .await
            .context("unsetting reply back-references")?
            .modified_count)
    }

    async fn link_reply(
        &self,
        notification: NotificationId,
        reply: CommentId,
    ) -> anyhow::Result<()> {
        self.notifications()
            .update_one(
                doc! { "id": notification.0.to_string() },
                doc! { "$set": { "reply": reply.0.to_string() } },
            )
            .await
            .context("linking reply into notification")?;
        Ok(())
    }

    async fn delete_notifications_for_blog(&self, blog: BlogId) -> anyhow::Result<u64> {
        Ok(self
            .notifications()
            .delete_many(doc! { "blog": blog.0.to_string() })
            .await
            .context("deleting notifications of blog")?
            .deleted_count)
    }

    async fn has_unseen(&self, user: UserId) -> anyhow::Result<bool> {
        let user = user.0.to_string();
        Ok(self
            .notifications()
            .find_one(doc! {
                "recipient": user.as_str(),
                "seen": false,
                "actor": { "$ne": user.as_str() },
            })
            .await
            .context("querying unseen notifications")?
            .is_some())
    }

    async fn notifications_page(
        &self,
        user: UserId,
        kind: Option<NotificationKind>,
        skip: u64,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let user = user.0.to_string();
        let mut filter = doc! {
            "recipient": user.as_str(),
            "actor": { "$ne": user.as_str() },
        };
        if let Some(kind) = kind {
            filter.insert("kind", kind_str(kind));
        }
        self.notifications()
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .skip(skip)
            .limit(limit)
            .await
            .context("querying notification page")?
            .try_collect()
            .await
            .context("collecting notification page")
    }

    async fn mark_seen(&self, notifications: &[NotificationId]) -> anyhow::Result<()> {
        if notifications.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = notifications.iter().map(|n| n.0.to_string()).collect();
        self.notifications()
            .update_many(
                doc! { "id": { "$in": ids } },
                doc! { "$set": { "seen": true } },
            )
            .await
            .context("marking notifications seen")?;
        Ok(())
    }
}
