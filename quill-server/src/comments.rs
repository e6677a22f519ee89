use anyhow::Context;
use chrono::Utc;
use quill_api::{BlogId, Comment, CommentId, Error as ApiError, NewComment, Store, UserId, Uuid};

use crate::{counters::CounterSync, notifications::NotificationLedger, Error};

/// Creation and cascading deletion of the comment tree under a blog.
pub struct CommentTree<'a> {
    store: &'a dyn Store,
}

/// One failed step of a deletion cascade
#[derive(Debug)]
pub struct CascadeFailure {
    pub comment: CommentId,
    pub error: anyhow::Error,
}

/// What a deletion cascade actually did.
///
/// Once the requested comment itself is gone the request counts as
/// successful; anything that failed afterwards ends up in `failures` instead
/// of aborting the cascade, so callers can log or assert on partial
/// outcomes.
#[derive(Debug, Default)]
pub struct CascadeOutcome {
    pub deleted: Vec<CommentId>,
    pub failures: Vec<CascadeFailure>,
}

impl<'a> CommentTree<'a> {
    pub fn new(store: &'a dyn Store) -> CommentTree<'a> {
        CommentTree { store }
    }

    /// Create a comment, as a root comment or as a reply to `data.parent`.
    ///
    /// The comment document is the operation of record: once it is written,
    /// counter updates and the notification are applied best-effort and
    /// their failure never bubbles up to the caller.
    pub async fn add_comment(
        &self,
        blog: BlogId,
        author: UserId,
        data: NewComment,
    ) -> Result<Comment, Error> {
        data.validate()?;
        let blog = self
            .store
            .blog_by_id(blog)
            .await
            .context("fetching blog")?
            .ok_or_else(|| ApiError::not_found("blog", blog.0))?;
        let parent = match data.parent {
            None => None,
            Some(parent) => {
                let parent = self
                    .store
                    .comment_by_id(parent)
                    .await
                    .context("fetching parent comment")?
                    .ok_or_else(|| ApiError::not_found("comment", parent.0))?;
                if parent.blog != blog.id {
                    return Err(ApiError::not_found("comment", parent.id.0).into());
                }
                Some(parent)
            }
        };

        let comment = Comment {
            id: CommentId(Uuid::new_v4()),
            blog: blog.id,
            author,
            body: data.body,
            parent: parent.as_ref().map(|p| p.id),
            children: Vec::new(),
            is_reply: parent.is_some(),
            created_at: Utc::now(),
        };
        self.store
            .create_comment(comment.clone())
            .await
            .context("creating comment")?;
        if let Some(parent) = &parent {
            self.store
                .push_child(parent.id, comment.id)
                .await
                .context("attaching comment to its parent")?;
        }
        self.store
            .push_blog_comment(blog.id, comment.id)
            .await
            .context("attaching comment to its blog")?;

        if let Err(err) = CounterSync::new(self.store)
            .increment_comments(blog.id, parent.is_none())
            .await
        {
            tracing::error!(?err, comment = ?comment.id, "failed incrementing comment counters");
        }
        if let Err(err) = NotificationLedger::new(self.store)
            .record_comment_or_reply(
                &comment,
                blog.author,
                parent.as_ref(),
                data.pending_notification,
            )
            .await
        {
            tracing::error!(?err, comment = ?comment.id, "failed recording comment notification");
        }

        Ok(comment)
    }

    /// Delete a comment and, transitively, every reply under it.
    ///
    /// Allowed to the comment's author and to the blog's author. Only the
    /// deletion of the requested comment itself can fail the request; the
    /// cascade over descendants runs to the end, collecting failures.
    pub async fn delete_comment(
        &self,
        comment: CommentId,
        requester: UserId,
    ) -> Result<CascadeOutcome, Error> {
        let root = self
            .store
            .comment_by_id(comment)
            .await
            .context("fetching comment")?
            .ok_or_else(|| ApiError::not_found("comment", comment.0))?;
        let blog = self
            .store
            .blog_by_id(root.blog)
            .await
            .context("fetching blog")?
            .ok_or_else(|| ApiError::not_found("blog", root.blog.0))?;
        if requester != root.author && requester != blog.author {
            return Err(Error::permission_denied());
        }

        let mut outcome = CascadeOutcome::default();

        macro_rules! attempt {
            ($comment:expr, $op:expr) => {
                if let Err(error) = $op.await {
                    tracing::error!(?error, comment = ?$comment, "cascade step failed");
                    outcome.failures.push(CascadeFailure {
                        comment: $comment,
                        error,
                    });
                }
            };
        }

        // Each popped document carries the snapshot of its children taken
        // when it was fetched, before anything below mutated the tree. The
        // worklist makes no assumption about tree depth.
        let mut worklist = vec![root];
        let mut at_root = true;
        while let Some(c) = worklist.pop() {
            let is_root_of_cascade = at_root;
            at_root = false;

            match self.store.delete_comment(c.id).await {
                Ok(true) => {}
                // Already gone, e.g. to a concurrent delete; its own cleanup
                // is not ours to do, but descendants may still linger.
                Ok(false) => {
                    self.queue_children(&c, &mut worklist, &mut outcome).await;
                    continue;
                }
                Err(error) => {
                    if is_root_of_cascade {
                        return Err(Error::Anyhow(error.context("deleting comment")));
                    }
                    // This branch of the tree stays attached; move on to the
                    // remaining siblings.
                    tracing::error!(?error, comment = ?c.id, "failed deleting descendant comment");
                    outcome.failures.push(CascadeFailure {
                        comment: c.id,
                        error,
                    });
                    continue;
                }
            }

            if let Some(parent) = c.parent {
                attempt!(c.id, self.store.pull_child(parent, c.id));
            }
            attempt!(c.id, self.store.pull_blog_comment(c.blog, c.id));
            attempt!(
                c.id,
                NotificationLedger::new(self.store).delete_by_comment(c.id)
            );
            attempt!(
                c.id,
                CounterSync::new(self.store).decrement_comments(c.blog, !c.is_reply)
            );

            self.queue_children(&c, &mut worklist, &mut outcome).await;
            outcome.deleted.push(c.id);
        }

        Ok(outcome)
    }

    async fn queue_children(
        &self,
        comment: &Comment,
        worklist: &mut Vec<Comment>,
        outcome: &mut CascadeOutcome,
    ) {
        for child in &comment.children {
            match self.store.comment_by_id(*child).await {
                Ok(Some(child)) => worklist.push(child),
                Ok(None) => {}
                Err(error) => {
                    tracing::error!(?error, comment = ?child, "failed fetching child comment");
                    outcome.failures.push(CascadeFailure {
                        comment: *child,
                        error: error.context("fetching child comment"),
                    });
                }
            }
        }
    }
}
