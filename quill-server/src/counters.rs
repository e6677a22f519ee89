use quill_api::{AccountDelta, ActivityDelta, BlogId, Store, UserId};

/// Applies deltas to the denormalized counters on blogs and users.
///
/// Stateless: every operation maps to one atomic increment at the storage
/// layer, so concurrent callers on the same blog never lose updates.
pub struct CounterSync<'a> {
    store: &'a dyn Store,
}

impl<'a> CounterSync<'a> {
    pub fn new(store: &'a dyn Store) -> CounterSync<'a> {
        CounterSync { store }
    }

    pub async fn increment_comments(&self, blog: BlogId, is_root: bool) -> anyhow::Result<()> {
        self.store
            .adjust_blog_activity(
                blog,
                ActivityDelta {
                    total_comments: 1,
                    total_parent_comments: is_root as i64,
                    ..ActivityDelta::default()
                },
            )
            .await
    }

    pub async fn decrement_comments(&self, blog: BlogId, was_root: bool) -> anyhow::Result<()> {
        self.store
            .adjust_blog_activity(
                blog,
                ActivityDelta {
                    total_comments: -1,
                    total_parent_comments: -(was_root as i64),
                    ..ActivityDelta::default()
                },
            )
            .await
    }

    pub async fn adjust_likes(&self, blog: BlogId, delta: i64) -> anyhow::Result<()> {
        self.store
            .adjust_blog_activity(
                blog,
                ActivityDelta {
                    total_likes: delta,
                    ..ActivityDelta::default()
                },
            )
            .await
    }

    /// One read counts both on the blog and on its author's account
    pub async fn adjust_reads(&self, blog: BlogId, author: UserId) -> anyhow::Result<()> {
        self.store
            .adjust_blog_activity(
                blog,
                ActivityDelta {
                    total_reads: 1,
                    ..ActivityDelta::default()
                },
            )
            .await?;
        self.store
            .adjust_account_info(
                author,
                AccountDelta {
                    total_reads: 1,
                    ..AccountDelta::default()
                },
            )
            .await
    }

    pub async fn adjust_post_count(&self, user: UserId, delta: i64) -> anyhow::Result<()> {
        self.store
            .adjust_account_info(
                user,
                AccountDelta {
                    total_posts: delta,
                    ..AccountDelta::default()
                },
            )
            .await
    }
}
