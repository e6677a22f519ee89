use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use quill_api::{
    AccountInfo, AuthToken, Blog, BlogActivity, BlogId, Comment, CommentId, LikeToggle, NewBlog,
    NewComment, NewSession, NewUser, Notification, NotificationQuery, Session, Store, UploadUrl,
    User, UserId, Uuid,
};

use crate::{
    comments::CommentTree, counters::CounterSync, extractors::*,
    notifications::NotificationLedger, signing::UploadUrlSigner, Error,
};

pub async fn admin_create_user(
    AdminAuth: AdminAuth,
    State(db): State<Db>,
    Json(data): Json<NewUser>,
) -> Result<(), Error> {
    data.validate()?;
    if db
        .user_by_id(data.id)
        .await
        .context("checking for user id")?
        .is_some()
    {
        return Err(Error::uuid_already_used(data.id.0));
    }
    let created = db
        .create_user(User {
            id: data.id,
            name: data.name.clone(),
            password_hash: data.initial_password_hash,
            account_info: AccountInfo::default(),
            joined_at: Utc::now(),
        })
        .await
        .context("creating user")?;
    if !created {
        return Err(Error::name_already_used(data.name));
    }
    Ok(())
}

pub async fn auth(State(db): State<Db>, Json(data): Json<NewSession>) -> Result<Json<AuthToken>, Error> {
    data.validate_except_pow()?;
    // in test setup, also allow the "empty" pow to work
    #[cfg(test)]
    if !data.verify_pow() && !data.pow.is_empty() {
        return Err(Error::invalid_pow());
    }
    #[cfg(not(test))]
    if !data.verify_pow() {
        return Err(Error::invalid_pow());
    }
    let user = db
        .user_by_name(&data.user)
        .await
        .context("logging user in")?
        .ok_or_else(Error::permission_denied)?;
    if user.password_hash != data.password {
        return Err(Error::permission_denied());
    }
    let token = AuthToken(Uuid::new_v4());
    db.create_session(Session {
        token,
        user: user.id,
        device: data.device,
        login_time: Utc::now(),
    })
    .await
    .context("creating session")?;
    Ok(Json(token))
}

pub async fn unauth(user: PreAuth, State(db): State<Db>) -> Result<(), Error> {
    match db.logout_session(user.0).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::permission_denied()),
        Err(e) => Err(Error::Anyhow(e)),
    }
}

pub async fn whoami(Auth(user): Auth) -> Json<UserId> {
    Json(user)
}

pub async fn create_blog(
    Auth(user): Auth,
    State(db): State<Db>,
    Json(data): Json<NewBlog>,
) -> Result<Json<Blog>, Error> {
    data.validate()?;
    let blog = Blog {
        id: BlogId(Uuid::new_v4()),
        author: user,
        title: data.title,
        body: data.body,
        comments: Vec::new(),
        activity: BlogActivity::default(),
        published_at: Utc::now(),
    };
    db.create_blog(blog.clone())
        .await
        .with_context(|| format!("publishing blog for {:?}", user))?;
    if let Err(err) = CounterSync::new(&*db).adjust_post_count(user, 1).await {
        tracing::error!(?err, user = ?user, "failed incrementing post count");
    }
    Ok(Json(blog))
}

pub async fn fetch_blog(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Blog>, Error> {
    let id = BlogId(id);
    let blog = db
        .blog_by_id(id)
        .await
        .context("fetching blog")?
        .ok_or_else(|| Error::not_found("blog", id.0))?;
    if let Err(err) = CounterSync::new(&*db).adjust_reads(id, blog.author).await {
        tracing::error!(?err, blog = ?id, "failed adjusting read counters");
    }
    Ok(Json(blog))
}

pub async fn delete_blog(
    Auth(user): Auth,
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<(), Error> {
    let id = BlogId(id);
    let blog = db
        .blog_by_id(id)
        .await
        .context("fetching blog")?
        .ok_or_else(|| Error::not_found("blog", id.0))?;
    if blog.author != user {
        return Err(Error::permission_denied());
    }
    db.delete_blog(id).await.context("deleting blog")?;
    // The blog is gone either way; its comment tree and feed entries follow
    // best-effort.
    if let Err(err) = db.delete_comments_for_blog(id).await {
        tracing::error!(?err, blog = ?id, "failed deleting comments of deleted blog");
    }
    if let Err(err) = db.delete_notifications_for_blog(id).await {
        tracing::error!(?err, blog = ?id, "failed deleting notifications of deleted blog");
    }
    if let Err(err) = CounterSync::new(&*db).adjust_post_count(user, -1).await {
        tracing::error!(?err, user = ?user, "failed decrementing post count");
    }
    Ok(())
}

pub async fn toggle_like(
    Auth(user): Auth,
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<LikeToggle>, Error> {
    let id = BlogId(id);
    let blog = db
        .blog_by_id(id)
        .await
        .context("fetching blog")?
        .ok_or_else(|| Error::not_found("blog", id.0))?;
    let liked = NotificationLedger::new(&*db).record_like(&blog, user).await?;
    Ok(Json(LikeToggle { liked }))
}

pub async fn list_comments(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, Error> {
    let id = BlogId(id);
    if db.blog_by_id(id).await.context("fetching blog")?.is_none() {
        return Err(Error::not_found("blog", id.0));
    }
    Ok(Json(
        db.comments_for_blog(id)
            .await
            .with_context(|| format!("listing comments of blog {:?}", id))?,
    ))
}

pub async fn add_comment(
    Auth(user): Auth,
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(data): Json<NewComment>,
) -> Result<Json<Comment>, Error> {
    Ok(Json(
        CommentTree::new(&*db)
            .add_comment(BlogId(id), user, data)
            .await?,
    ))
}

pub async fn delete_comment(
    Auth(user): Auth,
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<Json<usize>, Error> {
    let outcome = CommentTree::new(&*db)
        .delete_comment(CommentId(id), user)
        .await?;
    Ok(Json(outcome.deleted.len()))
}

pub async fn unseen_notifications(
    Auth(user): Auth,
    State(db): State<Db>,
) -> Result<Json<bool>, Error> {
    Ok(Json(
        NotificationLedger::new(&*db)
            .has_unseen(user)
            .await
            .with_context(|| format!("checking unseen notifications for {:?}", user))?,
    ))
}

pub async fn list_notifications(
    Auth(user): Auth,
    State(db): State<Db>,
    Json(query): Json<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, Error> {
    Ok(Json(
        NotificationLedger::new(&*db)
            .list_page(user, query)
            .await
            .with_context(|| format!("listing notifications for {:?}", user))?,
    ))
}

#[derive(serde::Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

pub async fn upload_url(
    Auth(user): Auth,
    State(signer): State<Signer>,
    Query(params): Query<UploadParams>,
) -> Json<UploadUrl> {
    Json(signer.upload_url(user, &params.filename))
}
