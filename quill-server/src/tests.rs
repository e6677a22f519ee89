#![cfg(test)]

use std::{fmt::Debug, sync::Arc};

use axum::{http::request, Router};
use quill_api::{
    AuthToken, Blog, BlogId, Comment, CommentId, Error as ApiError, LikeToggle, NewBlog,
    NewComment, NewSession, NewUser, Notification, NotificationFilter, NotificationId,
    NotificationKind, NotificationQuery, UploadUrl, UserId, Uuid,
};
use quill_mock_store::MemoryStore;
use tower::{Service, ServiceExt};

use crate::{
    app,
    comments::CommentTree,
    extractors::{AppState, Db, Signer},
    signing::LocalSigner,
};

async fn call<Req, Resp>(
    app: &mut Router,
    req: request::Request<axum::body::Body>,
    req_body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    app.ready().await.expect("waiting for app to be ready");
    let resp = app.call(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    if status == http::StatusCode::OK {
        if std::any::TypeId::of::<Resp>() == std::any::TypeId::of::<()>() {
            // the server returns an empty string in this situation, which does not parse properly with serde_json
            return Ok(serde_json::from_slice(b"null").unwrap());
        } else {
            return Ok(serde_json::from_slice(&body).unwrap_or_else(|err| {
                panic!("failed parsing resp body: {err}\nbody: {body:?}\nrequest: {req_body:?}")
            }));
        }
    }
    Err(ApiError::parse(&body)
        .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {body:?}")))
}

async fn run_on_app<Req, Resp>(
    app: &mut Router,
    method: &str,
    uri: &str,
    token: Option<Uuid>,
    body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug + serde::Serialize,
    Resp: 'static + for<'de> serde::Deserialize<'de>,
{
    let req = request::Builder::new()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    let req = match token {
        Some(token) => req.header(http::header::AUTHORIZATION, format!("bearer {token}")),
        None => req,
    };
    let req = req
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serializing request body to json"),
        ))
        .expect("building request");
    call(app, req, body).await
}

struct TestServer {
    app: Router,
    store: Arc<MemoryStore>,
    admin_token: Uuid,
}

impl TestServer {
    fn new() -> TestServer {
        let store = Arc::new(MemoryStore::new());
        let admin_token = Uuid::new_v4();
        let state = AppState {
            db: Db::new(store.clone()),
            signer: Signer(Arc::new(LocalSigner::new("https://uploads.test"))),
            admin_token: Some(AuthToken(admin_token)),
        };
        TestServer {
            app: app(state),
            store,
            admin_token,
        }
    }

    /// Create a user and log them in
    async fn user(&mut self, name: &str) -> (UserId, AuthToken) {
        let id = UserId(Uuid::new_v4());
        // tests don't actually use bcrypt
        let password = format!("hash-of-{name}");
        let () = run_on_app(
            &mut self.app,
            "POST",
            "/api/admin/create-user",
            Some(self.admin_token),
            &NewUser {
                id,
                name: String::from(name),
                initial_password_hash: password.clone(),
            },
        )
        .await
        .expect("creating user");
        let token = run_on_app(
            &mut self.app,
            "POST",
            "/api/auth",
            None,
            &NewSession {
                user: String::from(name),
                password,
                device: String::from("tests"),
                pow: String::new(),
            },
        )
        .await
        .expect("logging user in");
        (id, token)
    }

    async fn publish(&mut self, token: AuthToken, title: &str) -> Blog {
        run_on_app(
            &mut self.app,
            "POST",
            "/api/blog",
            Some(token.0),
            &NewBlog {
                title: String::from(title),
                body: String::from("..."),
            },
        )
        .await
        .expect("publishing blog")
    }

    async fn blog(&mut self, id: BlogId) -> Result<Blog, ApiError> {
        run_on_app(&mut self.app, "GET", &format!("/api/blog/{}", id.0), None, &()).await
    }

    async fn comment(
        &mut self,
        token: AuthToken,
        blog: BlogId,
        body: &str,
        parent: Option<CommentId>,
        pending: Option<NotificationId>,
    ) -> Result<Comment, ApiError> {
        run_on_app(
            &mut self.app,
            "POST",
            &format!("/api/blog/{}/comment", blog.0),
            Some(token.0),
            &NewComment {
                body: String::from(body),
                parent,
                pending_notification: pending,
            },
        )
        .await
    }

    async fn comments(&mut self, blog: BlogId) -> Vec<Comment> {
        run_on_app(
            &mut self.app,
            "GET",
            &format!("/api/blog/{}/comments", blog.0),
            None,
            &(),
        )
        .await
        .expect("listing comments")
    }

    async fn delete_comment(
        &mut self,
        token: AuthToken,
        comment: CommentId,
    ) -> Result<usize, ApiError> {
        run_on_app(
            &mut self.app,
            "DELETE",
            &format!("/api/comment/{}", comment.0),
            Some(token.0),
            &(),
        )
        .await
    }

    async fn like(&mut self, token: AuthToken, blog: BlogId) -> LikeToggle {
        run_on_app(
            &mut self.app,
            "POST",
            &format!("/api/blog/{}/like", blog.0),
            Some(token.0),
            &(),
        )
        .await
        .expect("toggling like")
    }

    async fn unseen(&mut self, token: AuthToken) -> bool {
        run_on_app(
            &mut self.app,
            "GET",
            "/api/notifications/unseen",
            Some(token.0),
            &(),
        )
        .await
        .expect("checking unseen notifications")
    }

    async fn notifications(
        &mut self,
        token: AuthToken,
        filter: NotificationFilter,
        page: u64,
        page_size: u64,
        deleted_count: u64,
    ) -> Vec<Notification> {
        run_on_app(
            &mut self.app,
            "POST",
            "/api/notifications",
            Some(token.0),
            &NotificationQuery {
                filter,
                page,
                page_size,
                deleted_count,
            },
        )
        .await
        .expect("listing notifications")
    }
}

#[tokio::test]
async fn deleting_a_comment_cascades_to_replies_and_counters() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let (_u2, t2) = s.user("bob").await;
    let blog = s.publish(t1, "hello world").await;

    let c1 = s.comment(t1, blog.id, "hi", None, None).await.unwrap();
    assert!(!c1.is_reply);
    assert_eq!(c1.parent, None);

    let c2 = s
        .comment(t2, blog.id, "hello", Some(c1.id), None)
        .await
        .unwrap();
    assert!(c2.is_reply);
    assert_eq!(c2.parent, Some(c1.id));

    let comments = s.comments(blog.id).await;
    let c1_now = comments.iter().find(|c| c.id == c1.id).unwrap();
    assert_eq!(c1_now.children, vec![c2.id]);

    let blog_now = s.blog(blog.id).await.unwrap();
    assert_eq!(blog_now.activity.total_comments, 2);
    assert_eq!(blog_now.activity.total_parent_comments, 1);
    assert_eq!(blog_now.comments.len(), 2);

    let removed = s.delete_comment(t1, c1.id).await.unwrap();
    assert_eq!(removed, 2);
    assert_eq!(s.store.test_comment_count(), 0);
    assert!(s.comments(blog.id).await.is_empty());

    let blog_now = s.blog(blog.id).await.unwrap();
    assert_eq!(blog_now.activity.total_comments, 0);
    assert_eq!(blog_now.activity.total_parent_comments, 0);
    assert!(blog_now.comments.is_empty());
}

#[tokio::test]
async fn cascade_handles_trees_deeper_than_replies_to_replies() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let blog = s.publish(t1, "deep threads").await;

    // a chain of depth 4 plus a second branch off the root
    let c1 = s.comment(t1, blog.id, "level 1", None, None).await.unwrap();
    let c2 = s
        .comment(t1, blog.id, "level 2", Some(c1.id), None)
        .await
        .unwrap();
    let c3 = s
        .comment(t1, blog.id, "level 3", Some(c2.id), None)
        .await
        .unwrap();
    let _c4 = s
        .comment(t1, blog.id, "level 4", Some(c3.id), None)
        .await
        .unwrap();
    let _branch = s
        .comment(t1, blog.id, "other branch", Some(c1.id), None)
        .await
        .unwrap();
    let keep = s.comment(t1, blog.id, "unrelated", None, None).await.unwrap();

    let removed = s.delete_comment(t1, c1.id).await.unwrap();
    assert_eq!(removed, 5);

    let left: Vec<CommentId> = s.comments(blog.id).await.iter().map(|c| c.id).collect();
    assert_eq!(left, vec![keep.id]);
    // no survivor references a deleted parent
    for c in s.comments(blog.id).await {
        assert!(c.parent.is_none() || left.contains(&c.parent.unwrap()));
    }

    let blog_now = s.blog(blog.id).await.unwrap();
    assert_eq!(blog_now.activity.total_comments, 1);
    assert_eq!(blog_now.activity.total_parent_comments, 1);
}

#[tokio::test]
async fn comment_deletion_is_for_comment_author_or_blog_author_only() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let (_u2, t2) = s.user("bob").await;
    let (_u3, t3) = s.user("carol").await;
    let blog = s.publish(t1, "moderation").await;
    let comment = s.comment(t2, blog.id, "spam", None, None).await.unwrap();

    // a bystander cannot delete
    assert_eq!(
        s.delete_comment(t3, comment.id).await.unwrap_err(),
        ApiError::PermissionDenied
    );
    assert_eq!(s.store.test_comment_count(), 1);

    // the blog's author can delete someone else's comment
    assert_eq!(s.delete_comment(t1, comment.id).await.unwrap(), 1);

    // the comment's author can delete their own
    let comment = s.comment(t2, blog.id, "again", None, None).await.unwrap();
    assert_eq!(s.delete_comment(t2, comment.id).await.unwrap(), 1);
    assert_eq!(s.store.test_comment_count(), 0);
}

#[tokio::test]
async fn empty_comment_bodies_are_rejected_without_side_effects() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let blog = s.publish(t1, "rules").await;

    for body in ["", "   ", "\n\t"] {
        assert_eq!(
            s.comment(t1, blog.id, body, None, None).await.unwrap_err(),
            ApiError::EmptyCommentBody
        );
    }
    assert_eq!(s.store.test_comment_count(), 0);
    assert_eq!(s.store.test_notification_count(), 0);
    let blog_now = s.blog(blog.id).await.unwrap();
    assert_eq!(blog_now.activity.total_comments, 0);
}

#[tokio::test]
async fn commenting_on_a_missing_blog_or_foreign_parent_is_not_found() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let blog = s.publish(t1, "one").await;
    let other = s.publish(t1, "two").await;
    let parent = s.comment(t1, other.id, "elsewhere", None, None).await.unwrap();

    assert!(matches!(
        s.comment(t1, BlogId(Uuid::new_v4()), "hi", None, None)
            .await
            .unwrap_err(),
        ApiError::NotFound { .. }
    ));
    // the parent exists, but on another blog
    assert!(matches!(
        s.comment(t1, blog.id, "hi", Some(parent.id), None)
            .await
            .unwrap_err(),
        ApiError::NotFound { .. }
    ));
}

#[tokio::test]
async fn like_toggle_round_trips_counter_and_notification() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let (_u2, t2) = s.user("bob").await;
    let blog = s.publish(t1, "likeable").await;

    assert_eq!(s.like(t2, blog.id).await, LikeToggle { liked: true });
    assert_eq!(s.blog(blog.id).await.unwrap().activity.total_likes, 1);
    assert!(s.unseen(t1).await);
    let page = s
        .notifications(t1, NotificationFilter::Like, 1, 10, 0)
        .await;
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].kind, NotificationKind::Like);
    assert_eq!(page[0].blog, Some(blog.id));

    assert_eq!(s.like(t2, blog.id).await, LikeToggle { liked: false });
    assert_eq!(s.blog(blog.id).await.unwrap().activity.total_likes, 0);
    assert_eq!(s.store.test_notification_count(), 0);

    // toggling twice more ends up liked again, with a single document
    assert_eq!(s.like(t2, blog.id).await, LikeToggle { liked: true });
    assert_eq!(s.store.test_notification_count(), 1);
}

#[tokio::test]
async fn replies_notify_the_parent_comment_author_and_link_back() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let (u2, t2) = s.user("bob").await;
    let blog = s.publish(t1, "conversations").await;

    // bob comments; alice is notified
    let c_bob = s.comment(t2, blog.id, "nice post", None, None).await.unwrap();
    let page = s.notifications(t1, NotificationFilter::All, 1, 10, 0).await;
    assert_eq!(page.len(), 1);
    let pending = &page[0];
    assert_eq!(pending.kind, NotificationKind::Comment);
    assert_eq!(pending.comment, Some(c_bob.id));
    assert_eq!(pending.reply, None);

    // alice replies, pointing at her pending notification; bob is notified
    let c_reply = s
        .comment(t1, blog.id, "thanks!", Some(c_bob.id), Some(pending.id))
        .await
        .unwrap();
    assert!(s.unseen(t2).await);
    let bob_page = s.notifications(t2, NotificationFilter::Reply, 1, 10, 0).await;
    assert_eq!(bob_page.len(), 1);
    assert_eq!(bob_page[0].recipient, u2);
    assert_eq!(bob_page[0].comment, Some(c_reply.id));
    assert_eq!(bob_page[0].replied_on_comment, Some(c_bob.id));

    // and alice's notification now links to the reply
    let linked = s.store.test_notification(pending.id).unwrap();
    assert_eq!(linked.reply, Some(c_reply.id));

    // deleting the reply clears the back-reference but keeps the notification
    assert_eq!(s.delete_comment(t1, c_reply.id).await.unwrap(), 1);
    let unlinked = s.store.test_notification(pending.id).unwrap();
    assert_eq!(unlinked.reply, None);
    assert_eq!(unlinked.comment, Some(c_bob.id));
    // bob's reply notification went away with the reply
    assert!(s
        .notifications(t2, NotificationFilter::Reply, 1, 10, 0)
        .await
        .is_empty());
}

#[tokio::test]
async fn notification_pages_are_newest_first_marked_seen_and_compensated() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let (_u2, t2) = s.user("bob").await;
    let blog = s.publish(t1, "busy").await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let c = s
            .comment(t2, blog.id, &format!("comment {i}"), None, None)
            .await
            .unwrap();
        ids.push(c.id);
    }

    let page1 = s.notifications(t1, NotificationFilter::All, 1, 2, 0).await;
    assert_eq!(page1.len(), 2);
    assert_eq!(page1[0].comment, Some(ids[4]));
    assert_eq!(page1[1].comment, Some(ids[3]));
    assert!(page1.iter().all(|n| !n.seen));

    // the fetch marked that page seen
    let page1_again = s.notifications(t1, NotificationFilter::All, 1, 2, 0).await;
    assert!(page1_again.iter().all(|n| n.seen));
    assert!(s.unseen(t1).await); // pages 2+ still unseen

    let page2 = s.notifications(t1, NotificationFilter::All, 2, 2, 0).await;
    assert_eq!(page2[0].comment, Some(ids[2]));
    // with one item reported deleted since page 1, the offset shifts back
    let page2_shifted = s.notifications(t1, NotificationFilter::All, 2, 2, 1).await;
    assert_eq!(page2_shifted[0].comment, Some(ids[3]));

    // type filter
    assert!(s
        .notifications(t1, NotificationFilter::Reply, 1, 10, 0)
        .await
        .is_empty());

    // reading everything clears the unseen flag
    s.notifications(t1, NotificationFilter::All, 1, 10, 0).await;
    assert!(!s.unseen(t1).await);
}

#[tokio::test]
async fn own_actions_never_notify_their_author() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let blog = s.publish(t1, "diary").await;

    s.comment(t1, blog.id, "first!", None, None).await.unwrap();
    s.like(t1, blog.id).await;

    // the documents exist, but alice's feed stays empty
    assert_eq!(s.store.test_notification_count(), 2);
    assert!(!s.unseen(t1).await);
    assert!(s
        .notifications(t1, NotificationFilter::All, 1, 10, 0)
        .await
        .is_empty());
}

#[tokio::test]
async fn counter_failures_never_block_the_primary_mutation() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let (_u2, t2) = s.user("bob").await;
    let blog = s.publish(t1, "resilient").await;

    s.store.test_fail_counters(true);

    // the comment is created even though its counter update fails
    let c = s.comment(t2, blog.id, "still here", None, None).await.unwrap();
    assert_eq!(s.store.test_comment_count(), 1);
    // the like toggles even though its counter update fails
    assert_eq!(s.like(t2, blog.id).await, LikeToggle { liked: true });
    // deletion also goes through, with the failed decrements reported as
    // cascade failures rather than an error
    assert_eq!(s.delete_comment(t2, c.id).await.unwrap(), 1);
    assert_eq!(s.store.test_comment_count(), 0);

    s.store.test_fail_counters(false);
    let blog_now = s.blog(blog.id).await.unwrap();
    assert_eq!(blog_now.activity.total_comments, 0);
    assert_eq!(blog_now.activity.total_likes, 0);
}

#[tokio::test]
async fn cascade_continues_past_a_failing_descendant() {
    let store = MemoryStore::new();
    let (u1, u2) = (UserId(Uuid::new_v4()), UserId(Uuid::new_v4()));
    let blog = quill_api::Blog {
        id: BlogId(Uuid::new_v4()),
        author: u1,
        title: String::from("partial failures"),
        body: String::new(),
        comments: Vec::new(),
        activity: Default::default(),
        published_at: chrono::Utc::now(),
    };
    quill_api::Store::create_blog(&store, blog.clone())
        .await
        .unwrap();

    let tree = CommentTree::new(&store);
    let root = tree
        .add_comment(
            blog.id,
            u1,
            NewComment {
                body: String::from("root"),
                parent: None,
                pending_notification: None,
            },
        )
        .await
        .unwrap();
    let stuck = tree
        .add_comment(
            blog.id,
            u2,
            NewComment {
                body: String::from("cannot be deleted"),
                parent: Some(root.id),
                pending_notification: None,
            },
        )
        .await
        .unwrap();
    let sibling = tree
        .add_comment(
            blog.id,
            u2,
            NewComment {
                body: String::from("deletes fine"),
                parent: Some(root.id),
                pending_notification: None,
            },
        )
        .await
        .unwrap();

    store.test_fail_delete(stuck.id);
    let outcome = tree.delete_comment(root.id, u1).await.unwrap();

    assert!(outcome.deleted.contains(&root.id));
    assert!(outcome.deleted.contains(&sibling.id));
    assert!(!outcome.deleted.contains(&stuck.id));
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].comment, stuck.id);
    assert_eq!(store.test_comment_count(), 1);

    // the two successful deletions still decremented the counters
    let blog_now = quill_api::Store::blog_by_id(&store, blog.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(blog_now.activity.total_comments, 1);
    assert_eq!(blog_now.activity.total_parent_comments, 0);
}

#[tokio::test]
async fn deleting_a_blog_takes_its_comments_and_notifications_along() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let (_u2, t2) = s.user("bob").await;
    let blog = s.publish(t1, "ephemeral").await;

    s.comment(t2, blog.id, "hello", None, None).await.unwrap();
    s.like(t2, blog.id).await;

    // only the author may delete
    let err: ApiError = run_on_app::<_, ()>(
        &mut s.app,
        "DELETE",
        &format!("/api/blog/{}", blog.id.0),
        Some(t2.0),
        &(),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::PermissionDenied);

    let () = run_on_app(
        &mut s.app,
        "DELETE",
        &format!("/api/blog/{}", blog.id.0),
        Some(t1.0),
        &(),
    )
    .await
    .unwrap();

    assert!(matches!(
        s.blog(blog.id).await.unwrap_err(),
        ApiError::NotFound { .. }
    ));
    assert_eq!(s.store.test_comment_count(), 0);
    assert_eq!(s.store.test_notification_count(), 0);
}

#[tokio::test]
async fn blog_reads_bump_both_read_counters() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let blog = s.publish(t1, "popular").await;

    s.blog(blog.id).await.unwrap();
    s.blog(blog.id).await.unwrap();
    // the response reflects the reads made before it
    assert_eq!(s.blog(blog.id).await.unwrap().activity.total_reads, 2);
}

#[tokio::test]
async fn sessions_authenticate_and_log_out() {
    let mut s = TestServer::new();
    let (u1, t1) = s.user("alice").await;

    let me: UserId = run_on_app(&mut s.app, "GET", "/api/whoami", Some(t1.0), &())
        .await
        .unwrap();
    assert_eq!(me, u1);

    // garbage token
    let err: ApiError = run_on_app::<_, UserId>(
        &mut s.app,
        "GET",
        "/api/whoami",
        Some(Uuid::new_v4()),
        &(),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::PermissionDenied);

    // wrong password
    let err: ApiError = run_on_app::<_, AuthToken>(
        &mut s.app,
        "POST",
        "/api/auth",
        None,
        &NewSession {
            user: String::from("alice"),
            password: String::from("not-the-hash"),
            device: String::from("tests"),
            pow: String::new(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::PermissionDenied);

    let () = run_on_app(&mut s.app, "POST", "/api/unauth", Some(t1.0), &())
        .await
        .unwrap();
    let err: ApiError = run_on_app::<_, UserId>(&mut s.app, "GET", "/api/whoami", Some(t1.0), &())
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::PermissionDenied);
}

#[tokio::test]
async fn user_creation_is_admin_only_and_conflict_checked() {
    let mut s = TestServer::new();
    let (u1, t1) = s.user("alice").await;

    // a logged-in non-admin cannot create users
    let err: ApiError = run_on_app::<_, ()>(
        &mut s.app,
        "POST",
        "/api/admin/create-user",
        Some(t1.0),
        &NewUser {
            id: UserId(Uuid::new_v4()),
            name: String::from("mallory"),
            initial_password_hash: String::from("h"),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::PermissionDenied);

    // name conflicts are rejected
    let err: ApiError = run_on_app::<_, ()>(
        &mut s.app,
        "POST",
        "/api/admin/create-user",
        Some(s.admin_token),
        &NewUser {
            id: UserId(Uuid::new_v4()),
            name: String::from("alice"),
            initial_password_hash: String::from("h"),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::NameAlreadyUsed(String::from("alice")));

    // id conflicts are rejected
    let err: ApiError = run_on_app::<_, ()>(
        &mut s.app,
        "POST",
        "/api/admin/create-user",
        Some(s.admin_token),
        &NewUser {
            id: u1,
            name: String::from("alice2"),
            initial_password_hash: String::from("h"),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::UuidAlreadyUsed(u1.0));

    // invalid names are rejected
    let err: ApiError = run_on_app::<_, ()>(
        &mut s.app,
        "POST",
        "/api/admin/create-user",
        Some(s.admin_token),
        &NewUser {
            id: UserId(Uuid::new_v4()),
            name: String::from("no spaces"),
            initial_password_hash: String::from("h"),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::InvalidName(String::from("no spaces")));
}

#[tokio::test]
async fn upload_urls_are_scoped_to_the_requesting_user() {
    let mut s = TestServer::new();
    let (u1, t1) = s.user("alice").await;

    let url: UploadUrl = run_on_app(
        &mut s.app,
        "GET",
        "/api/upload-url?filename=portrait.png",
        Some(t1.0),
        &(),
    )
    .await
    .unwrap();
    assert!(url.url.starts_with(&format!("https://uploads.test/{}/", u1.0)));
    assert!(url.url.ends_with("-portrait.png"));

    // anonymous requests get nothing
    let err: ApiError = run_on_app::<_, UploadUrl>(
        &mut s.app,
        "GET",
        "/api/upload-url?filename=portrait.png",
        None,
        &(),
    )
    .await
    .unwrap_err();
    assert_eq!(err, ApiError::PermissionDenied);
}

#[tokio::test]
async fn comment_counters_track_live_comments() {
    let mut s = TestServer::new();
    let (_u1, t1) = s.user("alice").await;
    let (_u2, t2) = s.user("bob").await;
    let blog = s.publish(t1, "busy thread").await;

    let mut roots = Vec::new();
    for i in 0..4 {
        roots.push(
            s.comment(t1, blog.id, &format!("root {i}"), None, None)
                .await
                .unwrap(),
        );
    }
    for root in &roots[..2] {
        s.comment(t2, blog.id, "reply", Some(root.id), None)
            .await
            .unwrap();
    }

    // delete a root with a reply (cascade of 2) and a bare root
    assert_eq!(s.delete_comment(t1, roots[0].id).await.unwrap(), 2);
    assert_eq!(s.delete_comment(t1, roots[3].id).await.unwrap(), 1);

    let blog_now = s.blog(blog.id).await.unwrap();
    let live = s.comments(blog.id).await;
    assert_eq!(blog_now.activity.total_comments as usize, live.len());
    assert_eq!(
        blog_now.activity.total_parent_comments as usize,
        live.iter().filter(|c| !c.is_reply).count()
    );
    assert_eq!(blog_now.comments.len(), live.len());
}
