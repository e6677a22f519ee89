use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    routing::{delete, get, post},
    Router,
};
use quill_api::{AuthToken, Uuid};

mod comments;
mod counters;
mod error;
mod extractors;
mod handlers;
mod notifications;
mod signing;
mod store;
#[cfg(test)]
mod tests;

pub use error::Error;
use extractors::{AppState, Db, Signer};
use signing::LocalSigner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let uri = std::env::var("MONGODB_URI").context("MONGODB_URI must be set")?;
    let db_name = std::env::var("QUILL_DB").unwrap_or_else(|_| String::from("quill"));
    let admin_token = match std::env::var("QUILL_ADMIN_TOKEN") {
        Ok(token) => Some(AuthToken(
            Uuid::try_parse(&token).context("parsing QUILL_ADMIN_TOKEN")?,
        )),
        Err(_) => None,
    };
    let upload_base = std::env::var("QUILL_UPLOAD_BASE")
        .unwrap_or_else(|_| String::from("https://uploads.quill.local"));

    let store = store::MongoStore::connect(&uri, &db_name)
        .await
        .with_context(|| format!("opening database {:?}", db_name))?;
    let state = AppState {
        db: Db::new(Arc::new(store)),
        signer: Signer(Arc::new(LocalSigner::new(upload_base))),
        admin_token,
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!("listening on {}", addr);
    axum::Server::bind(&addr)
        .serve(app(state).into_make_service())
        .await
        .context("serving axum webserver")
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/admin/create-user", post(handlers::admin_create_user))
        .route("/api/auth", post(handlers::auth))
        .route("/api/unauth", post(handlers::unauth))
        .route("/api/whoami", get(handlers::whoami))
        .route("/api/blog", post(handlers::create_blog))
        .route(
            "/api/blog/:id",
            get(handlers::fetch_blog).delete(handlers::delete_blog),
        )
        .route("/api/blog/:id/like", post(handlers::toggle_like))
        .route("/api/blog/:id/comments", get(handlers::list_comments))
        .route("/api/blog/:id/comment", post(handlers::add_comment))
        .route("/api/comment/:id", delete(handlers::delete_comment))
        .route(
            "/api/notifications/unseen",
            get(handlers::unseen_notifications),
        )
        .route("/api/notifications", post(handlers::list_notifications))
        .route("/api/upload-url", get(handlers::upload_url))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
