//! API endpoints.

mod admin;
mod comments;
mod groups;
mod health;
mod notifications;
mod posts;
mod reactions;
mod reports;
mod users;

use axum::{Router, extract::DefaultBodyLimit, routing::get};

use crate::{middleware::AppState, streaming::streaming_handler};

/// Create the API router. The server mounts it under `/api`.
///
/// `upload_limit` caps request bodies on the routes that accept multipart
/// media (posts, groups and user avatars); every other route keeps axum's
/// default limit.
pub fn router(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .nest("/reactions", reactions::router())
        .nest("/comments", comments::router())
        .nest(
            "/posts",
            posts::router().layer(DefaultBodyLimit::max(upload_limit)),
        )
        .nest(
            "/groups",
            groups::router().layer(DefaultBodyLimit::max(upload_limit)),
        )
        .nest("/notifications", notifications::router())
        .nest("/reports", reports::router())
        .nest(
            "/users",
            users::router().layer(DefaultBodyLimit::max(upload_limit)),
        )
        .nest("/admin", admin::router())
        .nest("/health", health::router())
        .route("/streaming", get(streaming_handler))
}
