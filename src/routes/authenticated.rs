use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post, put},
};

/// Authenticated Router Module
///
/// Every content write. The router built here is layered with both the
/// authentication middleware and the admin gate in `create_router`, so handlers
/// never check the caller themselves.
///
/// Paths overlap the public read routes; axum merges the method routers, so
/// `GET /categories/{id}` stays public while `PUT` on the same path is guarded.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/categories", post(handlers::category::create_category))
        .route(
            "/categories/{id}",
            put(handlers::category::update_category).delete(handlers::category::delete_category),
        )
        .route("/tags", post(handlers::tag::create_tag))
        .route(
            "/tags/{id}",
            put(handlers::tag::update_tag).delete(handlers::tag::delete_tag),
        )
        .route("/posts", post(handlers::post::create_post))
        .route(
            "/posts/{id}",
            put(handlers::post::update_post).delete(handlers::post::delete_post),
        )
        .route("/post-tags", post(handlers::post_tag::link_post_tags))
        .route(
            "/post-tags/{post_id}/{tag_id}",
            delete(handlers::post_tag::unlink_post_tag),
        )
}
