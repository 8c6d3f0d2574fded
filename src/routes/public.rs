use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a bearer token. Mounted under `/api/v1`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // --- Content reads ---
        .route("/categories", get(handlers::category::list_categories))
        .route("/categories/search", get(handlers::category::search_categories))
        .route("/categories/{id}", get(handlers::category::get_category))
        .route("/tags", get(handlers::tag::list_tags))
        .route("/tags/search", get(handlers::tag::search_tags))
        .route("/tags/{id}", get(handlers::tag::get_tag))
        .route("/posts", get(handlers::post::list_posts))
        .route("/posts/search", get(handlers::post::search_posts))
        .route("/posts/{id}", get(handlers::post::get_post))
        .route("/post-tags/{post_id}", get(handlers::post_tag::get_post_tags))
        // --- Identity ---
        // Sign-in is two-step for two-factor accounts: sign-in emails a code,
        // verify-otp exchanges it for tokens.
        .route("/auth/sign-up", post(handlers::auth::sign_up))
        .route("/auth/sign-in", post(handlers::auth::sign_in))
        .route("/auth/verify-otp", post(handlers::auth::verify_otp))
        // Expired access tokens are accepted here; only the refresh record decides.
        .route("/token/refresh", post(handlers::token::refresh_token))
        .route("/token/revoke", post(handlers::token::revoke_token))
}
