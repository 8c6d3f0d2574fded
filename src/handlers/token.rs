use axum::{extract::State, http::StatusCode};

use super::{ApiResponse, ok};
use crate::{
    error::AppResult,
    extract::ValidatedJson,
    models::{RefreshTokenRequest, TokenResponse},
    services::TokenService,
};

/// refresh_token
///
/// [Public Route] Trades an access/refresh pair for a new one. The presented
/// refresh token is consumed; presenting it again fails.
#[utoipa::path(
    post,
    path = "/api/v1/token/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Unknown, used, revoked or expired refresh token")
    )
)]
pub async fn refresh_token(
    State(service): State<TokenService>,
    ValidatedJson(payload): ValidatedJson<RefreshTokenRequest>,
) -> ApiResponse<TokenResponse> {
    ok(service.refresh(&payload).await?)
}

#[utoipa::path(
    post,
    path = "/api/v1/token/revoke",
    request_body = RefreshTokenRequest,
    responses(
        (status = 204, description = "Revoked, or nothing matched"),
        (status = 401, description = "Access token unreadable")
    )
)]
pub async fn revoke_token(
    State(service): State<TokenService>,
    ValidatedJson(payload): ValidatedJson<RefreshTokenRequest>,
) -> AppResult<StatusCode> {
    service.revoke(&payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
