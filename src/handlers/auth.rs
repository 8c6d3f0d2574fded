use axum::extract::State;

use super::{ApiResponse, CreatedResponse, created, ok};
use crate::{
    extract::ValidatedJson,
    models::{
        SignInRequest, SignInResponse, SignUpRequest, SignUpResponse, TokenResponse,
        VerifyOtpRequest,
    },
    services::AuthService,
};

/// sign_up
///
/// [Public Route] Registers an account. Two-factor sign-in is enabled for it.
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Registered", body = SignUpResponse),
        (status = 400, description = "Validation failed, passwords differ, or email/user name in use")
    )
)]
pub async fn sign_up(
    State(service): State<AuthService>,
    ValidatedJson(payload): ValidatedJson<SignUpRequest>,
) -> CreatedResponse<SignUpResponse> {
    created(service.sign_up(payload).await?)
}

/// sign_in
///
/// [Public Route] Checks the password. For two-factor accounts an OTP is
/// emailed and no token is returned yet.
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "OTP sent, or tokens for accounts without two-factor", body = SignInResponse),
        (status = 401, description = "Incorrect username or password")
    )
)]
pub async fn sign_in(
    State(service): State<AuthService>,
    ValidatedJson(payload): ValidatedJson<SignInRequest>,
) -> ApiResponse<SignInResponse> {
    ok(service.sign_in(payload).await?)
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn verify_otp(
    State(service): State<AuthService>,
    ValidatedJson(payload): ValidatedJson<VerifyOtpRequest>,
) -> ApiResponse<TokenResponse> {
    ok(service.verify_otp(payload).await?)
}
