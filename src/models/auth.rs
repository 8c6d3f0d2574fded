use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const ADMIN_ROLE: &str = "admin";

/// User
///
/// Row of the `users` table. `email` is stored normalized (trimmed, inner
/// whitespace removed, lower-cased) so lookups can compare it directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    // Argon2id PHC string.
    pub password_hash: String,
    pub two_factor_enabled: bool,
    // RBAC field checked by the admin route layer.
    pub role: String,
    pub created_on: DateTime<Utc>,
}

/// UserRefreshToken
///
/// One link in a session's refresh chain. Records are never deleted: consuming
/// a token sets `is_used`, revoking sets `is_revoked`, and either flag retires it.
#[derive(Debug, Clone, FromRow)]
pub struct UserRefreshToken {
    pub id: i32,
    pub user_id: Uuid,
    // The access token this refresh token was issued alongside.
    pub access_token: String,
    pub refresh_token: String,
    pub expiry_time: DateTime<Utc>,
    pub is_used: bool,
    pub is_revoked: bool,
    pub created_on: DateTime<Utc>,
    pub updated_on: Option<DateTime<Utc>>,
}

impl UserRefreshToken {
    /// Usable for exactly one refresh: not consumed, not revoked, not past expiry.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_revoked && self.expiry_time > now
    }
}

// --- Request Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignUpRequest {
    #[validate(length(min = 1, max = 100, message = "FirstName is required."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "LastName is required."))]
    pub last_name: String,
    #[validate(email(message = "Email is not a valid email address."))]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[validate(length(min = 3, max = 256, message = "UserName must be between 3 and 256 characters."))]
    pub user_name: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,
    #[validate(length(min = 1, message = "ConfirmPassword is required."))]
    pub confirm_password: String,
}

/// SignInRequest
///
/// `user_name` accepts either the account's user name or its email address.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignInRequest {
    #[validate(length(min = 1, message = "UserName is required."))]
    pub user_name: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct VerifyOtpRequest {
    #[validate(length(min = 1, message = "UserName is required."))]
    pub user_name: String,
    #[validate(length(equal = 6, message = "Otp must be 6 digits."))]
    pub otp: String,
}

/// Used by both `/token/refresh` and `/token/revoke`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "AccessToken is required."))]
    pub access_token: String,
    #[validate(length(min = 1, message = "RefreshToken is required."))]
    pub refresh_token: String,
}

// --- Responses ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[ts(type = "string")]
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignUpResponse {
    pub ok: bool,
}

/// SignInResponse
///
/// With two-factor enabled no token is returned: the caller must complete
/// `/auth/verify-otp` with the emailed code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SignInResponse {
    pub two_factor_required: bool,
    pub message: String,
    pub token: Option<TokenResponse>,
}
