use axum::extract::FromRef;
use chrono::{DateTime, Utc};

use crate::{
    AppState,
    error::{AppError, AppResult},
    jwt::JwtService,
    models::{RefreshTokenRequest, TokenResponse, User},
    repository::{NewRefreshToken, RepoResult, UnitOfWork},
};

const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

fn unauthorized() -> AppError {
    AppError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
}

/// TokenService
///
/// Issues access/refresh pairs and rotates them.
///
/// Refresh tokens are single use. A refresh locates the record issued together
/// with the presented access token, and in one commit retires it and stores
/// its successor. A record that is used, revoked or expired refuses to rotate,
/// and nothing is marked used unless the replacement is written too.
#[derive(Clone)]
pub struct TokenService {
    uow: UnitOfWork,
    jwt: JwtService,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.uow.clone(), state.jwt.clone())
    }
}

impl TokenService {
    pub fn new(uow: UnitOfWork, jwt: JwtService) -> Self {
        Self { uow, jwt }
    }

    /// Starts a new session chain for `user`.
    pub async fn issue_for(&self, user: &User) -> AppResult<TokenResponse> {
        let now = Utc::now();
        let (replacement, response) = self.new_pair(user, now)?;
        self.uow.refresh_tokens.insert(&replacement).await?;
        tracing::info!(user_id = %user.id, "token pair issued");
        Ok(response)
    }

    pub async fn refresh(&self, request: &RefreshTokenRequest) -> AppResult<TokenResponse> {
        let user_id = self
            .jwt
            .subject_ignoring_expiry(&request.access_token)
            .ok_or_else(unauthorized)?;

        let user = self
            .uow
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(unauthorized)?;

        let record = self
            .uow
            .refresh_tokens
            .find(user_id, &request.access_token, &request.refresh_token)
            .await?
            .ok_or_else(unauthorized)?;

        let now = Utc::now();
        if !record.is_active(now) {
            tracing::warn!(
                %user_id,
                record_id = record.id,
                used = record.is_used,
                revoked = record.is_revoked,
                "refresh rejected for inactive token"
            );
            return Err(unauthorized());
        }

        let (replacement, response) = self.new_pair(&user, now)?;
        match self.uow.refresh_tokens.rotate(record.id, &replacement).await? {
            Some(_) => {
                tracing::info!(%user_id, "token pair rotated");
                Ok(response)
            }
            None => {
                tracing::warn!(%user_id, record_id = record.id, "refresh token consumed concurrently");
                Err(unauthorized())
            }
        }
    }

    /// Revokes the matching refresh token.
    ///
    /// Only an invalid access token is reported. Unknown records and persistence
    /// failures are logged and otherwise ignored.
    pub async fn revoke(&self, request: &RefreshTokenRequest) -> AppResult<()> {
        let user_id = self
            .jwt
            .subject_ignoring_expiry(&request.access_token)
            .ok_or_else(unauthorized)?;

        let outcome: RepoResult<bool> = async {
            let record = self
                .uow
                .refresh_tokens
                .find(user_id, &request.access_token, &request.refresh_token)
                .await?;
            match record {
                Some(record) => self.uow.refresh_tokens.revoke(record.id).await,
                None => Ok(false),
            }
        }
        .await;

        match outcome {
            Ok(true) => tracing::info!(%user_id, "refresh token revoked"),
            Ok(false) => tracing::debug!(%user_id, "revoke matched no refresh token"),
            Err(e) => tracing::warn!(%user_id, error = %e, "revoke failed; ignoring"),
        }
        Ok(())
    }

    fn new_pair(&self, user: &User, now: DateTime<Utc>) -> AppResult<(NewRefreshToken, TokenResponse)> {
        let (access_token, expires) = self.jwt.generate_access_token(user, now)?;
        let refresh_token = self.jwt.generate_refresh_token();

        let record = NewRefreshToken {
            user_id: user.id,
            access_token: access_token.clone(),
            refresh_token: refresh_token.clone(),
            expiry_time: self.jwt.refresh_token_expiry(now),
        };
        let response = TokenResponse {
            access_token,
            refresh_token,
            expires,
        };
        Ok((record, response))
    }
}
