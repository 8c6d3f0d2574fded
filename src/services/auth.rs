use axum::extract::FromRef;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::TokenService;
use crate::{
    AppState,
    email::{EmailMessage, EmailState},
    error::{AppError, AppResult},
    models::{
        ADMIN_ROLE, SignInRequest, SignInResponse, SignUpRequest, SignUpResponse, TokenResponse,
        User, VerifyOtpRequest,
    },
    otp::OtpStore,
    password::{hash_password, verify_dummy, verify_password},
    repository::{RepositoryError, USERS_USER_NAME_KEY, UnitOfWork},
};

pub const BAD_LOGIN_MESSAGE: &str = "Incorrect username or password.";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials.";
pub const OTP_SENT_MESSAGE: &str = "OTP has been sent to your email.";
pub const OTP_EMAIL_SUBJECT: &str = "Your OTP Login Code";

/// Trims and strips every whitespace character, then lower-cases.
pub fn normalize_email(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// AuthService
///
/// Account registration and the two-step sign-in:
/// 1. `sign_in` checks the password and emails a one-time code.
/// 2. `verify_otp` exchanges that code for an access/refresh pair.
///
/// Accounts with two-factor disabled receive the pair directly from `sign_in`.
#[derive(Clone)]
pub struct AuthService {
    uow: UnitOfWork,
    otp: Arc<OtpStore>,
    email: EmailState,
    tokens: TokenService,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.uow.clone(),
            state.otp.clone(),
            state.email.clone(),
            TokenService::from_ref(state),
        )
    }
}

impl AuthService {
    pub fn new(
        uow: UnitOfWork,
        otp: Arc<OtpStore>,
        email: EmailState,
        tokens: TokenService,
    ) -> Self {
        Self {
            uow,
            otp,
            email,
            tokens,
        }
    }

    /// sign_up
    ///
    /// Registers a new account with two-factor enabled. The new account is
    /// granted the admin role, since every registered author manages content.
    ///
    /// Rejects (400) a password/confirmation mismatch, an email that is already
    /// registered, or a user name that is taken regardless of case.
    pub async fn sign_up(&self, request: SignUpRequest) -> AppResult<SignUpResponse> {
        if request.password != request.confirm_password {
            return Err(AppError::BadRequest(
                "Password and confirmation password do not match.".to_string(),
            ));
        }

        let email = normalize_email(&request.email);
        if self.uow.users.find_by_email(&email).await?.is_some() {
            tracing::warn!(%email, "sign-up rejected: email already registered");
            return Err(AppError::BadRequest("Email is already registered.".to_string()));
        }

        let user_name = request.user_name.trim().to_string();
        if self.uow.users.find_by_user_name(&user_name).await?.is_some() {
            tracing::warn!(%user_name, "sign-up rejected: user name taken");
            return Err(AppError::BadRequest("UserName is already taken.".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            user_name,
            email,
            password_hash: hash_password(&request.password)?,
            two_factor_enabled: true,
            role: ADMIN_ROLE.to_string(),
            created_on: Utc::now(),
        };
        // A concurrent sign-up can still win the race past the checks above.
        match self.uow.users.insert(&user).await {
            Err(RepositoryError::Conflict(constraint)) => {
                tracing::warn!(%constraint, "sign-up rejected: lost a concurrent insert");
                let message = if constraint == USERS_USER_NAME_KEY {
                    "UserName is already taken."
                } else {
                    "Email is already registered."
                };
                return Err(AppError::BadRequest(message.to_string()));
            }
            result => result?,
        }

        tracing::info!(user_id = %user.id, "user registered");
        Ok(SignUpResponse { ok: true })
    }

    pub async fn sign_in(&self, request: SignInRequest) -> AppResult<SignInResponse> {
        let user = match self.find_by_login(&request.user_name).await? {
            Some(user) if verify_password(&request.password, &user.password_hash) => user,
            found => {
                if found.is_none() {
                    verify_dummy(&request.password);
                }
                return Err(AppError::Unauthorized(BAD_LOGIN_MESSAGE.to_string()));
            }
        };

        if !user.two_factor_enabled {
            let token = self.tokens.issue_for(&user).await?;
            return Ok(SignInResponse {
                two_factor_required: false,
                message: "Signed in successfully.".to_string(),
                token: Some(token),
            });
        }

        let code = self.otp.issue(user.id);
        self.email
            .send(EmailMessage {
                to: user.email.clone(),
                subject: OTP_EMAIL_SUBJECT.to_string(),
                content: format!("Your OTP code is: <b>{code}</b>"),
            })
            .await?;

        tracing::info!(user_id = %user.id, "sign-in OTP issued");
        Ok(SignInResponse {
            two_factor_required: true,
            message: OTP_SENT_MESSAGE.to_string(),
            token: None,
        })
    }

    /// Exchanges an emailed code for a token pair. Unknown users and wrong,
    /// expired or reused codes all fail with the same 401.
    pub async fn verify_otp(&self, request: VerifyOtpRequest) -> AppResult<TokenResponse> {
        let invalid = || AppError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string());

        let user = self
            .find_by_login(&request.user_name)
            .await?
            .ok_or_else(invalid)?;

        if !self.otp.verify(user.id, request.otp.trim()) {
            tracing::warn!(user_id = %user.id, "OTP verification failed");
            return Err(invalid());
        }

        self.tokens.issue_for(&user).await
    }

    /// Resolves a login that may be a user name or an email address.
    async fn find_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let login = login.trim();
        if let Some(user) = self.uow.users.find_by_user_name(login).await? {
            return Ok(Some(user));
        }
        Ok(self.uow.users.find_by_email(&normalize_email(login)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_email;

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  Jane.Doe @Example.COM "), "jane.doe@example.com");
    }
}
