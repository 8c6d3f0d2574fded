use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::JwtSettings,
    error::{AppError, AppResult},
    models::User,
};

const REFRESH_SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFRESH_SUFFIX_LEN: usize = 32;

/// Claims
///
/// Payload of every access token. Identity claims are copied from the user at
/// issue time; the extractor still reloads the user so a deleted account or a
/// changed role takes effect before the token expires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    /// Unique per token, so two tokens minted in the same second still differ.
    pub jti: Uuid,
    /// Display name (first name).
    pub name: String,
    /// Login name.
    pub unique_name: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// JwtService
///
/// Signs and verifies HS256 access tokens and mints opaque refresh tokens.
/// Stateless apart from the key material, so it is cloned freely into state.
#[derive(Clone)]
pub struct JwtService {
    settings: JwtSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(settings: JwtSettings) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(settings.secret.as_bytes());
        Self {
            settings,
            encoding_key,
            decoding_key,
        }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    /// Issues an access token for `user`, valid for `token_validity_minutes` from `now`.
    /// Returns the token and its expiry.
    pub fn generate_access_token(
        &self,
        user: &User,
        now: DateTime<Utc>,
    ) -> AppResult<(String, DateTime<Utc>)> {
        let expires = now + Duration::minutes(self.settings.token_validity_minutes);
        let claims = Claims {
            sub: user.id,
            jti: Uuid::new_v4(),
            name: user.first_name.clone(),
            unique_name: user.user_name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            exp: expires.timestamp() as usize,
            iat: now.timestamp() as usize,
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("failed to sign access token: {e}")))?;
        Ok((token, expires))
    }

    /// Strict verification used for bearer authentication: signature, expiry,
    /// and issuer/audience when configured.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation(true))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::Unauthorized("Token has expired.".into()),
                _ => AppError::Unauthorized("Invalid token.".into()),
            })
    }

    /// Recovers the subject of a correctly signed token even if it has expired.
    /// Refresh and revoke operate on access tokens that are typically past expiry.
    pub fn subject_ignoring_expiry(&self, token: &str) -> Option<Uuid> {
        decode::<Claims>(token, &self.decoding_key, &self.validation(false))
            .map(|data| data.claims.sub)
            .ok()
    }

    /// `<uuid without hyphens>_<32 chars of A-Z0-9>`.
    pub fn generate_refresh_token(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..REFRESH_SUFFIX_LEN)
            .map(|_| {
                let idx = rng.gen_range(0..REFRESH_SUFFIX_CHARSET.len());
                REFRESH_SUFFIX_CHARSET[idx] as char
            })
            .collect();
        format!("{}_{}", Uuid::new_v4().simple(), suffix)
    }

    pub fn refresh_token_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(self.settings.refresh_token_validity_days)
    }

    fn validation(&self, check_expiry: bool) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = check_expiry;
        if !check_expiry {
            validation.required_spec_claims.remove("exp");
        }

        match &self.settings.issuer {
            Some(issuer) => validation.set_issuer(&[issuer]),
            None => validation.iss = None,
        }
        match &self.settings.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            user_name: "ada".into(),
            email: "ada@example.com".into(),
            password_hash: String::new(),
            two_factor_enabled: true,
            role: "admin".into(),
            created_on: Utc::now(),
        }
    }

    #[test]
    fn test_issued_token_verifies() {
        let service = JwtService::new(JwtSettings::default());
        let user = user();
        let (token, expires) = service.generate_access_token(&user, Utc::now()).unwrap();

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.unique_name, "ada");
        assert_eq!(claims.exp, expires.timestamp() as usize);
    }

    #[test]
    fn test_expired_token_only_passes_lenient_check() {
        let service = JwtService::new(JwtSettings::default());
        let user = user();
        let issued_at = Utc::now() - Duration::days(2);
        let (token, _) = service.generate_access_token(&user, issued_at).unwrap();

        assert!(service.verify(&token).is_err());
        assert_eq!(service.subject_ignoring_expiry(&token), Some(user.id));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let ours = JwtService::new(JwtSettings::default());
        let theirs = JwtService::new(JwtSettings {
            secret: "another-secret-entirely".into(),
            ..JwtSettings::default()
        });
        let (token, _) = theirs.generate_access_token(&user(), Utc::now()).unwrap();

        assert!(ours.verify(&token).is_err());
        assert_eq!(ours.subject_ignoring_expiry(&token), None);
    }

    #[test]
    fn test_audience_is_enforced_when_configured() {
        let strict = JwtService::new(JwtSettings {
            issuer: Some("blog-api".into()),
            audience: Some("blog-web".into()),
            ..JwtSettings::default()
        });
        let lax = JwtService::new(JwtSettings::default());
        let (token, _) = lax.generate_access_token(&user(), Utc::now()).unwrap();

        assert!(strict.verify(&token).is_err());
    }

    #[test]
    fn test_refresh_token_shape() {
        let token = JwtService::new(JwtSettings::default()).generate_refresh_token();
        let (prefix, suffix) = token.split_once('_').unwrap();
        assert_eq!(prefix.len(), 32);
        assert_eq!(suffix.len(), REFRESH_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
