//! Domain services.
//!
//! Each service is a thin orchestration layer over the [`UnitOfWork`]: it applies
//! the business rules (slug uniqueness, category existence, OTP and refresh-token
//! checks), seals and opens slugs, and maps rows to DTOs.
//!
//! Convention for missing targets: lookups, updates and deletes return
//! `Ok(None)` when the addressed entity does not exist. Handlers turn that into
//! a 404 envelope, so "absent" never travels as an error.
//!
//! Services are extracted straight from [`crate::AppState`] through `FromRef`.

pub mod auth;
pub mod category;
pub mod post;
pub mod post_tag;
pub mod tag;
pub mod token;

pub use auth::AuthService;
pub use category::CategoryService;
pub use post::PostService;
pub use post_tag::PostTagService;
pub use tag::TagService;
pub use token::TokenService;

use crate::{
    crypto::SlugCipher,
    error::{AppError, AppResult},
    models::{PageList, PageQuery},
    repository::EntityRepository,
};

pub const DUPLICATE_SLUG_MESSAGE: &str = "UrlSlug already exists.";

/// Loads one page of rows together with the total row count.
pub(crate) async fn load_page<T, D>(
    repo: &dyn EntityRepository<T, D>,
    query: PageQuery,
) -> AppResult<PageList<T>> {
    let window = query.window();
    let total = repo.count().await?;
    let items = repo.list(window).await?;
    Ok(PageList::new(items, total, window))
}

/// Rejects `candidate` if any other row already uses it as its plaintext slug.
///
/// Stored slugs are sealed with a random nonce, so the comparison has to happen
/// after decryption. `owner` is the id being updated, whose own slug may be kept.
pub(crate) fn ensure_unique_slug(
    cipher: &SlugCipher,
    stored: &[(i32, String)],
    candidate: &str,
    owner: Option<i32>,
) -> AppResult<()> {
    for (id, sealed) in stored {
        if Some(*id) == owner {
            continue;
        }
        match cipher.decrypt(sealed) {
            Ok(existing) if existing == candidate => {
                return Err(AppError::BadRequest(DUPLICATE_SLUG_MESSAGE.to_string()));
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(id, error = %e, "stored slug could not be decrypted"),
        }
    }
    Ok(())
}

/// Trimmed keyword, or `None` when the caller sent nothing searchable.
pub(crate) fn search_keyword(keyword: Option<&str>) -> Option<&str> {
    keyword.map(str::trim).filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> SlugCipher {
        SlugCipher::from_base64_key("MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=").unwrap()
    }

    #[test]
    fn test_duplicate_plaintext_is_found_through_encryption() {
        let cipher = cipher();
        let stored = vec![(1, cipher.encrypt("rust").unwrap())];

        assert!(ensure_unique_slug(&cipher, &stored, "rust", None).is_err());
        assert!(ensure_unique_slug(&cipher, &stored, "rust", Some(1)).is_ok());
        assert!(ensure_unique_slug(&cipher, &stored, "go", None).is_ok());
    }

    #[test]
    fn test_blank_keywords_are_dropped() {
        assert_eq!(search_keyword(Some("  ")), None);
        assert_eq!(search_keyword(None), None);
        assert_eq!(search_keyword(Some(" axum ")), Some("axum"));
    }
}
