use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

/// Category
///
/// Row of the `categories` table. `url_slug` holds the sealed slug exactly as
/// stored; it only ever leaves the service layer decrypted, inside [`CategoryDto`].
#[derive(Debug, Clone, FromRow, Default)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub url_slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryDto {
    pub id: i32,
    pub name: String,
    /// Plaintext slug.
    pub url_slug: String,
    pub description: String,
}

/// CategoryRequest
///
/// Input payload for `POST /categories` and `PUT /categories/{id}`.
/// The slug is supplied in plaintext and sealed before it reaches storage.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required and must not exceed 255 characters."))]
    #[schema(example = "Programming")]
    pub name: String,
    #[validate(length(min = 1, max = 450, message = "UrlSlug is required and must not exceed 450 characters."))]
    #[schema(example = "programming")]
    pub url_slug: String,
    #[validate(length(max = 1000, message = "Description must not exceed 1000 characters."))]
    #[serde(default)]
    pub description: String,
}
