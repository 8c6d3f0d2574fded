use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

// Row of the `tags` table; `url_slug` is sealed.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub url_slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TagDto {
    pub id: i32,
    pub name: String,
    pub url_slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TagRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required and must not exceed 255 characters."))]
    #[schema(example = "axum")]
    pub name: String,
    #[validate(length(min = 1, max = 450, message = "UrlSlug is required and must not exceed 450 characters."))]
    #[schema(example = "axum")]
    pub url_slug: String,
    #[validate(length(max = 1000, message = "Description must not exceed 1000 characters."))]
    #[serde(default)]
    pub description: String,
}
