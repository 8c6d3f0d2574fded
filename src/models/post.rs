use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

/// Post
///
/// Row of the `posts` table. Every post belongs to exactly one category;
/// deleting the category removes its posts.
#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub short_description: String,
    pub description: String,
    pub meta: String,
    // Sealed, see `crypto::SlugCipher`.
    pub url_slug: String,
    pub published: bool,
    pub posted_on: DateTime<Utc>,
    // Null until the first update.
    pub modified: Option<DateTime<Utc>>,
    pub category_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostDto {
    pub id: i32,
    pub title: String,
    pub short_description: String,
    pub description: String,
    pub meta: String,
    pub url_slug: String,
    pub published: bool,
    #[ts(type = "string")]
    pub posted_on: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub modified: Option<DateTime<Utc>>,
    pub category_id: i32,
}

/// PostRequest
///
/// Input payload for creating and updating posts. Timestamps are server-assigned.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required and must not exceed 255 characters."))]
    pub title: String,
    #[validate(length(min = 1, max = 1000, message = "ShortDescription is required and must not exceed 1000 characters."))]
    pub short_description: String,
    #[validate(length(min = 1, max = 10000, message = "Description is required and must not exceed 10000 characters."))]
    pub description: String,
    #[validate(length(min = 1, max = 1000, message = "Meta is required and must not exceed 1000 characters."))]
    pub meta: String,
    #[validate(length(min = 1, max = 450, message = "UrlSlug is required and must not exceed 450 characters."))]
    #[schema(example = "hello-axum")]
    pub url_slug: String,
    #[serde(default)]
    pub published: bool,
    #[validate(range(min = 1, message = "CategoryId must be greater than 0."))]
    pub category_id: i32,
}
