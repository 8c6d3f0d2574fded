use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// One `post_tag_maps` row joined with the tag's name.
#[derive(Debug, Clone, FromRow)]
pub struct PostTagLink {
    pub post_id: i32,
    pub tag_id: i32,
    pub tag_name: String,
}

/// PostTagsDto
///
/// The tags currently linked to a post, by name, in link-table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostTagsDto {
    pub post_id: i32,
    pub tag_names: Vec<String>,
}

/// PostTagRequest
///
/// Input payload for `POST /post-tags`. Unknown or already-linked tag ids are
/// skipped, not rejected; only the shape of the list is validated here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostTagRequest {
    #[validate(range(min = 1, message = "PostId must be greater than 0."))]
    pub post_id: i32,
    #[validate(
        length(min = 1, message = "TagIds must not be empty."),
        custom(function = "validate_tag_ids")
    )]
    pub tag_ids: Vec<i32>,
}

fn validate_tag_ids(tag_ids: &[i32]) -> Result<(), ValidationError> {
    if tag_ids.iter().all(|id| *id > 0) {
        return Ok(());
    }
    Err(ValidationError::new("tag_ids").with_message("Each TagId must be greater than 0.".into()))
}
