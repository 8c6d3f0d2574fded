use axum::extract::{Path, State};

use super::{ApiResponse, found};
use crate::{
    extract::ValidatedJson,
    models::{PostTagRequest, PostTagsDto},
    services::PostTagService,
};

const POST_NOT_FOUND: &str = "Post not found";

#[utoipa::path(
    get,
    path = "/api/v1/post-tags/{post_id}",
    responses(
        (status = 200, description = "Tags linked to the post", body = PostTagsDto),
        (status = 404, description = "Post not found")
    )
)]
pub async fn get_post_tags(
    State(service): State<PostTagService>,
    Path(post_id): Path<i32>,
) -> ApiResponse<PostTagsDto> {
    found(service.get(post_id).await?, POST_NOT_FOUND)
}

/// link_post_tags
///
/// [Admin Route] Merges the given tags into the post's tag list. Unknown and
/// already-linked ids are skipped; the response carries the full list afterwards.
#[utoipa::path(
    post,
    path = "/api/v1/post-tags",
    request_body = PostTagRequest,
    responses(
        (status = 200, description = "Tags linked to the post after the merge", body = PostTagsDto),
        (status = 400, description = "Empty or non-positive tag ids"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn link_post_tags(
    State(service): State<PostTagService>,
    ValidatedJson(payload): ValidatedJson<PostTagRequest>,
) -> ApiResponse<PostTagsDto> {
    found(service.link(payload).await?, POST_NOT_FOUND)
}

#[utoipa::path(
    delete,
    path = "/api/v1/post-tags/{post_id}/{tag_id}",
    responses(
        (status = 200, description = "Tags remaining on the post", body = PostTagsDto),
        (status = 404, description = "Post or link not found")
    )
)]
pub async fn unlink_post_tag(
    State(service): State<PostTagService>,
    Path((post_id, tag_id)): Path<(i32, i32)>,
) -> ApiResponse<PostTagsDto> {
    found(service.unlink(post_id, tag_id).await?, "Link does not exist")
}
