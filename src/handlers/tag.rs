use axum::extract::{Path, Query, State};

use super::{ApiResponse, CreatedResponse, created, found, ok};
use crate::{
    extract::ValidatedJson,
    models::{PageList, PageQuery, SearchQuery, TagDto, TagRequest},
    services::TagService,
};

const NOT_FOUND: &str = "Tag not found";

#[utoipa::path(
    get,
    path = "/api/v1/tags",
    params(PageQuery),
    responses((status = 200, description = "Page of tags", body = inline(PageList<TagDto>)))
)]
pub async fn list_tags(
    State(service): State<TagService>,
    Query(query): Query<PageQuery>,
) -> ApiResponse<PageList<TagDto>> {
    ok(service.list(query).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/tags/search",
    params(SearchQuery),
    responses((status = 200, description = "Matching tags", body = [TagDto]))
)]
pub async fn search_tags(
    State(service): State<TagService>,
    Query(query): Query<SearchQuery>,
) -> ApiResponse<Vec<TagDto>> {
    ok(service.search(query.keyword.as_deref()).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/tags/{id}",
    responses(
        (status = 200, description = "Tag", body = TagDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_tag(
    State(service): State<TagService>,
    Path(id): Path<i32>,
) -> ApiResponse<TagDto> {
    found(service.get(id).await?, NOT_FOUND)
}

#[utoipa::path(
    post,
    path = "/api/v1/tags",
    request_body = TagRequest,
    responses(
        (status = 201, description = "Created", body = TagDto),
        (status = 400, description = "Validation failed or duplicate slug")
    )
)]
pub async fn create_tag(
    State(service): State<TagService>,
    ValidatedJson(payload): ValidatedJson<TagRequest>,
) -> CreatedResponse<TagDto> {
    created(service.create(payload).await?)
}

#[utoipa::path(
    put,
    path = "/api/v1/tags/{id}",
    request_body = TagRequest,
    responses(
        (status = 200, description = "Updated", body = TagDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_tag(
    State(service): State<TagService>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<TagRequest>,
) -> ApiResponse<TagDto> {
    found(service.update(id, payload).await?, NOT_FOUND)
}

#[utoipa::path(
    delete,
    path = "/api/v1/tags/{id}",
    responses(
        (status = 200, description = "Deleted tag", body = TagDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_tag(
    State(service): State<TagService>,
    Path(id): Path<i32>,
) -> ApiResponse<TagDto> {
    found(service.delete(id).await?, NOT_FOUND)
}
