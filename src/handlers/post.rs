use axum::extract::{Path, Query, State};

use super::{ApiResponse, CreatedResponse, created, found, ok};
use crate::{
    extract::ValidatedJson,
    models::{PageList, PageQuery, PostDto, PostRequest, SearchQuery},
    services::PostService,
};

const NOT_FOUND: &str = "Post not found";

#[utoipa::path(
    get,
    path = "/api/v1/posts",
    params(PageQuery),
    responses((status = 200, description = "Page of posts", body = inline(PageList<PostDto>)))
)]
pub async fn list_posts(
    State(service): State<PostService>,
    Query(query): Query<PageQuery>,
) -> ApiResponse<PageList<PostDto>> {
    ok(service.list(query).await?)
}

/// search_posts
///
/// [Public Route] Case-insensitive match on the title and both descriptions.
#[utoipa::path(
    get,
    path = "/api/v1/posts/search",
    params(SearchQuery),
    responses((status = 200, description = "Matching posts", body = [PostDto]))
)]
pub async fn search_posts(
    State(service): State<PostService>,
    Query(query): Query<SearchQuery>,
) -> ApiResponse<Vec<PostDto>> {
    ok(service.search(query.keyword.as_deref()).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/posts/{id}",
    responses(
        (status = 200, description = "Post", body = PostDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    State(service): State<PostService>,
    Path(id): Path<i32>,
) -> ApiResponse<PostDto> {
    found(service.get(id).await?, NOT_FOUND)
}

/// create_post
///
/// [Admin Route] The referenced category must exist and the slug must be unused.
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = PostRequest,
    responses(
        (status = 201, description = "Created", body = PostDto),
        (status = 400, description = "Validation failed, unknown category or duplicate slug")
    )
)]
pub async fn create_post(
    State(service): State<PostService>,
    ValidatedJson(payload): ValidatedJson<PostRequest>,
) -> CreatedResponse<PostDto> {
    created(service.create(payload).await?)
}

#[utoipa::path(
    put,
    path = "/api/v1/posts/{id}",
    request_body = PostRequest,
    responses(
        (status = 200, description = "Updated", body = PostDto),
        (status = 400, description = "Validation failed, unknown category or duplicate slug"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    State(service): State<PostService>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<PostRequest>,
) -> ApiResponse<PostDto> {
    found(service.update(id, payload).await?, NOT_FOUND)
}

#[utoipa::path(
    delete,
    path = "/api/v1/posts/{id}",
    responses(
        (status = 200, description = "Deleted post", body = PostDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    State(service): State<PostService>,
    Path(id): Path<i32>,
) -> ApiResponse<PostDto> {
    found(service.delete(id).await?, NOT_FOUND)
}
