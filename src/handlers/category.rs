use axum::extract::{Path, Query, State};

use super::{ApiResponse, CreatedResponse, created, found, ok};
use crate::{
    extract::ValidatedJson,
    models::{CategoryDto, CategoryRequest, PageList, PageQuery, SearchQuery},
    services::CategoryService,
};

const NOT_FOUND: &str = "Category not found";

/// list_categories
///
/// [Public Route] One page of categories with their slugs decrypted.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(PageQuery),
    responses((status = 200, description = "Page of categories", body = inline(PageList<CategoryDto>)))
)]
pub async fn list_categories(
    State(service): State<CategoryService>,
    Query(query): Query<PageQuery>,
) -> ApiResponse<PageList<CategoryDto>> {
    ok(service.list(query).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/search",
    params(SearchQuery),
    responses((status = 200, description = "Matching categories", body = [CategoryDto]))
)]
pub async fn search_categories(
    State(service): State<CategoryService>,
    Query(query): Query<SearchQuery>,
) -> ApiResponse<Vec<CategoryDto>> {
    ok(service.search(query.keyword.as_deref()).await?)
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    responses(
        (status = 200, description = "Category", body = CategoryDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(service): State<CategoryService>,
    Path(id): Path<i32>,
) -> ApiResponse<CategoryDto> {
    found(service.get(id).await?, NOT_FOUND)
}

/// create_category
///
/// [Admin Route] Rejects a slug that already belongs to another category.
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Created", body = CategoryDto),
        (status = 400, description = "Validation failed or duplicate slug")
    )
)]
pub async fn create_category(
    State(service): State<CategoryService>,
    ValidatedJson(payload): ValidatedJson<CategoryRequest>,
) -> CreatedResponse<CategoryDto> {
    created(service.create(payload).await?)
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Updated", body = CategoryDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    State(service): State<CategoryService>,
    Path(id): Path<i32>,
    ValidatedJson(payload): ValidatedJson<CategoryRequest>,
) -> ApiResponse<CategoryDto> {
    found(service.update(id, payload).await?, NOT_FOUND)
}

/// delete_category
///
/// [Admin Route] Also removes the category's posts and their tag links.
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    responses(
        (status = 200, description = "Deleted category", body = CategoryDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    State(service): State<CategoryService>,
    Path(id): Path<i32>,
) -> ApiResponse<CategoryDto> {
    found(service.delete(id).await?, NOT_FOUND)
}
