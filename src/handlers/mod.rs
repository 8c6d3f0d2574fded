//! HTTP adapters over the services.
//!
//! Handlers stay thin: extract, call one service method, wrap the outcome in
//! the `ApiResult` envelope. A service answering `None` becomes a 404 here.

pub mod auth;
pub mod category;
pub mod post;
pub mod post_tag;
pub mod tag;
pub mod token;

use axum::{Json, http::StatusCode};

use crate::{
    error::{AppError, AppResult},
    models::ApiResult,
};

pub type ApiResponse<T> = AppResult<Json<ApiResult<T>>>;
pub type CreatedResponse<T> = AppResult<(StatusCode, Json<ApiResult<T>>)>;

fn ok<T>(value: T) -> ApiResponse<T> {
    Ok(Json(ApiResult::success(value)))
}

fn created<T>(value: T) -> CreatedResponse<T> {
    Ok((StatusCode::CREATED, Json(ApiResult::success(value))))
}

fn found<T>(value: Option<T>, missing: &str) -> ApiResponse<T> {
    match value {
        Some(value) => ok(value),
        None => Err(AppError::NotFound(missing.to_string())),
    }
}
