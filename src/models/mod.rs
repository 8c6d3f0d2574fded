//! Row entities, request payloads and response DTOs.
//!
//! Rows derive `FromRow` and stay inside the crate's service boundary; anything
//! that crosses HTTP derives `ToSchema` for the OpenAPI document and `TS` for the
//! generated frontend bindings, and is serialized in camelCase.

pub mod auth;
pub mod category;
pub mod common;
pub mod post;
pub mod post_tag;
pub mod tag;

pub use auth::{
    ADMIN_ROLE, RefreshTokenRequest, SignInRequest, SignInResponse, SignUpRequest,
    SignUpResponse, TokenResponse, User, UserRefreshToken, VerifyOtpRequest,
};
pub use category::{Category, CategoryDto, CategoryRequest};
pub use common::{ApiResult, PageList, PageQuery, PageWindow, SearchQuery};
pub use post::{Post, PostDto, PostRequest};
pub use post_tag::{PostTagLink, PostTagRequest, PostTagsDto};
pub use tag::{Tag, TagDto, TagRequest};
