use axum::{
    Extension, Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod jwt;
pub mod models;
pub mod otp;
pub mod password;
pub mod repository;
pub mod services;

pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use crypto::SlugCipher;
pub use email::{EmailState, MockEmailService, SmtpEmailService};
pub use error::{AppError, AppResult};
pub use jwt::JwtService;
pub use otp::OtpStore;
pub use repository::{MemoryStore, UnitOfWork};

/// Versioned prefix for every API route. `/health` and the docs live outside it.
pub const API_PREFIX: &str = "/api/v1";

/// Response/request header carrying the per-request correlation id.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and request/response schema into
/// the OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::category::list_categories, handlers::category::search_categories,
        handlers::category::get_category, handlers::category::create_category,
        handlers::category::update_category, handlers::category::delete_category,
        handlers::tag::list_tags, handlers::tag::search_tags, handlers::tag::get_tag,
        handlers::tag::create_tag, handlers::tag::update_tag, handlers::tag::delete_tag,
        handlers::post::list_posts, handlers::post::search_posts, handlers::post::get_post,
        handlers::post::create_post, handlers::post::update_post, handlers::post::delete_post,
        handlers::post_tag::get_post_tags, handlers::post_tag::link_post_tags,
        handlers::post_tag::unlink_post_tag,
        handlers::auth::sign_up, handlers::auth::sign_in, handlers::auth::verify_otp,
        handlers::token::refresh_token, handlers::token::revoke_token,
    ),
    components(
        schemas(
            models::CategoryDto, models::CategoryRequest, models::TagDto, models::TagRequest,
            models::PostDto, models::PostRequest, models::PostTagsDto, models::PostTagRequest,
            models::SignUpRequest, models::SignUpResponse, models::SignInRequest,
            models::SignInResponse, models::VerifyOtpRequest, models::RefreshTokenRequest,
            models::TokenResponse,
        )
    ),
    tags(
        (name = "blog-api", description = "Blog content and authentication API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared container handed to the router. Services are assembled
/// from it per request through their `FromRef` impls, so handlers only name
/// the service they need.
#[derive(Clone)]
pub struct AppState {
    pub uow: UnitOfWork,
    pub cipher: SlugCipher,
    pub jwt: JwtService,
    pub otp: Arc<OtpStore>,
    pub email: EmailState,
    pub config: AppConfig,
}

impl AppState {
    /// Derives the cipher, token signer and OTP store from `config`.
    /// Fails if the configured AES key is not a base64 encoded 32 byte key.
    pub fn new(config: AppConfig, uow: UnitOfWork, email: EmailState) -> AppResult<Self> {
        let cipher = SlugCipher::from_base64_key(&config.aes_key)?;
        let jwt = JwtService::new(config.jwt.clone());
        let otp = Arc::new(OtpStore::new(config.otp_ttl_seconds));

        Ok(Self {
            uow,
            cipher,
            jwt,
            otp,
            email,
            config,
        })
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for UnitOfWork {
    fn from_ref(app_state: &AppState) -> UnitOfWork {
        app_state.uow.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for JwtService {
    fn from_ref(app_state: &AppState) -> JwtService {
        app_state.jwt.clone()
    }
}

/// auth_middleware
///
/// Resolves the caller through the `AuthUser` extractor, which rejects with 401
/// before this body runs. The identity is stashed in the request extensions for
/// the layers and handlers behind it.
async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// admin_middleware
///
/// Second gate on the write routes. Must run inside `auth_middleware`.
async fn admin_middleware(
    Extension(auth_user): Extension<AuthUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !auth_user.is_admin() {
        tracing::warn!(user_id = %auth_user.id, role = %auth_user.role, "non-admin write rejected");
        return Err(AppError::Forbidden);
    }
    Ok(next.run(request).await)
}

/// create_router
///
/// Assembles the routing tree, the auth layers and the observability stack.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let correlation_header = HeaderName::from_static(CORRELATION_HEADER);

    // Layers wrap bottom-up: auth runs first, then the admin check.
    let protected = authenticated::authenticated_routes()
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let api = public::public_routes().merge(protected);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", axum::routing::get(|| async { "ok" }))
        .nest(API_PREFIX, api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Keeps a caller-supplied id; generates a UUID otherwise.
                .layer(SetRequestIdLayer::new(
                    correlation_header.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(correlation_header)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span for one request, tagged with the correlation
/// id so every log line it produces can be grouped.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let correlation_id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        correlation_id = %correlation_id,
    )
}
