use blog_api::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    email::{EmailState, MockEmailService, SmtpEmailService},
    repository::UnitOfWork,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, database and schema, mail relay, then
/// the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: pretty for humans locally, JSON for the aggregator in production.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "blog_api=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database and schema
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("FATAL: Failed to apply database migrations.");

    let uow = UnitOfWork::postgres(pool);

    // 4. Mail relay. Without SMTP settings (local only) OTP mails are just logged.
    let email: EmailState = match &config.smtp {
        Some(settings) => Arc::new(
            SmtpEmailService::new(settings).expect("FATAL: Invalid SMTP configuration."),
        ),
        None => {
            tracing::warn!("SMTP_HOST not set; OTP emails will only be logged");
            Arc::new(MockEmailService::new())
        }
    };

    // 5. Shared state
    let bind_addr = config.bind_addr.clone();
    let app_state =
        AppState::new(config, uow, email).expect("FATAL: AES_KEY must be base64 of 32 bytes.");

    // 6. Router and server
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
