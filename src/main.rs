use rusty_lending::{
    adapters::{memory, mock::AuthService as MockAuthService, postgres},
    api::{AppState, create_router},
    config::AppConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rusty_lending=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    // Initialize adapters
    let service_deps = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_db_connections)
                .connect(database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Connected to PostgreSQL and applied migrations");

            postgres::service_dependencies(pool, config.policy)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; using in-memory storage");
            memory::service_dependencies(config.policy)
        }
    };

    if config.auth_tokens.is_empty() {
        tracing::warn!("AUTH_TOKENS is empty; every authenticated route will return 401");
    }
    let auth = Arc::new(MockAuthService::with_tokens(config.auth_tokens.clone()));

    // Create application state
    let app_state = Arc::new(AppState { service_deps, auth });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        loan_period_days = config.policy.loan_period.duration().num_days(),
        strict_release = config.policy.strict_release,
        "Server listening on {}",
        addr
    );

    // Start server
    axum::serve(listener, app).await?;
    Ok(())
}
