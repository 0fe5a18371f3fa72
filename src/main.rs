use std::sync::Arc;

use pitchcall::{
    prediction::PostgresPredictionRepository, router, AppConfig, AppState,
    InMemoryPredictionRepository, PredictionRepository,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pitchcall=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting prediction engine");
    let config = AppConfig::from_env();

    // Postgres when DATABASE_URL is set, otherwise everything stays in memory
    let repository: Arc<dyn PredictionRepository> = match &config.server.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url).await?;
            let repository = PostgresPredictionRepository::new(pool);
            repository.run_migrations().await?;
            info!("Using PostgreSQL prediction store");
            Arc::new(repository)
        }
        None => {
            info!("DATABASE_URL not set, using in-memory prediction store");
            Arc::new(InMemoryPredictionRepository::new())
        }
    };

    let app_state = AppState::new(repository, &config);
    let _sync_task = app_state.scheduler.clone().spawn();

    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr).await?;
    info!(addr = %config.server.bind_addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
