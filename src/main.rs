use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gotocard_api::config::Config;
use gotocard_api::db::postgres::{
    create_pool, PgCardCatalog, PgRecommendationStore, PgSpendingStore,
};
use gotocard_api::routes::{create_router, AppState};
use gotocard_api::services::recommendations::RecommendationEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!().run(&pool).await?;

    let engine = RecommendationEngine::new(
        Arc::new(PgSpendingStore::new(pool.clone())),
        Arc::new(PgCardCatalog::new(pool.clone())),
        Arc::new(PgRecommendationStore::new(pool)),
    );

    let state = AppState {
        engine: Arc::new(engine),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
