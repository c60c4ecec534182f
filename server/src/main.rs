use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fanzone_server::app::{router, AppState};
use fanzone_server::config::Config;
use fanzone_server::db::{self, DbConfig};
use fanzone_server::matches::MatchDataClient;
use fanzone_server::realtime::{BroadcastEngine, ConnectionRegistry};
use fanzone_server::store::PgMessageStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fanzone_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting Fanzone chat server");

    let config = Arc::new(Config::from_env()?);

    // The store must be reachable at boot; a dead backing store is the one
    // unrecoverable condition.
    let db_pool = db::init_db(DbConfig {
        database_url: config.database_url.clone(),
        ..DbConfig::default()
    })
    .await?;
    if !db::ping(&db_pool).await {
        anyhow::bail!("database unreachable at startup");
    }
    tracing::info!("Database initialized");

    let registry = Arc::new(ConnectionRegistry::new());
    let store = Arc::new(PgMessageStore::new(db_pool));
    let engine = Arc::new(BroadcastEngine::new(store, registry));

    let matches = MatchDataClient::new(config.hltv_api_base.clone(), config.team_name.clone());

    let app = router(AppState {
        config: config.clone(),
        engine,
        matches,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
