mod config;

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use dinelog_api::router::create_router;
use dinelog_api::session;
use dinelog_api::state::AppStateInner;
use dinelog_db::{Database, DbOptions};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
            |_| "dinelog_server=debug,dinelog_api=debug,dinelog_db=debug,tower_http=debug".into(),
        ))
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Database::open(
        &config.db_path,
        &DbOptions {
            reader_pool_size: config.reader_pool_size,
            busy_timeout: config.busy_timeout,
        },
    )?;

    // Shared state
    let state = AppStateInner::new(db, config.jwt_secret.clone(), config.session_ttl);

    tokio::spawn(session::run_purge_loop(
        state.clone(),
        config.session_purge_interval,
    ));

    let app = create_router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("dinelog listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
