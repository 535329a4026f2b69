mod cleanup;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use muamma_api::session::{MemorySessionStore, SessionStore, SqliteSessionStore};
use muamma_api::{AppState, AppStateInner, auth::seed_admin};
use muamma_db::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Config, SessionBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "muamma_server=debug,muamma_api=debug,muamma_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database and the single admin account
    let db = Arc::new(Database::open(&config.db_path)?);
    if !seed_admin(&db, &config.admin)? {
        info!("Admin user '{}' already present", config.admin.username);
    }

    let ttl = chrono::Duration::hours(config.session_ttl_hours);
    let sessions: Arc<dyn SessionStore> = match config.session_backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new(ttl)),
        SessionBackend::Sqlite => Arc::new(SqliteSessionStore::new(db.clone(), ttl)),
    };
    info!(
        "Sessions: {:?} store, {} hour lifetime",
        config.session_backend, config.session_ttl_hours
    );

    tokio::spawn(cleanup::run_session_purge_loop(
        sessions.clone(),
        config.session_purge_secs,
    ));

    let state: AppState = Arc::new(AppStateInner {
        db,
        sessions,
        secure_cookies: config.secure_cookies,
    });

    // The browser client is served from the same origin; CORS only matters in development.
    let app = muamma_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Muamma server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
