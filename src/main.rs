use expense_tracker::db::ExpenseStorage;
use expense_tracker::router::{AppState, tracker_router};
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &expense_tracker::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.listen_addr,
        db_path = %cfg.db_path.display(),
        drive_file_name = %cfg.drive_file_name,
        drive_file_id = %cfg.drive_file_id.as_deref().unwrap_or("<lookup by name>"),
        allow_list = cfg.allow_list.len(),
        proxy = %cfg.proxy.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.loglevel,
        client_secret = "<redacted>",
    );
    if cfg.allow_list.is_empty() {
        warn!("allow_list is empty; every login will be refused");
    }

    // an empty file is a valid start; Refresh or first login fills it from Drive
    let storage = ExpenseStorage::open(&cfg.db_path).await?;
    storage.init_schema().await?;
    storage.close().await;

    let state = AppState::new(cfg)?;
    let app = tracker_router(state);

    let listener = TcpListener::bind(&cfg.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
