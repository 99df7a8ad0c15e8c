use std::net::SocketAddr;
use std::sync::Arc;

use backend::domain::a001_product::ProductStore;
use backend::shared::{config, data::db};
use backend::state::AppState;
use backend::system::tasks::SyncScheduler;
use backend::usecases::u501_sync_products::{SheetsApiClient, SyncExecutor, SyncSettings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // конфиг читается до tracing, чтобы имя лог-файла шло из server.service_name
    let cfg = config::load_config()?;
    backend::system::tracing::initialize(&cfg.server.service_name)?;
    match &cfg.loaded_from {
        Some(path) => tracing::info!("Config loaded from: {}", path.display()),
        None => tracing::info!("config.toml not found, using default embedded configuration"),
    }
    tracing::info!(
        "Service={}, table={}, schedule='{}' (UTC)",
        cfg.server.service_name,
        cfg.sync.table,
        cfg.sync.schedule
    );

    let conn = db::initialize_database(&cfg)
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;

    let store = ProductStore::new(conn, cfg.sync.table.clone(), cfg.sync.locale_mode);
    store.ensure_table().await?;

    let source = SheetsApiClient::new(cfg.source.clone())?;
    let executor = Arc::new(SyncExecutor::new(
        Arc::new(source),
        store.clone(),
        SyncSettings::from_config(&cfg),
    ));

    let scheduler = SyncScheduler::new(
        Arc::clone(&executor),
        &cfg.sync.schedule,
        cfg.sync.startup_delay_secs,
    )?;

    let state = AppState {
        service_name: cfg.server.service_name.clone(),
        published_status: cfg.sync.published_status.clone(),
        executor,
        store,
    };
    let app = backend::routes::configure_routes(state);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {e}"))?;

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Port {} is already in use. Please ensure no other process is using this port.",
                    cfg.server.port
                );
            } else {
                tracing::error!("Failed to bind to port {}. Error: {}", cfg.server.port, e);
            }
            return Err(e.into());
        }
    };

    // планировщик стартует после bind, стартовый прогон ждет startup_delay_secs
    let _tasks = scheduler.start();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
