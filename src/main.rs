use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lotkeeper::Registry;
use lotkeeper::router::{LotState, cookie_key, lot_router};
use lotkeeper::service::sessions::SessionStore;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &*lotkeeper::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.storage.database_url,
        images_dir = %cfg.storage.images_dir.display(),
        listen_addr = %cfg.basic.listen_addr,
        loglevel = %cfg.basic.loglevel,
    );

    let registry = Registry::open(cfg).await?;

    let key = cookie_key(cfg.basic.cookie_secret.as_deref());
    let ttl = chrono::Duration::seconds(i64::try_from(cfg.basic.session_ttl_secs)?);
    let state = LotState::new(
        registry,
        key,
        SessionStore::new(ttl),
        cfg.basic.insecure_cookie,
        cfg.storage.max_upload_bytes,
    );
    let app = lot_router(state);

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
