use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursegate::{
    config::Config,
    notify::{Notifier, WebhookNotifier},
    store::{self, MemoryStore, PgStore, Store},
    workflow::Workflow,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "coursegate=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Config::from_env()?;
    let notifier = WebhookNotifier::new(cfg.notify_webhook_url.clone())?;

    match &cfg.database_url {
        Some(url) => {
            let pool = store::postgres::connect(url, cfg.max_db_connections).await?;
            serve(&cfg, PgStore::new(pool), notifier).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, state will not survive a restart");
            serve(&cfg, MemoryStore::new(), notifier).await
        }
    }
}

async fn serve<S: Store, N: Notifier>(cfg: &Config, store: S, notifier: N) -> anyhow::Result<()> {
    let wf = Arc::new(Workflow::new(store, notifier));
    let app = coursegate::app(wf, Duration::from_secs(cfg.request_timeout_secs));

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
