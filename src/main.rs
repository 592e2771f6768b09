use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod jobs;
mod models;
mod notify;
mod services;
mod store;
mod tenant;


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env()?;

    let store: Arc<dyn store::Store> = Arc::new(store::InMemoryStore::new());
    let notifier: Arc<dyn notify::Notifier> = Arc::new(notify::StoreNotifier::new(store.clone()));

    let mut scheduler = jobs::JobScheduler::new(
        store.clone(),
        notifier.clone(),
        config.automation.clone(),
        config.jobs.clone(),
    )
    .await?;
    scheduler.start().await?;

    tracing::info!("Automation engine running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    scheduler.shutdown().await?;

    Ok(())
}
