//! Catalogue search service entry point.

use std::sync::Arc;

use catalogue_search::{api::search::SearchService, config::Settings, server};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("catalogue_search=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();
    info!(
        "searching index {} at {} (timeout {:?})",
        settings.elasticsearch_index, settings.elasticsearch_url, settings.elasticsearch_timeout
    );

    let listen_addr = settings.listen_addr.clone();
    let service = Arc::new(SearchService::new(settings)?);
    let app = server::router(service);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
