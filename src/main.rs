use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artist_rec_api::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, Cache, CacheWriterHandle},
    services::{
        BoostedTreeClassifier, CachedGateway, EmbeddingStore, Explainer, GraphGateway,
        Neo4jGateway, Recommender, Scorer,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artist_rec_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let neo4j: Arc<dyn GraphGateway> = Arc::new(
        Neo4jGateway::connect(
            &config.neo4j_uri,
            &config.neo4j_user,
            &config.neo4j_password,
            config.database(),
        )
        .await
        .with_context(|| format!("Failed to connect to Neo4j at {}", config.neo4j_uri))?,
    );
    info!(uri = %config.neo4j_uri, database = config.database(), "Graph gateway configured");

    let (gateway, cache_writer): (Arc<dyn GraphGateway>, Option<CacheWriterHandle>) =
        match &config.redis_url {
            Some(url) => {
                let client = create_redis_client(url)?;
                let (cache, writer) = Cache::new(client);
                info!(ttl = config.popular_cache_ttl, "Popularity cache enabled");
                (
                    Arc::new(CachedGateway::new(neo4j, cache, config.popular_cache_ttl)),
                    Some(writer),
                )
            }
            None => (neo4j, None),
        };

    let classifier = BoostedTreeClassifier::from_path(&config.model_path)
        .with_context(|| format!("Failed to load model from {}", config.model_path))?;
    let scorer = Scorer::new(Arc::new(classifier));

    // Requests are only accepted once the full store is in memory
    let store = EmbeddingStore::load(gateway.as_ref())
        .await
        .context("Failed to load artist embeddings")?;

    let recommender = Recommender::new(gateway.clone(), Arc::new(store), scorer)
        .context("Embedding store does not match the classifier")?
        .with_popular_pool(config.popular_pool_size);
    let explainer = Explainer::new(gateway, config.user_tag_limit, config.neighbor_limit);

    let state = AppState::new(
        recommender,
        explainer,
        config.default_top_k,
        config.max_top_k,
    );
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
