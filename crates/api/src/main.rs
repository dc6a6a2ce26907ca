//! API server entry point.

use api::config::Config;
use cart_store::{
    CatalogReader, InMemoryCatalog, InMemoryStore, PostgresCatalog, PostgresStore,
    ProductSnapshot, StorefrontStore,
};
use common::{Money, ProductId};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Seeds a small catalog so the in-memory demo mode has something to sell.
fn demo_catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    let seed = [
        ("Wireless Headphones", 7999, "headphones.jpg"),
        ("Mechanical Keyboard", 12950, "keyboard.jpg"),
        ("USB-C Hub", 3499, "hub.jpg"),
        ("Laptop Stand", 4500, "stand.jpg"),
        ("Webcam", 6999, "webcam.jpg"),
        ("Desk Mat", 1999, "mat.jpg"),
    ];
    for (name, price_cents, image) in seed {
        let id = ProductId::new();
        catalog.insert(ProductSnapshot {
            id,
            name: name.to_string(),
            price: Money::from_cents(price_cents),
            image_url: Some(format!("/img/{image}")),
        });
        tracing::info!(product_id = %id, name, "seeded demo product");
    }
    catalog
}

async fn serve<S, C>(store: S, catalog: C, config: &Config, metrics_handle: PrometheusHandle)
where
    S: StorefrontStore + Clone + 'static,
    C: CatalogReader + Clone + 'static,
{
    let state = api::create_state(store, catalog);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting storefront API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the storage backend and run
    match config.database_url.clone() {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to database");
            let store = PostgresStore::new(pool.clone());
            store.run_migrations().await.expect("migrations failed");
            tracing::info!("using PostgreSQL store");
            serve(store, PostgresCatalog::new(pool), &config, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory store with demo catalog");
            let catalog = demo_catalog();
            let store = InMemoryStore::new(catalog.clone());
            serve(store, catalog, &config, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
