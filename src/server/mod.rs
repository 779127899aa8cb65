pub mod api;

use crate::config::Config;
use crate::constants::STALE_THRESHOLD;
use crate::error::Result;
use crate::services::{AlphaVantageClient, EquityResolver, EquityStore};
use axum::http::header::CONTENT_SECURITY_POLICY;
use axum::http::HeaderValue;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<EquityResolver>,
    pub store: EquityStore,
}

/// Start the axum server
pub async fn serve(config: Config) -> Result<()> {
    let store = EquityStore::open(&config.database_path).await?;
    let provider = Arc::new(AlphaVantageClient::new(
        config.provider_url.clone(),
        config.api_key.clone(),
    )?);
    let resolver = Arc::new(EquityResolver::new(
        store.clone(),
        provider,
        STALE_THRESHOLD,
    ));

    let app_state = AppState {
        resolver,
        store: store.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    // Scripts and styles only from this origin (plus inline for the demo page).
    let csp = SetResponseHeaderLayer::if_not_present(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'",
        ),
    );

    tracing::info!("Registering routes:");
    tracing::info!("  GET /api/stock-prices?stock=GOOG&like=true");
    tracing::info!("  GET /health");
    tracing::info!("  GET /public/* (static files)");

    let app = Router::new()
        .route("/api/stock-prices", get(api::stock_prices_handler))
        .route("/health", get(api::health_handler))
        .nest_service("/public", ServeDir::new("public"))
        .layer(cors)
        .layer(csp)
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    tracing::info!("Shutting down, closing equity store");
    store.close().await;
    Ok(())
}
