use std::net::SocketAddr;

use anyhow::Result;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::predicate::NotForContentType;
use tower_http::compression::{DefaultPredicate, Predicate};
use tower_http::{
    compression::CompressionLayer, decompression::DecompressionLayer, trace::TraceLayer,
};

use state::AppState;

use crate::controllers::{proxy, search, video};

pub mod aggregate;
pub mod config;
pub mod controllers;
pub mod errors;
pub mod filter;
pub mod models;
pub mod preferences;
pub mod rate_limit;
pub mod state;

pub fn router(app_state: AppState) -> Router {
    // relayed media is passed on as is
    let compression_predicate = DefaultPredicate::new()
        .and(NotForContentType::const_new("video/"))
        .and(NotForContentType::const_new("audio/"))
        .and(NotForContentType::const_new("application/octet-stream"));
    Router::new()
        .route("/api/search", get(search::get))
        .route("/api/proxy", get(proxy::get).head(proxy::head))
        .route("/api/ytdl", get(video::get))
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new().compress_when(compression_predicate))
                .layer(DecompressionLayer::new()),
        )
}

/// # Errors
/// Fails when the listener cannot be bound or the server stops with an error.
pub async fn serve_axum(app_state: AppState) -> Result<()> {
    let address = app_state.config.bind_address;
    let app = router(app_state);
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::debug!("listening on {}", address);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
