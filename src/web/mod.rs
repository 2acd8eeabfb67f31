//! Web layer module
//!
//! This module provides the HTTP interface for the HLS preview service.
//! Handlers are thin and delegate to the service layer.
//!
//! # Architecture
//!
//! - **Handlers**: one module per endpoint group
//! - **Responses**: the standard JSON envelope and error mapping
//! - **Extractors**: query validation and request context
//! - **Middleware**: request logging
//!
//! # Routes
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET | `/health` | liveness and active stream count |
//! | GET | `/api/v1/analyze?url=` | playlist analysis |
//! | GET, HEAD | `/api/v1/proxy?url=` | playlist rewrite or segment passthrough |
//! | GET | `/api/v1/download?url=&quality=` | 302 to the transcoding worker |
//! | GET | `/api/v1/download-link?url=&quality=` | the same target as JSON |
//! | GET | `/api/v1/active-streams` | segment streams currently being proxied |

use anyhow::Result;
use axum::{
    Router,
    http::{Method, header},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    config::Config,
    errors::AppResult,
    services::{
        AnalysisService, DownloadLinkBuilder, PlaylistFetcher, SourcePolicy, StreamProxyService,
        StreamRegistry,
    },
};

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;

pub use extractors::{RequestContext, SourceParams};
pub use responses::{ApiResponse, handle_error, handle_result};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analysis: AnalysisService,
    pub proxy: StreamProxyService,
    pub download: DownloadLinkBuilder,
    pub registry: StreamRegistry,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Wire every service from configuration. Cancelling `shutdown` ends all proxy streams.
    pub fn new(config: Config, shutdown: CancellationToken) -> AppResult<Self> {
        let policy = Arc::new(SourcePolicy::new(&config.policy));
        let fetcher = Arc::new(PlaylistFetcher::new(&config.upstream)?);
        let registry = StreamRegistry::new(shutdown);
        let max_playlist_bytes = config.upstream.max_playlist_bytes;

        Ok(Self {
            analysis: AnalysisService::new(policy.clone(), fetcher.clone(), max_playlist_bytes),
            proxy: StreamProxyService::new(
                policy.clone(),
                fetcher,
                registry.clone(),
                max_playlist_bytes,
            ),
            download: DownloadLinkBuilder::new(policy, &config.download.worker_url)?,
            registry,
            config: Arc::new(config),
            start_time: chrono::Utc::now(),
        })
    }
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr = state.config.bind_address().parse()?;
        Ok(Self {
            app: Self::create_router(state),
            addr,
        })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health::health_check))
            .nest("/api/v1", Self::api_v1_routes())
            // Middleware (applied in reverse order)
            .layer(Self::cors_layer())
            .layer(axum::middleware::from_fn(
                middleware::request_logging_middleware,
            ))
            .with_state(state)
    }

    fn api_v1_routes() -> Router<AppState> {
        Router::new()
            .route("/analyze", get(handlers::analyze::analyze_playlist))
            // axum answers HEAD from the GET handler and drops the body
            .route("/proxy", get(handlers::proxy::proxy_stream))
            .route("/download", get(handlers::download::download_redirect))
            .route("/download-link", get(handlers::download::download_link))
            .route("/active-streams", get(handlers::streams::active_streams))
    }

    fn cors_layer() -> CorsLayer {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
            .allow_headers([header::RANGE, header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers([
                header::CONTENT_RANGE,
                header::ACCEPT_RANGES,
                header::CONTENT_TYPE,
            ])
    }

    /// Serve until `cancellation_token` fires, reporting bind success or failure first
    pub async fn serve_with_cancellation(
        self,
        ready_signal: tokio::sync::oneshot::Sender<Result<()>>,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        match tokio::net::TcpListener::bind(&self.addr).await {
            Ok(listener) => {
                let _ = ready_signal.send(Ok(()));

                let shutdown_signal = async move {
                    cancellation_token.cancelled().await;
                    tracing::info!("Web server received cancellation signal, shutting down gracefully");
                };

                axum::serve(listener, self.app)
                    .with_graceful_shutdown(shutdown_signal)
                    .await?;
                Ok(())
            }
            Err(bind_error) => {
                let bind_err_msg = format!("Failed to bind to {}: {}", self.addr, bind_error);
                let _ = ready_signal.send(Err(anyhow::anyhow!("{}", bind_err_msg)));
                Err(anyhow::anyhow!("{}", bind_err_msg))
            }
        }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}
