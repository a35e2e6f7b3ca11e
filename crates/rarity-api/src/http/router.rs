//! Router construction and server host for the RPC surface.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::Request,
    routing::{get, post},
};
use rarity_api_models::{
    PROCEDURE_ADD_TORRENT, PROCEDURE_FIND_TORRENT, PROCEDURE_GET_TORRENT_INFO,
    PROCEDURE_GET_TORRENT_METAINFO, PROCEDURE_GET_TORRENT_NAME, PROCEDURE_PAUSE_TORRENT,
    PROCEDURE_REMOVE_TORRENT, PROCEDURE_RESUME_TORRENT, rpc_path,
};
use rarity_telemetry::{HEADER_REQUEST_ID, Metrics, build_sha};
use rarity_torrent_engine::TorrentCorrelator;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::health::{health, metrics};
use crate::http::rpc::{
    add_torrent, find_torrent, get_torrent_info, get_torrent_metainfo, get_torrent_name,
    pause_torrent, remove_torrent, resume_torrent,
};
use crate::http::telemetry::RpcMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the RPC procedures, health, and metrics.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire the router over a correlator and the shared metrics registry.
    #[must_use]
    pub fn new(correlator: TorrentCorrelator, telemetry: Metrics) -> Self {
        let state = Arc::new(ApiState::new(correlator, telemetry.clone()));
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "rpc.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(rarity_telemetry::set_request_id_layer())
            .layer(rarity_telemetry::propagate_request_id_layer())
            .layer(trace_layer)
            .layer(RpcMetricsLayer::new(telemetry));

        let router = Self::routes().route_layer(layered).with_state(state);
        Self { router }
    }

    fn routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route(&rpc_path(PROCEDURE_ADD_TORRENT), post(add_torrent))
            .route(&rpc_path(PROCEDURE_PAUSE_TORRENT), post(pause_torrent))
            .route(&rpc_path(PROCEDURE_RESUME_TORRENT), post(resume_torrent))
            .route(&rpc_path(PROCEDURE_REMOVE_TORRENT), post(remove_torrent))
            .route(&rpc_path(PROCEDURE_GET_TORRENT_INFO), post(get_torrent_info))
            .route(
                &rpc_path(PROCEDURE_GET_TORRENT_METAINFO),
                post(get_torrent_metainfo),
            )
            .route(&rpc_path(PROCEDURE_GET_TORRENT_NAME), post(get_torrent_name))
            .route(&rpc_path(PROCEDURE_FIND_TORRENT), post(find_torrent))
    }

    /// Bind `addr` and serve until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the server terminates unexpectedly.
    pub async fn serve_listener<F>(self, listener: TcpListener, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener
            .local_addr()
            .map_err(|source| ApiServerError::Serve { source })?;
        info!(addr = %local, "rpc server listening");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}
