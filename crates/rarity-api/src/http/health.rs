//! Health and metrics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use rarity_api_models::{HealthMetrics, HealthResponse};
use rarity_telemetry::build_sha;
use tracing::error;

use crate::http::constants::PROMETHEUS_CONTENT_TYPE;
use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let degraded = state.health().degraded();
    let snapshot = state.telemetry.snapshot();
    let status = if degraded.is_empty() { "ok" } else { "degraded" };
    Json(HealthResponse {
        status: status.to_string(),
        build: build_sha().to_string(),
        degraded,
        metrics: HealthMetrics {
            waiters_pending: snapshot.waiters_pending,
            active_torrents: snapshot.active_torrents,
            waiters_matched_total: snapshot.waiters_matched_total,
            waiters_expired_total: snapshot.waiters_expired_total,
        },
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(axum::http::header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestDaemon;
    use anyhow::Result;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn health_reports_degraded_components() {
        let daemon = TestDaemon::start();
        let Json(healthy) = health(State(daemon.state())).await;
        assert_eq!(healthy.status, "ok");
        assert!(healthy.degraded.is_empty());

        daemon
            .state()
            .health()
            .mark_degraded("resume_store", Some("disk full"));
        let Json(degraded) = health(State(daemon.state())).await;
        assert_eq!(degraded.status, "degraded");
        assert_eq!(degraded.degraded, vec!["resume_store"]);
    }

    #[tokio::test]
    async fn metrics_render_prometheus_text() -> Result<()> {
        let daemon = TestDaemon::start();
        daemon.add_sample().await?;
        let response = metrics(State(daemon.state()))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(
            response.headers().get(axum::http::header::CONTENT_TYPE),
            Some(&axum::http::HeaderValue::from_static(PROMETHEUS_CONTENT_TYPE))
        );
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        let text = String::from_utf8(body.to_vec())?;
        assert!(text.contains("waiters_resolved_total"));
        assert!(text.contains("alerts_processed_total"));
        Ok(())
    }
}
