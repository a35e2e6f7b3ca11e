//! RPC procedure handlers.
//!
//! # Design
//! - One `POST /rpc/{procedure}` route per procedure with a JSON body.
//! - Mutating procedures reply only after the engine confirms; their future is the correlator's.
//! - Every failure becomes a problem document; bodies that fail to decode are 400s.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use rarity_api_models::{
    AddTorrentRequest, FindTorrentRequest, FindTorrentResponse, InfoHashResponse,
    PROCEDURE_ADD_TORRENT, PROCEDURE_FIND_TORRENT, PROCEDURE_GET_TORRENT_INFO,
    PROCEDURE_GET_TORRENT_METAINFO, PROCEDURE_GET_TORRENT_NAME, PROCEDURE_PAUSE_TORRENT,
    PROCEDURE_REMOVE_TORRENT, PROCEDURE_RESUME_TORRENT, TorrentNameResponse, TorrentTarget,
};
use rarity_telemetry::{current_procedure, current_request_id};
use rarity_torrent_core::{Alert, TorrentError, TorrentMetainfo, TorrentResult, TorrentStatusView};
use tracing::{info, warn};

use crate::http::errors::ApiError;
use crate::state::ApiState;

type Payload<T> = Result<Json<T>, JsonRejection>;

pub(crate) async fn add_torrent(
    State(state): State<Arc<ApiState>>,
    payload: Payload<AddTorrentRequest>,
) -> Result<Json<InfoHashResponse>, ApiError> {
    let request = decode(payload)?;
    let outcome = state.correlator.add_torrent(&request.url).await;
    confirmed(PROCEDURE_ADD_TORRENT, outcome)
}

pub(crate) async fn pause_torrent(
    State(state): State<Arc<ApiState>>,
    payload: Payload<TorrentTarget>,
) -> Result<Json<InfoHashResponse>, ApiError> {
    let request = decode(payload)?;
    let outcome = state
        .correlator
        .pause_torrent(request.info_hash.as_str())
        .await;
    confirmed(PROCEDURE_PAUSE_TORRENT, outcome)
}

pub(crate) async fn resume_torrent(
    State(state): State<Arc<ApiState>>,
    payload: Payload<TorrentTarget>,
) -> Result<Json<InfoHashResponse>, ApiError> {
    let request = decode(payload)?;
    let outcome = state
        .correlator
        .resume_torrent(request.info_hash.as_str())
        .await;
    confirmed(PROCEDURE_RESUME_TORRENT, outcome)
}

pub(crate) async fn remove_torrent(
    State(state): State<Arc<ApiState>>,
    payload: Payload<TorrentTarget>,
) -> Result<Json<InfoHashResponse>, ApiError> {
    let request = decode(payload)?;
    let outcome = state
        .correlator
        .remove_torrent(request.info_hash.as_str())
        .await;
    confirmed(PROCEDURE_REMOVE_TORRENT, outcome)
}

pub(crate) async fn get_torrent_info(
    State(state): State<Arc<ApiState>>,
    payload: Payload<TorrentTarget>,
) -> Result<Json<TorrentStatusView>, ApiError> {
    let request = decode(payload)?;
    read(
        PROCEDURE_GET_TORRENT_INFO,
        state.correlator.torrent_info(request.info_hash.as_str()),
    )
}

pub(crate) async fn get_torrent_metainfo(
    State(state): State<Arc<ApiState>>,
    payload: Payload<TorrentTarget>,
) -> Result<Json<TorrentMetainfo>, ApiError> {
    let request = decode(payload)?;
    read(
        PROCEDURE_GET_TORRENT_METAINFO,
        state
            .correlator
            .torrent_metainfo_of(request.info_hash.as_str()),
    )
}

pub(crate) async fn get_torrent_name(
    State(state): State<Arc<ApiState>>,
    payload: Payload<TorrentTarget>,
) -> Result<Json<TorrentNameResponse>, ApiError> {
    let request = decode(payload)?;
    read(
        PROCEDURE_GET_TORRENT_NAME,
        state
            .correlator
            .torrent_name(request.info_hash.as_str())
            .map(|name| TorrentNameResponse { name }),
    )
}

pub(crate) async fn find_torrent(
    State(state): State<Arc<ApiState>>,
    payload: Payload<FindTorrentRequest>,
) -> Result<Json<FindTorrentResponse>, ApiError> {
    let request = decode(payload)?;
    read(
        PROCEDURE_FIND_TORRENT,
        state.correlator.find_torrents(&request.pattern),
    )
}

fn decode<T>(payload: Payload<T>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn confirmed(
    procedure: &'static str,
    outcome: TorrentResult<Alert>,
) -> Result<Json<InfoHashResponse>, ApiError> {
    let alert = outcome.map_err(|err| failure(procedure, &err))?;
    alert
        .info_hash()
        .map(|info_hash| Json(InfoHashResponse { info_hash }))
        .ok_or_else(|| ApiError::internal("confirmation alert carried no info-hash"))
}

fn read<T>(procedure: &'static str, outcome: TorrentResult<T>) -> Result<Json<T>, ApiError> {
    outcome
        .map(Json)
        .map_err(|err| failure(procedure, &err))
}

fn failure(procedure: &'static str, err: &TorrentError) -> ApiError {
    // The middleware label matches the request metrics; direct calls fall back to the handler.
    let procedure = current_procedure().unwrap_or_else(|| procedure.to_string());
    let procedure = procedure.as_str();
    if matches!(err, TorrentError::NotFound { .. }) {
        info!(
            procedure,
            request_id = ?current_request_id(),
            error = %err.detail(),
            "rpc target not found"
        );
    } else {
        warn!(
            procedure,
            request_id = ?current_request_id(),
            error = %err.detail(),
            "rpc procedure failed"
        );
    }
    ApiError::from(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SAMPLE_URL, TestDaemon};
    use anyhow::Result;
    use axum::http::StatusCode;
    use rarity_test_support::fixtures::MetainfoFixture;
    use rarity_torrent_core::{InfoHash, TorrentDescriptor};

    fn target(info_hash: impl ToString) -> Payload<TorrentTarget> {
        Ok(Json(TorrentTarget::new(info_hash)))
    }

    fn sample_hash() -> Result<InfoHash> {
        Ok(TorrentDescriptor::from_bytes(&MetainfoFixture::new("sample").encode())?.info_hash)
    }

    #[tokio::test]
    async fn add_replies_with_confirmed_info_hash() -> Result<()> {
        let daemon = TestDaemon::start();
        let Json(reply) = add_torrent(
            State(daemon.state()),
            Ok(Json(AddTorrentRequest {
                url: SAMPLE_URL.to_string(),
            })),
        )
        .await
        .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(reply.info_hash, sample_hash()?);

        let Json(name) = get_torrent_name(State(daemon.state()), target(reply.info_hash))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(name.name, "sample");
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_url_is_a_bad_gateway() {
        let daemon = TestDaemon::start();
        let err = add_torrent(
            State(daemon.state()),
            Ok(Json(AddTorrentRequest {
                url: "http://example.test/missing.torrent".to_string(),
            })),
        )
        .await
        .err();
        assert_eq!(err.map(|err| err.status), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(daemon.state().correlator.pending_waiters(), 0);
    }

    #[tokio::test]
    async fn pause_and_resume_round_trip_through_status() -> Result<()> {
        let daemon = TestDaemon::start();
        let info_hash = daemon.add_sample().await?;

        let Json(paused) = pause_torrent(
            State(daemon.state()),
            target(info_hash.to_hex().to_uppercase()),
        )
        .await
        .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(paused.info_hash, info_hash);
        let Json(status) = get_torrent_info(State(daemon.state()), target(info_hash))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert!(status.paused);

        let _ = resume_torrent(State(daemon.state()), target(info_hash))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        let Json(status) = get_torrent_info(State(daemon.state()), target(info_hash))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert!(!status.paused);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_targets_are_not_found() {
        let daemon = TestDaemon::start();
        for outcome in [
            pause_torrent(State(daemon.state()), target("deadbeef".repeat(5)))
                .await
                .err(),
            remove_torrent(State(daemon.state()), target("nonsense"))
                .await
                .err(),
        ] {
            assert_eq!(outcome.map(|err| err.status), Some(StatusCode::NOT_FOUND));
        }
        // Too short for an info-hash, so no lookup or waiter happens.
        let short = pause_torrent(State(daemon.state()), target("deadbeef".repeat(4)))
            .await
            .err();
        assert_eq!(short.map(|err| err.status), Some(StatusCode::NOT_FOUND));
        assert_eq!(daemon.state().correlator.pending_waiters(), 0);

        let metainfo = get_torrent_metainfo(State(daemon.state()), target("deadbeef".repeat(5)))
            .await
            .err();
        assert_eq!(metainfo.map(|err| err.status), Some(StatusCode::NOT_FOUND));
        assert_eq!(daemon.state().correlator.pending_waiters(), 0);
    }

    #[tokio::test]
    async fn failures_inside_a_request_context_keep_its_labels() {
        let daemon = TestDaemon::start();
        let outcome = rarity_telemetry::with_request_context("req-7", "pause_torrent", async {
            let err = pause_torrent(State(daemon.state()), target("nonsense"))
                .await
                .err();
            (err, current_procedure(), current_request_id())
        })
        .await;
        assert_eq!(outcome.0.map(|err| err.status), Some(StatusCode::NOT_FOUND));
        assert_eq!(outcome.1.as_deref(), Some("pause_torrent"));
        assert_eq!(outcome.2.as_deref(), Some("req-7"));
        assert!(current_procedure().is_none());
    }

    #[tokio::test]
    async fn remove_confirms_and_forgets_the_torrent() -> Result<()> {
        let daemon = TestDaemon::start();
        let info_hash = daemon.add_sample().await?;
        let Json(reply) = remove_torrent(State(daemon.state()), target(info_hash))
            .await
            .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(reply.info_hash, info_hash);
        let err = get_torrent_name(State(daemon.state()), target(info_hash))
            .await
            .err();
        assert_eq!(err.map(|err| err.status), Some(StatusCode::NOT_FOUND));
        Ok(())
    }

    #[tokio::test]
    async fn find_returns_matches_and_rejects_bad_patterns() -> Result<()> {
        let daemon = TestDaemon::start();
        let info_hash = daemon.add_sample().await?;

        let Json(found) = find_torrent(
            State(daemon.state()),
            Ok(Json(FindTorrentRequest {
                pattern: "amp".to_string(),
            })),
        )
        .await
        .map_err(|err| anyhow::anyhow!("{err:?}"))?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[&info_hash].name, "sample");

        let err = find_torrent(
            State(daemon.state()),
            Ok(Json(FindTorrentRequest {
                pattern: "[".to_string(),
            })),
        )
        .await
        .err();
        assert_eq!(err.map(|err| err.status), Some(StatusCode::BAD_REQUEST));
        Ok(())
    }
}
