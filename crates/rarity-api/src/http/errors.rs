//! RFC9457-style API error wrapper.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rarity_api_models::ProblemDetails;
use rarity_torrent_core::TorrentError;

use crate::http::constants::{
    PROBLEM_BAD_REQUEST, PROBLEM_ENGINE, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND,
    PROBLEM_SERVICE_UNAVAILABLE, PROBLEM_TIMEOUT, PROBLEM_UPSTREAM,
};

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }
}

impl From<&TorrentError> for ApiError {
    fn from(err: &TorrentError) -> Self {
        let base = match err {
            TorrentError::Parse { .. }
            | TorrentError::InvalidInfoHash { .. }
            | TorrentError::InvalidPattern { .. } => {
                Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request")
            }
            TorrentError::NotFound { .. } => Self::new(
                StatusCode::NOT_FOUND,
                PROBLEM_NOT_FOUND,
                "torrent not found",
            ),
            TorrentError::Timeout { .. } => Self::new(
                StatusCode::GATEWAY_TIMEOUT,
                PROBLEM_TIMEOUT,
                "engine confirmation timed out",
            ),
            TorrentError::Transport { .. } => Self::new(
                StatusCode::BAD_GATEWAY,
                PROBLEM_UPSTREAM,
                "metainfo download failed",
            ),
            TorrentError::Engine { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_ENGINE,
                "torrent engine failure",
            ),
            TorrentError::Cancelled { .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                PROBLEM_SERVICE_UNAVAILABLE,
                "operation cancelled",
            ),
            TorrentError::Storage { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                PROBLEM_INTERNAL,
                "internal server error",
            ),
        };
        base.with_detail(err.detail())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rarity_torrent_core::InfoHash;
    use std::io;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn torrent_errors_map_to_stable_statuses() {
        let cases = [
            (TorrentError::parse("bad bencode"), StatusCode::BAD_REQUEST),
            (
                TorrentError::InvalidPattern {
                    pattern: "(".to_string(),
                    reason: "unclosed group".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                TorrentError::not_found(&InfoHash::new([1; 20])),
                StatusCode::NOT_FOUND,
            ),
            (
                TorrentError::Timeout {
                    expire_after: Duration::from_secs(600),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                TorrentError::Transport {
                    url: "http://example.test/a.torrent".to_string(),
                    source: "connection refused".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                TorrentError::Engine {
                    operation: "pause_torrent",
                    info_hash: None,
                    source: "rejected".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                TorrentError::Cancelled {
                    operation: "add_torrent",
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                TorrentError::Storage {
                    operation: "write",
                    path: PathBuf::from("/tmp/x.fastresume"),
                    source: io::Error::other("disk full"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            let api = ApiError::from(&err);
            assert_eq!(api.status, status, "{err:?}");
            assert_eq!(api.detail.as_deref(), Some(err.detail().as_str()));
        }
    }

    #[test]
    fn engine_failures_use_their_own_problem_kind() {
        let err = TorrentError::Engine {
            operation: "add_torrent",
            info_hash: None,
            source: "duplicate".into(),
        };
        assert_eq!(ApiError::from(&err).kind, PROBLEM_ENGINE);
        assert_eq!(ApiError::internal("x").kind, PROBLEM_INTERNAL);
    }
}
