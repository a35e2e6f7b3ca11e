//! RPC client for the daemon's `/rpc/{procedure}` surface.

use std::time::Duration;

use async_trait::async_trait;
use rarity_api_models::{
    AddTorrentRequest, FindTorrentRequest, FindTorrentResponse, InfoHash, InfoHashResponse,
    PROCEDURE_ADD_TORRENT, PROCEDURE_FIND_TORRENT, PROCEDURE_GET_TORRENT_METAINFO,
    PROCEDURE_GET_TORRENT_NAME, PROCEDURE_PAUSE_TORRENT, PROCEDURE_RESUME_TORRENT,
    ProblemDetails, TorrentMetainfo, TorrentNameResponse, TorrentTarget, rpc_path,
};
use reqwest::{Client, Url};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

const HEADER_REQUEST_ID: &str = "x-request-id";

/// Failures talking to the RPC server.
#[derive(Debug, Error)]
pub(crate) enum RemoteError {
    /// The server answered with a problem document.
    #[error("rpc procedure failed")]
    Problem {
        procedure: &'static str,
        problem: ProblemDetails,
        request_id: Option<String>,
    },
    /// The server answered with a non-success status and no problem document.
    #[error("rpc procedure returned an unexpected status")]
    Status {
        procedure: &'static str,
        status: u16,
        body: String,
    },
    /// The request never completed.
    #[error("rpc server unreachable")]
    Transport {
        procedure: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// A success reply did not match the expected shape.
    #[error("rpc reply could not be decoded")]
    Decode {
        procedure: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

pub(crate) type RemoteResult<T> = Result<T, RemoteError>;

impl RemoteError {
    /// Text shown to chat users after `Failed:`.
    pub(crate) fn reply_text(&self) -> String {
        match self {
            Self::Problem { problem, .. } => problem
                .detail
                .clone()
                .unwrap_or_else(|| problem.title.clone()),
            Self::Status { status, body, .. } if body.trim().is_empty() => {
                format!("request failed with status {status}")
            }
            Self::Status { status, body, .. } => format!("{} (status {status})", body.trim()),
            Self::Transport { source, .. } => format!("rpc server unreachable: {source}"),
            Self::Decode { .. } => "unexpected reply from rpc server".to_string(),
        }
    }

    /// Procedure that failed.
    pub(crate) const fn procedure(&self) -> &'static str {
        match self {
            Self::Problem { procedure, .. }
            | Self::Status { procedure, .. }
            | Self::Transport { procedure, .. }
            | Self::Decode { procedure, .. } => procedure,
        }
    }

    /// Server-assigned request identifier, when the server answered.
    pub(crate) fn request_id(&self) -> Option<&str> {
        match self {
            Self::Problem { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

/// Operations the bot needs from the daemon.
#[async_trait]
pub(crate) trait TorrentRemote: Send + Sync {
    async fn add_torrent(&self, url: &str) -> RemoteResult<InfoHash>;
    async fn find_torrent(&self, pattern: &str) -> RemoteResult<FindTorrentResponse>;
    async fn pause_torrent(&self, info_hash: &InfoHash) -> RemoteResult<InfoHash>;
    async fn resume_torrent(&self, info_hash: &InfoHash) -> RemoteResult<InfoHash>;
    async fn get_torrent_metainfo(&self, info_hash: &InfoHash) -> RemoteResult<TorrentMetainfo>;
    async fn get_torrent_name(&self, info_hash: &InfoHash) -> RemoteResult<String>;
}

/// `reqwest` implementation of [`TorrentRemote`].
#[derive(Clone)]
pub(crate) struct RpcClient {
    client: Client,
    base_url: Url,
}

impl RpcClient {
    /// Build a client whose requests time out after `timeout`.
    pub(crate) fn new(base_url: Url, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub(crate) const fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, procedure: &str) -> String {
        format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            rpc_path(procedure)
        )
    }

    async fn call<B, T>(&self, procedure: &'static str, body: &B) -> RemoteResult<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(procedure))
            .json(body)
            .send()
            .await
            .map_err(|source| RemoteError::Transport { procedure, source })?;

        if !response.status().is_success() {
            return Err(classify_problem(procedure, response).await);
        }

        debug!(procedure, "rpc call succeeded");
        response
            .json::<T>()
            .await
            .map_err(|source| RemoteError::Decode { procedure, source })
    }
}

#[async_trait]
impl TorrentRemote for RpcClient {
    async fn add_torrent(&self, url: &str) -> RemoteResult<InfoHash> {
        let request = AddTorrentRequest {
            url: url.to_string(),
        };
        let reply: InfoHashResponse = self.call(PROCEDURE_ADD_TORRENT, &request).await?;
        Ok(reply.info_hash)
    }

    async fn find_torrent(&self, pattern: &str) -> RemoteResult<FindTorrentResponse> {
        let request = FindTorrentRequest {
            pattern: pattern.to_string(),
        };
        self.call(PROCEDURE_FIND_TORRENT, &request).await
    }

    async fn pause_torrent(&self, info_hash: &InfoHash) -> RemoteResult<InfoHash> {
        let reply: InfoHashResponse = self
            .call(PROCEDURE_PAUSE_TORRENT, &TorrentTarget::new(info_hash))
            .await?;
        Ok(reply.info_hash)
    }

    async fn resume_torrent(&self, info_hash: &InfoHash) -> RemoteResult<InfoHash> {
        let reply: InfoHashResponse = self
            .call(PROCEDURE_RESUME_TORRENT, &TorrentTarget::new(info_hash))
            .await?;
        Ok(reply.info_hash)
    }

    async fn get_torrent_metainfo(&self, info_hash: &InfoHash) -> RemoteResult<TorrentMetainfo> {
        self.call(PROCEDURE_GET_TORRENT_METAINFO, &TorrentTarget::new(info_hash))
            .await
    }

    async fn get_torrent_name(&self, info_hash: &InfoHash) -> RemoteResult<String> {
        let reply: TorrentNameResponse = self
            .call(PROCEDURE_GET_TORRENT_NAME, &TorrentTarget::new(info_hash))
            .await?;
        Ok(reply.name)
    }
}

/// Classify a non-success response into a [`RemoteError`].
async fn classify_problem(procedure: &'static str, response: reqwest::Response) -> RemoteError {
    let status = response.status().as_u16();
    let request_id = response
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response.bytes().await.unwrap_or_default();

    match serde_json::from_slice::<ProblemDetails>(&bytes) {
        Ok(problem) => RemoteError::Problem {
            procedure,
            problem,
            request_id,
        },
        Err(_) => RemoteError::Status {
            procedure,
            status,
            body: String::from_utf8_lossy(&bytes).to_string(),
        },
    }
}
