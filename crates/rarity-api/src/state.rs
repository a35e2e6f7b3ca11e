//! Shared handler state.

use rarity_telemetry::Metrics;
use rarity_torrent_engine::{EngineHealth, TorrentCorrelator};

pub(crate) struct ApiState {
    pub(crate) correlator: TorrentCorrelator,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    pub(crate) const fn new(correlator: TorrentCorrelator, telemetry: Metrics) -> Self {
        Self {
            correlator,
            telemetry,
        }
    }

    pub(crate) const fn health(&self) -> &EngineHealth {
        self.correlator.dispatcher().health()
    }
}
