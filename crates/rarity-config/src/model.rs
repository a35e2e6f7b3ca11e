//! Typed configuration sections.
//!
//! # Design
//! - Pure data carriers; parsing lives in `loader.rs`.
//! - Every section has a `Default` carrying the daemon's stock values.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use rarity_telemetry::{DEFAULT_LOG_LEVEL, LogFormat};

/// Default RPC port.
pub const DEFAULT_HTTP_PORT: u16 = 8800;
/// Default engine peer listen port.
pub const DEFAULT_LISTEN_PORT: u16 = 23_866;
/// Default DHT bootstrap router.
pub const DEFAULT_DHT_ROUTER: &str = "router.bittorrent.com:6881";

/// RPC server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Address the RPC server binds to.
    pub bind_addr: IpAddr,
    /// Port the RPC server binds to.
    pub http_port: u16,
}

impl ApiSettings {
    /// Socket address combining bind address and port.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            http_port: DEFAULT_HTTP_PORT,
        }
    }
}

/// Engine session and on-disk state locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Peer listen port.
    pub listen_port: u16,
    /// Directory new torrents download into.
    pub download_dir: PathBuf,
    /// Directory holding `.fastresume` blobs.
    pub resume_dir: PathBuf,
    /// File holding the bencoded DHT snapshot.
    pub dht_state_path: PathBuf,
    /// DHT bootstrap routers as `host:port`.
    pub dht_routers: Vec<String>,
    /// Whether local service discovery is enabled.
    pub local_discovery: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            download_dir: PathBuf::from("/tmp"),
            resume_dir: PathBuf::from("/tmp/rarity-resume"),
            dht_state_path: PathBuf::from("/tmp/dht-info.b"),
            dht_routers: vec![DEFAULT_DHT_ROUTER.to_string()],
            local_discovery: true,
        }
    }
}

/// Timers driving the correlator, pump, DHT persistence, and fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Expiry applied to operation waiters.
    pub waiter_timeout: Duration,
    /// Alert pump tick period.
    pub poll_interval: Duration,
    /// Delay before the first DHT snapshot write.
    pub dht_initial_delay: Duration,
    /// Period between DHT snapshot writes.
    pub dht_interval: Duration,
    /// Request timeout for `.torrent` downloads.
    pub fetch_timeout: Duration,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            waiter_timeout: Duration::from_secs(600),
            poll_interval: Duration::from_millis(1000),
            dht_initial_delay: Duration::from_secs(120),
            dht_interval: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// Logging output selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Level or filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::infer(),
        }
    }
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// RPC server.
    pub api: ApiSettings,
    /// Engine session.
    pub engine: EngineSettings,
    /// Timers.
    pub schedule: ScheduleSettings,
    /// Logging.
    pub logging: LogSettings,
}
