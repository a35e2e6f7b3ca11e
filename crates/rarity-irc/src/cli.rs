//! Argument parsing, exit codes, and connection setup for the IRC bridge.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use rarity_telemetry::{LogFormat, LoggingConfig, init_logging};
use reqwest::Url;
use tokio::net::TcpStream;
use tracing::info;

use crate::bot::Bot;
use crate::client::RpcClient;
use crate::session::run_session;

const DEFAULT_IRC_SERVER: &str = "127.0.0.1:6667";
const DEFAULT_NICKNAME: &str = "Rarity|nina";
const DEFAULT_CHANNELS: &str = "#lolinano";
const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8800";
// Mutating procedures wait for engine confirmation, which may take up to the daemon's
// waiter expiry (600 s by default).
const DEFAULT_TIMEOUT_SECS: u64 = 660;

#[derive(Parser, Debug)]
#[command(
    name = "rarity-irc",
    about = "Relay IRC chat commands to a Rarity RPC server",
    version
)]
pub(crate) struct Cli {
    /// IRC server as `host:port`.
    #[arg(long, env = "RARITY_IRC_SERVER", default_value = DEFAULT_IRC_SERVER)]
    server: String,
    /// Nickname the bot registers and answers to.
    #[arg(long, env = "RARITY_IRC_NICK", default_value = DEFAULT_NICKNAME)]
    nickname: String,
    /// Channels to join once registered.
    #[arg(
        long = "channel",
        env = "RARITY_IRC_CHANNELS",
        value_delimiter = ',',
        default_value = DEFAULT_CHANNELS
    )]
    channels: Vec<String>,
    /// Base URL of the RPC server.
    #[arg(long, env = "RARITY_RPC_URL", default_value = DEFAULT_RPC_URL, value_parser = parse_url)]
    rpc_url: Url,
    /// Per-request timeout in seconds.
    #[arg(long, env = "RARITY_RPC_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
    /// Log level used when `RUST_LOG` is unset.
    #[arg(long, env = "RARITY_LOG_LEVEL", default_value = "info")]
    log_level: String,
    /// Log output format (`json` or `pretty`).
    #[arg(long, env = "RARITY_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("irc bridge error")
    }
}

impl std::error::Error for CliError {}

/// Parses arguments, connects to IRC, and relays commands until the connection ends.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match bridge(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn bridge(cli: Cli) -> CliResult<()> {
    let channels = validate_channels(&cli.channels)?;
    if cli.nickname.trim().is_empty() || cli.nickname.contains(' ') {
        return Err(CliError::validation(
            "nickname must be non-empty and contain no spaces",
        ));
    }

    init_logging(&LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        ..LoggingConfig::default()
    })
    .map_err(CliError::failure)?;

    let remote = RpcClient::new(cli.rpc_url.clone(), Duration::from_secs(cli.timeout))
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
    let bot = Arc::new(Bot::new(cli.nickname.clone(), Arc::new(remote)));

    let stream = TcpStream::connect(&cli.server)
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to connect to {}: {err}", cli.server)))?;
    info!(
        server = %cli.server,
        rpc_url = %cli.rpc_url,
        nickname = %cli.nickname,
        "connected to irc server"
    );

    run_session(stream, bot, &channels)
        .await
        .map_err(CliError::failure)?;
    Err(CliError::failure(anyhow!("irc server closed the connection")))
}

fn validate_channels(channels: &[String]) -> CliResult<Vec<String>> {
    let channels: Vec<String> = channels
        .iter()
        .map(|channel| channel.trim().to_string())
        .filter(|channel| !channel.is_empty())
        .collect();
    if let Some(bad) = channels
        .iter()
        .find(|channel| !channel.starts_with(['#', '&']) || channel.contains(' '))
    {
        return Err(CliError::validation(format!(
            "invalid channel '{bad}': channels start with '#' or '&' and contain no spaces"
        )));
    }
    Ok(channels)
}

/// Parse the RPC URL provided to the bridge.
fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse()
}
