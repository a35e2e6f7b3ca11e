use std::future::Future;
use std::sync::Arc;

use rarity_api::ApiServer;
use rarity_config::AppConfig;
use rarity_telemetry::{GlobalContextGuard, LoggingConfig, Metrics};
use rarity_torrent_core::{EngineSession, MetainfoFetcher, ResumeStateStore};
use rarity_torrent_engine::{
    AlertDispatcher, AlertPump, FastResumeStore, HttpFetcher, MemorySession, SessionSettings,
    TorrentCorrelator,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dht::DhtPersistence;
use crate::error::{AppError, AppResult};

/// Dependencies required to bootstrap the Rarity daemon.
pub(crate) struct BootstrapDependencies {
    config: AppConfig,
    telemetry: Metrics,
    session: Arc<dyn EngineSession>,
    fetcher: Arc<dyn MetainfoFetcher>,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = AppConfig::from_env().map_err(|err| AppError::config("config.from_env", err))?;
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let fetcher = HttpFetcher::new(config.schedule.fetch_timeout)
            .map_err(|err| AppError::engine("fetcher.new", err))?;
        let session = MemorySession::new(session_settings(&config));
        Ok(Self {
            config,
            telemetry,
            session: Arc::new(session),
            fetcher: Arc::new(fetcher),
        })
    }
}

/// Entry point for the Rarity daemon boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, engine bootstrap, or the RPC listener fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    rarity_telemetry::init_logging(&LoggingConfig {
        level: &dependencies.config.logging.level,
        format: dependencies.config.logging.format,
        ..LoggingConfig::default()
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    Box::pin(run_app_with(dependencies, shutdown_signal())).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<F>(dependencies: BootstrapDependencies, shutdown: F) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let _context = GlobalContextGuard::new("bootstrap");
    info!("Rarity daemon bootstrap starting");

    let BootstrapDependencies {
        config,
        telemetry,
        session,
        fetcher,
    } = dependencies;

    let store = FastResumeStore::new(&config.engine.resume_dir);
    store
        .ensure_initialized()
        .map_err(|err| AppError::torrent("resume_store.init", err))?;
    let store: Arc<dyn ResumeStateStore> = Arc::new(store);

    let dispatcher = AlertDispatcher::with_metrics(telemetry.clone());
    dispatcher.install_standing_handlers(Arc::clone(&session), store);
    let correlator = TorrentCorrelator::new(Arc::clone(&session), dispatcher.clone(), fetcher)
        .with_expiry(config.schedule.waiter_timeout);

    let dht = DhtPersistence::new(Arc::clone(&session), config.engine.dht_state_path.clone());
    dht.start()?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let pump = AlertPump::new(Arc::clone(&session), dispatcher)
        .with_interval(config.schedule.poll_interval)
        .spawn(stop_rx.clone());
    let dht_task = dht.clone().spawn_periodic(
        config.schedule.dht_initial_delay,
        config.schedule.dht_interval,
        stop_rx,
    );

    let addr = config.api.socket_addr();
    info!(
        addr = %addr,
        listen_port = config.engine.listen_port,
        download_dir = %config.engine.download_dir.display(),
        "Launching RPC listener"
    );
    let serve_result = ApiServer::new(correlator, telemetry).serve(addr, shutdown).await;

    if stop_tx.send(true).is_err() {
        warn!("background tasks already stopped");
    }
    join_task("alert pump", pump).await;
    join_task("dht persistence", dht_task).await;
    if let Err(err) = dht.save() {
        warn!(path = %dht.path().display(), error = ?err, "final dht save failed");
    }

    serve_result.map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("RPC server shutdown complete");
    Ok(())
}

fn session_settings(config: &AppConfig) -> SessionSettings {
    SessionSettings {
        listen_port: config.engine.listen_port,
        download_dir: config.engine.download_dir.clone(),
        dht_routers: config.engine.dht_routers.clone(),
        local_discovery: config.engine.local_discovery,
        ..SessionSettings::default()
    }
}

async fn join_task(name: &'static str, task: JoinHandle<()>) {
    if let Err(err) = task.await {
        warn!(task = name, error = %err, "background task join failed");
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use rarity_torrent_core::{TorrentError, TorrentResult};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tempfile::TempDir;

    struct OfflineFetcher;

    #[async_trait]
    impl MetainfoFetcher for OfflineFetcher {
        async fn fetch(&self, url: &str) -> TorrentResult<Vec<u8>> {
            Err(TorrentError::Transport {
                url: url.to_string(),
                source: "offline".into(),
            })
        }
    }

    fn dependencies(dir: &TempDir) -> Result<(BootstrapDependencies, Arc<MemorySession>)> {
        let mut config = AppConfig::default();
        config.api.bind_addr = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.api.http_port = 0;
        config.engine.resume_dir = dir.path().join("resume");
        config.engine.dht_state_path = dir.path().join("dht-info.b");
        config.engine.download_dir = dir.path().join("downloads");
        let session = Arc::new(MemorySession::new(session_settings(&config)));
        Ok((
            BootstrapDependencies {
                config,
                telemetry: Metrics::new()?,
                session: session.clone(),
                fetcher: Arc::new(OfflineFetcher),
            },
            session,
        ))
    }

    #[test]
    fn session_settings_follow_engine_config() {
        let mut config = AppConfig::default();
        config.engine.listen_port = 40_000;
        config.engine.local_discovery = false;
        let settings = session_settings(&config);
        assert_eq!(settings.listen_port, 40_000);
        assert!(!settings.local_discovery);
        assert_eq!(settings.dht_routers, config.engine.dht_routers);
    }

    #[tokio::test]
    async fn shutdown_persists_dht_state_and_creates_resume_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let (deps, session) = dependencies(&dir)?;
        run_app_with(deps, async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await?;

        assert!(session.dht_running());
        assert!(dir.path().join("dht-info.b").exists());
        assert!(dir.path().join("resume").is_dir());
        Ok(())
    }

    #[tokio::test]
    async fn unusable_resume_dir_is_fatal() -> Result<()> {
        let dir = TempDir::new()?;
        let (mut deps, _session) = dependencies(&dir)?;
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file")?;
        deps.config.engine.resume_dir = blocker.join("resume");

        let outcome = run_app_with(deps, async {}).await;
        assert!(matches!(outcome, Err(AppError::Torrent { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn bind_failures_surface_as_api_server_errors() -> Result<()> {
        let dir = TempDir::new()?;
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let (mut deps, _session) = dependencies(&dir)?;
        deps.config.api.http_port = taken.local_addr()?.port();

        let outcome = run_app_with(deps, async {}).await;
        assert!(matches!(outcome, Err(AppError::ApiServer { .. })));
        assert!(dir.path().join("dht-info.b").exists());
        Ok(())
    }
}
