use std::sync::Arc;

use cyberscope_core::{
    DispatcherConfig, InMemoryStore, NmapInvoker, PermissivePrivilegeProbe, PrivilegeProbe,
    ScanEngine, SessionStore, SystemPrivilegeProbe, TargetStore,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::infra::config::Config;

const DEFAULT_LOG_FILTER: &str = "info,cyberscope=info,tower_http=warn";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wires the scan engine from configuration.
pub async fn build_engine(config: &Config) -> anyhow::Result<ScanEngine> {
    let (sessions, targets) = open_storage(config).await?;

    let privileges: Arc<dyn PrivilegeProbe> = if config.scanner.skip_privilege_check {
        warn!("privilege pre-flight disabled by configuration");
        Arc::new(PermissivePrivilegeProbe)
    } else {
        Arc::new(SystemPrivilegeProbe::new(&config.scanner.nmap_path))
    };

    let scanner = Arc::new(NmapInvoker::new(&config.scanner.nmap_path));
    let dispatcher = DispatcherConfig {
        scan_timeout: config.scanner.timeout(),
    };

    Ok(ScanEngine::new(sessions, targets, scanner, privileges, dispatcher))
}

#[cfg(feature = "postgres")]
async fn open_storage(
    config: &Config,
) -> anyhow::Result<(Arc<dyn SessionStore>, Arc<dyn TargetStore>)> {
    use anyhow::Context;

    if let Some(url) = config.database.url.as_deref() {
        let store = cyberscope_core::PostgresStore::connect(url)
            .await
            .context("failed to connect to PostgreSQL")?;
        store.migrate().await.context("failed to apply migrations")?;
        info!("using PostgreSQL session storage");
        let store = Arc::new(store);
        let sessions: Arc<dyn SessionStore> = store.clone();
        let targets: Arc<dyn TargetStore> = store;
        return Ok((sessions, targets));
    }
    Ok(in_memory())
}

#[cfg(not(feature = "postgres"))]
async fn open_storage(
    _config: &Config,
) -> anyhow::Result<(Arc<dyn SessionStore>, Arc<dyn TargetStore>)> {
    Ok(in_memory())
}

fn in_memory() -> (Arc<dyn SessionStore>, Arc<dyn TargetStore>) {
    info!("using in-memory session storage; scan history is lost on restart");
    let store = Arc::new(InMemoryStore::new());
    let sessions: Arc<dyn SessionStore> = store.clone();
    let targets: Arc<dyn TargetStore> = store;
    (sessions, targets)
}
