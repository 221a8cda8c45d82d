//! DAO Vote Pari-Mutuel Venue - Entry Point
//!
//! Initializes configuration, logging, governor connections,
//! and the settlement engine. Runs until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Restore ledger, registry, custody books and pools from the data dir
//! 4. Build custody, exchange and authority adapters
//! 5. Build the event fan-out (tracing + JSONL log + Prometheus)
//! 6. Connect to the governance RPC and install one adapter per DAO
//! 7. Spawn health and metrics servers
//! 8. Spawn the resolution keeper and the snapshot task
//! 9. Wait for SIGINT → graceful shutdown (stop→save→exit)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{Semaphore, broadcast};
use tracing::{error, info, warn};

use dao_vote_parimutuel::adapters::auth::StaticAuthority;
use dao_vote_parimutuel::adapters::clock::SystemClock;
use dao_vote_parimutuel::adapters::custody::{BooksSnapshot, InMemoryBooks, InMemoryCustody};
use dao_vote_parimutuel::adapters::events::{FanoutSink, TracingEventSink};
use dao_vote_parimutuel::adapters::exchange::{ConstantProductPools, PairEntry};
use dao_vote_parimutuel::adapters::governance::{
    AdapterSettings, ChainProvider, DeadlineCall, GovernanceAdapter, RpcGovernor,
};
use dao_vote_parimutuel::adapters::metrics::{HealthServer, HealthState, VenueMetrics};
use dao_vote_parimutuel::adapters::persistence::{EventLog, StateStore};
use dao_vote_parimutuel::config::AppConfig;
use dao_vote_parimutuel::config::loader::load_config;
use dao_vote_parimutuel::domain::{Capabilities, Ledger, Registry, RegistrySnapshot};
use dao_vote_parimutuel::ports::clock::Clock;
use dao_vote_parimutuel::ports::events::EventSink;
use dao_vote_parimutuel::usecases::{EngineSettings, ExchangeClient, ResolutionKeeper, SettlementEngine};

const REGISTRY_FILE: &str = "registry.json";
const BOOKS_FILE: &str = "books.json";
const POOLS_FILE: &str = "pools.json";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.venue.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.venue.name,
        version = env!("CARGO_PKG_VERSION"),
        daos = config.daos.len(),
        assets = config.assets.len(),
        house_rake_bps = config.venue.house_rake_bps,
        resolver_bps = config.venue.resolver_bps,
        "Starting DAO vote venue"
    );

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // ── 3. Restore persisted state ──────────────────────────
    let store = Arc::new(
        StateStore::new(&config.persistence.data_dir)
            .await
            .context("Failed to open data directory")?,
    );

    let rates = (config.venue.house_rake_bps, config.venue.resolver_bps);
    let ledger = match store.load_ledger(rates).await? {
        Some(snapshot) => {
            let ledger = Ledger::restore(snapshot).context("Stored ledger is inconsistent")?;
            info!(proposals = ledger.proposals().len(), "Ledger restored");
            ledger
        }
        None => Ledger::new(rates.0, rates.1)?,
    };

    let registry = match store.load::<RegistrySnapshot>(REGISTRY_FILE).await? {
        Some(snapshot) => Registry::restore(snapshot),
        None => seed_registry(&config)?,
    };

    let books = Arc::new(InMemoryBooks::new());
    let pools = Arc::new(ConstantProductPools::new(
        config.exchange.router,
        books.clone(),
        clock.clone(),
    ));
    match store.load::<BooksSnapshot>(BOOKS_FILE).await? {
        Some(snapshot) => {
            books.restore(snapshot).await;
            let pairs: Vec<PairEntry> = store.load(POOLS_FILE).await?.unwrap_or_default();
            pools.restore(pairs).await;
            info!("Custody books restored");
        }
        None => {
            for pool in &config.exchange.pools {
                pools
                    .seed(pool.asset_a, pool.asset_b, pool.reserve_a, pool.reserve_b)
                    .await?;
            }
        }
    }

    // ── 4. Custody, exchange and authority ──────────────────
    let custody = Arc::new(InMemoryCustody::new(config.venue.venue_account, books.clone()));
    let exchange = ExchangeClient::new(pools.clone(), custody.clone(), clock.clone()).with_bounds(
        config.exchange.slippage_bps,
        config.exchange.swap_deadline_secs,
    );
    let authority = Arc::new(StaticAuthority::new(
        config.venue.admins.iter().copied(),
        config.venue.curators.iter().copied(),
        config.venue.open_admission,
    ));

    // ── 5. Event fan-out ────────────────────────────────────
    let metrics = Arc::new(VenueMetrics::new().context("Failed to register metrics")?);
    let event_log = Arc::new(
        EventLog::new(&config.persistence.data_dir)
            .await
            .context("Failed to open event log")?,
    );
    let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(TracingEventSink), event_log, metrics.clone()];
    let events = Arc::new(FanoutSink::new(sinks));

    let engine = Arc::new(SettlementEngine::new(
        ledger,
        registry,
        custody,
        exchange,
        authority,
        clock.clone(),
        events,
        EngineSettings {
            house_receiver: config.venue.house_receiver,
            betting_cutoff_secs: config.venue.betting_cutoff_secs,
        },
    ));

    // ── 6. Governance RPC + outcome adapters ────────────────
    let provider = Arc::new(
        ChainProvider::connect(&config.chain)
            .await
            .context("Failed to connect to governance RPC")?,
    );
    let semaphore = Arc::new(Semaphore::new(config.chain.max_concurrent_calls));

    for dao in &config.daos {
        let oracle = Arc::new(RpcGovernor::new(
            provider.clone(),
            dao.governor_address,
            DeadlineCall::for_dialect(dao.dialect),
            semaphore.clone(),
            &config.chain,
        ));
        let adapter = Arc::new(GovernanceAdapter::new(
            AdapterSettings {
                adapter_id: dao.adapter_address,
                name: dao.name.clone(),
                dialect: dao.dialect,
                deadline_unit: dao.deadline_unit,
                block_time_secs: config.chain.block_time_secs,
            },
            oracle,
            clock.clone(),
        ));
        let rebound = engine
            .install_adapter(adapter)
            .await
            .with_context(|| format!("Failed to install adapter for {}", dao.name))?;
        info!(dao = %dao.name, dialect = %dao.dialect, rebound, "Governance adapter ready");
    }

    // ── 7. Health + metrics servers ─────────────────────────
    let health = Arc::new(HealthState::new());
    let mut handles = Vec::new();

    if config.metrics.enabled {
        let server = HealthServer::new(health.clone(), config.metrics.health_port);
        let rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            if let Err(e) = server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        }));

        let metrics_server = metrics.clone();
        let bind = config.metrics.bind_address.clone();
        let rx = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            if let Err(e) = metrics_server.serve(bind, rx).await {
                error!(error = %e, "Metrics server failed");
            }
        }));
    }

    // Periodic chain probe for readiness
    let chain_flag = health.chain_healthy.clone();
    let probe = provider.clone();
    let mut rx = shutdown_tx.subscribe();
    handles.push(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let healthy = probe.is_healthy().await;
                    if !healthy {
                        warn!("Governance RPC unhealthy");
                    }
                    chain_flag.store(healthy, Ordering::Relaxed);
                }
                _ = rx.recv() => break,
            }
        }
    }));

    // ── 8. Keeper + snapshot tasks ──────────────────────────
    let keeper = ResolutionKeeper::new(
        engine.clone(),
        config.venue.keeper_account,
        Duration::from_secs(config.venue.keeper_interval_secs),
    );
    let running = health.keeper_running.clone();
    let rx = shutdown_tx.subscribe();
    let keeper_handle = tokio::spawn(async move {
        keeper.run(rx, running).await;
    });

    let snapshot_engine = engine.clone();
    let snapshot_books = books.clone();
    let snapshot_pools = pools.clone();
    let snapshot_store = store.clone();
    let snapshot_metrics = metrics.clone();
    let period = Duration::from_secs(config.persistence.snapshot_interval_secs);
    let mut rx = shutdown_tx.subscribe();
    handles.push(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let unresolved = snapshot_engine.unresolved_count().await;
                    snapshot_metrics
                        .pending_resolution
                        .set(i64::try_from(unresolved).unwrap_or(i64::MAX));
                    if let Err(e) = save_state(&snapshot_engine, &snapshot_books, &snapshot_pools, &snapshot_store).await {
                        error!(error = %e, "Periodic snapshot failed");
                    }
                }
                _ = rx.recv() => break,
            }
        }
    }));

    info!("All systems running. Press Ctrl+C to stop.");

    // ── 9. Graceful shutdown ────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown...");
    let _ = shutdown_tx.send(());

    // Let an in-flight sweep finish before the final snapshot
    match tokio::time::timeout(Duration::from_secs(30), keeper_handle).await {
        Ok(Ok(())) => info!("Keeper stopped"),
        Ok(Err(e)) => error!(error = %e, "Keeper task panicked"),
        Err(_) => warn!("Keeper did not stop within 30s"),
    }

    save_state(&engine, &books, &pools, &store)
        .await
        .context("Final snapshot failed")?;
    info!("State saved");

    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

/// Registry for a first start, built from the configured DAOs and assets.
fn seed_registry(config: &AppConfig) -> Result<Registry> {
    let mut registry = Registry::new();
    for asset in &config.assets {
        registry
            .add_asset(asset.address)
            .with_context(|| format!("Invalid asset {}", asset.symbol))?;
    }
    for dao in &config.daos {
        registry
            .add_dao(dao.adapter_address, Capabilities::OUTCOME_ADAPTER, &dao.name, dao.payout_asset)
            .with_context(|| format!("Invalid DAO {}", dao.name))?;
    }
    Ok(registry)
}

/// Persist ledger, registry, books and pools.
async fn save_state(
    engine: &SettlementEngine,
    books: &InMemoryBooks,
    pools: &ConstantProductPools,
    store: &StateStore,
) -> Result<()> {
    let (ledger, registry) = engine.snapshot().await;
    store.save_ledger(&ledger).await?;
    store.save(REGISTRY_FILE, &registry).await?;
    store.save(BOOKS_FILE, &books.snapshot().await).await?;
    store.save(POOLS_FILE, &pools.snapshot().await).await?;
    Ok(())
}
