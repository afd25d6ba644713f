mod aggregator;
mod api;
mod config;
mod db;
mod error;
mod evaluator;
mod parser;
mod providers;
mod reconciler;
mod recorder;
mod resolver;
mod retry;
mod scheduler;
mod teams;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::aggregator::PerformanceAggregator;
use crate::api::health::RunStatus;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::store::ResultStore;
use crate::error::Result;
use crate::providers::boxscore::BoxScoreConfig;
use crate::providers::search::SearchProviderConfig;
use crate::providers::sportsdb::SportsDbConfig;
use crate::providers::{BoxScoreProvider, ScoreProvider, SearchScoreProvider, SportsDbProvider};
use crate::reconciler::Reconciler;
use crate::recorder::ResultRecorder;
use crate::resolver::ScoreResolver;
use crate::scheduler::DailyScheduler;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", cfg.db_path)).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Provider chain, priority order ---
    let providers = build_providers(&cfg)?;
    info!(
        "Provider chain: [{}]",
        providers
            .iter()
            .map(|p| p.id())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    let store = ResultStore::new(pool.clone());
    let status = Arc::new(RunStatus::new(cfg.schedule_enabled));
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        ScoreResolver::new(providers),
        ResultRecorder::new(store.clone()),
        Arc::clone(&status),
    ));

    // --- Daily scheduler ---
    let daily = DailyScheduler::new(Arc::clone(&reconciler), Arc::clone(&status), cfg.schedule_time);
    tokio::spawn(async move { daily.run().await });
    info!(
        "Daily result check at {} local ({})",
        cfg.schedule_time.format("%H:%M"),
        if cfg.schedule_enabled { "enabled" } else { "disabled" },
    );

    // --- Admin API ---
    let api_state = ApiState {
        store,
        aggregator: PerformanceAggregator::new(pool),
        reconciler,
        status,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Admin API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Tier order is construction order: search (broad) first, box scores, then
/// the sports database; the resolver re-appends the search tier for its
/// narrow last-resort pass.
fn build_providers(cfg: &Config) -> Result<Vec<Arc<dyn ScoreProvider>>> {
    let mut providers: Vec<Arc<dyn ScoreProvider>> = Vec::new();

    if cfg.search_api_key.is_empty() {
        warn!("SEARCH_API_KEY not set: the search tier is disabled and coverage outside the NBA depends on the sports database alone");
    } else {
        let search_cfg = SearchProviderConfig {
            api_key: cfg.search_api_key.clone(),
            base_url: cfg.search_api_url.clone(),
            model: cfg.search_model.clone(),
            timeout_secs: config::SEARCH_TIMEOUT_SECS,
            call_delay_ms: cfg.provider_delay_ms,
        };
        providers.push(Arc::new(SearchScoreProvider::new(search_cfg)?));
    }

    if cfg.boxscore_api_key.is_empty() {
        warn!("BOXSCORE_API_KEY not set: the box-score tier is disabled");
    } else {
        let boxscore_cfg = BoxScoreConfig::new(
            cfg.boxscore_api_key.clone(),
            cfg.boxscore_api_url.clone(),
        );
        providers.push(Arc::new(BoxScoreProvider::new(boxscore_cfg)?));
    }

    let sportsdb_cfg = SportsDbConfig::new(
        cfg.sportsdb_api_key.clone(),
        cfg.sportsdb_api_url.clone(),
    );
    providers.push(Arc::new(SportsDbProvider::new(sportsdb_cfg)?));

    Ok(providers)
}
