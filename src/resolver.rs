//! Fallback orchestrator: tries providers tier by tier until every pick has
//! a score or the tiers run out. Tier order is fixed: search (broad), then
//! the structured providers in registration order, then search again with a
//! narrow query as a last resort. A provider failure for one pick never
//! aborts the batch.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::providers::{FetchMode, ScoreProvider, ScoreQuery};
use crate::teams;
use crate::types::{League, Pick, ScoreRecord};

pub struct ScoreResolver {
    providers: Vec<Arc<dyn ScoreProvider>>,
}

#[derive(Debug, Default)]
pub struct ResolvedBatch {
    pub resolved: Vec<(Pick, ScoreRecord)>,
    pub unresolved: Vec<Pick>,
}

struct Tier {
    provider: Arc<dyn ScoreProvider>,
    narrow: bool,
}

impl ScoreResolver {
    /// Providers in priority order. Providers that support a narrow retry
    /// (the search tier) are appended again at the end.
    pub fn new(providers: Vec<Arc<dyn ScoreProvider>>) -> Self {
        Self { providers }
    }

    fn tiers(&self) -> Vec<Tier> {
        let mut tiers: Vec<Tier> = self
            .providers
            .iter()
            .map(|p| Tier {
                provider: Arc::clone(p),
                narrow: false,
            })
            .collect();
        tiers.extend(
            self.providers
                .iter()
                .filter(|p| p.supports_narrow())
                .map(|p| Tier {
                    provider: Arc::clone(p),
                    narrow: true,
                }),
        );
        tiers
    }

    pub async fn resolve_batch(&self, date: NaiveDate, picks: Vec<Pick>) -> ResolvedBatch {
        let total = picks.len();
        let mut resolved: Vec<(Pick, ScoreRecord)> = Vec::new();
        let mut pending = picks;
        // Providers that answered 401, dead for the rest of this run.
        let mut dead: HashSet<&'static str> = HashSet::new();

        for tier in self.tiers() {
            if pending.is_empty() {
                break;
            }
            if dead.contains(tier.provider.id()) {
                continue;
            }

            let before = pending.len();
            match tier.provider.mode() {
                FetchMode::PerPick { delay } => {
                    self.run_per_pick_tier(&tier, date, delay, &mut pending, &mut resolved, &mut dead)
                        .await;
                }
                FetchMode::Scoreboard => {
                    self.run_scoreboard_tier(&tier, date, &mut pending, &mut resolved, &mut dead)
                        .await;
                }
            }
            debug!(
                provider = tier.provider.id(),
                narrow = tier.narrow,
                resolved = before - pending.len(),
                remaining = pending.len(),
                "tier complete"
            );
        }

        info!(
            date = %date,
            picks = total,
            resolved = resolved.len(),
            unresolved = pending.len(),
            "score resolution complete"
        );
        ResolvedBatch {
            resolved,
            unresolved: pending,
        }
    }

    async fn run_per_pick_tier(
        &self,
        tier: &Tier,
        _date: NaiveDate,
        delay: std::time::Duration,
        pending: &mut Vec<Pick>,
        resolved: &mut Vec<(Pick, ScoreRecord)>,
        dead: &mut HashSet<&'static str>,
    ) {
        let provider = &tier.provider;
        let mut still = Vec::new();
        let mut aborted = false;
        let mut called = false;

        for pick in std::mem::take(pending) {
            if aborted || !provider.supports(pick.league) {
                still.push(pick);
                continue;
            }
            if called {
                tokio::time::sleep(delay).await;
            }
            called = true;

            let query = ScoreQuery::for_pick(&pick, tier.narrow);
            match provider.fetch_score(&query).await {
                Ok(Some(record)) => {
                    match teams::align(&record, &pick.home_team, &pick.away_team) {
                        Some(aligned) => resolved.push((pick, aligned)),
                        None => {
                            warn!(
                                provider = provider.id(),
                                pick = %pick.pick_text,
                                "score did not match the pick's matchup"
                            );
                            still.push(pick);
                        }
                    }
                }
                Ok(None) => still.push(pick),
                Err(AppError::Unauthorized { .. }) => {
                    warn!(
                        provider = provider.id(),
                        "unauthorized, disabling provider for this run"
                    );
                    dead.insert(provider.id());
                    still.push(pick);
                    aborted = true;
                }
                Err(AppError::RateLimited { .. }) => {
                    warn!(
                        provider = provider.id(),
                        "rate limited, abandoning tier"
                    );
                    still.push(pick);
                    aborted = true;
                }
                Err(e) => {
                    warn!(
                        provider = provider.id(),
                        pick = %pick.pick_text,
                        "provider error: {e}"
                    );
                    still.push(pick);
                }
            }
        }

        *pending = still;
    }

    async fn run_scoreboard_tier(
        &self,
        tier: &Tier,
        date: NaiveDate,
        pending: &mut Vec<Pick>,
        resolved: &mut Vec<(Pick, ScoreRecord)>,
        dead: &mut HashSet<&'static str>,
    ) {
        let provider = &tier.provider;
        let leagues: BTreeSet<League> = pending
            .iter()
            .filter(|p| provider.supports(p.league))
            .map(|p| p.league)
            .collect();

        let mut boards: HashMap<League, Vec<ScoreRecord>> = HashMap::new();
        for league in leagues {
            match provider.fetch_scoreboard(league, date).await {
                Ok(records) => {
                    boards.insert(league, records);
                }
                Err(AppError::Unauthorized { .. }) => {
                    warn!(
                        provider = provider.id(),
                        "unauthorized, disabling provider for this run"
                    );
                    dead.insert(provider.id());
                    break;
                }
                Err(e) => {
                    warn!(
                        provider = provider.id(),
                        league = %league,
                        "scoreboard fetch failed: {e}"
                    );
                }
            }
        }

        let mut still = Vec::new();
        for pick in std::mem::take(pending) {
            let matched = boards.get(&pick.league).and_then(|records| {
                records
                    .iter()
                    .find_map(|r| teams::align(r, &pick.home_team, &pick.away_team))
            });
            match matched {
                Some(record) => resolved.push((pick, record)),
                None => still.push(pick),
            }
        }
        *pending = still;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn pick(id: &str, home: &str, away: &str) -> Pick {
        Pick {
            id: id.to_string(),
            game_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            league: League::Nba,
            home_team: home.to_string(),
            away_team: away.to_string(),
            pick_text: format!("{home} ML"),
            bet_type: crate::types::BetType::Moneyline,
            line: None,
            confidence: 0.6,
        }
    }

    fn record(home: &str, away: &str) -> ScoreRecord {
        ScoreRecord {
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score: 100,
            away_score: 95,
            league: League::Nba,
            source: "mock",
            is_final: true,
        }
    }

    /// PerPick provider that resolves only the configured home teams.
    struct MockProvider {
        id: &'static str,
        resolves: Vec<&'static str>,
        calls: AtomicUsize,
        fail_for: Option<&'static str>,
        error: Option<fn() -> AppError>,
    }

    impl MockProvider {
        fn new(id: &'static str, resolves: Vec<&'static str>) -> Self {
            Self {
                id,
                resolves,
                calls: AtomicUsize::new(0),
                fail_for: None,
                error: None,
            }
        }

        fn failing_for(mut self, team: &'static str, error: fn() -> AppError) -> Self {
            self.fail_for = Some(team);
            self.error = Some(error);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScoreProvider for MockProvider {
        fn id(&self) -> &'static str {
            self.id
        }

        fn mode(&self) -> FetchMode {
            FetchMode::PerPick {
                delay: Duration::from_millis(0),
            }
        }

        async fn fetch_score(&self, query: &ScoreQuery) -> Result<Option<ScoreRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let (Some(team), Some(err)) = (self.fail_for, self.error) {
                if query.home_team == team {
                    return Err(err());
                }
            }
            if self.resolves.iter().any(|t| *t == query.home_team) {
                return Ok(Some(record(&query.home_team, &query.away_team)));
            }
            Ok(None)
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    #[tokio::test]
    async fn resolved_picks_skip_later_tiers() {
        let a = Arc::new(MockProvider::new("a", vec!["Boston Celtics"]));
        let b = Arc::new(MockProvider::new("b", vec!["Boston Celtics", "Chicago Bulls"]));
        let resolver = ScoreResolver::new(vec![a.clone(), b.clone()]);

        let picks = vec![
            pick("p1", "Boston Celtics", "Los Angeles Lakers"),
            pick("p2", "Chicago Bulls", "Miami Heat"),
        ];
        let batch = resolver.resolve_batch(date(), picks).await;

        assert_eq!(batch.resolved.len(), 2);
        assert!(batch.unresolved.is_empty());
        // Tier A saw both picks; tier B only saw the one A missed.
        assert_eq!(a.calls(), 2);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn early_exit_once_everything_is_resolved() {
        let a = Arc::new(MockProvider::new("a", vec!["Boston Celtics"]));
        let b = Arc::new(MockProvider::new("b", vec!["Boston Celtics"]));
        let resolver = ScoreResolver::new(vec![a.clone(), b.clone()]);

        let picks = vec![pick("p1", "Boston Celtics", "Los Angeles Lakers")];
        let batch = resolver.resolve_batch(date(), picks).await;

        assert_eq!(batch.resolved.len(), 1);
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn one_pick_failure_does_not_abort_the_batch() {
        let a = Arc::new(
            MockProvider::new("a", vec!["Chicago Bulls"]).failing_for("Boston Celtics", || {
                AppError::Provider {
                    provider: "a",
                    message: "timeout".to_string(),
                }
            }),
        );
        let resolver = ScoreResolver::new(vec![a.clone()]);

        let picks = vec![
            pick("p1", "Boston Celtics", "Los Angeles Lakers"),
            pick("p2", "Chicago Bulls", "Miami Heat"),
        ];
        let batch = resolver.resolve_batch(date(), picks).await;

        assert_eq!(batch.resolved.len(), 1);
        assert_eq!(batch.unresolved.len(), 1);
        assert_eq!(a.calls(), 2);
    }

    #[tokio::test]
    async fn unauthorized_disables_the_provider_for_the_run() {
        let a = Arc::new(
            MockProvider::new("a", vec!["Chicago Bulls"])
                .failing_for("Boston Celtics", || AppError::Unauthorized { provider: "a" }),
        );
        let resolver = ScoreResolver::new(vec![a.clone()]);

        let picks = vec![
            pick("p1", "Boston Celtics", "Los Angeles Lakers"),
            pick("p2", "Chicago Bulls", "Miami Heat"),
        ];
        let batch = resolver.resolve_batch(date(), picks).await;

        // First call hits the 401; nothing else is attempted.
        assert_eq!(a.calls(), 1);
        assert!(batch.resolved.is_empty());
        assert_eq!(batch.unresolved.len(), 2);
    }

    #[tokio::test]
    async fn unresolved_picks_are_returned() {
        let a = Arc::new(MockProvider::new("a", vec![]));
        let resolver = ScoreResolver::new(vec![a]);

        let picks = vec![pick("p1", "Boston Celtics", "Los Angeles Lakers")];
        let batch = resolver.resolve_batch(date(), picks).await;

        assert!(batch.resolved.is_empty());
        assert_eq!(batch.unresolved.len(), 1);
    }
}
