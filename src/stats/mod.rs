//! Operator performance aggregation over paginated chat histories.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ProviderError};
use crate::upstream::{ChatSnapshotProvider, DepositAggregateProvider, MessagePageProvider};

pub mod aggregate;
pub mod candidates;
pub mod fetcher;
pub mod operator;
pub mod reducer;
pub mod run_guard;
pub mod scheduler;
pub mod types;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;

use aggregate::OperatorAggregator;
use candidates::{DEFAULT_MAX_CANDIDATES, select_candidates};
use fetcher::{FetchPlan, PagedHistoryFetcher};
use run_guard::{RunGuard, RunToken};
use scheduler::{ConcurrencyScheduler, DEFAULT_WORKERS};
use types::{Chat, DepositAggregate, Millis, OperatorStats, TimeWindow};
use window::{CustomBounds, RangeSelector, resolve_window};

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub workers: usize,
    pub max_candidates: usize,
    /// Upper bound for any single upstream request.
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            request_timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub range: RangeSelector,
    #[serde(default)]
    pub from: Option<Millis>,
    #[serde(default)]
    pub to: Option<Millis>,
}

impl StatsQuery {
    pub fn range(range: RangeSelector) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    fn custom_bounds(&self) -> CustomBounds {
        CustomBounds {
            from: self.from,
            to: self.to,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub range: RangeSelector,
    pub window: TimeWindow,
    pub rows: Vec<OperatorStats>,
    /// Candidate cap, some chat's page ceiling, or a lost worker cut the
    /// walk short.
    pub truncated: bool,
    pub candidate_cap_hit: bool,
    pub candidates: usize,
    pub failed_chats: usize,
    pub skipped_chats: usize,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        token: RunToken,
        result: Result<StatsReport, EngineError>,
    },
    /// A newer run started before this one finished; its output is dropped.
    Superseded { token: RunToken },
}

pub struct OperatorStatsEngine {
    config: EngineConfig,
    snapshots: Arc<dyn ChatSnapshotProvider>,
    messages: Arc<dyn MessagePageProvider>,
    deposits: Arc<dyn DepositAggregateProvider>,
    guard: RunGuard,
}

impl OperatorStatsEngine {
    pub fn new(
        config: EngineConfig,
        snapshots: Arc<dyn ChatSnapshotProvider>,
        messages: Arc<dyn MessagePageProvider>,
        deposits: Arc<dyn DepositAggregateProvider>,
    ) -> Self {
        Self {
            config,
            snapshots,
            messages,
            deposits,
            guard: RunGuard::new(),
        }
    }

    /// Starts a new run, superseding any run still in flight.
    pub fn begin_run(&self) -> RunToken {
        self.guard.begin()
    }

    pub fn is_current(&self, token: RunToken) -> bool {
        self.guard.is_current(token)
    }

    pub fn latest_token(&self) -> RunToken {
        self.guard.latest()
    }

    /// Computes the report for a run started with [`Self::begin_run`].
    /// Staleness is checked once, after every worker has joined.
    pub async fn run_with_token(&self, token: RunToken, query: StatsQuery, now: Millis) -> RunOutcome {
        let result = self.compute(token, query, now).await;

        if !self.guard.is_current(token) {
            tracing::debug!("Discarding stats run {token:?}, superseded by {:?}", self.guard.latest());
            return RunOutcome::Superseded { token };
        }
        if let Err(e) = &result {
            tracing::warn!("Stats run {token:?} failed: {e}");
        }
        RunOutcome::Completed { token, result }
    }

    async fn compute(
        &self,
        token: RunToken,
        query: StatsQuery,
        now: Millis,
    ) -> Result<StatsReport, EngineError> {
        let snapshot = self.snapshots.snapshot().await.map_err(EngineError::Snapshot)?;
        let window = resolve_window(query.range, query.custom_bounds(), &snapshot, now);

        let candidates = select_candidates(&snapshot, window.from_ts, self.config.max_candidates);
        if candidates.truncated {
            tracing::info!(
                "Candidate cap hit: {} of {} qualifying chats processed",
                candidates.chats.len(),
                candidates.qualifying
            );
        }
        let candidate_cap_hit = candidates.truncated;
        let chats: Vec<Chat> = candidates.chats.into_iter().cloned().collect();
        let candidate_count = chats.len();

        tracing::info!(
            "Stats run {token:?}: range={} window=[{}, {}] candidates={candidate_count}",
            query.range.as_str(),
            window.from_ts,
            window.to_ts
        );

        let scheduler = ConcurrencyScheduler::new(
            self.config.workers,
            PagedHistoryFetcher::new(
                Arc::clone(&self.messages),
                FetchPlan::for_range(query.range),
                self.config.request_timeout,
            ),
        );
        let (outcomes, deposits) = tokio::join!(
            scheduler.run(chats, window, self.guard.activate(token)),
            self.fetch_deposits(window),
        );
        let deposits = deposits.map_err(EngineError::Deposits)?;

        let mut aggregator = OperatorAggregator::new();
        for outcome in outcomes {
            aggregator.record(outcome);
        }
        aggregator.merge_deposits(&deposits);

        let truncated = candidate_cap_hit || aggregator.truncated();
        let failed_chats = aggregator.failed_chats();
        let skipped_chats = aggregator.skipped_chats();

        Ok(StatsReport {
            range: query.range,
            window,
            rows: aggregator.into_rows(),
            truncated,
            candidate_cap_hit,
            candidates: candidate_count,
            failed_chats,
            skipped_chats,
        })
    }

    async fn fetch_deposits(&self, window: TimeWindow) -> Result<Vec<DepositAggregate>, ProviderError> {
        let timeout = self.config.request_timeout;
        tokio::time::timeout(timeout, self.deposits.deposits(window))
            .await
            .map_err(|_| ProviderError::Timeout {
                endpoint: "deposit aggregate".into(),
                after: timeout,
            })?
    }
}
