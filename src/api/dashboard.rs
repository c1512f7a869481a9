use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::stats::types::Millis;
use crate::stats::{OperatorStatsEngine, RunOutcome, StatsQuery, StatsReport};

/// What API clients currently see. Only the latest run may change it.
#[derive(Clone, Debug, Default)]
pub struct DashboardView {
    pub loading: bool,
    pub query: StatsQuery,
    pub report: Option<StatsReport>,
    pub error: Option<String>,
    pub updated_at: Option<String>,
}

pub struct Dashboard {
    engine: Arc<OperatorStatsEngine>,
    query: RwLock<StatsQuery>,
    view: RwLock<DashboardView>,
}

impl Dashboard {
    pub fn new(engine: Arc<OperatorStatsEngine>, query: StatsQuery) -> Self {
        Self {
            engine,
            query: RwLock::new(query),
            view: RwLock::new(DashboardView {
                query,
                ..Default::default()
            }),
        }
    }

    pub fn engine(&self) -> &OperatorStatsEngine {
        &self.engine
    }

    pub async fn query(&self) -> StatsQuery {
        *self.query.read().await
    }

    pub async fn set_query(&self, query: StatsQuery) {
        *self.query.write().await = query;
    }

    pub async fn view(&self) -> DashboardView {
        self.view.read().await.clone()
    }

    /// Runs the engine and publishes the result if no newer run started in
    /// the meantime. A superseded run leaves the view untouched.
    pub async fn refresh(&self, query: StatsQuery, now: Millis) -> RunOutcome {
        let token = {
            let mut view = self.view.write().await;
            let token = self.engine.begin_run();
            view.loading = true;
            view.query = query;
            token
        };

        let (token, result) = match self.engine.run_with_token(token, query, now).await {
            RunOutcome::Completed { token, result } => (token, result),
            superseded => return superseded,
        };

        let mut view = self.view.write().await;
        if !self.engine.is_current(token) {
            tracing::debug!("Stats run {token:?} finished after a newer run started, not publishing");
            return RunOutcome::Superseded { token };
        }

        view.loading = false;
        match &result {
            Ok(report) => {
                view.report = Some(report.clone());
                view.error = None;
            }
            Err(e) => {
                view.report = None;
                view.error = Some(e.to_string());
            }
        }
        view.updated_at = Some(chrono::Utc::now().to_rfc3339());

        RunOutcome::Completed { token, result }
    }

    pub async fn refresh_now(&self) -> RunOutcome {
        let query = self.query().await;
        self.refresh(query, now_ms()).await
    }

    /// Re-invokes the engine with the current query on a fixed cadence.
    pub async fn run_refresher(self: Arc<Self>, every: Duration) {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let RunOutcome::Completed { result: Ok(report), .. } = self.refresh_now().await {
                tracing::info!(
                    "Operator stats refreshed: {} operators, truncated={}",
                    report.rows.len(),
                    report.truncated
                );
            }
        }
    }
}

pub fn now_ms() -> Millis {
    chrono::Utc::now().timestamp_millis()
}
