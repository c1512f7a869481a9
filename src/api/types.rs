use serde::{Deserialize, Serialize};

use crate::stats::types::{Millis, OperatorStats, TimeWindow};
use crate::stats::window::RangeSelector;
use crate::stats::{StatsQuery, StatsReport};

use super::dashboard::DashboardView;

pub const INCOMPLETE_NOTICE: &str =
    "Results may be incomplete: some chats or message pages were not fetched.";

#[derive(Deserialize)]
pub struct StatsParams {
    pub range: Option<String>,
    pub from: Option<Millis>,
    pub to: Option<Millis>,
}

impl StatsParams {
    /// `None` when the range name is not recognised.
    pub fn to_query(&self) -> Option<StatsQuery> {
        let range = match self.range.as_deref() {
            Some(r) => RangeSelector::parse(r)?,
            None => RangeSelector::default(),
        };
        Some(StatsQuery {
            range,
            from: self.from,
            to: self.to,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRow {
    pub operator: String,
    pub chats: u64,
    pub total_messages: u64,
    pub inbound_messages: u64,
    pub outbound_messages: u64,
    pub response_count: u64,
    pub response_sum_ms: u64,
    pub avg_response_ms: Option<f64>,
    pub deposit_count: u64,
    pub deposit_amount: f64,
}

impl From<&OperatorStats> for OperatorRow {
    fn from(s: &OperatorStats) -> Self {
        Self {
            operator: s.operator.clone(),
            chats: s.chats,
            total_messages: s.total_messages,
            inbound_messages: s.inbound_messages,
            outbound_messages: s.outbound_messages,
            response_count: s.response_count,
            response_sum_ms: s.response_sum_ms,
            avg_response_ms: s.avg_response_ms(),
            deposit_count: s.deposit_count,
            deposit_amount: s.deposit_amount,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub range: RangeSelector,
    pub window: TimeWindow,
    pub rows: Vec<OperatorRow>,
    pub truncated: bool,
    pub notice: Option<&'static str>,
    pub candidates: usize,
    pub failed_chats: usize,
    pub skipped_chats: usize,
}

impl From<&StatsReport> for StatsResponse {
    fn from(r: &StatsReport) -> Self {
        Self {
            range: r.range,
            window: r.window,
            rows: r.rows.iter().map(OperatorRow::from).collect(),
            truncated: r.truncated,
            notice: r.truncated.then_some(INCOMPLETE_NOTICE),
            candidates: r.candidates,
            failed_chats: r.failed_chats,
            skipped_chats: r.skipped_chats,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub loading: bool,
    pub query: StatsQuery,
    pub stats: Option<StatsResponse>,
    pub error: Option<String>,
    pub updated_at: Option<String>,
}

impl From<DashboardView> for DashboardResponse {
    fn from(v: DashboardView) -> Self {
        Self {
            loading: v.loading,
            query: v.query,
            stats: v.report.as_ref().map(StatsResponse::from),
            error: v.error,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub snapshot_chats: Option<usize>,
    pub latest_run: u64,
}
