use serde::{Deserialize, Serialize};

/// Epoch milliseconds.
pub type Millis = i64;

/// Closed interval `[from_ts, to_ts]` in epoch ms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub from_ts: Millis,
    pub to_ts: Millis,
}

impl TimeWindow {
    /// Builds a window, swapping the bounds if they arrive reversed.
    pub fn new(from_ts: Millis, to_ts: Millis) -> Self {
        if to_ts < from_ts {
            Self { from_ts: to_ts, to_ts: from_ts }
        } else {
            Self { from_ts, to_ts }
        }
    }

    pub fn contains(&self, ts: Millis) -> bool {
        self.from_ts <= ts && ts <= self.to_ts
    }
}

/// One support chat as it appears in the snapshot. Read-only.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub chat_id: String,
    #[serde(default)]
    pub accepted_by: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub started_at: Option<Millis>,
    #[serde(default)]
    pub last_message_at: Option<Millis>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum Direction {
    #[serde(rename = "in", alias = "IN", alias = "inbound")]
    In,
    #[serde(rename = "out", alias = "OUT", alias = "outbound")]
    Out,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub direction: Direction,
    /// Server receive time. Orders the conversation and places it in a window.
    pub created_at: Millis,
    /// Sender clock, when the client reported one. May disagree with
    /// `created_at` ordering.
    #[serde(default)]
    pub sent_at: Option<Millis>,
}

impl Message {
    /// Timestamp used for response latency.
    pub fn latency_ts(&self) -> Millis {
        self.sent_at.unwrap_or(self.created_at)
    }
}

/// Statistics contributed by a single chat. Only built for chats with an
/// operator and at least one in-window message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatStatsPartial {
    pub operator: String,
    pub chats: u64,
    pub total_messages: u64,
    pub inbound_messages: u64,
    pub outbound_messages: u64,
    pub response_count: u64,
    pub response_sum_ms: u64,
    pub truncated: bool,
}

/// Final per-operator row.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorStats {
    pub operator: String,
    pub chats: u64,
    pub total_messages: u64,
    pub inbound_messages: u64,
    pub outbound_messages: u64,
    pub response_count: u64,
    pub response_sum_ms: u64,
    pub deposit_count: u64,
    pub deposit_amount: f64,
}

impl OperatorStats {
    pub fn empty(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            ..Default::default()
        }
    }

    pub fn avg_response_ms(&self) -> Option<f64> {
        (self.response_count > 0).then(|| self.response_sum_ms as f64 / self.response_count as f64)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositAggregate {
    pub operator: String,
    #[serde(default)]
    pub deposit_count: u64,
    #[serde(default)]
    pub deposit_amount: f64,
}
