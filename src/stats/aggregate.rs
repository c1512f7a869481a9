use std::collections::BTreeMap;

use super::scheduler::ChatOutcome;
use super::types::{ChatStatsPartial, DepositAggregate, OperatorStats};

/// Per-run fold of chat outcomes into operator rows. Every field is a plain
/// sum, so arrival order does not matter.
#[derive(Debug, Default)]
pub struct OperatorAggregator {
    rows: BTreeMap<String, OperatorStats>,
    truncated: bool,
    failed_chats: usize,
    skipped_chats: usize,
}

impl OperatorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ChatOutcome) {
        match outcome {
            ChatOutcome::Stats(partial) => self.add(partial),
            ChatOutcome::Empty { truncated } => self.truncated |= truncated,
            ChatOutcome::Skipped => self.skipped_chats += 1,
            ChatOutcome::Failed { chat_id, error } => {
                tracing::debug!("Chat {chat_id} counted as zero contribution: {error}");
                self.failed_chats += 1;
            }
            ChatOutcome::Lost => {
                self.failed_chats += 1;
                self.truncated = true;
            }
        }
    }

    pub fn add(&mut self, partial: ChatStatsPartial) {
        self.truncated |= partial.truncated;
        let row = self
            .rows
            .entry(partial.operator)
            .or_insert_with_key(|op| OperatorStats::empty(op.as_str()));
        row.chats += partial.chats;
        row.total_messages += partial.total_messages;
        row.inbound_messages += partial.inbound_messages;
        row.outbound_messages += partial.outbound_messages;
        row.response_count += partial.response_count;
        row.response_sum_ms = row.response_sum_ms.saturating_add(partial.response_sum_ms);
    }

    /// Applies externally computed deposit figures. Operators without chat
    /// activity in the window still get a row.
    pub fn merge_deposits(&mut self, deposits: &[DepositAggregate]) {
        for deposit in deposits {
            let operator = deposit.operator.trim();
            if operator.is_empty() {
                continue;
            }
            let row = self
                .rows
                .entry(operator.to_string())
                .or_insert_with(|| OperatorStats::empty(operator));
            row.deposit_count = deposit.deposit_count;
            row.deposit_amount = deposit.deposit_amount;
        }
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn failed_chats(&self) -> usize {
        self.failed_chats
    }

    pub fn skipped_chats(&self) -> usize {
        self.skipped_chats
    }

    /// Rows ordered by chat count, busiest first. Ties keep operator order.
    pub fn into_rows(self) -> Vec<OperatorStats> {
        let mut rows: Vec<OperatorStats> = self.rows.into_values().collect();
        rows.sort_by(|a, b| b.chats.cmp(&a.chats));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partial(op: &str, messages: u64, responses: u64, sum: u64) -> ChatStatsPartial {
        ChatStatsPartial {
            operator: op.into(),
            chats: 1,
            total_messages: messages,
            inbound_messages: messages / 2,
            outbound_messages: messages - messages / 2,
            response_count: responses,
            response_sum_ms: sum,
            truncated: false,
        }
    }

    fn deposit(op: &str, count: u64, amount: f64) -> DepositAggregate {
        DepositAggregate {
            operator: op.into(),
            deposit_count: count,
            deposit_amount: amount,
        }
    }

    #[test]
    fn sums_partials_per_operator() {
        let mut agg = OperatorAggregator::new();
        agg.add(partial("alice", 4, 2, 3_000));
        agg.add(partial("bob", 2, 1, 500));
        agg.add(partial("alice", 6, 3, 1_000));

        let rows = agg.into_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].operator, "alice");
        assert_eq!(rows[0].chats, 2);
        assert_eq!(rows[0].total_messages, 10);
        assert_eq!(rows[0].response_count, 5);
        assert_eq!(rows[0].response_sum_ms, 4_000);
        assert_eq!(rows[1].operator, "bob");
    }

    #[test]
    fn fold_order_does_not_matter() {
        let items = vec![
            partial("alice", 4, 2, 3_000),
            partial("bob", 2, 1, 500),
            partial("alice", 6, 3, 1_000),
            partial("carol", 1, 0, 0),
        ];
        let mut forward = OperatorAggregator::new();
        items.iter().cloned().for_each(|p| forward.add(p));
        let mut backward = OperatorAggregator::new();
        items.into_iter().rev().for_each(|p| backward.add(p));

        assert_eq!(forward.into_rows(), backward.into_rows());
    }

    #[test]
    fn outcomes_update_counters_and_truncation() {
        let mut agg = OperatorAggregator::new();
        agg.record(ChatOutcome::Skipped);
        agg.record(ChatOutcome::Failed {
            chat_id: "c9".into(),
            error: "503".into(),
        });
        agg.record(ChatOutcome::Empty { truncated: true });

        assert_eq!(agg.skipped_chats(), 1);
        assert_eq!(agg.failed_chats(), 1);
        assert!(agg.truncated());
        assert!(agg.into_rows().is_empty());
    }

    #[test]
    fn lost_chat_counts_as_failed_and_truncates() {
        let mut agg = OperatorAggregator::new();
        agg.add(partial("alice", 2, 1, 100));
        agg.record(ChatOutcome::Lost);

        assert_eq!(agg.failed_chats(), 1);
        assert!(agg.truncated());
        assert_eq!(agg.into_rows()[0].chats, 1);
    }

    #[test]
    fn response_sums_saturate_across_chats() {
        let mut agg = OperatorAggregator::new();
        agg.add(partial("alice", 2, 1, u64::MAX - 10));
        agg.add(partial("alice", 2, 1, 500));
        assert_eq!(agg.into_rows()[0].response_sum_ms, u64::MAX);
    }

    #[test]
    fn deposits_overwrite_existing_rows() {
        let mut agg = OperatorAggregator::new();
        agg.add(partial("alice", 4, 2, 3_000));
        agg.merge_deposits(&[deposit("alice", 3, 150.5)]);
        agg.merge_deposits(&[deposit("alice", 4, 200.0)]);

        let rows = agg.into_rows();
        assert_eq!(rows[0].deposit_count, 4);
        assert_eq!(rows[0].deposit_amount, 200.0);
        assert_eq!(rows[0].chats, 1);
    }

    #[test]
    fn deposit_only_operator_gets_zeroed_row() {
        let mut agg = OperatorAggregator::new();
        agg.add(partial("alice", 4, 2, 3_000));
        agg.merge_deposits(&[deposit("dave", 2, 75.0), deposit("  ", 9, 1.0)]);

        let rows = agg.into_rows();
        assert_eq!(rows.len(), 2);
        let dave = rows.iter().find(|r| r.operator == "dave").unwrap();
        assert_eq!(dave.chats, 0);
        assert_eq!(dave.total_messages, 0);
        assert_eq!(dave.deposit_count, 2);
        assert_eq!(dave.deposit_amount, 75.0);
        assert_eq!(rows.last().unwrap().operator, "dave");
    }

    #[test]
    fn ties_are_broken_by_operator_name() {
        let mut agg = OperatorAggregator::new();
        agg.add(partial("zed", 1, 0, 0));
        agg.add(partial("amy", 1, 0, 0));
        let names: Vec<String> = agg.into_rows().into_iter().map(|r| r.operator).collect();
        assert_eq!(names, ["amy", "zed"]);
    }
}
