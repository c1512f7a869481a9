use super::types::{ChatStatsPartial, Direction, Message, Millis};

/// Reduces one chat's in-window messages to its contribution.
///
/// Messages are ordered by arrival (`created_at`); latency is measured on the
/// sender clock (`sent_at`) when one is present. Each outbound message is
/// paired with the most recent inbound message that has not been answered
/// yet; older unanswered inbound messages are dropped from latency.
///
/// A pairing with a negative delta (clock skew) is not counted but still
/// consumes the pending inbound. Without `sent_at` both ends of a pairing are
/// measured on `created_at`, the sort key, so the delta is never negative and
/// that guard cannot fire. A delta that does not fit in `i64` is dropped the
/// same way, and sums saturate.
///
/// Returns `None` for an empty chat so it never shows up in aggregates.
pub fn reduce_chat(
    operator: &str,
    mut messages: Vec<Message>,
    truncated: bool,
) -> Option<ChatStatsPartial> {
    if messages.is_empty() {
        return None;
    }
    messages.sort_by_key(|m| m.created_at);

    let mut partial = ChatStatsPartial {
        operator: operator.to_string(),
        chats: 1,
        total_messages: messages.len() as u64,
        truncated,
        ..Default::default()
    };
    let mut pending_inbound: Option<Millis> = None;

    for message in &messages {
        match message.direction {
            Direction::In => {
                partial.inbound_messages += 1;
                pending_inbound = Some(message.latency_ts());
            }
            Direction::Out => {
                partial.outbound_messages += 1;
                if let Some(asked_at) = pending_inbound.take() {
                    match message.latency_ts().checked_sub(asked_at) {
                        Some(delta) if delta >= 0 => {
                            partial.response_sum_ms = partial.response_sum_ms.saturating_add(delta as u64);
                            partial.response_count += 1;
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    Some(partial)
}
