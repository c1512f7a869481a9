use super::types::{Chat, Millis};

pub const DEFAULT_MAX_CANDIDATES: usize = 300;

/// Chats that may have activity inside the window, in snapshot order.
pub struct Candidates<'a> {
    pub chats: Vec<&'a Chat>,
    /// Number of qualifying chats before the cap was applied.
    pub qualifying: usize,
    /// Set when qualifying chats were dropped by the cap.
    pub truncated: bool,
}

pub fn select_candidates(chats: &[Chat], from_ts: Millis, cap: usize) -> Candidates<'_> {
    let mut selected = Vec::with_capacity(cap.min(chats.len()));
    let mut qualifying = 0usize;

    for chat in chats.iter().filter(|c| may_be_active(c, from_ts)) {
        qualifying += 1;
        if selected.len() < cap {
            selected.push(chat);
        }
    }

    Candidates {
        truncated: qualifying > selected.len(),
        chats: selected,
        qualifying,
    }
}

fn may_be_active(chat: &Chat, from_ts: Millis) -> bool {
    chat.last_message_at.is_some_and(|ts| ts >= from_ts)
        || chat.started_at.is_some_and(|ts| ts >= from_ts)
}
