//! In-memory providers for engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::ProviderError;
use crate::upstream::{
    ChatSnapshotProvider, DepositAggregateProvider, MessagePage, MessagePageProvider, PageRequest,
};

use super::types::{Chat, DepositAggregate, Direction, Message, Millis, TimeWindow};

pub fn msg(chat_id: &str, id: &str, direction: Direction, created_at: Millis) -> Message {
    Message {
        id: id.into(),
        chat_id: chat_id.into(),
        direction,
        created_at,
        sent_at: None,
    }
}

/// A message whose sender clock disagrees with its arrival time.
pub fn skewed(id: &str, direction: Direction, created_at: Millis, sent_at: Millis) -> Message {
    Message {
        sent_at: Some(sent_at),
        ..msg("c", id, direction, created_at)
    }
}

pub fn chat(id: &str, operator: Option<&str>, last_message_at: Millis) -> Chat {
    Chat {
        chat_id: id.into(),
        accepted_by: operator.map(String::from),
        started_at: Some(last_message_at),
        last_message_at: Some(last_message_at),
        ..Default::default()
    }
}

/// Blocks the first page request until released.
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl Gate {
    pub fn armed() -> Arc<Self> {
        Arc::new(Self {
            armed: AtomicBool::new(true),
            ..Default::default()
        })
    }
}

/// Serves each chat's history newest-first, paginated by message id.
#[derive(Default)]
pub struct FakeMessages {
    histories: HashMap<String, Vec<Message>>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    stalled: HashSet<String>,
    omit_cursor: bool,
    delay: Option<Duration>,
    gate: Option<Arc<Gate>>,
    requests: Mutex<Vec<(String, PageRequest)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chat(mut self, chat_id: &str, mut messages: Vec<Message>) -> Self {
        messages.sort_by_key(|m| std::cmp::Reverse(m.created_at));
        self.histories.insert(chat_id.into(), messages);
        self
    }

    pub fn failing(mut self, chat_id: &str) -> Self {
        self.failing.insert(chat_id.into());
        self
    }

    /// Page requests for this chat panic inside the provider.
    pub fn panicking(mut self, chat_id: &str) -> Self {
        self.panicking.insert(chat_id.into());
        self
    }

    /// Page requests for this chat never resolve.
    pub fn stalled(mut self, chat_id: &str) -> Self {
        self.stalled.insert(chat_id.into());
        self
    }

    pub fn without_cursor_hints(mut self) -> Self {
        self.omit_cursor = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn requests(&self) -> Vec<(String, PageRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_chats(&self) -> HashSet<String> {
        self.requests().into_iter().map(|(id, _)| id).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagePageProvider for FakeMessages {
    async fn page(&self, chat_id: &str, request: PageRequest) -> Result<MessagePage, ProviderError> {
        self.requests
            .lock()
            .unwrap()
            .push((chat_id.to_string(), request.clone()));

        if self.panicking.contains(chat_id) {
            panic!("message provider blew up on chat {chat_id}");
        }
        if self.stalled.contains(chat_id) {
            std::future::pending::<()>().await;
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            if gate.armed.swap(false, Ordering::SeqCst) {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(chat_id) {
            return Err(ProviderError::Status {
                endpoint: format!("/chats/{chat_id}/messages"),
                status: 503,
            });
        }

        let all = self.histories.get(chat_id).map(Vec::as_slice).unwrap_or(&[]);
        let start = match &request.before {
            Some(cursor) => all
                .iter()
                .position(|m| &m.id == cursor)
                .map_or(all.len(), |i| i + 1),
            None => 0,
        };
        let end = (start + request.limit as usize).min(all.len());
        let messages = all[start..end].to_vec();
        let has_more = end < all.len();
        let next_before_cursor = match (self.omit_cursor, messages.last()) {
            (false, Some(last)) if has_more => Some(last.id.clone()),
            _ => None,
        };

        Ok(MessagePage {
            messages,
            has_more,
            next_before_cursor,
        })
    }
}

pub struct FakeSnapshot(pub Option<Arc<Vec<Chat>>>);

impl FakeSnapshot {
    pub fn of(chats: Vec<Chat>) -> Self {
        Self(Some(Arc::new(chats)))
    }
}

#[async_trait]
impl ChatSnapshotProvider for FakeSnapshot {
    async fn snapshot(&self) -> Result<Arc<Vec<Chat>>, ProviderError> {
        self.0.clone().ok_or(ProviderError::Unavailable("chat snapshot"))
    }
}

#[derive(Default)]
pub struct FakeDeposits {
    rows: Option<Vec<DepositAggregate>>,
    stalled: bool,
    windows: Mutex<Vec<TimeWindow>>,
}

impl FakeDeposits {
    pub fn of(rows: Vec<DepositAggregate>) -> Self {
        Self {
            rows: Some(rows),
            ..Default::default()
        }
    }

    pub fn broken() -> Self {
        Self::default()
    }

    /// Never answers.
    pub fn stalled() -> Self {
        Self {
            rows: Some(Vec::new()),
            stalled: true,
            ..Default::default()
        }
    }

    pub fn windows(&self) -> Vec<TimeWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl DepositAggregateProvider for FakeDeposits {
    async fn deposits(&self, window: TimeWindow) -> Result<Vec<DepositAggregate>, ProviderError> {
        self.windows.lock().unwrap().push(window);
        if self.stalled {
            std::future::pending::<()>().await;
        }
        self.rows.clone().ok_or(ProviderError::Status {
            endpoint: "/deposits/by-operator".into(),
            status: 500,
        })
    }
}
