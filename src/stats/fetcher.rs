use std::sync::Arc;
use std::time::Duration;

use crate::error::ProviderError;
use crate::upstream::{MessagePageProvider, PageRequest};

use super::run_guard::ActiveRun;
use super::types::{Message, Millis};
use super::window::RangeSelector;

/// Page size and page ceiling for one chat's history walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchPlan {
    pub page_size: u32,
    pub max_pages: u32,
}

impl FetchPlan {
    /// Wider windows get bigger and more pages.
    pub fn for_range(range: RangeSelector) -> Self {
        match range {
            RangeSelector::All => Self { page_size: 100, max_pages: 8 },
            _ => Self { page_size: 50, max_pages: 4 },
        }
    }
}

/// Raw messages collected for one chat. May contain messages older than the
/// window start; callers filter.
#[derive(Debug, Default)]
pub struct ChatHistory {
    pub messages: Vec<Message>,
    pub pages: u32,
    /// Page ceiling reached while the provider still had older pages.
    pub truncated: bool,
}

#[derive(Clone)]
pub struct PagedHistoryFetcher {
    provider: Arc<dyn MessagePageProvider>,
    plan: FetchPlan,
    request_timeout: Duration,
}

impl PagedHistoryFetcher {
    pub fn new(
        provider: Arc<dyn MessagePageProvider>,
        plan: FetchPlan,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            plan,
            request_timeout,
        }
    }

    /// Walks pages backwards from the newest message until the page that
    /// crosses `from_ts`, an empty page, the end of history, or the page
    /// ceiling. Pages are fetched strictly one after another.
    pub async fn fetch(
        &self,
        chat_id: &str,
        from_ts: Millis,
        run: &ActiveRun,
    ) -> Result<ChatHistory, ProviderError> {
        let mut history = ChatHistory::default();
        let mut cursor: Option<String> = None;

        loop {
            if run.is_superseded() {
                tracing::debug!(
                    "Run {:?} superseded, stopping history walk for chat {chat_id}",
                    run.token()
                );
                break;
            }

            let request = PageRequest {
                before: cursor.take(),
                limit: self.plan.page_size,
            };
            let page = tokio::time::timeout(self.request_timeout, self.provider.page(chat_id, request))
                .await
                .map_err(|_| ProviderError::Timeout {
                    endpoint: format!("messages of chat {chat_id}"),
                    after: self.request_timeout,
                })??;
            history.pages += 1;

            let Some(oldest) = page.messages.iter().min_by_key(|m| m.created_at) else {
                break;
            };
            let oldest_ts = oldest.created_at;
            let oldest_id = oldest.id.clone();
            history.messages.extend(page.messages);

            if oldest_ts < from_ts || !page.has_more {
                break;
            }
            if history.pages >= self.plan.max_pages {
                tracing::debug!(
                    "Chat {chat_id} hit page ceiling ({} pages of {})",
                    self.plan.max_pages,
                    self.plan.page_size
                );
                history.truncated = true;
                break;
            }
            cursor = Some(page.next_before_cursor.unwrap_or(oldest_id));
        }

        Ok(history)
    }
}
