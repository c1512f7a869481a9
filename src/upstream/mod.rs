use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ProviderError;
use crate::stats::types::{Chat, DepositAggregate, Message, TimeWindow};

pub mod http;
pub mod snapshot;

pub use http::HttpSupportApi;
pub use snapshot::SnapshotCache;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// Only messages strictly older than this cursor. `None` = newest page.
    pub before: Option<String>,
    pub limit: u32,
}

/// One page of a chat's history, newest message first.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_before_cursor: Option<String>,
}

#[async_trait]
pub trait ChatSnapshotProvider: Send + Sync {
    async fn snapshot(&self) -> Result<Arc<Vec<Chat>>, ProviderError>;
}

#[async_trait]
pub trait MessagePageProvider: Send + Sync {
    async fn page(&self, chat_id: &str, request: PageRequest) -> Result<MessagePage, ProviderError>;
}

#[async_trait]
pub trait DepositAggregateProvider: Send + Sync {
    async fn deposits(&self, window: TimeWindow) -> Result<Vec<DepositAggregate>, ProviderError>;
}
