use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::stats::types::{Chat, DepositAggregate, TimeWindow};

use super::{
    ChatSnapshotProvider, DepositAggregateProvider, MessagePage, MessagePageProvider, PageRequest,
};

/// JSON client for the support-chat API and the deposit attribution API.
#[derive(Clone)]
pub struct HttpSupportApi {
    http: reqwest::Client,
    support_url: String,
    deposits_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpSupportApi {
    pub fn new(
        http: reqwest::Client,
        support_url: impl Into<String>,
        deposits_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            support_url: support_url.into(),
            deposits_url: deposits_url.into(),
            token,
            timeout,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let mut req = self.http.get(url).query(query).timeout(self.timeout);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    endpoint: url.to_string(),
                    after: self.timeout,
                }
            } else {
                ProviderError::Http(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.json().await?)
    }
}

/// `/chats` answers either with a bare array or wrapped in `{ "chats": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChatList {
    Bare(Vec<Chat>),
    Wrapped { chats: Vec<Chat> },
}

#[derive(Deserialize)]
struct DepositResponse {
    #[serde(default)]
    operators: Vec<DepositAggregate>,
}

#[async_trait]
impl ChatSnapshotProvider for HttpSupportApi {
    async fn snapshot(&self) -> Result<Arc<Vec<Chat>>, ProviderError> {
        let url = format!("{}/chats", self.support_url);
        let chats = match self.get_json::<ChatList>(&url, &[]).await? {
            ChatList::Bare(chats) | ChatList::Wrapped { chats } => chats,
        };
        Ok(Arc::new(chats))
    }
}

#[async_trait]
impl MessagePageProvider for HttpSupportApi {
    async fn page(&self, chat_id: &str, request: PageRequest) -> Result<MessagePage, ProviderError> {
        let url = format!("{}/chats/{chat_id}/messages", self.support_url);
        let mut query = vec![("limit", request.limit.to_string())];
        if let Some(before) = request.before {
            query.push(("before", before));
        }
        self.get_json(&url, &query).await
    }
}

#[async_trait]
impl DepositAggregateProvider for HttpSupportApi {
    async fn deposits(&self, window: TimeWindow) -> Result<Vec<DepositAggregate>, ProviderError> {
        let url = format!("{}/deposits/by-operator", self.deposits_url);
        let query = [
            ("from", window.from_ts.to_string()),
            ("to", window.to_ts.to_string()),
        ];
        let resp: DepositResponse = self.get_json(&url, &query).await?;
        Ok(resp.operators)
    }
}
