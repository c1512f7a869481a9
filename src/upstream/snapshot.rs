use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ProviderError;
use crate::stats::types::Chat;

use super::ChatSnapshotProvider;

/// Last good chat snapshot, refreshed in the background.
#[derive(Clone)]
pub struct SnapshotCache {
    source: Arc<dyn ChatSnapshotProvider>,
    current: Arc<RwLock<Option<Arc<Vec<Chat>>>>>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn ChatSnapshotProvider>) -> Self {
        Self {
            source,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Pulls a fresh snapshot. On failure the previous one stays in place.
    pub async fn refresh(&self) -> Result<usize, ProviderError> {
        let chats = self.source.snapshot().await?;
        let count = chats.len();
        *self.current.write().await = Some(chats);
        Ok(count)
    }

    pub async fn len(&self) -> Option<usize> {
        self.current.read().await.as_ref().map(|c| c.len())
    }

    pub async fn run_refresher(self, every: Duration) {
        let mut interval = tokio::time::interval(every);
        interval.tick().await; // skip immediate tick
        loop {
            interval.tick().await;
            match self.refresh().await {
                Ok(count) => tracing::debug!("Chat snapshot refreshed: {count} chats"),
                Err(e) => tracing::warn!("Chat snapshot refresh failed, keeping previous: {e}"),
            }
        }
    }
}

#[async_trait]
impl ChatSnapshotProvider for SnapshotCache {
    async fn snapshot(&self) -> Result<Arc<Vec<Chat>>, ProviderError> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(ProviderError::Unavailable("chat snapshot"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Hands out queued responses in order.
    struct Scripted(Mutex<Vec<Result<Vec<Chat>, ProviderError>>>);

    #[async_trait]
    impl ChatSnapshotProvider for Scripted {
        async fn snapshot(&self) -> Result<Arc<Vec<Chat>>, ProviderError> {
            self.0.lock().unwrap().remove(0).map(Arc::new)
        }
    }

    fn chats(n: usize) -> Vec<Chat> {
        (0..n)
            .map(|i| Chat {
                chat_id: format!("c{i}"),
                ..Default::default()
            })
            .collect()
    }

    #[tokio::test]
    async fn unavailable_until_first_refresh() {
        let cache = SnapshotCache::new(Arc::new(Scripted(Mutex::new(vec![Ok(chats(2))]))));
        assert!(matches!(cache.snapshot().await, Err(ProviderError::Unavailable(_))));
        assert_eq!(cache.len().await, None);

        assert_eq!(cache.refresh().await.unwrap(), 2);
        assert_eq!(cache.snapshot().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let script = vec![
            Ok(chats(3)),
            Err(ProviderError::Status {
                endpoint: "/chats".into(),
                status: 500,
            }),
        ];
        let cache = SnapshotCache::new(Arc::new(Scripted(Mutex::new(script))));

        cache.refresh().await.unwrap();
        assert!(cache.refresh().await.is_err());
        assert_eq!(cache.len().await, Some(3));
    }
}
