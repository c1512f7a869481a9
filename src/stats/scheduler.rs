use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{Mutex, mpsc};

use super::fetcher::PagedHistoryFetcher;
use super::operator::resolve_operator;
use super::reducer::reduce_chat;
use super::run_guard::ActiveRun;
use super::types::{Chat, ChatStatsPartial, Message, TimeWindow};

pub const DEFAULT_WORKERS: usize = 6;

/// What one chat contributed to a run.
#[derive(Debug)]
pub enum ChatOutcome {
    Stats(ChatStatsPartial),
    /// Fetched, but nothing fell inside the window.
    Empty { truncated: bool },
    /// No operator could be attributed; nothing was fetched.
    Skipped,
    /// History could not be fetched. Counts as zero contribution.
    Failed { chat_id: String, error: String },
    /// The worker died before reporting this chat. Counts as failed and
    /// marks the run incomplete.
    Lost,
}

/// Fixed pool of workers pulling chats one at a time off a shared queue.
pub struct ConcurrencyScheduler {
    workers: usize,
    fetcher: PagedHistoryFetcher,
}

impl ConcurrencyScheduler {
    pub fn new(workers: usize, fetcher: PagedHistoryFetcher) -> Self {
        Self {
            workers: workers.max(1),
            fetcher,
        }
    }

    /// Processes every chat and returns once all workers have finished.
    /// Always yields one outcome per input chat.
    pub async fn run(&self, chats: Vec<Chat>, window: TimeWindow, run: ActiveRun) -> Vec<ChatOutcome> {
        let total = chats.len();
        let (tx, rx) = mpsc::channel::<Chat>(self.workers * 2);
        let rx = Arc::new(Mutex::new(rx));
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<ChatOutcome>();

        let handles: Vec<_> = (0..self.workers)
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let done = done_tx.clone();
                let fetcher = self.fetcher.clone();
                let run = run.clone();
                tokio::spawn(async move {
                    let mut processed = 0usize;
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(chat) = next else { break };
                        let outcome = process_chat(&fetcher, chat, window, &run).await;
                        processed += 1;
                        if done.send(outcome).is_err() {
                            break;
                        }
                    }
                    tracing::trace!("Stats worker {worker} done ({processed} chats)");
                })
            })
            .collect();
        // Workers hold the only queue handles, so the queue closes if all of them die.
        drop(rx);
        drop(done_tx);

        for chat in chats {
            if tx.send(chat).await.is_err() {
                tracing::warn!("Stats workers exited early, queue closed");
                break;
            }
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = done_rx.recv().await {
            outcomes.push(outcome);
        }
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                tracing::error!("Stats worker panicked: {e}");
            }
        }

        let lost = total.saturating_sub(outcomes.len());
        if lost > 0 {
            tracing::warn!("{lost} chats lost to worker failures, run is incomplete");
            outcomes.extend((0..lost).map(|_| ChatOutcome::Lost));
        }
        outcomes
    }
}

async fn process_chat(
    fetcher: &PagedHistoryFetcher,
    chat: Chat,
    window: TimeWindow,
    run: &ActiveRun,
) -> ChatOutcome {
    let Some(operator) = resolve_operator(&chat) else {
        return ChatOutcome::Skipped;
    };

    let history = match fetcher.fetch(&chat.chat_id, window.from_ts, run).await {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!("History fetch failed for chat {}: {e}", chat.chat_id);
            return ChatOutcome::Failed {
                chat_id: chat.chat_id.clone(),
                error: e.to_string(),
            };
        }
    };

    let in_window: Vec<Message> = history
        .messages
        .into_iter()
        .filter(|m| window.contains(m.created_at))
        .collect();

    match reduce_chat(operator, in_window, history.truncated) {
        Some(partial) => ChatOutcome::Stats(partial),
        None => ChatOutcome::Empty {
            truncated: history.truncated,
        },
    }
}
