use crate::domain::model::StreamUpdate;
use crate::domain::ports::MarketplaceApi;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What the poller currently knows about a stream.
///
/// A failed poll leaves `latest` alone and only sets `last_error`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollState {
    pub latest: Option<StreamUpdate>,
    pub last_error: Option<String>,
    pub successes: u64,
    pub failures: u64,
}

/// Periodically refreshes a stream in the background.
///
/// Every tick starts its own request; requests are not deduplicated and
/// whichever one finishes last wins. Dropping the poller cancels the tick
/// loop and all requests still in flight.
pub struct StreamPoller {
    stream_id: String,
    state: watch::Receiver<PollState>,
    task: JoinHandle<()>,
}

impl StreamPoller {
    pub fn spawn(api: Arc<dyn MarketplaceApi>, stream_id: impl Into<String>, period: Duration) -> Self {
        let stream_id = stream_id.into();
        let (tx, rx) = watch::channel(PollState::default());
        let task = tokio::spawn(poll_loop(api, stream_id.clone(), period, Arc::new(tx)));
        tracing::info!("Polling stream {} every {:?}", stream_id, period);
        Self {
            stream_id,
            state: rx,
            task,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// A receiver that is notified on every poll outcome.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for StreamPoller {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!("Stopped polling stream {}", self.stream_id);
    }
}

async fn poll_loop(
    api: Arc<dyn MarketplaceApi>,
    stream_id: String,
    period: Duration,
    tx: Arc<watch::Sender<PollState>>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let api = api.clone();
                let stream_id = stream_id.clone();
                let tx = tx.clone();
                in_flight.spawn(async move {
                    let outcome = api.get_stream(&stream_id).await;
                    tx.send_modify(|state| match outcome {
                        Ok(snapshot) => {
                            state.latest = Some(StreamUpdate {
                                snapshot,
                                received_at: Utc::now(),
                            });
                            state.last_error = None;
                            state.successes += 1;
                        }
                        Err(e) => {
                            tracing::warn!("Polling stream {} failed: {}", stream_id, e);
                            state.last_error = Some(e.to_string());
                            state.failures += 1;
                        }
                    });
                });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!("Stream poll task panicked: {}", e);
                    }
                }
            }
            _ = tx.closed() => break,
        }
    }
}
