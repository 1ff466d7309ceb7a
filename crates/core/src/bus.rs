//! `job:progress:{job_id}` pub/sub channel bridging the pipeline runtime to
//! SSE subscribers. Keyed per job instead of a single process-wide channel
//! so an idle job's events don't compete with a busy one's.

use dashmap::DashMap;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

use crate::error::{CoreError, ErrorKind};
use crate::traits::{ProgressBus, ProgressEvent};

const CHANNEL_CAPACITY: usize = 256;

pub struct InProcessProgressBus {
    channels: DashMap<Uuid, broadcast::Sender<ProgressEvent>>,
}

impl InProcessProgressBus {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    fn sender_for(&self, job_id: Uuid) -> broadcast::Sender<ProgressEvent> {
        self.channels
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    pub fn subscribe(&self, job_id: Uuid) -> broadcast::Receiver<ProgressEvent> {
        self.sender_for(job_id).subscribe()
    }

    /// Drop the channel once the owning job is terminal; subscribers already
    /// holding a receiver keep draining it independently.
    pub fn retire(&self, job_id: Uuid) {
        self.channels.remove(&job_id);
    }
}

impl Default for InProcessProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ProgressBus for InProcessProgressBus {
    async fn publish(&self, job_id: Uuid, event: ProgressEvent) -> Result<(), CoreError> {
        let sender = self.sender_for(job_id);
        // No subscribers is a normal condition (nobody opened the SSE
        // stream yet) and must not fail the publishing stage.
        if sender.send(event).is_err() {
            warn!(%job_id, "progress event published with no subscribers");
        }
        Ok(())
    }

    async fn next_message(
        &self,
        job_id: Uuid,
        timeout: Duration,
    ) -> Result<Option<ProgressEvent>, CoreError> {
        let mut rx = self.subscribe(job_id);
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Ok(event)) => Ok(Some(event)),
            Ok(Err(broadcast::error::RecvError::Closed)) => Ok(None),
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => {
                // Publisher order is still preserved for messages that
                // survive; a lagged subscriber just missed the oldest ones.
                Ok(None)
            }
            Err(_elapsed) => Err(CoreError::new(ErrorKind::Timeout, "poll timed out")),
        }
    }
}
