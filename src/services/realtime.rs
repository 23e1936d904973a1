//! Realtime equipment change feed.
//!
//! Database triggers NOTIFY a JSON row image on every equipment write,
//! whichever process or tool made it. One listener task per process folds
//! each change into the allocation state and re-broadcasts it to SSE
//! subscribers. Notifications published while the connection is down are
//! gone for good, so every (re)connect schedules a full resync to cover the
//! gap.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::postgres::PgListener;
use sqlx::{Pool, Postgres};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::allocation::AllocationService;
use crate::models::EquipmentChange;

/// NOTIFY channel the equipment triggers publish on.
pub const EQUIPMENT_CHANNEL: &str = "equipment_changes";

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct RealtimeService {
    sender: broadcast::Sender<EquipmentChange>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeService {
    pub fn new(buffer: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer);
        Self {
            sender,
            listener: Mutex::new(None),
        }
    }

    /// Subscribe to the re-broadcast change feed. A slow consumer lags and
    /// misses changes rather than backpressuring the listener.
    pub fn subscribe(&self) -> broadcast::Receiver<EquipmentChange> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Start the background LISTEN task, replacing any previous one.
    pub fn start(&self, pool: Pool<Postgres>, allocation: Arc<AllocationService>) {
        let sender = self.sender.clone();
        let handle = tokio::spawn(async move {
            loop {
                let mut listener = match PgListener::connect_with(&pool).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        tracing::error!("change feed connect failed: {}", e);
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        continue;
                    }
                };
                if let Err(e) = listener.listen(EQUIPMENT_CHANNEL).await {
                    tracing::error!("LISTEN {} failed: {}", EQUIPMENT_CHANNEL, e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    continue;
                }
                tracing::info!("change feed listening on {}", EQUIPMENT_CHANNEL);
                allocation.schedule_resync();

                loop {
                    match listener.try_recv().await {
                        Ok(Some(notification)) => {
                            match serde_json::from_str::<EquipmentChange>(notification.payload()) {
                                Ok(change) => {
                                    allocation.apply_remote_change(&change);
                                    // No subscribers is fine.
                                    let _ = sender.send(change);
                                }
                                Err(e) => {
                                    tracing::warn!("unparsable change payload: {}", e);
                                }
                            }
                        }
                        // The connection dropped and was re-established;
                        // anything published in between was missed.
                        Ok(None) => {
                            tracing::warn!("change feed connection reset, scheduling resync");
                            allocation.schedule_resync();
                        }
                        Err(e) => {
                            tracing::error!("change feed lost: {}", e);
                            break;
                        }
                    }
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        });

        let mut slot = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Stop the listener task. Safe to call when it was never started.
    pub fn shutdown(&self) {
        let mut slot = self.listener.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = slot.take() {
            handle.abort();
            tracing::info!("change feed listener stopped");
        }
    }
}
