//! Subscription manager for broadcasting row changes.

use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<StoreEvent>,
}

impl Subscription {
    /// Try to send an event. Returns false if the buffer is full or the
    /// receiver is gone.
    fn try_send(&self, event: StoreEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Manages subscriptions and broadcasts events.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(sub) = self.subscriptions.write().remove(&id) {
            // Best effort
            let _ = sub.sender.try_send(StoreEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Broadcast an upserted row to matching subscriptions.
    pub fn broadcast_upsert(&self, table: &str, pk: &str, row: &Value) {
        let event = StoreEvent::Upserted {
            table: table.to_string(),
            pk: pk.to_string(),
            row: row.clone(),
        };
        self.broadcast(table, event);
    }

    /// Broadcast a deleted row to matching subscriptions.
    pub fn broadcast_delete(&self, table: &str, pk: &str) {
        let event = StoreEvent::Deleted {
            table: table.to_string(),
            pk: pk.to_string(),
        };
        self.broadcast(table, event);
    }

    /// Drops subscribers that fail to receive.
    fn broadcast(&self, table: &str, event: StoreEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if sub.config.filter.matches_table(table) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    tracing::warn!(subscription = id.0, table, "dropping slow subscriber");
                    let _ = sub.sender.try_send(StoreEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
