//! Subscription types for store change feeds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for a subscription.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber; 0 is treated as 1.
    /// Default: 1000
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: SubscriptionFilter::default(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubscriptionFilter {
    /// Filter by table (None = all tables).
    pub tables: Option<Vec<String>>,
}

impl SubscriptionFilter {
    /// Subscribe to changes on specific tables.
    pub fn tables(tables: Vec<String>) -> Self {
        Self {
            tables: Some(tables),
        }
    }

    pub(crate) fn matches_table(&self, table: &str) -> bool {
        match self.tables {
            Some(ref tables) => tables.iter().any(|t| t == table),
            None => true,
        }
    }
}

/// Events emitted to subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A row was inserted or merged.
    Upserted {
        table: String,
        pk: String,
        /// Full row after the write.
        row: Value,
    },

    /// A row was deleted.
    Deleted { table: String, pk: String },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to receive a subscription's events.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<StoreEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<StoreEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<StoreEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<StoreEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
