//! Change feeds for the in-memory store.
//!
//! Subscribers receive an event for every row written to the tables they
//! watch. Buffers are bounded; a subscriber that falls behind is dropped.
//!
//! # Example
//!
//! ```ignore
//! let handle = store.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::tables(vec!["events".to_string()]),
//!     ..Default::default()
//! });
//!
//! while let Ok(event) = handle.recv() {
//!     match event {
//!         StoreEvent::Upserted { pk, row, .. } => println!("{pk}: {row}"),
//!         StoreEvent::Deleted { pk, .. } => println!("{pk} deleted"),
//!         StoreEvent::Dropped { .. } => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
