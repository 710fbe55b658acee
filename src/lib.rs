//! # Push Mirror
//!
//! Mirrors server-pushed real-time events into a local reactive store.
//!
//! ## Core Concepts
//!
//! - **Interceptors**: User handlers that inspect or rewrite a push message
//!   before it reaches the store
//! - **Sequences**: Ordered interceptor chains, one per table
//! - **Control flow**: Bitflag outcomes deciding whether the chain stops
//!   early and whether the default store write happens
//! - **Dispatcher**: Routes messages to sequences and applies default writes
//!
//! ## Example
//!
//! ```ignore
//! use push_mirror::{ControlFlow, Dispatcher, Flags, MemoryStore, Message};
//!
//! let mut dispatcher = Dispatcher::new(Arc::new(MemoryStore::new()));
//! dispatcher.register_table("event", "_id");
//!
//! // Drop archived events before they are written
//! dispatcher.append("event", |msg: &mut Message, _db: &MemoryStore, _table: &str, _pk: &str| {
//!     if msg.data["isArchived"] == true {
//!         return ControlFlow::SHORT_CIRCUIT_AND_IGNORE_DEFAULT_DB_OPS;
//!     }
//!     ControlFlow::PASS_THROUGH
//! }, None)?;
//!
//! let outcome = dispatcher.dispatch(Message::from_slice(frame)?)?;
//! ```

pub mod control_flow;
pub mod dispatch;
pub mod error;
pub mod interceptor;
pub mod message;
pub mod sequence;
pub mod store;
pub mod subscriptions;

// Re-exports
pub use control_flow::ControlFlow;
pub use dispatch::{DispatchConfig, DispatchOutcome, Dispatcher};
pub use error::{Error, Result};
pub use interceptor::{create_interceptor, Flags, Interceptor, IntoControlFlow, MessagePolicy};
pub use message::{Message, Method};
pub use sequence::Sequence;
pub use store::{Database, MemoryStore};
pub use subscriptions::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
