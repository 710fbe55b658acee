//! Interceptor factory.
//!
//! Wraps a user handler into an [`Interceptor`] with a uniform return
//! contract and a mutation-isolation policy chosen at registration time:
//!
//! - **Keep** (default): the handler receives a deep copy of the message, so
//!   its edits are invisible to the caller and to later interceptors.
//! - **Mutate**: the handler receives the caller's message; edits are visible
//!   downstream and after the pass.
//!
//! # Example
//!
//! ```ignore
//! let interceptor = create_interceptor(
//!     |msg: &mut Message, _db: &MemoryStore, _table: &str, _pk: &str| {
//!         msg.data["seen"] = json!(true);
//!         ControlFlow::IGNORE_DEFAULT_DB_OPS
//!     },
//!     Flags::mutate(),
//! );
//! ```

use crate::control_flow::ControlFlow;
use crate::error::{Error, Result};
use crate::message::Message;
use serde::Deserialize;
use std::fmt;

/// Registration options for one handler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Flags {
    /// Hand the caller's message to the handler instead of a copy.
    /// Default: false
    pub mutate_message: bool,
}

impl Flags {
    /// Flags with `mutate_message` set.
    pub fn mutate() -> Self {
        Self {
            mutate_message: true,
        }
    }

    pub fn policy(&self) -> MessagePolicy {
        if self.mutate_message {
            MessagePolicy::Mutate
        } else {
            MessagePolicy::Keep
        }
    }
}

/// How an interceptor exposes the message to its handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessagePolicy {
    /// Handler sees a private deep copy.
    Keep,
    /// Handler sees the shared original.
    Mutate,
}

/// Conversion from a handler's return value into a control-flow decision.
///
/// `()` and `None` mean "no decision" and normalize to `PASS_THROUGH`.
/// An `Err` is the handler failing and aborts the pass.
pub trait IntoControlFlow {
    fn into_control_flow(self) -> Result<ControlFlow>;
}

impl IntoControlFlow for () {
    fn into_control_flow(self) -> Result<ControlFlow> {
        Ok(ControlFlow::PASS_THROUGH)
    }
}

impl IntoControlFlow for ControlFlow {
    fn into_control_flow(self) -> Result<ControlFlow> {
        Ok(self)
    }
}

impl IntoControlFlow for Option<ControlFlow> {
    fn into_control_flow(self) -> Result<ControlFlow> {
        Ok(self.unwrap_or(ControlFlow::PASS_THROUGH))
    }
}

impl<T, E> IntoControlFlow for std::result::Result<T, E>
where
    T: IntoControlFlow,
    E: Into<Error>,
{
    fn into_control_flow(self) -> Result<ControlFlow> {
        self.map_err(Into::into)?.into_control_flow()
    }
}

type Handler<S> = dyn Fn(&mut Message, &S, &str, &str) -> Result<ControlFlow> + Send + Sync;

/// A normalized handler: `(message, store, table_name, pk_name) -> ControlFlow`.
pub struct Interceptor<S: ?Sized> {
    policy: MessagePolicy,
    handler: Box<Handler<S>>,
}

impl<S: ?Sized> Interceptor<S> {
    /// Run the handler under this interceptor's policy.
    pub fn call(
        &self,
        message: &mut Message,
        store: &S,
        table_name: &str,
        pk_name: &str,
    ) -> Result<ControlFlow> {
        (self.handler)(message, store, table_name, pk_name)
    }

    pub fn policy(&self) -> MessagePolicy {
        self.policy
    }
}

impl<S: ?Sized> fmt::Debug for Interceptor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Wrap `user_fn` into an interceptor. `None` flags mean the defaults.
pub fn create_interceptor<S, F, R>(user_fn: F, flags: impl Into<Option<Flags>>) -> Interceptor<S>
where
    S: ?Sized,
    F: Fn(&mut Message, &S, &str, &str) -> R + Send + Sync + 'static,
    R: IntoControlFlow,
{
    let policy = flags.into().unwrap_or_default().policy();
    let handler = match policy {
        MessagePolicy::Keep => keep_message(user_fn),
        MessagePolicy::Mutate => mutate_message(user_fn),
    };

    Interceptor { policy, handler }
}

fn keep_message<S, F, R>(user_fn: F) -> Box<Handler<S>>
where
    S: ?Sized,
    F: Fn(&mut Message, &S, &str, &str) -> R + Send + Sync + 'static,
    R: IntoControlFlow,
{
    Box::new(
        move |message: &mut Message, store: &S, table_name: &str, pk_name: &str| {
            let mut copy = message.clone();
            user_fn(&mut copy, store, table_name, pk_name).into_control_flow()
        },
    )
}

fn mutate_message<S, F, R>(user_fn: F) -> Box<Handler<S>>
where
    S: ?Sized,
    F: Fn(&mut Message, &S, &str, &str) -> R + Send + Sync + 'static,
    R: IntoControlFlow,
{
    Box::new(
        move |message: &mut Message, store: &S, table_name: &str, pk_name: &str| {
            user_fn(message, store, table_name, pk_name).into_control_flow()
        },
    )
}
