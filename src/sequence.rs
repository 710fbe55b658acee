//! Ordered interceptor chain for one message category.

use crate::control_flow::ControlFlow;
use crate::error::Result;
use crate::interceptor::{create_interceptor, Flags, Interceptor, IntoControlFlow};
use crate::message::Message;
use std::fmt;

/// An append-only list of interceptors applied in registration order.
///
/// The last executed interceptor's outcome wins; outcomes are not OR-ed
/// together. Execution stops at the first outcome carrying `SHORT_CIRCUIT`.
pub struct Sequence<S: ?Sized> {
    interceptors: Vec<Interceptor<S>>,
}

impl<S: ?Sized> Sequence<S> {
    pub fn new() -> Self {
        Self {
            interceptors: Vec::new(),
        }
    }

    /// Wrap `user_fn` and append it. `None` flags mean the defaults.
    pub fn append<F, R>(&mut self, user_fn: F, flags: impl Into<Option<Flags>>)
    where
        F: Fn(&mut Message, &S, &str, &str) -> R + Send + Sync + 'static,
        R: IntoControlFlow,
    {
        self.interceptors.push(create_interceptor(user_fn, flags));
    }

    /// Append `user_fn` with default flags (keep-message policy).
    pub fn append_with_default_flags<F, R>(&mut self, user_fn: F)
    where
        F: Fn(&mut Message, &S, &str, &str) -> R + Send + Sync + 'static,
        R: IntoControlFlow,
    {
        self.append(user_fn, None);
    }

    /// Append an already-built interceptor.
    pub fn push(&mut self, interceptor: Interceptor<S>) {
        self.interceptors.push(interceptor);
    }

    /// Run every interceptor against `message` and return the final outcome.
    ///
    /// An interceptor error aborts the pass and is returned as-is.
    pub fn apply(
        &self,
        message: &mut Message,
        store: &S,
        table_name: &str,
        pk_name: &str,
    ) -> Result<ControlFlow> {
        let mut cf = ControlFlow::PASS_THROUGH;

        for (index, interceptor) in self.interceptors.iter().enumerate() {
            cf = interceptor.call(message, store, table_name, pk_name)?;

            tracing::trace!(
                table = table_name,
                index,
                control_flow = cf.bits(),
                "interceptor ran"
            );

            if cf.is_short_circuit() {
                tracing::debug!(
                    table = table_name,
                    index,
                    skipped = self.interceptors.len() - index - 1,
                    "interceptor short-circuited sequence"
                );
                break;
            }
        }

        Ok(cf)
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl<S: ?Sized> Default for Sequence<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized> fmt::Debug for Sequence<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("interceptors", &self.interceptors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn make_message() -> Message {
        Message::new("change", "1234567890", "event", json!({ "key": "value" }))
    }

    fn trans_data_key(msg: &mut Message, _: &(), _: &str, _: &str) {
        msg.data["key"] = json!("hello");
    }

    fn trans_type(msg: &mut Message, _: &(), _: &str, _: &str) {
        msg.event_type = "Event".to_string();
    }

    fn apply(seq: &Sequence<()>, msg: &mut Message) -> ControlFlow {
        seq.apply(msg, &(), "events", "_id").unwrap()
    }

    #[test]
    fn test_empty_sequence_passes_through() {
        let seq = Sequence::<()>::new();
        let mut msg = make_message();
        let before = msg.clone();

        assert!(seq.is_empty());
        assert_eq!(apply(&seq, &mut msg), ControlFlow::PASS_THROUGH);
        assert_eq!(msg, before);
    }

    #[test]
    fn test_pass_through_without_mutation() {
        let mut seq = Sequence::new();
        seq.append(trans_data_key, None);
        seq.append(trans_type, None);
        let mut msg = make_message();
        let before = msg.clone();

        assert_eq!(seq.len(), 2);
        assert_eq!(apply(&seq, &mut msg), ControlFlow::PASS_THROUGH);
        assert_eq!(msg, before);
    }

    #[test]
    fn test_pass_through_with_mutation() {
        let mut seq = Sequence::new();
        seq.append(trans_data_key, Flags::mutate());
        seq.append(trans_type, Flags::mutate());
        let mut msg = make_message();
        let before = msg.clone();

        assert_eq!(apply(&seq, &mut msg), ControlFlow::PASS_THROUGH);
        assert_eq!(msg.event_type, "Event");
        assert_eq!(msg.data["key"], "hello");

        msg.event_type = "event".to_string();
        msg.data["key"] = json!("value");
        assert_eq!(msg, before);
    }

    #[test]
    fn test_short_circuit_stops_sequence() {
        let mut seq = Sequence::new();
        seq.append(
            |msg: &mut Message, db: &(), table: &str, pk: &str| {
                trans_data_key(msg, db, table, pk);
                ControlFlow::SHORT_CIRCUIT
            },
            Flags::mutate(),
        );
        seq.append(trans_type, Flags::mutate());
        let mut msg = make_message();

        assert_eq!(apply(&seq, &mut msg), ControlFlow::SHORT_CIRCUIT);
        assert_eq!(msg.data["key"], "hello");
        assert_eq!(msg.event_type, "event");
    }

    #[test]
    fn test_short_circuit_and_ignore_default_db_ops() {
        let mut seq = Sequence::new();
        seq.append(
            |msg: &mut Message, db: &(), table: &str, pk: &str| {
                trans_data_key(msg, db, table, pk);
                ControlFlow::SHORT_CIRCUIT_AND_IGNORE_DEFAULT_DB_OPS
            },
            Flags::mutate(),
        );
        seq.append(trans_type, Flags::mutate());
        let mut msg = make_message();

        let cf = apply(&seq, &mut msg);
        assert_eq!(cf, ControlFlow::SHORT_CIRCUIT_AND_IGNORE_DEFAULT_DB_OPS);
        assert!(cf.is_short_circuit());
        assert!(cf.ignores_default_db_ops());
        assert_eq!(msg.data["key"], "hello");
        assert_eq!(msg.event_type, "event");
    }

    #[test]
    fn test_last_outcome_wins() {
        let mut seq = Sequence::new();
        seq.append(
            |_: &mut Message, _: &(), _: &str, _: &str| ControlFlow::IGNORE_DEFAULT_DB_OPS,
            None,
        );
        seq.append(
            |_: &mut Message, _: &(), _: &str, _: &str| ControlFlow::PASS_THROUGH,
            None,
        );

        assert_eq!(apply(&seq, &mut make_message()), ControlFlow::PASS_THROUGH);
    }

    #[test]
    fn test_earlier_signal_kept_when_last() {
        let mut seq = Sequence::new();
        seq.append(|_: &mut Message, _: &(), _: &str, _: &str| {}, None);
        seq.append(
            |_: &mut Message, _: &(), _: &str, _: &str| ControlFlow::IGNORE_DEFAULT_DB_OPS,
            None,
        );

        assert_eq!(
            apply(&seq, &mut make_message()),
            ControlFlow::IGNORE_DEFAULT_DB_OPS
        );
    }

    #[test]
    fn test_error_aborts_sequence() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut seq = Sequence::new();
        seq.append(
            |_: &mut Message, _: &(), _: &str, _: &str| -> Result<ControlFlow> {
                Err(Error::handler("bad payload"))
            },
            None,
        );
        let counter = Arc::clone(&calls);
        seq.append(
            move |_: &mut Message, _: &(), _: &str, _: &str| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            None,
        );

        let result = seq.apply(&mut make_message(), &(), "events", "_id");
        assert!(matches!(result, Err(Error::Handler(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_append_with_default_flags_keeps_message() {
        let mut seq = Sequence::new();
        seq.append_with_default_flags(trans_data_key);
        let mut msg = make_message();
        let before = msg.clone();

        assert_eq!(apply(&seq, &mut msg), ControlFlow::PASS_THROUGH);
        assert_eq!(msg, before);
    }

    #[test]
    fn test_push_prebuilt_interceptor() {
        let mut seq = Sequence::new();
        seq.push(create_interceptor(
            |msg: &mut Message, db: &(), table: &str, pk: &str| {
                trans_type(msg, db, table, pk);
                ControlFlow::IGNORE_DEFAULT_DB_OPS
            },
            Flags::mutate(),
        ));
        let mut msg = make_message();

        assert_eq!(seq.len(), 1);
        assert_eq!(apply(&seq, &mut msg), ControlFlow::IGNORE_DEFAULT_DB_OPS);
        assert_eq!(msg.event_type, "Event");
    }

    #[test]
    fn test_keep_copies_do_not_leak_between_interceptors() {
        let mut seq = Sequence::new();
        seq.append(trans_data_key, None);
        seq.append(
            |msg: &mut Message, _: &(), _: &str, _: &str| {
                assert_eq!(msg.data["key"], "value");
            },
            None,
        );
        apply(&seq, &mut make_message());
    }
}
