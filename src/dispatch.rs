//! Dispatch layer: routes push messages through per-table interceptor
//! sequences and applies the default store write unless suppressed.

use crate::control_flow::ControlFlow;
use crate::error::{Error, Result};
use crate::interceptor::{Flags, IntoControlFlow};
use crate::message::{Message, Method};
use crate::sequence::Sequence;
use crate::store::Database;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatcher configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Flags used by [`Dispatcher::append`] when the caller passes `None`.
    pub default_flags: Flags,

    /// Match message types to table names ignoring ASCII case.
    /// Default: true
    pub type_case_insensitive: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_flags: Flags::default(),
            type_case_insensitive: true,
        }
    }
}

/// Result of dispatching one message.
#[derive(Clone, Debug)]
pub struct DispatchOutcome {
    /// Final decision of the table's sequence.
    pub control_flow: ControlFlow,

    /// Default write that was applied, if any.
    pub applied: Option<Method>,

    /// The message after interception (reflects mutating interceptors).
    pub message: Message,
}

struct Route<D: ?Sized> {
    table: String,
    pk_name: String,
    sequence: Sequence<D>,
}

/// Routes messages to per-table interceptor sequences.
pub struct Dispatcher<D: Database + ?Sized> {
    store: Arc<D>,
    config: DispatchConfig,
    routes: HashMap<String, Route<D>>,
}

impl<D: Database + ?Sized> Dispatcher<D> {
    pub fn new(store: Arc<D>) -> Self {
        Self::with_config(store, DispatchConfig::default())
    }

    pub fn with_config(store: Arc<D>, config: DispatchConfig) -> Self {
        Self {
            store,
            config,
            routes: HashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<D> {
        &self.store
    }

    /// Register a table; messages whose type names it are routed here.
    /// Re-registering replaces the primary key name and keeps interceptors.
    pub fn register_table(&mut self, table: impl Into<String>, pk_name: impl Into<String>) {
        let table = table.into();
        let pk_name = pk_name.into();
        let key = self.route_key(&table);

        match self.routes.get_mut(&key) {
            Some(route) => route.pk_name = pk_name,
            None => {
                self.routes.insert(
                    key,
                    Route {
                        table,
                        pk_name,
                        sequence: Sequence::new(),
                    },
                );
            }
        }
    }

    /// The interceptor sequence for `table`.
    pub fn interceptors(&mut self, table: &str) -> Option<&mut Sequence<D>> {
        let key = self.route_key(table);
        self.routes.get_mut(&key).map(|route| &mut route.sequence)
    }

    /// Append an interceptor to `table`'s sequence. `None` flags fall back
    /// to the configured defaults.
    pub fn append<F, R>(
        &mut self,
        table: &str,
        user_fn: F,
        flags: impl Into<Option<Flags>>,
    ) -> Result<()>
    where
        F: Fn(&mut Message, &D, &str, &str) -> R + Send + Sync + 'static,
        R: IntoControlFlow,
    {
        let flags = flags.into().unwrap_or(self.config.default_flags);
        let sequence = self
            .interceptors(table)
            .ok_or_else(|| Error::UnknownTable(table.to_string()))?;
        sequence.append(user_fn, flags);
        Ok(())
    }

    /// Decode a raw JSON envelope and dispatch it.
    pub fn dispatch_slice(&self, bytes: &[u8]) -> Result<DispatchOutcome> {
        self.dispatch(Message::from_slice(bytes)?)
    }

    /// Run the table's interceptors, then apply the default write unless an
    /// interceptor set `IGNORE_DEFAULT_DB_OPS`.
    pub fn dispatch(&self, mut message: Message) -> Result<DispatchOutcome> {
        let route = self
            .routes
            .get(&self.route_key(&message.event_type))
            .ok_or_else(|| Error::UnknownTable(message.event_type.clone()))?;

        let control_flow =
            route
                .sequence
                .apply(&mut message, &*self.store, &route.table, &route.pk_name)?;

        if control_flow.ignores_default_db_ops() {
            tracing::debug!(
                table = %route.table,
                id = %message.id,
                method = %message.method,
                "default db ops suppressed by interceptor"
            );
            return Ok(DispatchOutcome {
                control_flow,
                applied: None,
                message,
            });
        }

        let applied = match message.method_kind() {
            Method::Upsert => {
                let row = row_for(&message, &route.pk_name)?;
                self.store.upsert(&route.table, &route.pk_name, row)?;
                Some(Method::Upsert)
            }
            Method::Delete => {
                self.store.delete(&route.table, &message.id)?;
                Some(Method::Delete)
            }
            Method::Other => None,
        };

        tracing::debug!(
            table = %route.table,
            id = %message.id,
            method = %message.method,
            applied = ?applied,
            "dispatched push message"
        );

        Ok(DispatchOutcome {
            control_flow,
            applied,
            message,
        })
    }

    fn route_key(&self, name: &str) -> String {
        if self.config.type_case_insensitive {
            name.to_ascii_lowercase()
        } else {
            name.to_string()
        }
    }
}

/// Row to write for an upsert: the payload with the primary key filled in
/// from the message id when missing.
///
/// A scalar payload key must read the same as the message id, otherwise a
/// later delete by id would miss the row.
fn row_for(message: &Message, pk_name: &str) -> Result<Value> {
    let mut fields = match &message.data {
        Value::Object(fields) => fields.clone(),
        Value::Null => serde_json::Map::new(),
        other => {
            return Err(Error::InvalidMessage(format!(
                "expected object payload for {}, got {}",
                message.method, other
            )))
        }
    };

    let payload_pk = match fields.get(pk_name) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    if let Some(pk) = payload_pk {
        if pk != message.id {
            return Err(Error::InvalidMessage(format!(
                "payload {} {:?} does not match message id {:?}",
                pk_name, pk, message.id
            )));
        }
    }

    fields
        .entry(pk_name.to_string())
        .or_insert_with(|| Value::String(message.id.clone()));

    Ok(Value::Object(fields))
}
