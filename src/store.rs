//! Local store boundary and an in-memory reactive implementation.

use crate::error::{Error, Result};
use crate::subscriptions::{
    SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Store operations the dispatch layer and interceptors rely on.
///
/// Rows are JSON objects keyed by the value of their primary-key field.
pub trait Database: Send + Sync {
    /// Fetch a row by primary key.
    fn get(&self, table: &str, pk: &str) -> Result<Option<Value>>;

    /// Insert `row`, or merge its fields into the existing row with the same
    /// key. Returns the row as stored.
    fn upsert(&self, table: &str, pk_name: &str, row: Value) -> Result<Value>;

    /// Delete a row. Returns whether it existed.
    fn delete(&self, table: &str, pk: &str) -> Result<bool>;
}

type Table = HashMap<String, Value>;

/// In-memory store with change feeds.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,

    subscriptions: SubscriptionManager,

    /// Serializes write-then-broadcast so subscribers see writes in order.
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            subscriptions: SubscriptionManager::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, HashMap::len)
    }

    /// Subscribe to row changes.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.subscriptions.subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Database for MemoryStore {
    fn get(&self, table: &str, pk: &str) -> Result<Option<Value>> {
        Ok(self
            .tables
            .read()
            .get(table)
            .and_then(|rows| rows.get(pk))
            .cloned())
    }

    fn upsert(&self, table: &str, pk_name: &str, row: Value) -> Result<Value> {
        let Value::Object(fields) = row else {
            return Err(Error::MissingPrimaryKey {
                table: table.to_string(),
                pk_name: pk_name.to_string(),
            });
        };
        let pk = primary_key(&fields, pk_name).ok_or_else(|| Error::MissingPrimaryKey {
            table: table.to_string(),
            pk_name: pk_name.to_string(),
        })?;

        let _lock = self.write_lock.lock();

        let stored = {
            let mut tables = self.tables.write();
            let rows = tables.entry(table.to_string()).or_default();
            let stored = match rows.remove(&pk) {
                Some(Value::Object(mut existing)) => {
                    existing.extend(fields);
                    Value::Object(existing)
                }
                _ => Value::Object(fields),
            };
            rows.insert(pk.clone(), stored.clone());
            stored
        };

        self.subscriptions.broadcast_upsert(table, &pk, &stored);
        Ok(stored)
    }

    fn delete(&self, table: &str, pk: &str) -> Result<bool> {
        let _lock = self.write_lock.lock();

        let existed = self
            .tables
            .write()
            .get_mut(table)
            .and_then(|rows| rows.remove(pk))
            .is_some();

        if existed {
            self.subscriptions.broadcast_delete(table, pk);
        }
        Ok(existed)
    }
}

/// Primary key as a string; numeric keys are accepted.
fn primary_key(fields: &Map<String, Value>, pk_name: &str) -> Option<String> {
    match fields.get(pk_name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
