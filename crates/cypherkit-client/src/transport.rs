//! Transport abstraction
//!
//! The driver that actually talks to the database is a collaborator. This
//! module defines the minimal contract the executors need from it:
//!
//! - `QueryContext::query()` - run one query, get rows back
//! - `Transport::begin_transaction()` - open a transaction handle
//! - `TransactionHandle::commit()` / `rollback()` - finish it
//!
//! Implementations must be Send + Sync to be shared across async boundaries.

use crate::error::TransportError;
use async_trait::async_trait;
use cypherkit_query::Params;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One result row: named columns holding opaque graph values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: IndexMap<String, Value>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Look up a column
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Remove and return a column
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.fields.shift_remove(name)
    }

    /// Column names in result order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert to a JSON object keyed by column name
    pub fn into_value(self) -> Value {
        Value::Object(self.fields.into_iter().collect())
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Anything that can execute a single query: a connection or a transaction
#[async_trait]
pub trait QueryContext: Send + Sync {
    /// Execute `text` with bound `params` and return the result rows in order
    async fn query(&self, text: &str, params: &Params) -> Result<Vec<Row>, TransportError>;
}

#[async_trait]
impl<C: QueryContext + ?Sized> QueryContext for Arc<C> {
    async fn query(&self, text: &str, params: &Params) -> Result<Vec<Row>, TransportError> {
        (**self).query(text, params).await
    }
}

/// A live transaction owned by the transaction executor
#[async_trait]
pub trait TransactionHandle: QueryContext {
    /// Make the transaction's writes durable
    async fn commit(&self) -> Result<(), TransportError>;

    /// Discard the transaction's writes
    async fn rollback(&self) -> Result<(), TransportError>;
}

/// A connection that can also open transactions
#[async_trait]
pub trait Transport: QueryContext {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Arc<dyn TransactionHandle>, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_preserves_column_order() {
        let row = Row::new().with("user", json!({"id": 1})).with("cart", 2);

        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["user", "cart"]);
        assert_eq!(row.get("cart"), Some(&json!(2)));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_row_into_value() {
        let row = Row::new().with("n", "x");

        assert_eq!(row.into_value(), json!({"n": "x"}));
    }

    #[test]
    fn test_row_serde_is_transparent() {
        let row: Row = serde_json::from_value(json!({"a": 1, "b": true})).unwrap();

        assert_eq!(row.get("b"), Some(&json!(true)));
        assert_eq!(serde_json::to_value(&row).unwrap(), json!({"a": 1, "b": true}));
    }
}
