//! Test support
//!
//! In-memory [`Transport`] for exercising executors without a database.
//! Responses are scripted up front and every call is recorded for
//! assertions afterwards.
//!
//! ```rust
//! use cypherkit_client::test_support::MockTransport;
//! use cypherkit_client::{QueryExecutor, Row};
//!
//! # async fn example() -> cypherkit_client::Result<()> {
//! let transport = MockTransport::new();
//! transport.push_rows(vec![Row::new().with("n", 1)]);
//!
//! let executor = QueryExecutor::new(transport.clone());
//! let rows = executor.execute("MATCH (n) RETURN n").await?;
//!
//! assert_eq!(rows.len(), 1);
//! assert_eq!(transport.queries()[0].text, "MATCH (n) RETURN n");
//! # Ok(())
//! # }
//! ```

use crate::error::TransportError;
use crate::transport::{QueryContext, Row, TransactionHandle, Transport};
use async_trait::async_trait;
use cypherkit_query::Params;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

// ============================================================================
// Recorded calls
// ============================================================================

/// Where a recorded query was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrigin {
    Connection,
    /// Index into [`MockTransport::transaction_events`]
    Transaction(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub text: String,
    pub params: Params,
    pub origin: QueryOrigin,
}

/// Per-transaction call log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxEvent {
    Query(String),
    Commit,
    Rollback,
}

// ============================================================================
// Mock Transport
// ============================================================================

#[derive(Default)]
struct MockState {
    responses: VecDeque<Result<Vec<Row>, TransportError>>,
    queries: Vec<RecordedQuery>,
    transactions: Vec<Vec<TxEvent>>,
    begin_error: Option<TransportError>,
    commit_error: Option<TransportError>,
    rollback_error: Option<TransportError>,
}

impl MockState {
    fn next_response(&mut self, text: &str, params: &Params, origin: QueryOrigin) -> Result<Vec<Row>, TransportError> {
        self.queries.push(RecordedQuery {
            text: text.to_string(),
            params: params.clone(),
            origin,
        });
        if let QueryOrigin::Transaction(index) = origin {
            self.transactions[index].push(TxEvent::Query(text.to_string()));
        }

        // Unscripted queries succeed with no rows
        self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Scriptable in-memory transport
///
/// Clones share state, so a test can keep one handle for assertions while
/// the executor owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue rows for the next query, on the connection or any transaction
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.state.lock().responses.push_back(Ok(rows));
    }

    /// Queue a failure for the next query
    pub fn push_error(&self, error: TransportError) {
        self.state.lock().responses.push_back(Err(error));
    }

    /// Make the next `begin_transaction` fail
    pub fn fail_begin(&self, error: TransportError) {
        self.state.lock().begin_error = Some(error);
    }

    /// Make the next commit fail
    pub fn fail_next_commit(&self, error: TransportError) {
        self.state.lock().commit_error = Some(error);
    }

    /// Make the next rollback fail
    pub fn fail_next_rollback(&self, error: TransportError) {
        self.state.lock().rollback_error = Some(error);
    }

    /// Every query issued so far, in order
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.state.lock().queries.clone()
    }

    /// Number of transactions begun
    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions.len()
    }

    /// Call log of the `index`th transaction begun
    pub fn transaction_events(&self, index: usize) -> Vec<TxEvent> {
        self.state
            .lock()
            .transactions
            .get(index)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryContext for MockTransport {
    async fn query(&self, text: &str, params: &Params) -> Result<Vec<Row>, TransportError> {
        self.state
            .lock()
            .next_response(text, params, QueryOrigin::Connection)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn begin_transaction(&self) -> Result<Arc<dyn TransactionHandle>, TransportError> {
        let mut state = self.state.lock();
        if let Some(error) = state.begin_error.take() {
            return Err(error);
        }

        state.transactions.push(Vec::new());
        Ok(Arc::new(MockTransaction {
            index: state.transactions.len() - 1,
            state: Arc::clone(&self.state),
        }))
    }
}

// ============================================================================
// Mock Transaction
// ============================================================================

struct MockTransaction {
    index: usize,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl QueryContext for MockTransaction {
    async fn query(&self, text: &str, params: &Params) -> Result<Vec<Row>, TransportError> {
        self.state
            .lock()
            .next_response(text, params, QueryOrigin::Transaction(self.index))
    }
}

#[async_trait]
impl TransactionHandle for MockTransaction {
    async fn commit(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.transactions[self.index].push(TxEvent::Commit);
        match state.commit_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn rollback(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.transactions[self.index].push(TxEvent::Rollback);
        match state.rollback_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Route `tracing` output through the test harness.
///
/// Honours `RUST_LOG`; safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let transport = MockTransport::new();
        transport.push_rows(vec![Row::new().with("a", 1)]);
        transport.push_error(TransportError::Query("second".into()));

        assert_eq!(transport.query("Q1", &Params::new()).await.unwrap().len(), 1);
        assert!(transport.query("Q2", &Params::new()).await.is_err());
        assert!(transport.query("Q3", &Params::new()).await.unwrap().is_empty());
        assert_eq!(transport.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_transaction_log() {
        let transport = MockTransport::new();
        let tx = transport.begin_transaction().await.unwrap();

        let mut params = Params::new();
        params.insert("p_0".to_string(), json!(1));
        tx.query("RETURN $p_0", &params).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(transport.transaction_count(), 1);
        assert_eq!(
            transport.transaction_events(0),
            vec![TxEvent::Query("RETURN $p_0".to_string()), TxEvent::Commit]
        );
        assert_eq!(transport.queries()[0].origin, QueryOrigin::Transaction(0));
    }

    #[tokio::test]
    async fn test_fail_begin_is_one_shot() {
        let transport = MockTransport::new();
        transport.fail_begin(TransportError::Connection("down".into()));

        assert!(transport.begin_transaction().await.is_err());
        assert!(transport.begin_transaction().await.is_ok());
        assert_eq!(transport.transaction_count(), 1);
    }
}
