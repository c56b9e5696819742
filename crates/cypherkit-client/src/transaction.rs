//! Transaction executor
//!
//! Brackets a body (a single query or a [`Computation`](crate::Computation))
//! with begin/commit, and rolls back when the body or the commit fails.
//!
//! ## Lifecycle
//!
//! ```text
//!  begin ──> Open ──commit──> Pending ──ok──> Committed
//!             │                  │
//!             │ failure          │ commit failed
//!             v                  v
//!          rollback ─────────────┘──ok──> RolledBack
//!             │
//!             └──rollback failed──> Failed
//! ```
//!
//! Every begun transaction settles in exactly one terminal state before
//! `execute_transaction` returns. The original failure is always the error
//! that is returned; a rollback failure is attached to it, never substituted.
//! The settled state is reported by [`TransactionError::state`].
//!
//! If the `execute_transaction` future is dropped before it settles (for
//! example by `tokio::time::timeout`), a rollback is spawned onto the current
//! tokio runtime.

use crate::config::ClientConfig;
use crate::error::{TransactionError, TransportError};
use crate::executor::{Executable, QueryExecutor};
use crate::transport::{TransactionHandle, Transport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

/// Lifecycle state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Begun, no commit attempted
    Open,
    /// Commit in flight or unacknowledged
    Pending,
    /// Commit acknowledged
    Committed,
    /// Rollback acknowledged
    RolledBack,
    /// Rollback itself failed
    Failed,
}

impl TransactionState {
    /// Whether the transaction still needs a commit or rollback
    pub fn is_active(self) -> bool {
        matches!(self, TransactionState::Open | TransactionState::Pending)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionState::Open => "open",
            TransactionState::Pending => "pending",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled_back",
            TransactionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A begun transaction and the state machine guarding it
pub(crate) struct Transaction {
    id: Uuid,
    handle: Arc<dyn TransactionHandle>,
    state: TransactionState,
}

impl Transaction {
    pub(crate) fn new(handle: Arc<dyn TransactionHandle>) -> Self {
        Self {
            id: Uuid::new_v4(),
            handle,
            state: TransactionState::Open,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn state(&self) -> TransactionState {
        self.state
    }

    pub(crate) fn handle(&self) -> Arc<dyn TransactionHandle> {
        Arc::clone(&self.handle)
    }

    /// `Open -> Pending -> Committed`. A failed commit stays `Pending`.
    pub(crate) async fn commit(&mut self) -> Result<(), TransportError> {
        if self.state != TransactionState::Open {
            return Err(TransportError::Transaction(format!(
                "cannot commit a transaction that is {}",
                self.state
            )));
        }

        self.state = TransactionState::Pending;
        self.handle.commit().await?;
        self.state = TransactionState::Committed;
        debug!("Transaction committed");
        Ok(())
    }

    /// `Open|Pending -> RolledBack`, or `Failed` if the driver rollback fails.
    /// No-op once terminal.
    pub(crate) async fn rollback(&mut self) -> Result<(), TransportError> {
        if self.state.is_terminal() {
            debug!(state = %self.state, "Skipping rollback of settled transaction");
            return Ok(());
        }

        match self.handle.rollback().await {
            Ok(()) => {
                self.state = TransactionState::RolledBack;
                debug!("Transaction rolled back");
                Ok(())
            }
            Err(err) => {
                self.state = TransactionState::Failed;
                Err(err)
            }
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        let id = self.id;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                warn!(%id, state = %self.state, "Transaction dropped before settling, rolling back");
                let handle = Arc::clone(&self.handle);
                runtime.spawn(async move {
                    match handle.rollback().await {
                        Ok(()) => debug!(%id, "Abandoned transaction rolled back"),
                        Err(err) => warn!(%id, error = %err, "Rollback of abandoned transaction failed"),
                    }
                });
            }
            Err(_) => {
                warn!(%id, state = %self.state, "Transaction dropped outside a tokio runtime, left open");
            }
        }
    }
}

/// Runs bodies inside transactions opened on a transport
#[derive(Clone)]
pub struct TransactionExecutor {
    transport: Arc<dyn Transport>,
    template: QueryExecutor,
}

impl fmt::Debug for TransactionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionExecutor")
            .field("executor", &self.template)
            .finish()
    }
}

impl TransactionExecutor {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        let template = QueryExecutor::from_shared(Arc::new(Arc::clone(&transport)));
        Self {
            transport,
            template,
        }
    }

    /// Apply render and logging settings to the executors handed to bodies
    pub fn with_config(mut self, config: &ClientConfig) -> Self {
        self.template = self.template.with_config(config);
        self
    }

    /// Executor on the bare connection, outside any transaction
    pub fn connection(&self) -> &QueryExecutor {
        &self.template
    }

    /// Run `body` in a fresh transaction and commit it.
    ///
    /// On failure the transaction is rolled back (if still active) and the
    /// original error is returned.
    pub async fn execute_transaction<E: Executable>(
        &self,
        body: E,
    ) -> Result<E::Output, TransactionError> {
        let handle = self
            .transport
            .begin_transaction()
            .await
            .map_err(TransactionError::Begin)?;
        let mut transaction = Transaction::new(handle);
        let span = info_span!("transaction", id = %transaction.id());

        async move {
            debug!("Transaction begun");
            let executor = self.template.rebind(Arc::new(transaction.handle()));

            let failure = match executor.execute(body).await {
                Ok(output) => match transaction.commit().await {
                    Ok(()) => return Ok(output),
                    Err(source) => TransactionError::Commit {
                        source,
                        rollback: None,
                        state: transaction.state(),
                    },
                },
                Err(source) => TransactionError::Query {
                    source,
                    rollback: None,
                    state: transaction.state(),
                },
            };

            warn!(state = %transaction.state(), error = %failure, "Transaction failed, rolling back");
            let rollback = match transaction.rollback().await {
                Ok(()) => None,
                Err(err) => {
                    warn!(error = %err, "Rollback failed");
                    Some(err)
                }
            };

            Err(failure.settle(rollback, transaction.state()))
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockTransport, TxEvent};
    use test_case::test_case;

    async fn begin(transport: &MockTransport) -> Transaction {
        Transaction::new(transport.begin_transaction().await.unwrap())
    }

    #[tokio::test]
    async fn test_commit_transitions() {
        let transport = MockTransport::new();
        let mut tx = begin(&transport).await;
        assert_eq!(tx.state(), TransactionState::Open);

        tx.commit().await.unwrap();

        assert_eq!(tx.state(), TransactionState::Committed);
        assert_eq!(transport.transaction_events(0), vec![TxEvent::Commit]);
    }

    #[tokio::test]
    async fn test_failed_commit_stays_pending() {
        let transport = MockTransport::new();
        transport.fail_next_commit(TransportError::Transaction("conflict".into()));
        let mut tx = begin(&transport).await;

        assert!(tx.commit().await.is_err());
        assert_eq!(tx.state(), TransactionState::Pending);

        tx.rollback().await.unwrap();
        assert_eq!(tx.state(), TransactionState::RolledBack);
    }

    #[tokio::test]
    async fn test_rollback_after_commit_is_noop() {
        let transport = MockTransport::new();
        let mut tx = begin(&transport).await;
        tx.commit().await.unwrap();

        tx.rollback().await.unwrap();

        assert_eq!(tx.state(), TransactionState::Committed);
        assert_eq!(transport.transaction_events(0), vec![TxEvent::Commit]);
    }

    #[tokio::test]
    async fn test_failed_rollback_is_terminal() {
        let transport = MockTransport::new();
        transport.fail_next_rollback(TransportError::Connection("lost".into()));
        let mut tx = begin(&transport).await;

        assert!(tx.rollback().await.is_err());
        assert_eq!(tx.state(), TransactionState::Failed);
        assert!(tx.commit().await.is_err());
        assert_eq!(tx.state(), TransactionState::Failed);
    }

    #[test_case(TransactionState::Open, true, "open")]
    #[test_case(TransactionState::Pending, true, "pending")]
    #[test_case(TransactionState::Committed, false, "committed")]
    #[test_case(TransactionState::RolledBack, false, "rolled_back")]
    #[test_case(TransactionState::Failed, false, "failed")]
    fn test_state_classification(state: TransactionState, active: bool, name: &str) {
        assert_eq!(state.is_active(), active);
        assert_eq!(state.is_terminal(), !active);
        assert_eq!(state.to_string(), name);
    }

    #[tokio::test]
    async fn test_dropped_open_transaction_rolls_back() {
        let transport = MockTransport::new();
        let tx = begin(&transport).await;

        drop(tx);
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(transport.transaction_events(0), vec![TxEvent::Rollback]);
    }

    #[tokio::test]
    async fn test_dropped_settled_transaction_is_left_alone() {
        let transport = MockTransport::new();
        let mut tx = begin(&transport).await;
        tx.commit().await.unwrap();

        drop(tx);
        tokio::task::yield_now().await;

        assert_eq!(transport.transaction_events(0), vec![TxEvent::Commit]);
    }

    #[tokio::test]
    async fn test_error_reports_settled_state() {
        let transport = MockTransport::new();
        transport.push_error(TransportError::Query("boom".into()));
        let executor = TransactionExecutor::new(transport.clone());

        let err = executor.execute_transaction("RETURN 1").await.unwrap_err();

        assert_eq!(err.state(), Some(TransactionState::RolledBack));
    }
}
