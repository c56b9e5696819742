//! # cypherkit-client
//!
//! Executes [`cypherkit_query`] fragments against a pluggable graph
//! transport.
//!
//! ## Components
//!
//! - **[`QueryExecutor`]**: runs fragments, raw text, or
//!   [`computation`]s against one connection or transaction
//! - **[`TransactionExecutor`]**: brackets a body with begin/commit and
//!   rolls back on failure
//! - **[`Pipe`]**: lazily linked chains of query and function steps
//! - **[`Repository`]**: label-bound query helpers with node mapping
//!
//! The database driver is injected through the [`Transport`] trait; the
//! crate never opens connections itself.
//!
//! ## Usage
//!
//! ```rust
//! use cypherkit_client::test_support::MockTransport;
//! use cypherkit_client::{computation, QueryExecutor, TransactionExecutor};
//! use cypherkit_query::cypher;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transactions = TransactionExecutor::new(MockTransport::new());
//!
//! transactions
//!     .execute_transaction(computation(|exec: QueryExecutor| async move {
//!         exec.execute(cypher!("CREATE (:User {{email: {}}})", "a@x")).await?;
//!         exec.execute(cypher!("CREATE (:Cart {{owner: {}}})", "a@x")).await?;
//!         Ok(())
//!     }))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod pipe;
pub mod repository;
pub mod transaction;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use config::{ClientConfig, LoggingConfig, RenderConfig};
pub use error::{ConfigError, Error, Result, TransactionError, TransportError};
pub use executor::{computation, Computation, Executable, QueryExecutor};
pub use pipe::{run_chain, Pipe, QueryDefinition};
pub use repository::{LabelRepository, NodeMapper, Repository, SerdeMapper, NODE_COLUMN};
pub use transaction::{TransactionExecutor, TransactionState};
pub use transport::{QueryContext, Row, TransactionHandle, Transport};

pub use cypherkit_query;
