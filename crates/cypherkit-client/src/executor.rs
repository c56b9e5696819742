//! Query executor
//!
//! A [`QueryExecutor`] is bound to one transport context (a connection or a
//! transaction handle) for its whole life. Anything implementing
//! [`Executable`] can be run through it:
//!
//! - fragments, rendered queries, and raw text cost exactly one transport
//!   call and yield the result rows;
//! - a [`Computation`] receives the executor itself and may issue any number
//!   of further queries against the same context; the executor adds no
//!   transport call of its own.
//!
//! The executor never mutates its input and never retries.

use crate::config::{ClientConfig, LoggingConfig};
use crate::error::Result;
use crate::transport::{QueryContext, Row};
use async_trait::async_trait;
use cypherkit_query::{CypherQuery, RenderOptions, RenderedQuery};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Executes queries against a single bound context
#[derive(Clone)]
pub struct QueryExecutor {
    context: Arc<dyn QueryContext>,
    render: RenderOptions,
    logging: LoggingConfig,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("render", &self.render)
            .field("logging", &self.logging)
            .finish()
    }
}

impl QueryExecutor {
    /// Bind an executor to a connection or transaction
    pub fn new(context: impl QueryContext + 'static) -> Self {
        Self::from_shared(Arc::new(context))
    }

    /// Bind to an already shared context
    pub fn from_shared(context: Arc<dyn QueryContext>) -> Self {
        Self {
            context,
            render: RenderOptions::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Apply render and logging settings
    pub fn with_config(mut self, config: &ClientConfig) -> Self {
        self.render = config.render.options();
        self.logging = config.logging.clone();
        self
    }

    pub fn with_render_options(mut self, options: RenderOptions) -> Self {
        self.render = options;
        self
    }

    pub fn render_options(&self) -> &RenderOptions {
        &self.render
    }

    /// Rebind the same settings to another context
    pub(crate) fn rebind(&self, context: Arc<dyn QueryContext>) -> Self {
        Self {
            context,
            render: self.render.clone(),
            logging: self.logging.clone(),
        }
    }

    /// Run a query or computation against the bound context
    pub async fn execute<E: Executable>(&self, input: E) -> Result<E::Output> {
        input.execute_on(self).await
    }

    /// Render a fragment with this executor's options
    pub fn render(&self, query: &CypherQuery) -> RenderedQuery {
        query.render_with(&self.render)
    }

    /// Issue exactly one transport call
    pub async fn execute_rendered(&self, query: &RenderedQuery) -> Result<Vec<Row>> {
        if self.logging.log_queries {
            debug!(query = %query.text, params = query.params.len(), "Executing query");
        }

        let started = Instant::now();
        let result = self.context.query(&query.text, &query.params).await;
        let elapsed = started.elapsed();

        if let Some(threshold) = self.logging.slow_query_threshold() {
            if elapsed > threshold {
                warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    query = %query.text,
                    "Slow query"
                );
            }
        }

        match result {
            Ok(rows) => {
                debug!(rows = rows.len(), "Query completed");
                Ok(rows)
            }
            Err(err) => {
                debug!(error = %err, "Query failed");
                Err(err.into())
            }
        }
    }
}

/// Input accepted by [`QueryExecutor::execute`]
#[async_trait]
pub trait Executable: Send {
    type Output: Send;

    async fn execute_on(self, executor: &QueryExecutor) -> Result<Self::Output>;
}

#[async_trait]
impl Executable for CypherQuery {
    type Output = Vec<Row>;

    async fn execute_on(self, executor: &QueryExecutor) -> Result<Vec<Row>> {
        let rendered = executor.render(&self);
        executor.execute_rendered(&rendered).await
    }
}

#[async_trait]
impl<'q> Executable for &'q CypherQuery {
    type Output = Vec<Row>;

    async fn execute_on(self, executor: &QueryExecutor) -> Result<Vec<Row>> {
        let rendered = executor.render(self);
        executor.execute_rendered(&rendered).await
    }
}

#[async_trait]
impl Executable for RenderedQuery {
    type Output = Vec<Row>;

    async fn execute_on(self, executor: &QueryExecutor) -> Result<Vec<Row>> {
        executor.execute_rendered(&self).await
    }
}

#[async_trait]
impl Executable for String {
    type Output = Vec<Row>;

    async fn execute_on(self, executor: &QueryExecutor) -> Result<Vec<Row>> {
        executor.execute_rendered(&RenderedQuery::raw(self)).await
    }
}

#[async_trait]
impl<'q> Executable for &'q str {
    type Output = Vec<Row>;

    async fn execute_on(self, executor: &QueryExecutor) -> Result<Vec<Row>> {
        executor.execute_rendered(&RenderedQuery::raw(self)).await
    }
}

/// A higher-order unit of work that receives the executor itself
pub struct Computation<F>(F);

/// Wrap a closure so it runs with the executor as its argument.
///
/// ```
/// use cypherkit_client::{computation, QueryExecutor, Result};
/// use cypherkit_query::cypher;
///
/// async fn create_and_link(executor: &QueryExecutor) -> Result<usize> {
///     executor
///         .execute(computation(|exec: QueryExecutor| async move {
///             exec.execute(cypher!("CREATE (:User {{name: {}}})", "a")).await?;
///             let rows = exec.execute(cypher!("MATCH (u:User) RETURN u")).await?;
///             Ok(rows.len())
///         }))
///         .await
/// }
/// ```
pub fn computation<F, Fut, T>(f: F) -> Computation<F>
where
    F: FnOnce(QueryExecutor) -> Fut + Send,
    Fut: Future<Output = Result<T>> + Send,
    T: Send,
{
    Computation(f)
}

#[async_trait]
impl<F, Fut, T> Executable for Computation<F>
where
    F: FnOnce(QueryExecutor) -> Fut + Send,
    Fut: Future<Output = Result<T>> + Send,
    T: Send,
{
    type Output = T;

    async fn execute_on(self, executor: &QueryExecutor) -> Result<T> {
        (self.0)(executor.clone()).await
    }
}
