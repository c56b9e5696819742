//! Operation chains
//!
//! A [`Pipe`] is a lazily linked list of steps. Each node owns its
//! predecessor; nothing runs until [`Pipe::run`] is called on the last node,
//! which resolves the chain depth-first and feeds each settled value into the
//! next step. A failing step short-circuits everything after it.
//!
//! Values passed between steps are `serde_json::Value`. A query step yields
//! its first result row as a JSON object, or `Null` when there are no rows.
//!
//! ```
//! use cypherkit_client::{Pipe, QueryDefinition, QueryExecutor, Result};
//! use cypherkit_query::cypher;
//! use serde_json::Value;
//!
//! async fn create_user(executor: QueryExecutor) -> Result<Value> {
//!     let create = QueryDefinition::new(
//!         executor,
//!         |name: &String| Ok(cypher!("CREATE (user:User {{username: {}}})", name.clone())),
//!         &["user"],
//!     )?;
//!
//!     create
//!         .bind("admin".to_string())
//!         .pipe(Pipe::map(|row| Ok(row["user"].clone())))
//!         .run()
//!         .await
//! }
//! ```

use crate::error::{Error, Result};
use crate::executor::QueryExecutor;
use cypherkit_query::{identifier, ConstructionError, CypherQuery};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

type Template = Arc<dyn Fn() -> std::result::Result<CypherQuery, ConstructionError> + Send + Sync>;
type Callback = Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// Reusable query template with declared outputs
pub struct QueryDefinition<A> {
    executor: QueryExecutor,
    template: Arc<dyn Fn(&A) -> std::result::Result<CypherQuery, ConstructionError> + Send + Sync>,
    outputs: Arc<[String]>,
}

impl<A> Clone for QueryDefinition<A> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            template: Arc::clone(&self.template),
            outputs: Arc::clone(&self.outputs),
        }
    }
}

impl<A> fmt::Debug for QueryDefinition<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDefinition")
            .field("outputs", &self.outputs)
            .field("executor", &self.executor)
            .finish()
    }
}

impl<A: Send + Sync + 'static> QueryDefinition<A> {
    /// Define a query whose result is projected onto `outputs`.
    ///
    /// Output names are validated here so that binding never fails on them.
    pub fn new<F, S>(executor: QueryExecutor, template: F, outputs: &[S]) -> Result<Self>
    where
        F: Fn(&A) -> std::result::Result<CypherQuery, ConstructionError> + Send + Sync + 'static,
        S: AsRef<str>,
    {
        for output in outputs {
            identifier(output.as_ref())?;
        }

        Ok(Self {
            executor,
            template: Arc::new(template),
            outputs: outputs.iter().map(|o| o.as_ref().to_string()).collect(),
        })
    }

    /// Declared output names
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Bind arguments, producing a runnable chain node
    pub fn bind(&self, args: A) -> Pipe {
        let template = Arc::clone(&self.template);
        Pipe::new(Step::Query(QueryStep {
            executor: self.executor.clone(),
            template: Arc::new(move || template(&args)),
            outputs: Arc::clone(&self.outputs),
        }))
    }
}

struct QueryStep {
    executor: QueryExecutor,
    template: Template,
    outputs: Arc<[String]>,
}

impl QueryStep {
    async fn run(&self) -> Result<Value> {
        let query = (self.template)()?.returning(&self.outputs[..])?;
        let rows = self.executor.execute(query).await?;

        Ok(rows
            .into_iter()
            .next()
            .map_or(Value::Null, |row| row.into_value()))
    }
}

enum Step {
    Query(QueryStep),
    Function(Callback),
}

/// One node of an operation chain
pub struct Pipe {
    previous: Option<Box<Pipe>>,
    step: Step,
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.step {
            Step::Query(query) => format!("query -> {}", query.outputs.join(", ")),
            Step::Function(_) => "function".to_string(),
        };
        f.debug_struct("Pipe")
            .field("step", &kind)
            .field("len", &self.len())
            .finish()
    }
}

impl Pipe {
    fn new(step: Step) -> Self {
        Self {
            previous: None,
            step,
        }
    }

    /// Async computation step.
    ///
    /// Receives `None` at the head of a chain, otherwise the predecessor's
    /// resolved value.
    pub fn function<F, Fut>(callback: F) -> Self
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::new(Step::Function(Arc::new(move |input| callback(input).boxed())))
    }

    /// Synchronous computation step; a missing input is passed as `Null`
    pub fn map<F>(callback: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        Self::function(move |input| {
            let callback = Arc::clone(&callback);
            async move { callback(input.unwrap_or(Value::Null)) }
        })
    }

    /// Link `self` before `next` and return `next`.
    ///
    /// If `next` already has predecessors, `self` is attached at the head of
    /// that chain, so the list stays linear.
    pub fn pipe(self, mut next: Pipe) -> Pipe {
        next.attach_head(self);
        next
    }

    fn attach_head(&mut self, head: Pipe) {
        match &mut self.previous {
            Some(previous) => previous.attach_head(head),
            None => self.previous = Some(Box::new(head)),
        }
    }

    /// Number of nodes up to and including this one
    pub fn len(&self) -> usize {
        1 + self.previous.as_ref().map_or(0, |previous| previous.len())
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Resolve the chain ending at this node
    pub fn run(&self) -> BoxFuture<'_, Result<Value>> {
        async move {
            let input = match &self.previous {
                Some(previous) => Some(previous.run().await?),
                None => None,
            };

            match &self.step {
                Step::Query(query) => {
                    if input.is_some() {
                        debug!("Predecessor resolved, running query step");
                    }
                    query.run().await
                }
                Step::Function(callback) => callback(input).await,
            }
        }
        .boxed()
    }

    /// Resolve the chain and deserialize its result
    pub async fn run_as<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.run().await?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Link steps left to right and run the resulting chain
pub async fn run_chain<I>(steps: I) -> Result<Value>
where
    I: IntoIterator<Item = Pipe>,
{
    let chain = steps
        .into_iter()
        .reduce(|chain, next| chain.pipe(next))
        .ok_or(Error::EmptyChain)?;
    chain.run().await
}
