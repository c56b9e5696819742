//! Label repositories
//!
//! A repository binds an executor, a node label, and a mapper from raw node
//! values to domain objects. Queries handed to [`Repository::execute_array_query`]
//! must leave the matched nodes bound as `node`:
//!
//! ```text
//! MATCH (node)
//! WHERE $p_0 IN labels(node)
//! WITH node
//! ...                 <- caller-supplied filtering / ordering
//! RETURN node         <- appended by the repository
//! ```
//!
//! Specialised repositories are built by composing fragments on top of
//! [`Repository::find_all_query`] rather than by subclassing.

use crate::error::{Error, Result};
use crate::executor::QueryExecutor;
use async_trait::async_trait;
use cypherkit_query::{cypher, CypherQuery};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

/// Column every repository query projects
pub const NODE_COLUMN: &str = "node";

/// Converts a raw node value into a domain object
pub trait NodeMapper: Send + Sync {
    type Output: Send;

    fn map_node(&self, node: &Value) -> Result<Self::Output>;
}

impl<F, T> NodeMapper for F
where
    F: Fn(&Value) -> Result<T> + Send + Sync,
    T: Send,
{
    type Output = T;

    fn map_node(&self, node: &Value) -> Result<T> {
        self(node)
    }
}

/// Mapper that deserializes nodes with serde
pub struct SerdeMapper<T>(PhantomData<fn() -> T>);

impl<T> SerdeMapper<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for SerdeMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SerdeMapper")
    }
}

impl<T: DeserializeOwned + Send> NodeMapper for SerdeMapper<T> {
    type Output = T;

    fn map_node(&self, node: &Value) -> Result<T> {
        Ok(T::deserialize(node)?)
    }
}

/// Query capabilities shared by every label-bound repository
#[async_trait]
pub trait Repository: Send + Sync {
    type Mapper: NodeMapper;

    /// Label whose nodes this repository manages
    fn label(&self) -> &str;

    fn executor(&self) -> &QueryExecutor;

    fn mapper(&self) -> &Self::Mapper;

    /// Fragment matching every node with this label, bound as `node`
    fn find_all_query(&self) -> CypherQuery {
        cypher!(
            "MATCH (node)\nWHERE {} IN labels(node)\nWITH node",
            self.label()
        )
    }

    async fn find_all(&self) -> Result<Vec<<Self::Mapper as NodeMapper>::Output>> {
        let query = self.find_all_query();
        self.execute_array_query(query).await
    }

    /// Append `RETURN node`, run, and map every row
    async fn execute_array_query(
        &self,
        query: CypherQuery,
    ) -> Result<Vec<<Self::Mapper as NodeMapper>::Output>> {
        let rows = self
            .executor()
            .execute(query.returning(&[NODE_COLUMN])?)
            .await?;
        debug!(label = self.label(), rows = rows.len(), "Mapping repository rows");

        rows.iter()
            .map(|row| {
                let node = row
                    .get(NODE_COLUMN)
                    .ok_or_else(|| Error::MissingField(NODE_COLUMN.to_string()))?;
                self.mapper().map_node(node)
            })
            .collect()
    }

    /// Like [`execute_array_query`](Repository::execute_array_query) but
    /// keeps only the first node
    async fn execute_node_query(
        &self,
        query: CypherQuery,
    ) -> Result<Option<<Self::Mapper as NodeMapper>::Output>> {
        Ok(self.execute_array_query(query).await?.into_iter().next())
    }
}

/// Repository for a single label
pub struct LabelRepository<M> {
    executor: QueryExecutor,
    label: String,
    mapper: M,
}

impl<M> fmt::Debug for LabelRepository<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelRepository")
            .field("label", &self.label)
            .field("executor", &self.executor)
            .finish()
    }
}

impl<M: NodeMapper> LabelRepository<M> {
    pub fn new(executor: QueryExecutor, label: impl Into<String>, mapper: M) -> Self {
        Self {
            executor,
            label: label.into(),
            mapper,
        }
    }
}

impl<T: DeserializeOwned + Send> LabelRepository<SerdeMapper<T>> {
    /// Repository that deserializes nodes into `T`
    pub fn deserializing(executor: QueryExecutor, label: impl Into<String>) -> Self {
        Self::new(executor, label, SerdeMapper::new())
    }
}

impl<M: NodeMapper> Repository for LabelRepository<M> {
    type Mapper = M;

    fn label(&self) -> &str {
        &self.label
    }

    fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    fn mapper(&self) -> &M {
        &self.mapper
    }
}
