//! Step-wise graph traversal builder.
//!
//! Compiles a chain of hops into a single query. Each step leaves the current
//! frontier bound to `inV`, and the finished query returns it as `node`, the
//! column label repositories read from.
//!
//! ```
//! use cypherkit_query::Traversal;
//!
//! let query = Traversal::vertices(vec![1, 2])
//!     .out("OWNS")
//!     .with_label("Session")
//!     .to_query()
//!     .unwrap();
//!
//! let rendered = query.render();
//! assert!(rendered.text.starts_with("MATCH (outV)\nWHERE id(outV) IN $p_0_0"));
//! assert!(rendered.text.ends_with("RETURN inV AS node"));
//! ```

use crate::error::ConstructionError;
use crate::fragment::{CypherQuery, QueryValue};
use crate::ident::identifier;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
enum Step {
    Vertex(Value),
    Vertices(Vec<Value>),
    Out(String),
    Incoming(String),
    WithLabel(String),
}

/// Traversal starting from one or more vertices by internal id
#[derive(Debug, Clone, PartialEq)]
pub struct Traversal {
    steps: Vec<Step>,
}

impl Traversal {
    /// Start from a single vertex id
    pub fn vertex(id: impl Into<Value>) -> Self {
        Self {
            steps: vec![Step::Vertex(id.into())],
        }
    }

    /// Start from a set of vertex ids
    pub fn vertices<I, V>(ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            steps: vec![Step::Vertices(ids.into_iter().map(Into::into).collect())],
        }
    }

    /// Follow outgoing relationships of the given type
    pub fn out(mut self, relationship: impl Into<String>) -> Self {
        self.steps.push(Step::Out(relationship.into()));
        self
    }

    /// Follow incoming relationships of the given type
    pub fn incoming(mut self, relationship: impl Into<String>) -> Self {
        self.steps.push(Step::Incoming(relationship.into()));
        self
    }

    /// Keep only vertices carrying the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.steps.push(Step::WithLabel(label.into()));
        self
    }

    /// Compile to a query returning the frontier as `node`
    pub fn to_query(&self) -> Result<CypherQuery, ConstructionError> {
        let mut parts = Vec::with_capacity(self.steps.len() + 1);

        for step in &self.steps {
            let part = match step {
                Step::Vertex(id) => CypherQuery::from_parts(
                    vec!["MATCH (outV)\nWHERE id(outV) = ", "\nWITH outV AS inV"],
                    vec![QueryValue::Param(id.clone())],
                )?,
                Step::Vertices(ids) => CypherQuery::from_parts(
                    vec!["MATCH (outV)\nWHERE id(outV) IN ", "\nWITH outV AS inV"],
                    vec![QueryValue::Param(Value::Array(ids.clone()))],
                )?,
                Step::Out(relationship) => CypherQuery::from_parts(
                    vec!["MATCH (inV)-[:", "]->(outV)\nWITH outV AS inV"],
                    vec![identifier(relationship)?.into()],
                )?,
                Step::Incoming(relationship) => CypherQuery::from_parts(
                    vec!["MATCH (inV)<-[:", "]-(outV)\nWITH outV AS inV"],
                    vec![identifier(relationship)?.into()],
                )?,
                Step::WithLabel(label) => CypherQuery::from_parts(
                    vec!["WHERE ", " IN labels(inV)\nWITH inV"],
                    vec![QueryValue::param(label.as_str())],
                )?,
            };
            parts.push(part);
        }

        parts.push(CypherQuery::raw("RETURN inV AS node"));
        Ok(CypherQuery::concat(parts))
    }
}
