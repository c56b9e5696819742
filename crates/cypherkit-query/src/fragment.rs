//! Query fragments.
//!
//! A [`CypherQuery`] is an immutable list of literal segments interleaved
//! with values. A value is either a bound parameter or another fragment;
//! nested fragments are kept as nodes and only flattened when rendered.
//!
//! ## Parameter naming
//!
//! A direct value at slot `i` is named `prefix + i`. A nested fragment at
//! slot `i` renders with the prefix `prefix + i + "_"`, so a name generated
//! inside a nested fragment always carries a `_` right after its parent's
//! slot index and can never collide with a sibling or ancestor name.
//!
//! ```
//! use cypherkit_query::cypher;
//!
//! let filter = cypher!("WHERE node.role = {}", "USER");
//! let query = cypher!("MATCH (node:User {{uuid: {}}})\n{}\nRETURN node", "abc", filter);
//! let rendered = query.render();
//!
//! assert_eq!(
//!     rendered.text,
//!     "MATCH (node:User {uuid: $p_0})\nWHERE node.role = $p_1_0\nRETURN node"
//! );
//! assert_eq!(rendered.params.len(), 2);
//! ```

use crate::error::ConstructionError;
use crate::ident::identifier_list;
use crate::render::{Params, PlaceholderStyle, RenderOptions, RenderedQuery};
use crate::template;
use serde_json::Value;

/// A value interpolated into a fragment
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Bound as a named parameter
    Param(Value),
    /// Spliced in as a nested fragment
    Fragment(CypherQuery),
}

impl QueryValue {
    /// Wrap anything convertible to JSON as a parameter
    pub fn param(value: impl Into<Value>) -> Self {
        QueryValue::Param(value.into())
    }
}

impl From<CypherQuery> for QueryValue {
    fn from(query: CypherQuery) -> Self {
        QueryValue::Fragment(query)
    }
}

impl From<&CypherQuery> for QueryValue {
    fn from(query: &CypherQuery) -> Self {
        QueryValue::Fragment(query.clone())
    }
}

macro_rules! param_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::Param(Value::from(value))
                }
            }
        )*
    };
}

param_from!(Value, String, &str, bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Param(Value::String(value.clone()))
    }
}

impl<T: Into<Value>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        QueryValue::Param(value.map_or(Value::Null, Into::into))
    }
}

impl<T: Into<Value>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::Param(Value::Array(values.into_iter().map(Into::into).collect()))
    }
}

/// Immutable, composable Cypher query with positional values
#[derive(Debug, Clone, PartialEq)]
pub struct CypherQuery {
    segments: Vec<String>,
    values: Vec<QueryValue>,
}

impl CypherQuery {
    /// Build from alternating literal segments and values.
    ///
    /// Requires exactly one more segment than values.
    pub fn from_parts<S: Into<String>>(
        segments: Vec<S>,
        values: Vec<QueryValue>,
    ) -> Result<Self, ConstructionError> {
        if segments.len() != values.len() + 1 {
            return Err(ConstructionError::ArityMismatch {
                segments: segments.len(),
                values: values.len(),
            });
        }

        Ok(Self {
            segments: segments.into_iter().map(Into::into).collect(),
            values,
        })
    }

    /// Build from a format-style template (`{}` slots, `{{`/`}}` escapes)
    pub fn from_template(template: &str, values: Vec<QueryValue>) -> Result<Self, ConstructionError> {
        Self::from_parts(template::split(template)?, values)
    }

    /// Used by `cypher!` after the template was checked at compile time
    #[doc(hidden)]
    pub fn from_checked_template(template: &'static str, values: Vec<QueryValue>) -> Self {
        match Self::from_template(template, values) {
            Ok(query) => query,
            Err(err) => unreachable!("cypher! template passed its compile-time check: {err}"),
        }
    }

    /// A fragment of literal text with no values
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            segments: vec![text.into()],
            values: Vec::new(),
        }
    }

    /// Join fragments with newlines, keeping each as a nested node
    pub fn concat<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = CypherQuery>,
    {
        let values: Vec<QueryValue> = parts.into_iter().map(QueryValue::Fragment).collect();
        let mut segments = Vec::with_capacity(values.len() + 1);
        segments.push(String::new());
        for index in 0..values.len() {
            let separator = if index + 1 == values.len() { "" } else { "\n" };
            segments.push(separator.to_string());
        }

        Self { segments, values }
    }

    /// Append `RETURN a, b, ...` projecting the given names
    pub fn returning<S: AsRef<str>>(self, outputs: &[S]) -> Result<Self, ConstructionError> {
        let projection = identifier_list(outputs)?;

        Ok(Self {
            segments: vec![String::new(), format!("\nRETURN {projection}")],
            values: vec![QueryValue::Fragment(self)],
        })
    }

    /// Literal text segments
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Interpolated values
    pub fn values(&self) -> &[QueryValue] {
        &self.values
    }

    /// Render with the default `p_` prefix and `$name` placeholders
    pub fn render(&self) -> RenderedQuery {
        self.render_with(&RenderOptions::default())
    }

    /// Render with explicit options
    pub fn render_with(&self, options: &RenderOptions) -> RenderedQuery {
        let mut text = String::new();
        let mut params = Params::new();
        self.render_into(
            &options.param_prefix,
            options.placeholder,
            &mut text,
            &mut params,
        );
        RenderedQuery { text, params }
    }

    fn render_into(
        &self,
        prefix: &str,
        style: PlaceholderStyle,
        text: &mut String,
        params: &mut Params,
    ) {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                let slot = index - 1;
                match &self.values[slot] {
                    QueryValue::Fragment(nested) => {
                        let nested_prefix = format!("{prefix}{slot}_");
                        nested.render_into(&nested_prefix, style, text, params);
                    }
                    QueryValue::Param(value) => {
                        let name = format!("{prefix}{slot}");
                        style.write(text, &name);
                        params.insert(name, value.clone());
                    }
                }
            }
            text.push_str(segment);
        }
    }
}

impl From<&str> for CypherQuery {
    fn from(text: &str) -> Self {
        CypherQuery::raw(text)
    }
}

impl From<String> for CypherQuery {
    fn from(text: String) -> Self {
        CypherQuery::raw(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cypher;
    use serde_json::json;

    #[test]
    fn test_single_placeholder() {
        let query = CypherQuery::from_parts(
            vec!["MATCH (n) WHERE n.id = ", ""],
            vec![QueryValue::param(42)],
        )
        .unwrap();
        let rendered = query.render();

        assert_eq!(rendered.text, "MATCH (n) WHERE n.id = $p_0");
        assert_eq!(rendered.params.len(), 1);
        assert_eq!(rendered.params["p_0"], json!(42));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = CypherQuery::from_parts(vec!["a", "b"], vec![]).unwrap_err();

        assert_eq!(
            err,
            ConstructionError::ArityMismatch {
                segments: 2,
                values: 0
            }
        );
    }

    #[test]
    fn test_nested_prefixes() {
        let inner = cypher!("WHERE node.role = {} AND node.age > {}", "USER", 18);
        let outer = cypher!("MATCH (node {{uuid: {}}})\n{}\nRETURN node", "u-1", inner);
        let rendered = outer.render();

        assert_eq!(
            rendered.text,
            "MATCH (node {uuid: $p_0})\nWHERE node.role = $p_1_0 AND node.age > $p_1_1\nRETURN node"
        );
        let keys: Vec<&str> = rendered.params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["p_0", "p_1_0", "p_1_1"]);
    }

    #[test]
    fn test_deep_nesting_is_disjoint() {
        let leaf = cypher!("{}", 3);
        let middle = cypher!("{} {}", 2, leaf);
        let root = cypher!("{} {} {}", 1, middle, 4);
        let rendered = root.render();

        assert_eq!(rendered.text, "$p_0 $p_1_0 $p_1_1_0 $p_2");
        assert_eq!(rendered.params["p_1_1_0"], json!(3));
    }

    #[test]
    fn test_macro_yields_query_directly() {
        let query: CypherQuery = cypher!("MATCH (n) WHERE n.id = {} RETURN n", 9);

        assert_eq!(
            query,
            CypherQuery::from_template(
                "MATCH (n) WHERE n.id = {} RETURN n",
                vec![QueryValue::param(9)]
            )
            .unwrap()
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let query = cypher!("MATCH (a {{id: {}}}) {}", 1, cypher!("SET a.x = {}", true));

        assert_eq!(query.render(), query.render());
    }

    #[test]
    fn test_braces_style_and_prefix() {
        let query = cypher!("MATCH (u:User {{uuid: {}}}) RETURN u", "abc");
        let options = RenderOptions::with_prefix("q").placeholder(PlaceholderStyle::Braces);
        let rendered = query.render_with(&options);

        assert_eq!(rendered.text, "MATCH (u:User {uuid: {q0}}) RETURN u");
        assert_eq!(rendered.params["q0"], json!("abc"));
    }

    #[test]
    fn test_returning_appends_projection() {
        let query = cypher!("CREATE (user:User {{username: {}}})", "admin")
            .returning(&["user"])
            .unwrap();
        let rendered = query.render();

        assert_eq!(
            rendered.text,
            "CREATE (user:User {username: $p_0_0})\nRETURN user"
        );
    }

    #[test]
    fn test_returning_rejects_bad_names() {
        let err = CypherQuery::raw("MATCH (n)")
            .returning(&["n; DROP"])
            .unwrap_err();

        assert!(matches!(err, ConstructionError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_concat_joins_with_newlines() {
        let query = CypherQuery::concat(vec![
            cypher!("MATCH (node) WHERE {} IN labels(node)", "User"),
            CypherQuery::raw("WITH node"),
            cypher!("RETURN node LIMIT {}", 10),
        ]);
        let rendered = query.render();

        assert_eq!(
            rendered.text,
            "MATCH (node) WHERE $p_0_0 IN labels(node)\nWITH node\nRETURN node LIMIT $p_2_0"
        );
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(QueryValue::from(None::<i64>), QueryValue::Param(Value::Null));
        assert_eq!(
            QueryValue::from(vec![1, 2]),
            QueryValue::Param(json!([1, 2]))
        );
        assert_eq!(QueryValue::from("x"), QueryValue::Param(json!("x")));
    }

    #[test]
    fn test_rendering_does_not_mutate() {
        let query = cypher!("RETURN {}", 1);
        let before = query.clone();
        let _ = query.render();

        assert_eq!(query, before);
    }
}
