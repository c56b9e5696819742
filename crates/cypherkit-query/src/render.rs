//! Rendered query output.
//!
//! A fragment tree is flattened into a single query string plus a map of
//! generated parameter names to values, ready to hand to a transport.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Parameter map produced by rendering, in insertion order
pub type Params = IndexMap<String, Value>;

/// Default prefix for generated parameter names
pub const DEFAULT_PARAM_PREFIX: &str = "p_";

/// How parameter placeholders are written into query text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// `$name` (current Cypher)
    #[default]
    Dollar,
    /// `{name}` (legacy Cypher, pre Neo4j 4)
    Braces,
}

impl PlaceholderStyle {
    pub(crate) fn write(self, out: &mut String, name: &str) {
        match self {
            PlaceholderStyle::Dollar => {
                out.push('$');
                out.push_str(name);
            }
            PlaceholderStyle::Braces => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
    }
}

/// Options controlling how a fragment is rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Prefix for every generated parameter name
    pub param_prefix: String,
    /// Placeholder token style
    pub placeholder: PlaceholderStyle,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            param_prefix: DEFAULT_PARAM_PREFIX.to_string(),
            placeholder: PlaceholderStyle::default(),
        }
    }
}

impl RenderOptions {
    /// Options with a custom parameter prefix and the default placeholder style
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            param_prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Replace the placeholder style
    pub fn placeholder(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder = style;
        self
    }
}

/// Output from rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedQuery {
    /// The generated query string
    pub text: String,
    /// Parameters to bind to the query
    pub params: Params,
}

impl RenderedQuery {
    /// A query with no parameters
    pub fn raw(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Params::new(),
        }
    }
}

impl fmt::Display for RenderedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
