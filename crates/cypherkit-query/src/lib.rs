//! # cypherkit-query
//!
//! Safe, nestable construction of parameterized Cypher queries.
//!
//! Values are never formatted into query text. Every interpolated value
//! becomes a named parameter, and nested fragments get their own parameter
//! namespace so composition can never produce colliding names.
//!
//! ## Usage
//!
//! ```rust
//! use cypherkit_query::{cypher, CypherQuery};
//!
//! let by_role = cypher!("WHERE node.role = {}\nWITH node", "USER");
//! let query = CypherQuery::concat(vec![
//!     cypher!("MATCH (node)\nWHERE {} IN labels(node)\nWITH node", "User"),
//!     by_role,
//!     CypherQuery::raw("RETURN node"),
//! ]);
//!
//! let rendered = query.render();
//! assert_eq!(rendered.params.len(), 2);
//! ```

pub mod error;
pub mod fragment;
pub mod ident;
pub mod render;
pub mod template;
pub mod traversal;

pub use error::ConstructionError;
pub use fragment::{CypherQuery, QueryValue};
pub use ident::{identifier, is_identifier};
pub use render::{Params, PlaceholderStyle, RenderOptions, RenderedQuery, DEFAULT_PARAM_PREFIX};
pub use traversal::Traversal;

/// Build a [`CypherQuery`] from a format-style template.
///
/// `{}` marks a slot, `{{` / `}}` are literal braces. Each argument becomes
/// a bound parameter, or a nested fragment if it is a `CypherQuery`. The
/// template is checked against the argument count at compile time, so
/// construction cannot fail at runtime. Use
/// [`CypherQuery::from_template`] for templates built at runtime.
///
/// ```rust
/// use cypherkit_query::cypher;
///
/// let query = cypher!("MATCH (u:User {{uuid: {}}}) RETURN u", "abc");
/// assert_eq!(query.render().text, "MATCH (u:User {uuid: $p_0}) RETURN u");
/// ```
///
/// ```compile_fail
/// // one slot, two arguments
/// let query = cypherkit_query::cypher!("RETURN {}", 1, 2);
/// ```
#[macro_export]
macro_rules! cypher {
    ($template:literal $(, $value:expr)* $(,)?) => {{
        const _: () = ::core::assert!(
            ::core::matches!(
                $crate::template::slot_count($template),
                ::core::option::Option::Some(n) if n == $crate::__cypher_count!($($value),*)
            ),
            "cypher! template is malformed or its slot count does not match the arguments"
        );
        $crate::CypherQuery::from_checked_template(
            $template,
            ::std::vec![$($crate::QueryValue::from($value)),*],
        )
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __cypher_count {
    () => { 0usize };
    ($head:expr $(, $tail:expr)*) => { 1usize + $crate::__cypher_count!($($tail),*) };
}
