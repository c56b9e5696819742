//! Identifier validation.
//!
//! Labels, relationship types, and projection names cannot be bound as
//! parameters in Cypher, so they are spliced into the query text. Only plain
//! identifiers are accepted for that.

use crate::error::ConstructionError;
use crate::fragment::CypherQuery;
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));

/// Check whether `name` can be spliced into a query verbatim
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Build a value-less fragment holding a validated identifier
pub fn identifier(name: &str) -> Result<CypherQuery, ConstructionError> {
    if is_identifier(name) {
        Ok(CypherQuery::raw(name))
    } else {
        Err(ConstructionError::InvalidIdentifier(name.to_string()))
    }
}

/// Validate a list of names and join them with `, `
pub(crate) fn identifier_list<S: AsRef<str>>(names: &[S]) -> Result<String, ConstructionError> {
    let mut joined = String::new();
    for (index, name) in names.iter().enumerate() {
        let name = name.as_ref();
        if !is_identifier(name) {
            return Err(ConstructionError::InvalidIdentifier(name.to_string()));
        }
        if index > 0 {
            joined.push_str(", ");
        }
        joined.push_str(name);
    }
    Ok(joined)
}
