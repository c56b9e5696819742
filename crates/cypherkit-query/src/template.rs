//! Format-style query templates.
//!
//! Templates use the same brace rules as `format!`: `{}` marks an
//! interpolation slot, `{{` and `}}` are literal braces, anything else
//! involving a lone brace is rejected. Cypher map literals therefore need
//! doubled braces: `"CREATE (u:User {{name: {}}})"`.

use crate::error::ConstructionError;

/// Count interpolation slots in a template, or `None` if it is malformed.
///
/// `const` so the `cypher!` macro can check arity at compile time.
pub const fn slot_count(template: &str) -> Option<usize> {
    let bytes = template.as_bytes();
    let mut i = 0;
    let mut slots = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b'{' {
                    i += 2;
                } else if i + 1 < bytes.len() && bytes[i + 1] == b'}' {
                    slots += 1;
                    i += 2;
                } else {
                    return None;
                }
            }
            b'}' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b'}' {
                    i += 2;
                } else {
                    return None;
                }
            }
            _ => i += 1,
        }
    }

    Some(slots)
}

/// Split a template into the literal segments around its slots.
///
/// Always returns `slots + 1` segments with escapes already resolved.
pub fn split(template: &str) -> Result<Vec<String>, ConstructionError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => match chars.peek() {
                Some((_, '{')) => {
                    chars.next();
                    current.push('{');
                }
                Some((_, '}')) => {
                    chars.next();
                    segments.push(std::mem::take(&mut current));
                }
                _ => {
                    return Err(ConstructionError::MalformedTemplate {
                        position,
                        reason: "unmatched `{` (use `{{` for a literal brace)",
                    })
                }
            },
            '}' => match chars.peek() {
                Some((_, '}')) => {
                    chars.next();
                    current.push('}');
                }
                _ => {
                    return Err(ConstructionError::MalformedTemplate {
                        position,
                        reason: "unmatched `}` (use `}}` for a literal brace)",
                    })
                }
            },
            other => current.push(other),
        }
    }

    segments.push(current);
    Ok(segments)
}
