//! Policy document parsing (pure Rust)
//!
//! IAM accepts several shapes for the same policy: `Statement` may be a single
//! object or an array, and `Action`/`Resource` may be a single string or an
//! array of strings. Everything is normalized into [`Policy`] here.

use serde_json::{Map, Value};

use crate::error::{ParseError, ParseResult};
use crate::types::{Policy, Statement};

const VERSION_FIELD: &str = "Version";
const STATEMENT_FIELD: &str = "Statement";
const SID_FIELD: &str = "Sid";
const EFFECT_FIELD: &str = "Effect";
const ACTION_FIELD: &str = "Action";
const RESOURCE_FIELD: &str = "Resource";

/// Parse a raw JSON policy document into a normalized [`Policy`].
///
/// Statement order follows the source document.
pub fn parse_policy(raw: &str) -> ParseResult<Policy> {
    if raw.is_empty() {
        return Err(ParseError::Empty);
    }

    let document: Value = serde_json::from_str(raw)?;

    let version = document
        .get(VERSION_FIELD)
        .and_then(Value::as_str)
        .ok_or(ParseError::MissingVersion)?
        .to_string();

    let statements = match document.get(STATEMENT_FIELD) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(index, item)| parse_statement(index, item))
            .collect::<ParseResult<Vec<_>>>()?,
        Some(single) => vec![parse_statement(0, single)?],
        None => {
            return Err(ParseError::MalformedStatement {
                index: 0,
                reason: format!("policy has no {STATEMENT_FIELD} field"),
            })
        }
    };

    Ok(Policy {
        version,
        statements,
    })
}

fn parse_statement(index: usize, raw: &Value) -> ParseResult<Statement> {
    let fields = raw
        .as_object()
        .ok_or_else(|| ParseError::MalformedStatement {
            index,
            reason: format!("expected an object, found {}", json_kind(raw)),
        })?;

    // A Sid that is not a string is ignored rather than rejected
    let sid = fields
        .get(SID_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let effect = match fields.get(EFFECT_FIELD) {
        Some(Value::String(effect)) if !effect.is_empty() => effect.clone(),
        _ => return Err(ParseError::MissingEffect { index }),
    };

    Ok(Statement {
        sid,
        effect,
        action: string_or_list(index, fields, ACTION_FIELD)?,
        resource: string_or_list(index, fields, RESOURCE_FIELD)?,
    })
}

/// Normalize a "single string or array of strings" field into a non-empty list.
fn string_or_list(
    index: usize,
    fields: &Map<String, Value>,
    field: &str,
) -> ParseResult<Vec<String>> {
    let malformed = |reason: String| ParseError::MalformedStatement { index, reason };

    let values = match fields.get(field) {
        Some(Value::String(single)) => vec![single.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    malformed(format!(
                        "{field} entries must be strings, found {}",
                        json_kind(item)
                    ))
                })
            })
            .collect::<ParseResult<Vec<_>>>()?,
        Some(other) => {
            return Err(malformed(format!(
                "{field} must be a string or an array of strings, found {}",
                json_kind(other)
            )))
        }
        None => return Err(malformed(format!("{field} is missing"))),
    };

    if values.is_empty() {
        return Err(malformed(format!("{field} must not be empty")));
    }
    Ok(values)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
