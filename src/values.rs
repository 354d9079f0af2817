//! Form encoding of entry content.
//!
//! Content types only need a [Serialize] implementation. The serialized value must be a map (a
//! struct, usually); each field becomes one or more form fields:
//!
//! * `null` (an unset `Option`) is omitted,
//! * scalars are sent as their string representation,
//! * sequences repeat the field once per element,
//! * nested maps are flattened with dotted names, so `dispatch: {earliest_time: "-1h"}` becomes
//!   `dispatch.earliest_time=-1h`.
//!
//! Fields that may only be sent by some operations (a name that is fixed at creation, a setting
//! the server refuses on create) are listed in a [Selective] table. Fields missing from the table
//! are sent by every operation.

use crate::error::{Result, ValuesSnafu};
use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// The write operations which send form encoded entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A content field restricted to a set of operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selective {
    pub field: &'static str,
    pub operations: &'static [Operation],
}

impl Selective {
    /// A field only sent on create.
    pub const fn create(field: &'static str) -> Self {
        Self {
            field,
            operations: &[Operation::Create],
        }
    }

    /// A field only sent on update.
    pub const fn update(field: &'static str) -> Self {
        Self {
            field,
            operations: &[Operation::Update],
        }
    }

    pub fn applies_to(&self, operation: Operation) -> bool {
        self.operations.contains(&operation)
    }
}

/// Encode every field of `value`.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<(String, String)>> {
    encode_fields(value, |_| true)
}

/// Encode the fields of `value` which apply to `operation`.
pub fn encode_selective<T: Serialize>(
    value: &T,
    table: &[Selective],
    operation: Operation,
) -> Result<Vec<(String, String)>> {
    encode_fields(value, |field| {
        table
            .iter()
            .filter(|rule| rule.field == field)
            .all(|rule| rule.applies_to(operation))
    })
}

/// Render form fields as an `application/x-www-form-urlencoded` body.
pub fn form_encode(pairs: &[(String, String)]) -> Result<String> {
    serde_urlencoded::to_string(pairs).map_err(|err| {
        ValuesSnafu {
            message: format!("unable to form encode {} fields: {}", pairs.len(), err),
        }
        .build()
    })
}

fn encode_fields<T, F>(value: &T, include: F) -> Result<Vec<(String, String)>>
where
    T: Serialize,
    F: Fn(&str) -> bool,
{
    let value = match serde_json::to_value(value) {
        Ok(value) => value,
        Err(err) => {
            return ValuesSnafu {
                message: format!("unable to serialize content: {}", err),
            }
            .fail()
        }
    };

    let mut pairs = Vec::new();
    match value {
        Value::Null => {}
        Value::Object(fields) => {
            for (name, field) in fields.iter().filter(|(name, _)| include(name.as_str())) {
                flatten(name, field, &mut pairs)?;
            }
        }
        other => {
            return ValuesSnafu {
                message: format!("content must encode as a map of fields, not {}", other),
            }
            .fail()
        }
    }
    Ok(pairs)
}

fn flatten(name: &str, value: &Value, pairs: &mut Vec<(String, String)>) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((name.to_string(), b.to_string())),
        Value::Number(n) => pairs.push((name.to_string(), n.to_string())),
        Value::String(s) => pairs.push((name.to_string(), s.clone())),
        Value::Array(items) => {
            for item in items {
                if item.is_array() || item.is_object() {
                    return ValuesSnafu {
                        message: format!("field {:?} holds a nested collection", name),
                    }
                    .fail();
                }
                flatten(name, item, pairs)?;
            }
        }
        Value::Object(fields) => {
            for (key, field) in fields {
                flatten(&format!("{}.{}", name, key), field, pairs)?;
            }
        }
    }
    Ok(())
}
