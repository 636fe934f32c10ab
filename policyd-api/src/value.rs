//! Policy values and their textual form

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PolicyError;

/// A single policy value.
///
/// Values carry no ordering of their own. Which of two values is "stricter"
/// is decided by the [`Comparator`](crate::Comparator) of the policy that owns
/// them, so `PolicyValue` deliberately does not implement `PartialOrd`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PolicyValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// The kind of scalar a [`PolicyValue`] holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Int,
    Text,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Text => "str",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PolicyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PolicyValue::Bool(_) => ValueKind::Bool,
            PolicyValue::Int(_) => ValueKind::Int,
            PolicyValue::Text(_) => ValueKind::Text,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PolicyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PolicyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PolicyValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Serialize to the tagged text form used for storage, transport and logs.
    ///
    /// The output always parses back to an equal value via [`FromStr`].
    pub fn dump(&self) -> String {
        match self {
            PolicyValue::Bool(v) => format!("bool:{}", v),
            PolicyValue::Int(v) => format!("int:{}", v),
            PolicyValue::Text(v) => format!("str:{}", v),
        }
    }

    /// Parse untagged user input (`"0"`, `"true"`, `"abc"`) as a value of the
    /// same kind as `template`. Tagged input is accepted too, provided the tag
    /// matches.
    pub fn parse_like(template: &PolicyValue, raw: &str) -> Result<PolicyValue, PolicyError> {
        if let Ok(tagged) = raw.parse::<PolicyValue>() {
            if tagged.kind() == template.kind() {
                return Ok(tagged);
            }
            // Text policies take any other tagged form literally
            if template.kind() != ValueKind::Text {
                return Err(PolicyError::TypeMismatch {
                    expected: template.kind(),
                    found: tagged.kind(),
                });
            }
        }
        Self::parse_kind(template.kind(), raw)
    }

    fn parse_kind(kind: ValueKind, raw: &str) -> Result<PolicyValue, PolicyError> {
        let invalid = || PolicyError::InvalidValue(format!("'{}' is not a valid {}", raw, kind));
        match kind {
            ValueKind::Bool => match raw.trim() {
                "true" | "1" | "on" => Ok(PolicyValue::Bool(true)),
                "false" | "0" | "off" => Ok(PolicyValue::Bool(false)),
                _ => Err(invalid()),
            },
            ValueKind::Int => raw
                .trim()
                .parse::<i64>()
                .map(PolicyValue::Int)
                .map_err(|_| invalid()),
            ValueKind::Text => Ok(PolicyValue::Text(raw.to_string())),
        }
    }
}

impl FromStr for PolicyValue {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, body) = s
            .split_once(':')
            .ok_or_else(|| PolicyError::InvalidValue(format!("missing type tag in '{}'", s)))?;
        let kind = match tag {
            "bool" => ValueKind::Bool,
            "int" => ValueKind::Int,
            "str" => ValueKind::Text,
            other => {
                return Err(PolicyError::InvalidValue(format!(
                    "unknown type tag '{}'",
                    other
                )));
            }
        };
        // Text bodies are kept verbatim, including leading whitespace
        if kind == ValueKind::Text {
            return Ok(PolicyValue::Text(body.to_string()));
        }
        Self::parse_kind(kind, body)
    }
}

impl fmt::Display for PolicyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyValue::Bool(v) => write!(f, "{}", v),
            PolicyValue::Int(v) => write!(f, "{}", v),
            PolicyValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for PolicyValue {
    fn from(v: bool) -> Self {
        PolicyValue::Bool(v)
    }
}

impl From<i64> for PolicyValue {
    fn from(v: i64) -> Self {
        PolicyValue::Int(v)
    }
}

impl From<i32> for PolicyValue {
    fn from(v: i32) -> Self {
        PolicyValue::Int(v as i64)
    }
}

impl From<&str> for PolicyValue {
    fn from(v: &str) -> Self {
        PolicyValue::Text(v.to_string())
    }
}

impl From<String> for PolicyValue {
    fn from(v: String) -> Self {
        PolicyValue::Text(v)
    }
}
