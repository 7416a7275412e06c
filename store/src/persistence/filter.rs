//! Field-equality queries shared by both backends.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use super::PersistenceError;

/// A conjunction of `field == value` clauses over a record's JSON form.
///
/// Field names are the serialized (camelCase) keys and are `'static` so the
/// database backend can splice them into SQL paths without escaping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(&'static str, Value)>,
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self::default().and(field, value)
    }

    pub fn and(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.clauses.push((field, value.into()));
        self
    }

    pub fn clauses(&self) -> &[(&'static str, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Match against an already-serialized record.
    pub fn matches_value(&self, record: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| record.get(*field).unwrap_or(&Value::Null) == expected)
    }

    pub fn matches<T: Serialize>(&self, record: &T) -> Result<bool, PersistenceError> {
        if self.clauses.is_empty() {
            return Ok(true);
        }
        Ok(self.matches_value(&serde_json::to_value(record)?))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, value)) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        Ok(())
    }
}
