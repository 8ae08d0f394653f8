use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::de::numeric;

/// Field names that upstream payloads have used for a student's mark on a question,
/// in the order they are consulted. The first alias holding a numeric value wins.
pub const MARK_VALUE_ALIASES: &[&str] = &[
    "studentMarks",
    "obtainedMarks",
    "obtained_marks",
    "awarded_marks",
    "currentMarks",
    "marks_obtained",
    "marks_awarded",
    "awardedMarks",
    "marks",
];

/// The untyped remainder of an API-shaped question: whatever fields the upstream
/// attached beyond the structural ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldBag(Map<String, Value>);

impl FieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(numeric)
    }

    /// Only real booleans count as flags.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn is_attempted(&self) -> Option<bool> {
        self.flag("is_attempted")
    }

    /// First usable mark value across [`MARK_VALUE_ALIASES`].
    pub fn first_mark(&self) -> Option<f64> {
        MARK_VALUE_ALIASES.iter().find_map(|alias| self.number(alias))
    }
}
