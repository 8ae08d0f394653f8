use std::collections::HashMap;

use super::errors::MarkInputError;
use crate::paper::QuestionId;

/// Key of an in-progress edit: one question for one student.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkKey {
    pub question_id: QuestionId,
    pub student: String,
}

impl MarkKey {
    pub fn new(question_id: QuestionId, student: impl Into<String>) -> Self {
        Self { question_id, student: student.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkOverride {
    Marks(f64),
    /// Entered as `NA`.
    NotAttempted,
    /// Text that is neither a number nor `NA`; resolves as an attempted zero.
    Unparsed(String),
}

impl MarkOverride {
    /// Reads raw input. Blank input is no override at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.eq_ignore_ascii_case("na") {
            return Some(MarkOverride::NotAttempted);
        }
        Some(match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => MarkOverride::Marks(value),
            _ => MarkOverride::Unparsed(trimmed.to_string()),
        })
    }

    pub fn marks(&self) -> f64 {
        match self {
            MarkOverride::Marks(value) => *value,
            MarkOverride::NotAttempted | MarkOverride::Unparsed(_) => 0.0,
        }
    }

    pub fn attempted(&self) -> bool {
        !matches!(self, MarkOverride::NotAttempted)
    }
}

/// Outcome of [`OverrideStore::enter`].
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Cleared,
    Stored(MarkOverride),
}

/// Session-scoped edits that have not been persisted yet. One entry per key;
/// later writes replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    entries: HashMap<MarkKey, MarkOverride>,
}

impl OverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question_id: QuestionId, student: &str) -> Option<&MarkOverride> {
        self.entries.get(&MarkKey::new(question_id, student))
    }

    pub fn set(&mut self, key: MarkKey, value: MarkOverride) {
        self.entries.insert(key, value);
    }

    pub fn clear(&mut self, key: &MarkKey) -> Option<MarkOverride> {
        self.entries.remove(key)
    }

    /// Interactive entry. Blank input removes the key, `NA` stores the
    /// not-attempted marker, numbers must fall within `[0, max_marks]`.
    pub fn enter(
        &mut self,
        key: MarkKey,
        raw: &str,
        max_marks: Option<f64>,
    ) -> Result<EntryOutcome, MarkInputError> {
        let Some(value) = MarkOverride::parse(raw) else {
            self.entries.remove(&key);
            return Ok(EntryOutcome::Cleared);
        };

        if let MarkOverride::Marks(marks) = value {
            if let Some(max) = max_marks.filter(|max| *max >= 0.0) {
                if marks > max {
                    return Err(MarkInputError::AboveMax { max });
                }
            }
            if marks < 0.0 {
                return Err(MarkInputError::Negative);
            }
        }

        self.entries.insert(key, value.clone());
        Ok(EntryOutcome::Stored(value))
    }

    pub fn has_student(&self, student: &str) -> bool {
        self.entries.keys().any(|key| key.student == student)
    }

    /// Drops the edits that still hold the value they had in `submitted`. Edits
    /// made or changed since then stay pending. Returns how many were removed.
    pub fn discard_submitted(&mut self, submitted: &OverrideStore) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, value| submitted.entries.get(key) != Some(value));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_distinguishes_na_numbers_and_text() {
        assert_eq!(MarkOverride::parse("  "), None);
        assert_eq!(MarkOverride::parse(" nA "), Some(MarkOverride::NotAttempted));
        assert_eq!(MarkOverride::parse("0"), Some(MarkOverride::Marks(0.0)));
        assert_eq!(MarkOverride::parse("abc"), Some(MarkOverride::Unparsed("abc".to_string())));
        assert_eq!(MarkOverride::parse("inf"), Some(MarkOverride::Unparsed("inf".to_string())));
    }

    #[test]
    fn enter_rejects_out_of_range_and_keeps_previous() {
        let mut store = OverrideStore::new();
        let key = MarkKey::new(1, "Asha");

        store.enter(key.clone(), "4", Some(5.0)).expect("in range");
        let err = store.enter(key.clone(), "6", Some(5.0)).expect_err("above max");
        assert_eq!(err, MarkInputError::AboveMax { max: 5.0 });
        let err = store.enter(key.clone(), "-1", Some(5.0)).expect_err("negative");
        assert_eq!(err, MarkInputError::Negative);

        assert_eq!(store.get(1, "Asha"), Some(&MarkOverride::Marks(4.0)));
    }

    #[test]
    fn blank_entry_removes_instead_of_storing_zero() {
        let mut store = OverrideStore::new();
        let key = MarkKey::new(1, "Asha");
        store.enter(key.clone(), "3", None).expect("store");
        assert_eq!(store.enter(key, "", None).expect("clear"), EntryOutcome::Cleared);
        assert!(store.get(1, "Asha").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn later_write_replaces_earlier() {
        let mut store = OverrideStore::new();
        store.set(MarkKey::new(1, "Asha"), MarkOverride::Marks(2.0));
        store.set(MarkKey::new(1, "Asha"), MarkOverride::NotAttempted);
        store.set(MarkKey::new(1, "Ravi"), MarkOverride::Marks(1.0));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1, "Asha"), Some(&MarkOverride::NotAttempted));
        assert!(store.has_student("Ravi"));
        assert!(!store.has_student("Mira"));
    }

    #[test]
    fn discard_submitted_keeps_later_edits() {
        let mut store = OverrideStore::new();
        store.set(MarkKey::new(1, "Asha"), MarkOverride::Marks(4.0));
        store.set(MarkKey::new(2, "Asha"), MarkOverride::Marks(3.0));
        let submitted = store.clone();

        store.set(MarkKey::new(2, "Asha"), MarkOverride::NotAttempted);
        store.set(MarkKey::new(3, "Asha"), MarkOverride::Marks(1.0));

        assert_eq!(store.discard_submitted(&submitted), 1);
        assert_eq!(store.get(1, "Asha"), None);
        assert_eq!(store.get(2, "Asha"), Some(&MarkOverride::NotAttempted));
        assert_eq!(store.get(3, "Asha"), Some(&MarkOverride::Marks(1.0)));
    }

    #[test]
    fn keys_with_separator_characters_do_not_collide() {
        let mut store = OverrideStore::new();
        store.set(MarkKey::new(1, "2-x"), MarkOverride::Marks(1.0));
        store.set(MarkKey::new(12, "x"), MarkOverride::Marks(2.0));
        assert_eq!(store.get(1, "2-x"), Some(&MarkOverride::Marks(1.0)));
        assert_eq!(store.get(12, "x"), Some(&MarkOverride::Marks(2.0)));
    }
}
