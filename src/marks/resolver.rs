use std::collections::HashMap;

use super::overrides::OverrideStore;
use crate::paper::{FieldBag, QuestionId, SectionQuestion};

/// Where a resolved mark came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkSource {
    Override,
    CompositeMeta,
    NodeField,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMark {
    pub marks: f64,
    pub attempted: bool,
    pub source: MarkSource,
}

impl ResolvedMark {
    /// False only for the zero default produced when no source had a value.
    pub fn has_value(&self) -> bool {
        self.source != MarkSource::Default
    }
}

/// Per-student data a parent question carries for its sub-questions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubQuestionMeta {
    pub marks: f64,
    pub max_marks: f64,
    pub is_attempted: Option<bool>,
}

/// Sub-question id to [`SubQuestionMeta`], gathered from the `sub_questions` of a
/// section's flat question list.
#[derive(Debug, Clone, Default)]
pub struct CompositeMeta {
    entries: HashMap<QuestionId, SubQuestionMeta>,
}

impl CompositeMeta {
    pub fn from_questions(questions: &[SectionQuestion]) -> Self {
        let mut entries = HashMap::new();
        for question in questions {
            for sub in &question.sub_questions {
                let marks = sub.marks().unwrap_or(0.0);
                entries.insert(
                    sub.question_id,
                    SubQuestionMeta {
                        marks,
                        max_marks: sub.max_marks.or_else(|| sub.marks()).unwrap_or(0.0),
                        is_attempted: sub.is_attempted(),
                    },
                );
            }
        }
        Self { entries }
    }

    pub fn get(&self, question_id: QuestionId) -> Option<&SubQuestionMeta> {
        self.entries.get(&question_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Effective `(marks, attempted)` for one leaf and one student.
///
/// Precedence: the student's override, then `meta` for composite children, then the
/// first mark alias on `fallback`, then zero. Outside the override path `attempted`
/// follows an explicit `is_attempted` flag and defaults to `true`.
pub fn resolve(
    question_id: QuestionId,
    student: &str,
    overrides: &OverrideStore,
    meta: Option<&CompositeMeta>,
    fallback: &FieldBag,
) -> ResolvedMark {
    if let Some(entry) = overrides.get(question_id, student) {
        return ResolvedMark {
            marks: entry.marks(),
            attempted: entry.attempted(),
            source: MarkSource::Override,
        };
    }

    let flag = fallback.is_attempted();

    if let Some(sub) = meta.and_then(|meta| meta.get(question_id)) {
        return ResolvedMark {
            marks: sub.marks,
            attempted: sub.is_attempted.or(flag).unwrap_or(true),
            source: MarkSource::CompositeMeta,
        };
    }

    if let Some(marks) = fallback.first_mark() {
        return ResolvedMark {
            marks,
            attempted: flag.unwrap_or(true),
            source: MarkSource::NodeField,
        };
    }

    ResolvedMark { marks: 0.0, attempted: flag.unwrap_or(true), source: MarkSource::Default }
}
