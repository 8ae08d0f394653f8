use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::errors::MarkingError;
use super::overrides::OverrideStore;
use super::resolver::resolve;
use super::validator::{validate_both, MarkLookup};
use crate::paper::{AttemptedPaper, PaperId, QuestionId, SectionQuestion, StudentExamRecord};

/// One question in the payload sent to the persistence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub question_id: QuestionId,
    pub marks: f64,
    pub is_attempted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_questions: Option<Vec<QuestionPayload>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    pub question_data: Vec<QuestionPayload>,
    pub obtained_marks: f64,
    pub question_paper_id: Option<PaperId>,
}

/// Payload entry for one flat question. Parents report the sum of their resolved
/// sub-questions and count as attempted when any sub-question is.
pub fn build_question_payload(
    question: &SectionQuestion,
    student: &str,
    overrides: &OverrideStore,
) -> QuestionPayload {
    if question.has_sub_questions() {
        let children: Vec<QuestionPayload> = question
            .sub_questions
            .iter()
            .map(|sub| build_question_payload(sub, student, overrides))
            .collect();
        return QuestionPayload {
            question_id: question.question_id,
            marks: children.iter().map(|child| child.marks).sum(),
            is_attempted: children.iter().any(|child| child.is_attempted),
            sub_questions: Some(children),
        };
    }

    let resolved = resolve(question.question_id, student, overrides, None, &question.fields);
    QuestionPayload {
        question_id: question.question_id,
        marks: resolved.marks,
        is_attempted: resolved.attempted,
        sub_questions: None,
    }
}

/// Lookup over the nested payload. The first occurrence of an id, in preorder, wins.
pub struct NestedMarks<'a>(pub &'a [QuestionPayload]);

impl MarkLookup for NestedMarks<'_> {
    fn marks_of(&self, question_id: QuestionId) -> f64 {
        find_entry(self.0, question_id).map(|entry| entry.marks).unwrap_or(0.0)
    }
}

fn find_entry(entries: &[QuestionPayload], question_id: QuestionId) -> Option<&QuestionPayload> {
    for entry in entries {
        if entry.question_id == question_id {
            return Some(entry);
        }
        if let Some(found) =
            entry.sub_questions.as_deref().and_then(|subs| find_entry(subs, question_id))
        {
            return Some(found);
        }
    }
    None
}

/// Flattens every level of the payload into one map. A repeated id keeps the
/// value written last.
pub fn flatten_marks(entries: &[QuestionPayload]) -> HashMap<QuestionId, f64> {
    let mut flat = HashMap::new();
    fn visit(entries: &[QuestionPayload], flat: &mut HashMap<QuestionId, f64>) {
        for entry in entries {
            flat.insert(entry.question_id, entry.marks);
            if let Some(subs) = entry.sub_questions.as_deref() {
                visit(subs, flat);
            }
        }
    }
    visit(entries, &mut flat);
    flat
}

/// The paper a submission is built from: the session's selection when it names one
/// of the record's papers, else the answered paper, else the first.
pub fn active_paper(
    record: &StudentExamRecord,
    selected: Option<PaperId>,
) -> Option<&AttemptedPaper> {
    selected.and_then(|paper_id| record.paper(paper_id)).or_else(|| record.default_paper())
}

/// Resolves, validates and totals one student's marks for persisting.
pub fn prepare_submission(
    record: &StudentExamRecord,
    selected: Option<PaperId>,
    overrides: &OverrideStore,
) -> Result<SubmissionPayload, MarkingError> {
    let paper = active_paper(record, selected).ok_or(MarkingError::MissingSelection)?;
    let student = record.student_key();
    let sections = paper.effective_sections();

    let question_data: Vec<QuestionPayload> = sections
        .iter()
        .flat_map(|section| section.questions.iter())
        .map(|question| build_question_payload(question, student, overrides))
        .collect();

    let flat = flatten_marks(&question_data);
    validate_both(&sections, &NestedMarks(&question_data), &flat)?;

    let obtained_marks: f64 = question_data.iter().map(|entry| entry.marks).sum();
    if obtained_marks == 0.0 {
        return Err(MarkingError::EmptySubmission);
    }

    Ok(SubmissionPayload {
        question_data,
        obtained_marks,
        question_paper_id: paper.question_paper_id,
    })
}
