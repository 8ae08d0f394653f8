use thiserror::Error;

use crate::paper::{PaperId, QuestionId, RecordId};

/// Rejected mark entry. The previous value for the key is left in place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkInputError {
    #[error("Marks cannot be more than {max}")]
    AboveMax { max: f64 },
    #[error("Marks cannot be less than 0")]
    Negative,
}

/// First attempt-count rule a student's marks break.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptViolation {
    #[error("Only {pick_count} question(s) can be attempted in {label}. You have attempted {attempted}.")]
    Group { label: String, pick_count: u32, attempted: usize },
    #[error(
        "Section {section}: Only {limit} question(s) can be attempted out of {total}. You have attempted {attempted} questions."
    )]
    Section { section: String, limit: u32, attempted: usize, total: usize },
    #[error("Attempt checks disagree for the submitted marks: {0}")]
    PassMismatch(Box<AttemptViolation>),
}

impl AttemptViolation {
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptViolation::Group { .. } => "group",
            AttemptViolation::Section { .. } => "section",
            AttemptViolation::PassMismatch(_) => "pass_mismatch",
        }
    }
}

#[derive(Debug, Error)]
pub enum MarkingError {
    #[error(transparent)]
    InvalidMark(#[from] MarkInputError),
    #[error(transparent)]
    AttemptLimit(#[from] AttemptViolation),
    #[error("Select a question paper before submitting marks")]
    MissingSelection,
    #[error("Please enter marks before submitting")]
    EmptySubmission,
    #[error("Exam record {0} not found")]
    RecordNotFound(RecordId),
    #[error("Question {0} is not part of the selected question paper")]
    UnknownQuestion(QuestionId),
    #[error("Question paper {0} is not available for this student")]
    UnknownPaper(PaperId),
    #[error("{0}")]
    Upstream(String),
}

impl MarkingError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            MarkingError::InvalidMark(_) => "invalid_mark",
            MarkingError::AttemptLimit(violation) => violation.kind(),
            MarkingError::MissingSelection => "missing_selection",
            MarkingError::EmptySubmission => "empty_submission",
            MarkingError::RecordNotFound(_) => "record_not_found",
            MarkingError::UnknownQuestion(_) => "unknown_question",
            MarkingError::UnknownPaper(_) => "unknown_paper",
            MarkingError::Upstream(_) => "upstream",
        }
    }
}
