//! Mark resolution, aggregation and attempt validation over a paper tree.
//!
//! All functions here are pure: session state such as pending overrides is owned
//! by the caller and passed in by reference.

mod aggregate;
mod errors;
mod overrides;
mod resolver;
mod submission;
mod validator;

pub use aggregate::{aggregate_composite, composite_totals, paper_total, section_total};
pub use errors::{AttemptViolation, MarkInputError, MarkingError};
pub use overrides::{EntryOutcome, MarkKey, MarkOverride, OverrideStore};
pub use resolver::{resolve, CompositeMeta, MarkSource, ResolvedMark, SubQuestionMeta};
pub use submission::{
    active_paper, build_question_payload, flatten_marks, prepare_submission, NestedMarks,
    QuestionPayload, SubmissionPayload,
};
pub use validator::{validate_both, validate_sections, MarkLookup};
