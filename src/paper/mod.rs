//! Question paper structure and the per-student exam records built on it.
//!
//! Everything here decodes tolerantly from upstream JSON: malformed entries are
//! dropped at the list level instead of failing a whole record.

pub(crate) mod de;
mod fields;
mod node;
mod record;
mod tree;

pub use fields::{FieldBag, MARK_VALUE_ALIASES};
pub use node::{CompositeNode, GroupKind, GroupNode, Node, QuestionNode};
pub use record::{
    AttemptedPaper, AttendanceStatus, ExamInfo, Section, SectionQuestion, StudentExamRecord,
    StudentProfile, Titled,
};
pub use tree::walk;

pub type QuestionId = i64;
pub type PaperId = i64;
pub type RecordId = i64;
