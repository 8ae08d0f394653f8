use std::collections::HashMap;

use super::errors::AttemptViolation;
use crate::paper::{Node, QuestionId, Section};

/// Source of per-question marks for attempt counting. A positive mark counts as
/// an attempt.
pub trait MarkLookup {
    fn marks_of(&self, question_id: QuestionId) -> f64;

    fn is_attempted(&self, question_id: QuestionId) -> bool {
        self.marks_of(question_id) > 0.0
    }
}

impl MarkLookup for HashMap<QuestionId, f64> {
    fn marks_of(&self, question_id: QuestionId) -> f64 {
        self.get(&question_id).copied().unwrap_or(0.0)
    }
}

/// Checks OR groups and section caps, section by section in declaration order.
/// Within a section every OR group is checked (preorder, parent before children)
/// before the section cap. Returns the first violation.
pub fn validate_sections(
    sections: &[Section],
    marks: &impl MarkLookup,
) -> Result<(), AttemptViolation> {
    for section in sections {
        validate_groups(&section.nodes, marks)?;
        validate_section_cap(section, marks)?;
    }
    Ok(())
}

fn validate_groups(nodes: &[Node], marks: &impl MarkLookup) -> Result<(), AttemptViolation> {
    for node in nodes {
        if let Node::Group(group) = node {
            if group.is_or() {
                let pick_count = group.effective_pick_count();
                let attempted =
                    group.members().into_iter().filter(|id| marks.is_attempted(*id)).count();
                if attempted > pick_count as usize {
                    return Err(AttemptViolation::Group {
                        label: group.label().to_string(),
                        pick_count,
                        attempted,
                    });
                }
            }
        }
        validate_groups(node.children(), marks)?;
    }
    Ok(())
}

fn validate_section_cap(section: &Section, marks: &impl MarkLookup) -> Result<(), AttemptViolation> {
    let limit = section.attemptable_questions;
    if limit == 0 {
        return Ok(());
    }

    let ids = section.countable_ids();
    let attempted = ids.iter().filter(|id| marks.is_attempted(**id)).count();
    if attempted > limit as usize {
        return Err(AttemptViolation::Section {
            section: section.display_name().to_string(),
            limit,
            attempted,
            total: ids.len(),
        });
    }
    Ok(())
}

/// Runs the authoritative check and the cross-check. A cross-check failure the
/// authoritative pass did not report is surfaced as [`AttemptViolation::PassMismatch`].
pub fn validate_both(
    sections: &[Section],
    authoritative: &impl MarkLookup,
    cross_check: &impl MarkLookup,
) -> Result<(), AttemptViolation> {
    validate_sections(sections, authoritative)?;
    validate_sections(sections, cross_check)
        .map_err(|violation| AttemptViolation::PassMismatch(Box::new(violation)))
}
