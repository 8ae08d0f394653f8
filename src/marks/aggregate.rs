use super::overrides::OverrideStore;
use super::resolver::{resolve, CompositeMeta};
use crate::paper::{AttemptedPaper, CompositeNode, Node, QuestionId, Section, SectionQuestion};

/// Displayed total of a composite: the sum of every resolvable leaf beneath it,
/// groups and nested composites included. When no leaf resolves to a value the
/// composite's own reported total is returned instead.
pub fn aggregate_composite(
    node: &CompositeNode,
    student: &str,
    fallback_total: f64,
    overrides: &OverrideStore,
    meta: Option<&CompositeMeta>,
) -> f64 {
    let mut total = 0.0;
    let mut found = false;
    sum_leaves(&node.children, student, overrides, meta, &mut total, &mut found);
    if found {
        total
    } else {
        fallback_total
    }
}

fn sum_leaves(
    nodes: &[Node],
    student: &str,
    overrides: &OverrideStore,
    meta: Option<&CompositeMeta>,
    total: &mut f64,
    found: &mut bool,
) {
    for node in nodes {
        match node {
            Node::Question(question) => {
                let resolved =
                    resolve(question.question_id, student, overrides, meta, &question.fields);
                if resolved.has_value() {
                    *total += resolved.marks;
                    *found = true;
                }
            }
            Node::Composite(composite) => {
                sum_leaves(&composite.children, student, overrides, meta, total, found)
            }
            Node::Group(group) => sum_leaves(&group.children, student, overrides, meta, total, found),
        }
    }
}

/// Override-aware total for one section.
pub fn section_total(section: &Section, student: &str, overrides: &OverrideStore) -> f64 {
    let meta = CompositeMeta::from_questions(&section.questions);
    if section.nodes.is_empty() {
        return section
            .questions
            .iter()
            .map(|question| flat_question_total(question, student, overrides))
            .sum();
    }
    nodes_total(&section.nodes, section, student, overrides, &meta)
}

pub fn paper_total(paper: &AttemptedPaper, student: &str, overrides: &OverrideStore) -> f64 {
    paper.effective_sections().iter().map(|section| section_total(section, student, overrides)).sum()
}

/// Displayed totals of every composite in a section, in tree order.
pub fn composite_totals(
    section: &Section,
    student: &str,
    overrides: &OverrideStore,
) -> Vec<(QuestionId, f64)> {
    let meta = CompositeMeta::from_questions(&section.questions);
    let mut totals = Vec::new();
    crate::paper::walk(&section.nodes, &mut |node| {
        if let Node::Composite(composite) = node {
            let fallback = reported_marks(section, composite.question_id);
            totals.push((
                composite.question_id,
                aggregate_composite(composite, student, fallback, overrides, Some(&meta)),
            ));
        }
    });
    totals
}

fn nodes_total(
    nodes: &[Node],
    section: &Section,
    student: &str,
    overrides: &OverrideStore,
    meta: &CompositeMeta,
) -> f64 {
    nodes
        .iter()
        .map(|node| match node {
            Node::Question(question) => {
                // Per-student data lives on the flat list when the tree is structural only.
                let fields = section
                    .question(question.question_id)
                    .map(|flat| &flat.fields)
                    .unwrap_or(&question.fields);
                resolve(question.question_id, student, overrides, Some(meta), fields).marks
            }
            Node::Composite(composite) => {
                let fallback = reported_marks(section, composite.question_id);
                aggregate_composite(composite, student, fallback, overrides, Some(meta))
            }
            Node::Group(group) => nodes_total(&group.children, section, student, overrides, meta),
        })
        .sum()
}

fn flat_question_total(question: &SectionQuestion, student: &str, overrides: &OverrideStore) -> f64 {
    if question.has_sub_questions() {
        return question
            .sub_questions
            .iter()
            .map(|sub| resolve(sub.question_id, student, overrides, None, &sub.fields).marks)
            .sum();
    }
    resolve(question.question_id, student, overrides, None, &question.fields).marks
}

fn reported_marks(section: &Section, question_id: QuestionId) -> f64 {
    section.question(question_id).and_then(SectionQuestion::marks).unwrap_or(0.0)
}
