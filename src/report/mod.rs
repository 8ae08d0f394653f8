//! Cohort report: one block per paper variant with per-student rows, aggregate
//! rows, section-wise and chapter-wise percentage rollups.

mod block;
mod cell;
mod export;
mod numbering;
mod rollup;


use crate::paper::StudentExamRecord;

pub use cell::{Cell, Row};
pub use export::{to_csv_string, write_csv};
pub use numbering::QuestionNumbering;

pub const DEFAULT_TAG_ORDER: &[&str] = &["SET A", "SET B"];

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Tags that lead the report in this order; any other tag follows in first-seen order.
    pub tag_order: Vec<String>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { tag_order: DEFAULT_TAG_ORDER.iter().map(|tag| tag.to_string()).collect() }
    }
}

/// Distinct answered-paper tags of the cohort in report order. Records without a
/// tag do not contribute.
pub fn ordered_tags(records: &[StudentExamRecord], tag_order: &[String]) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    for tag in records.iter().filter_map(StudentExamRecord::attempted_tag) {
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }

    let mut ordered: Vec<String> = tag_order
        .iter()
        .filter(|tag| seen.contains(&tag.as_str()))
        .cloned()
        .collect();
    ordered.extend(
        seen.into_iter()
            .filter(|tag| !tag_order.iter().any(|known| known == tag))
            .map(str::to_string),
    );
    ordered
}

/// Builds every block of the report, concatenated in tag order.
pub fn build_report(records: &[StudentExamRecord], options: &ReportOptions) -> Vec<Row> {
    let mut rows = Vec::new();
    for tag in ordered_tags(records, &options.tag_order) {
        let students: Vec<&StudentExamRecord> = records
            .iter()
            .filter(|record| record.attempted_tag() == Some(tag.as_str()))
            .collect();
        let block = block::build_block(&students, &tag);
        tracing::debug!(tag = %tag, students = students.len(), rows = block.len(), "Built report block");
        rows.extend(block);
    }
    rows
}
