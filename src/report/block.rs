use std::borrow::Cow;

use super::cell::{fixed, Cell, Row};
use super::numbering::QuestionNumbering;
use super::rollup;
use crate::marks::{resolve, OverrideStore};
use crate::paper::{AttemptedPaper, Section, SectionQuestion, StudentExamRecord};

const IDENTITY_COLUMNS: [&str; 5] = ["Index", "Section", "Scholar ID", "Name of Student", "Tag"];

/// Everything the passes of one report block share.
pub(super) struct Block<'a> {
    pub(super) tag: &'a str,
    pub(super) students: &'a [&'a StudentExamRecord],
    pub(super) sections: Cow<'a, [Section]>,
    pub(super) numbering: QuestionNumbering,
    pub(super) class_sections: Vec<&'a str>,
}

impl<'a> Block<'a> {
    fn new(students: &'a [&'a StudentExamRecord], tag: &'a str) -> Option<Self> {
        let first = students.first()?;
        let variant = first.first_paper_with_tag(tag).or_else(|| first.default_paper());
        let sections = variant.map(AttemptedPaper::effective_sections).unwrap_or(Cow::Borrowed(&[]));
        let numbering = QuestionNumbering::assign(&sections);

        let mut class_sections: Vec<&str> =
            students.iter().filter_map(|student| student.section_title()).collect();
        class_sections.sort_unstable();
        class_sections.dedup();

        Some(Self { tag, students, sections, numbering, class_sections })
    }

    /// Flat questions of every section, in column order.
    pub(super) fn columns(&self) -> impl Iterator<Item = (&Section, usize, &SectionQuestion)> {
        self.sections.iter().flat_map(|section| {
            section.questions.iter().enumerate().map(move |(index, question)| (section, index, question))
        })
    }

    pub(super) fn students_in(&self, class_section: &str) -> Vec<&'a StudentExamRecord> {
        self.students
            .iter()
            .copied()
            .filter(|student| student.section_title() == Some(class_section))
            .collect()
    }
}

/// The mark a stored question carries, read through the alias table.
pub(super) fn stored_mark(question: &SectionQuestion) -> Option<f64> {
    let resolved = resolve(question.question_id, "", &OverrideStore::new(), None, &question.fields);
    resolved.has_value().then_some(resolved.marks)
}

fn text_or_blank(value: Option<&str>) -> Cell {
    value.map(Cell::text).unwrap_or(Cell::Blank)
}

fn number_or_blank(value: Option<f64>) -> Cell {
    value.map(Cell::Number).unwrap_or(Cell::Blank)
}

/// One complete block for the students whose answered paper carries `tag`.
pub(crate) fn build_block(students: &[&StudentExamRecord], tag: &str) -> Vec<Row> {
    let Some(block) = Block::new(students, tag) else {
        return Vec::new();
    };

    let mut rows = vec![info_row(&block)];
    rows.extend(header_rows(&block));

    let data = data_rows(&block);
    let width = data.first().map(Vec::len).unwrap_or(0);
    let percentages = percentage_row(&block, &data, width);
    rows.extend(data);
    rows.push(vec![Cell::Blank; width]);
    rows.push(vec![
        Cell::Blank,
        Cell::Blank,
        Cell::Blank,
        Cell::text("Number of Student"),
        Cell::from(block.students.len()),
    ]);
    rows.push(percentages);

    if !block.sections.is_empty() {
        rows.push(Vec::new());
        rows.extend(rollup::section_wise(&block));
        rows.push(Vec::new());
        rows.extend(rollup::chapter_wise(&block));
    }

    rows.push(Vec::new());
    rows.push(Vec::new());
    rows
}

fn info_row(block: &Block<'_>) -> Row {
    let first = block.students.first();
    let class_name = first.and_then(|student| student.grade_title()).unwrap_or("N/A");
    let exam_name = first.and_then(|student| student.exam_name()).unwrap_or("N/A");
    vec![Cell::text(format!(
        "{class_name}_Section-{}_{exam_name}_Set-{}",
        block.class_sections.join(", "),
        block.tag
    ))]
}

fn header_rows(block: &Block<'_>) -> Vec<Row> {
    let mut spans: Row = IDENTITY_COLUMNS.iter().map(|name| Cell::text(*name)).collect();
    for section in block.sections.iter().filter(|section| !section.questions.is_empty()) {
        spans.push(Cell::text(format!("Section - {}", section.name.as_deref().unwrap_or_default())));
        spans.extend(std::iter::repeat(Cell::Blank).take(section.questions.len() - 1));
    }
    spans.push(Cell::text("Total Obtained Marks"));
    spans.push(Cell::text("Total Marks"));

    let mut numbers = vec![Cell::Blank; 5];
    let mut chapters = vec![Cell::Blank; 5];
    let mut types = vec![Cell::Blank; 5];
    let mut maxima = vec![Cell::Blank; 5];
    for (_, _, question) in block.columns() {
        numbers.push(Cell::text(block.numbering.label("Q", question.question_id)));
        chapters.push(text_or_blank(question.chapter.as_deref()));
        types.push(text_or_blank(question.question_type.as_deref()));
        maxima.push(number_or_blank(question.max_marks.filter(|max| *max != 0.0)));
    }

    let mut rows = vec![spans, numbers, chapters, types, maxima];
    for row in rows.iter_mut().skip(1) {
        row.extend([Cell::Blank, Cell::Blank]);
    }
    rows
}

fn data_rows(block: &Block<'_>) -> Vec<Row> {
    block
        .students
        .iter()
        .enumerate()
        .map(|(index, student)| {
            let paper = student.paper_for_tag(block.tag);
            let tag = paper.and_then(AttemptedPaper::tag).unwrap_or(block.tag);

            let mut row = vec![
                Cell::from(index + 1),
                text_or_blank(student.section_title()),
                text_or_blank(student.student_id.as_deref()),
                Cell::text(student.display_name()),
                Cell::text(tag),
            ];

            if let Some(paper) = paper {
                for section in paper.effective_sections().iter() {
                    for question in &section.questions {
                        row.push(if question.is_attempted() == Some(false) {
                            Cell::text("N/A")
                        } else {
                            number_or_blank(stored_mark(question))
                        });
                    }
                }
            }

            row.push(number_or_blank(student.obtained_marks));
            row.push(number_or_blank(student.total_marks));
            row
        })
        .collect()
}

/// Mean percentage per question column, then the summed obtained marks.
fn percentage_row(block: &Block<'_>, data: &[Row], width: usize) -> Row {
    let maxima: Vec<f64> =
        block.columns().map(|(_, _, question)| question.max_marks.unwrap_or(0.0)).collect();

    let mut row = vec![Cell::Blank; 5];
    for column in 5..width.saturating_sub(2) {
        let max = maxima.get(column - 5).copied().unwrap_or(0.0);
        if max <= 0.0 {
            row.push(Cell::text("0.00 %"));
            continue;
        }

        let mut total = 0.0;
        let mut counted = 0usize;
        for cells in data {
            if let Some(marks) = Cell::percent_input(cells.get(column)) {
                total += marks / max * 100.0;
                counted += 1;
            }
        }
        if counted == 0 {
            row.push(Cell::text("0.00 %"));
        } else {
            let mean = total / (counted as f64 * 100.0) * 100.0;
            row.push(Cell::text(format!("{} %", fixed(mean, 2))));
        }
    }

    let obtained: f64 =
        block.students.iter().map(|student| student.obtained_marks.unwrap_or(0.0)).sum();
    row.push(Cell::text(fixed(obtained, 2)));
    row.push(Cell::Blank);
    row
}
