use super::block::{stored_mark, Block};
use super::cell::{fixed, Cell, Row};
use crate::paper::{SectionQuestion, StudentExamRecord};

const UNKNOWN_CHAPTER: &str = "Unknown Chapter";

/// Per class section, the mean percentage each question earned; then the same
/// over every student of the block.
pub(super) fn section_wise(block: &Block<'_>) -> Vec<Row> {
    let mut header = vec![Cell::Blank, Cell::Blank];
    header.extend(
        block
            .columns()
            .map(|(_, _, question)| Cell::text(block.numbering.label("Q-", question.question_id))),
    );

    let mut rows = vec![header];
    for class_section in &block.class_sections {
        let students = block.students_in(class_section);
        rows.push(performance_row(block, format!("Section - {class_section}"), &students));
    }
    rows.push(performance_row(block, "Overall Performance".to_string(), block.students));
    rows
}

fn performance_row(block: &Block<'_>, label: String, students: &[&StudentExamRecord]) -> Row {
    let mut row = vec![Cell::Blank, Cell::text(label)];
    for (section, index, question) in block.columns() {
        let max = question.max_marks.unwrap_or(0.0);
        if max <= 0.0 || students.is_empty() {
            row.push(Cell::text("0.00 %"));
            continue;
        }

        // Students are matched by section name and position, not by question id.
        let total: f64 = students
            .iter()
            .filter_map(|student| {
                let paper = student.first_paper_with_tag(block.tag)?;
                let sections = paper.effective_sections();
                let own = sections.iter().find(|own| own.name == section.name)?;
                own.questions.get(index).map(|own| stored_mark(own).unwrap_or(0.0))
            })
            .map(|marks| marks / max * 100.0)
            .sum();

        let mean = total / (students.len() as f64 * 100.0) * 100.0;
        row.push(Cell::text(format!("{} %", fixed(mean, 2))));
    }
    row
}

/// Questions grouped by chapter in first-seen order; for each chapter a header of
/// question numbers and one row per class section with per-question percentages
/// and the chapter's obtained, maximum and percentage.
pub(super) fn chapter_wise(block: &Block<'_>) -> Vec<Row> {
    let mut chapters: Vec<(&str, Vec<&SectionQuestion>)> = Vec::new();
    for (_, _, question) in block.columns() {
        let chapter = question.chapter.as_deref().unwrap_or(UNKNOWN_CHAPTER);
        match chapters.iter_mut().find(|(name, _)| *name == chapter) {
            Some((_, questions)) => questions.push(question),
            None => chapters.push((chapter, vec![question])),
        }
    }

    let mut rows = Vec::new();
    for (chapter, questions) in &chapters {
        let mut header = vec![Cell::text(*chapter), Cell::Blank, Cell::Blank];
        header.extend(
            questions
                .iter()
                .map(|question| Cell::text(block.numbering.label("Q. ", question.question_id))),
        );
        header.extend([Cell::text("Obtained"), Cell::text("Total"), Cell::text("%age")]);
        rows.push(header);

        for class_section in &block.class_sections {
            let students = block.students_in(class_section);
            rows.push(chapter_row(block, class_section, questions, &students));
        }
        rows.push(Vec::new());
    }
    rows
}

fn chapter_row(
    block: &Block<'_>,
    class_section: &str,
    questions: &[&SectionQuestion],
    students: &[&StudentExamRecord],
) -> Row {
    let mut row = vec![Cell::Blank, Cell::Blank, Cell::text(class_section)];
    let mut chapter_obtained = 0.0;
    let mut chapter_max = 0.0;

    for question in questions {
        let mut obtained = 0.0;
        let mut max = 0.0;
        for student in students {
            let Some(paper) = student.first_paper_with_tag(block.tag) else {
                continue;
            };
            for section in paper.effective_sections().iter() {
                if let Some(own) = section.question(question.question_id) {
                    obtained += stored_mark(own).unwrap_or(0.0);
                    max += own.max_marks.unwrap_or(0.0);
                }
            }
        }

        row.push(Cell::text(format!("{}%", percent(obtained, max))));
        chapter_obtained += obtained;
        chapter_max += max;
    }

    row.push(Cell::text(fixed(chapter_obtained, 2)));
    row.push(Cell::text(fixed(chapter_max, 0)));
    row.push(Cell::text(format!("{}%", percent(chapter_obtained, chapter_max))));
    row
}

fn percent(obtained: f64, max: f64) -> String {
    if max > 0.0 {
        fixed(obtained / max * 100.0, 2)
    } else {
        "0.00".to_string()
    }
}
