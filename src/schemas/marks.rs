use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::marks::{QuestionPayload, SubmissionPayload};
use crate::paper::{AttendanceStatus, PaperId, QuestionId, RecordId};
use crate::report::Row;
use crate::services::exam_marks_client::{ExamMarksQuery, SortOrder, SortSpec};

/// Listing filters shared by the marks page and the report.
#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct ListMarksQuery {
    #[serde(default)]
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub(crate) page: Option<u32>,
    #[serde(default, alias = "pageSize")]
    #[validate(range(min = 1, max = 500, message = "page_size must be between 1 and 500"))]
    pub(crate) page_size: Option<u32>,
    #[serde(default, alias = "searchQuery")]
    #[validate(length(max = 200, message = "search must be at most 200 characters"))]
    pub(crate) search: Option<String>,
    /// Comma-separated section ids.
    #[serde(default, alias = "sectionId")]
    pub(crate) section_id: Option<String>,
    #[serde(default, alias = "sortField")]
    #[validate(length(min = 1, max = 64, message = "sort_field must not be empty"))]
    pub(crate) sort_field: Option<String>,
    #[serde(default, alias = "sortOrder")]
    pub(crate) sort_order: Option<SortOrder>,
}

impl ListMarksQuery {
    pub(crate) fn section_ids(&self) -> Result<Vec<i64>, String> {
        let Some(raw) = self.section_id.as_deref() else {
            return Ok(Vec::new());
        };
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| item.parse::<i64>().map_err(|_| format!("Invalid section id '{item}'")))
            .collect()
    }

    pub(crate) fn to_upstream(
        &self,
        exam_id: i64,
        default_page_size: u32,
    ) -> Result<ExamMarksQuery, String> {
        let mut query = ExamMarksQuery::new(exam_id, self.page_size.unwrap_or(default_page_size));
        query.page = self.page.unwrap_or(1);
        query.search = self.search.clone();
        query.section_ids = self.section_ids()?;
        query.sort = self.sort_field.clone().map(|field| SortSpec {
            field,
            order: self.sort_order.unwrap_or(SortOrder::Asc),
        });
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MarkEntryRequest {
    #[serde(alias = "questionId")]
    pub(crate) question_id: QuestionId,
    /// Raw cell text: a number, `NA`, or blank to clear.
    #[serde(default)]
    pub(crate) value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PaperSelectionRequest {
    #[serde(alias = "questionPaperId")]
    pub(crate) question_paper_id: PaperId,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AttendanceUpdateRequest {
    #[serde(alias = "recordIds")]
    #[validate(length(min = 1, message = "record_ids must not be empty"))]
    pub(crate) record_ids: Vec<RecordId>,
    #[serde(alias = "attendanceStatus")]
    pub(crate) attendance_status: AttendanceStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct PaperView {
    pub(crate) question_paper_id: Option<PaperId>,
    pub(crate) tag: Option<String>,
    pub(crate) is_attempted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CompositeView {
    pub(crate) question_id: QuestionId,
    pub(crate) total: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SectionView {
    pub(crate) name: Option<String>,
    pub(crate) attemptable_questions: u32,
    pub(crate) question_count: usize,
    pub(crate) composites: Vec<CompositeView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecordView {
    pub(crate) id: RecordId,
    pub(crate) student_id: Option<String>,
    pub(crate) name: String,
    pub(crate) section: Option<String>,
    pub(crate) attendance_status: AttendanceStatus,
    pub(crate) selected_paper_id: Option<PaperId>,
    pub(crate) papers: Vec<PaperView>,
    pub(crate) obtained_marks: Option<f64>,
    pub(crate) total_marks: Option<f64>,
    pub(crate) has_pending_marks: bool,
    pub(crate) sections: Vec<SectionView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkingPageResponse {
    pub(crate) exam_id: i64,
    pub(crate) count: u32,
    pub(crate) records: Vec<RecordView>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EntryResponse {
    pub(crate) question_id: QuestionId,
    /// `None` once the entry is cleared.
    pub(crate) marks: Option<f64>,
    pub(crate) is_attempted: Option<bool>,
    pub(crate) record: RecordView,
}

#[derive(Debug, Serialize)]
pub(crate) struct PreviewResponse {
    pub(crate) record_id: RecordId,
    pub(crate) question_data: Vec<QuestionPayload>,
    pub(crate) obtained_marks: f64,
    pub(crate) question_paper_id: Option<PaperId>,
}

impl PreviewResponse {
    pub(crate) fn new(record_id: RecordId, payload: SubmissionPayload) -> Self {
        Self {
            record_id,
            question_data: payload.question_data,
            obtained_marks: payload.obtained_marks,
            question_paper_id: payload.question_paper_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) obtained_marks: f64,
    pub(crate) cleared_entries: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttendanceResponse {
    pub(crate) updated: usize,
    pub(crate) attendance_status: AttendanceStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReportResponse {
    pub(crate) exam_id: i64,
    pub(crate) generated_at: String,
    pub(crate) record_count: usize,
    pub(crate) rows: Vec<Row>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_filter_parses_csv() {
        let query = ListMarksQuery { section_id: Some("3, 4,,".to_string()), ..Default::default() };
        assert_eq!(query.section_ids(), Ok(vec![3, 4]));

        let broken = ListMarksQuery { section_id: Some("3,x".to_string()), ..Default::default() };
        assert_eq!(broken.section_ids(), Err("Invalid section id 'x'".to_string()));
    }

    #[test]
    fn upstream_query_defaults() {
        let query = ListMarksQuery {
            sort_field: Some("name".to_string()),
            ..Default::default()
        };
        let upstream = query.to_upstream(8, 10).expect("query");
        assert_eq!(upstream.page, 1);
        assert_eq!(upstream.page_size, 10);
        assert_eq!(upstream.sort, Some(SortSpec { field: "name".to_string(), order: SortOrder::Asc }));
        assert!(!upstream.fetch_all);
    }

    #[test]
    fn rejects_zero_page_and_empty_attendance() {
        let query = ListMarksQuery { page: Some(0), ..Default::default() };
        assert!(query.validate().is_err());

        let request = AttendanceUpdateRequest {
            record_ids: Vec::new(),
            attendance_status: AttendanceStatus::Absent,
        };
        assert!(request.validate().is_err());
    }
}
