use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::core::metrics;
use crate::marks::{
    active_paper, composite_totals, paper_total, prepare_submission, EntryOutcome, MarkKey,
    MarkingError, OverrideStore, SubmissionPayload,
};
use crate::paper::{AttendanceStatus, PaperId, QuestionId, RecordId, StudentExamRecord};
use crate::report::{build_report, ReportOptions, Row};
use crate::schemas::marks::{CompositeView, PaperView, RecordView, SectionView};
use crate::services::exam_marks_client::{ExamMarksGateway, ExamMarksPage, ExamMarksQuery, UpstreamError};

pub(crate) fn upstream_failure(err: UpstreamError) -> MarkingError {
    MarkingError::Upstream(err.to_string())
}

/// Marking state for one exam: the fetched page, pending edits and the paper
/// variant chosen per record. Edits are held per record so students sharing a
/// first name never see each other's marks.
#[derive(Debug, Default)]
pub(crate) struct MarkingSession {
    overrides: HashMap<RecordId, OverrideStore>,
    selections: HashMap<RecordId, PaperId>,
    records: Vec<StudentExamRecord>,
    count: u32,
    last_query: Option<ExamMarksQuery>,
}

impl MarkingSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot. Valid selections survive; records without one get
    /// their answered paper, else their first; selections of vanished records go.
    pub(crate) fn refresh(&mut self, page: ExamMarksPage, query: ExamMarksQuery) {
        let mut selections = HashMap::with_capacity(page.records.len());
        for record in &page.records {
            let kept = self
                .selections
                .get(&record.id)
                .copied()
                .filter(|paper_id| record.paper(*paper_id).is_some());
            let selected =
                kept.or_else(|| record.default_paper().and_then(|paper| paper.question_paper_id));
            if let Some(paper_id) = selected {
                selections.insert(record.id, paper_id);
            }
        }

        self.selections = selections;
        self.records = page.records;
        self.count = page.count;
        self.last_query = Some(query);
    }

    pub(crate) fn count(&self) -> u32 {
        self.count
    }

    pub(crate) fn last_query(&self) -> Option<&ExamMarksQuery> {
        self.last_query.as_ref()
    }

    pub(crate) fn record(&self, record_id: RecordId) -> Result<&StudentExamRecord, MarkingError> {
        self.records
            .iter()
            .find(|record| record.id == record_id)
            .ok_or(MarkingError::RecordNotFound(record_id))
    }

    pub(crate) fn selected_paper(&self, record_id: RecordId) -> Option<PaperId> {
        self.selections.get(&record_id).copied()
    }

    pub(crate) fn select_paper(
        &mut self,
        record_id: RecordId,
        paper_id: PaperId,
    ) -> Result<(), MarkingError> {
        let record = self.record(record_id)?;
        if record.paper(paper_id).is_none() {
            return Err(MarkingError::UnknownPaper(paper_id));
        }
        self.selections.insert(record_id, paper_id);
        Ok(())
    }

    /// Interactive edit of one cell, bounded by the question's maximum on the
    /// record's active paper.
    pub(crate) fn enter_mark(
        &mut self,
        record_id: RecordId,
        question_id: QuestionId,
        raw: &str,
    ) -> Result<EntryOutcome, MarkingError> {
        let record = self.record(record_id)?;
        let paper = active_paper(record, self.selected_paper(record_id))
            .ok_or(MarkingError::MissingSelection)?;
        let max_marks =
            paper.max_marks_for(question_id).ok_or(MarkingError::UnknownQuestion(question_id))?;

        let key = MarkKey::new(question_id, record.student_key());
        let store = self.overrides.entry(record_id).or_default();
        let outcome = store.enter(key, raw, max_marks);
        if store.is_empty() {
            self.overrides.remove(&record_id);
        }
        Ok(outcome?)
    }

    /// Builds the record's payload along with a copy of the edits it was built
    /// from.
    pub(crate) fn prepare_submission(
        &self,
        record_id: RecordId,
    ) -> Result<(SubmissionPayload, OverrideStore), MarkingError> {
        let record = self.record(record_id)?;
        let edits = self.overrides.get(&record_id).cloned().unwrap_or_default();
        let payload = prepare_submission(record, self.selected_paper(record_id), &edits)?;
        Ok((payload, edits))
    }

    /// Drops the record's edits that went out in `submitted`. Anything entered
    /// while the save was in flight stays pending.
    pub(crate) fn settle_submission(
        &mut self,
        record_id: RecordId,
        submitted: &OverrideStore,
    ) -> usize {
        let Some(store) = self.overrides.get_mut(&record_id) else {
            return 0;
        };
        let cleared = store.discard_submitted(submitted);
        if store.is_empty() {
            self.overrides.remove(&record_id);
        }
        cleared
    }

    /// Applies attendance locally for records the upstream did not echo back.
    fn set_attendance(&mut self, record_ids: &[RecordId], status: AttendanceStatus) {
        for record in self.records.iter_mut().filter(|record| record_ids.contains(&record.id)) {
            record.attendance_status = Some(status);
        }
    }

    pub(crate) fn view(&self, record_id: RecordId) -> Result<RecordView, MarkingError> {
        self.record(record_id).map(|record| self.record_view(record))
    }

    pub(crate) fn views(&self) -> Vec<RecordView> {
        self.records.iter().map(|record| self.record_view(record)).collect()
    }

    fn record_view(&self, record: &StudentExamRecord) -> RecordView {
        let student = record.student_key();
        let selected = self.selected_paper(record.id);
        let paper = active_paper(record, selected);
        let no_edits = OverrideStore::new();
        let overrides = self.overrides.get(&record.id).unwrap_or(&no_edits);
        let pending = !overrides.is_empty();

        let obtained_marks = match paper {
            Some(paper) if pending => Some(paper_total(paper, student, overrides)),
            _ => record.obtained_marks,
        };

        let sections = paper
            .map(|paper| {
                paper
                    .effective_sections()
                    .iter()
                    .map(|section| SectionView {
                        name: section.name.clone(),
                        attemptable_questions: section.attemptable_questions,
                        question_count: section.countable_ids().len(),
                        composites: composite_totals(section, student, overrides)
                            .into_iter()
                            .map(|(question_id, total)| CompositeView { question_id, total })
                            .collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        RecordView {
            id: record.id,
            student_id: record.student_id.clone(),
            name: record.display_name(),
            section: record.section_title().map(str::to_string),
            attendance_status: record.attendance(),
            selected_paper_id: selected,
            papers: record
                .papers
                .iter()
                .map(|paper| PaperView {
                    question_paper_id: paper.question_paper_id,
                    tag: paper.tag.clone(),
                    is_attempted: paper.attempted(),
                })
                .collect(),
            obtained_marks,
            total_marks: record.total_marks,
            has_pending_marks: pending,
            sections,
        }
    }
}

/// One session per exam id.
#[derive(Debug, Default)]
pub(crate) struct MarkingSessions {
    sessions: RwLock<HashMap<i64, MarkingSession>>,
}

impl MarkingSessions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn with_session<R>(
        &self,
        exam_id: i64,
        apply: impl FnOnce(&mut MarkingSession) -> R,
    ) -> R {
        let mut sessions = self.sessions.write().await;
        apply(sessions.entry(exam_id).or_default())
    }

    pub(crate) async fn read_session<R>(
        &self,
        exam_id: i64,
        apply: impl FnOnce(Option<&MarkingSession>) -> R,
    ) -> R {
        let sessions = self.sessions.read().await;
        apply(sessions.get(&exam_id))
    }
}

/// Fetches a page and makes it the exam's current snapshot.
pub(crate) async fn load_page(
    gateway: &dyn ExamMarksGateway,
    sessions: &MarkingSessions,
    query: ExamMarksQuery,
) -> Result<(u32, Vec<RecordView>), MarkingError> {
    let exam_id = query.exam_id;
    let page = gateway.fetch_exam_marks(&query).await.map_err(|err| {
        tracing::error!(exam_id, error = %err, "Failed to fetch exam marks");
        upstream_failure(err)
    })?;

    Ok(sessions
        .with_session(exam_id, |session| {
            session.refresh(page, query);
            (session.count(), session.views())
        })
        .await)
}

/// Re-fetches the exam's last page. A failure leaves the previous snapshot.
async fn reload(gateway: &dyn ExamMarksGateway, sessions: &MarkingSessions, exam_id: i64) {
    let Some(query) =
        sessions.read_session(exam_id, |session| session.and_then(|s| s.last_query().cloned())).await
    else {
        return;
    };

    match gateway.fetch_exam_marks(&query).await {
        Ok(page) => sessions.with_session(exam_id, |session| session.refresh(page, query)).await,
        Err(err) => tracing::warn!(exam_id, error = %err, "Failed to reload exam marks"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SubmitOutcome {
    pub(crate) message: Option<String>,
    pub(crate) obtained_marks: f64,
    pub(crate) cleared_entries: usize,
}

/// Validates and persists one record's marks. Pending edits are kept unless the
/// upstream accepts the payload, and then only the submitted ones are dropped.
pub(crate) async fn submit(
    gateway: &dyn ExamMarksGateway,
    sessions: &MarkingSessions,
    exam_id: i64,
    record_id: RecordId,
) -> Result<SubmitOutcome, MarkingError> {
    let prepared =
        sessions.with_session(exam_id, |session| session.prepare_submission(record_id)).await;
    let (payload, submitted) = match prepared {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::info!(exam_id, record_id, kind = err.kind(), error = %err, "Submission rejected");
            metrics::record_validation_failure(err.kind());
            metrics::record_submission("invalid");
            return Err(err);
        }
    };

    let outcome = match gateway.persist_marks(record_id, &payload).await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(exam_id, record_id, error = %err, "Failed to persist marks");
            metrics::record_submission("upstream_error");
            return Err(upstream_failure(err));
        }
    };

    let cleared_entries = sessions
        .with_session(exam_id, |session| session.settle_submission(record_id, &submitted))
        .await;
    reload(gateway, sessions, exam_id).await;

    metrics::record_submission("persisted");
    tracing::info!(
        exam_id,
        record_id,
        obtained_marks = payload.obtained_marks,
        cleared_entries,
        "Marks persisted"
    );
    Ok(SubmitOutcome { message: outcome.message, obtained_marks: payload.obtained_marks, cleared_entries })
}

pub(crate) async fn update_attendance(
    gateway: &dyn ExamMarksGateway,
    sessions: &MarkingSessions,
    exam_id: i64,
    record_ids: &[RecordId],
    status: AttendanceStatus,
) -> Result<usize, MarkingError> {
    let updated = gateway.persist_attendance(record_ids, status).await.map_err(|err| {
        tracing::warn!(exam_id, records = record_ids.len(), error = %err, "Attendance update failed");
        upstream_failure(err)
    })?;

    sessions.with_session(exam_id, |session| session.set_attendance(record_ids, status)).await;
    reload(gateway, sessions, exam_id).await;

    tracing::info!(exam_id, records = record_ids.len(), echoed = updated.len(), status = %status, "Attendance updated");
    Ok(record_ids.len())
}

/// Fetches every record matching the query's filters and lays out the report.
pub(crate) async fn fetch_report(
    gateway: &dyn ExamMarksGateway,
    query: &ExamMarksQuery,
    options: &ReportOptions,
) -> Result<(usize, Vec<Row>), MarkingError> {
    let page = gateway.fetch_exam_marks(&query.all()).await.map_err(|err| {
        tracing::error!(exam_id = query.exam_id, error = %err, "Failed to fetch report records");
        upstream_failure(err)
    })?;

    let rows = build_report(&page.records, options);
    metrics::record_report_built();
    tracing::info!(
        exam_id = query.exam_id,
        records = page.records.len(),
        rows = rows.len(),
        "Report built"
    );
    Ok((page.records.len(), rows))
}
