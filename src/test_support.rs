use std::sync::{Arc, Mutex as StdMutex, OnceLock};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::api;
use crate::core::{config::Settings, state::AppState};
use crate::marks::SubmissionPayload;
use crate::paper::{AttendanceStatus, RecordId, StudentExamRecord};
use crate::services::exam_marks_client::{
    ExamMarksGateway, ExamMarksPage, ExamMarksQuery, PersistOutcome, SectionOption, UpstreamError,
};

pub(crate) struct TestContext {
    pub(crate) state: AppState,
    pub(crate) app: Router,
    pub(crate) gateway: Arc<FakeGateway>,
    _guard: OwnedMutexGuard<()>,
}

pub(crate) async fn env_lock() -> OwnedMutexGuard<()> {
    static LOCK: OnceLock<Arc<Mutex<()>>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Arc::new(Mutex::new(()))).clone();
    lock.lock_owned().await
}

pub(crate) fn set_test_env() {
    for key in [
        "MARKING_HOST",
        "MARKING_PORT",
        "API_V1_STR",
        "PROJECT_NAME",
        "VERSION",
        "BACKEND_CORS_ORIGINS",
        "UPSTREAM_API_TOKEN",
        "UPSTREAM_MAX_RETRIES",
        "MARKS_PAGE_SIZE",
        "REPORT_TAG_ORDER",
    ] {
        std::env::remove_var(key);
    }
    std::env::set_var("MARKING_ENV", "test");
    std::env::set_var("UPSTREAM_BASE_URL", "http://upstream.test");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
}

pub(crate) async fn setup_test_context(records: Vec<StudentExamRecord>) -> TestContext {
    let guard = env_lock().await;
    set_test_env();

    let settings = Settings::load().expect("settings");
    let gateway = Arc::new(FakeGateway::new(records));
    let state = AppState::new(settings, gateway.clone());
    let app = api::router::router(state.clone());

    TestContext { state, app, gateway, _guard: guard }
}

/// A student with two variants: `SET A` (id 100, answered) and `SET B` (id 101).
/// Section `A` allows two of its three questions; q1 is out of 10, q2 and q3 out of 5.
pub(crate) fn fixture_record(id: RecordId, first_name: &str) -> StudentExamRecord {
    let section = json!({
        "section": "A",
        "attemptable_questions": 2,
        "questions": [
            { "question_id": 1, "type": "MCQ", "chapter": "Algebra", "max_marks": 10, "marks": 6 },
            { "question_id": 2, "type": "SA", "chapter": "Geometry", "max_marks": 5, "marks": 5 },
            { "question_id": 3, "type": "SA", "chapter": "Geometry", "max_marks": 5 }
        ],
        "items": [
            { "nodeType": "question", "questionId": 1 },
            { "nodeType": "question", "questionId": 2 },
            { "nodeType": "question", "questionId": 3 }
        ]
    });

    serde_json::from_value(json!({
        "id": id,
        "student_id": format!("S{id}"),
        "user": {
            "f_name": first_name,
            "l_name": format!("No{id}"),
            "section": { "title": "X" },
            "grade": { "title": "Class 8" }
        },
        "exam": { "name": "Midterm" },
        "question_paper": [
            { "question_paper_id": 100, "tag": "SET A", "is_attempted": true, "allSectionData": [section.clone()] },
            { "question_paper_id": 101, "tag": "SET B", "is_attempted": false, "allSectionData": [section] }
        ],
        "obtained_marks": 11,
        "total_marks": 20
    }))
    .expect("fixture record")
}

/// In-memory stand-in for the exam marks service.
#[derive(Debug, Default)]
pub(crate) struct FakeGateway {
    records: StdMutex<Vec<StudentExamRecord>>,
    persisted: StdMutex<Vec<(RecordId, SubmissionPayload)>>,
    reject_next: StdMutex<Option<String>>,
}

impl FakeGateway {
    pub(crate) fn new(records: Vec<StudentExamRecord>) -> Self {
        Self { records: StdMutex::new(records), ..Self::default() }
    }

    pub(crate) fn reject_next(&self, message: &str) {
        *self.reject_next.lock().expect("lock") = Some(message.to_string());
    }

    pub(crate) fn persisted(&self) -> Vec<(RecordId, SubmissionPayload)> {
        self.persisted.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ExamMarksGateway for FakeGateway {
    async fn fetch_exam_marks(&self, query: &ExamMarksQuery) -> Result<ExamMarksPage, UpstreamError> {
        let records = self.records.lock().expect("lock");
        let matching: Vec<StudentExamRecord> = records
            .iter()
            .filter(|record| match query.search.as_deref() {
                Some(search) => record.display_name().to_lowercase().contains(&search.to_lowercase()),
                None => true,
            })
            .cloned()
            .collect();
        let count = matching.len() as u32;

        let records = if query.fetch_all {
            matching
        } else {
            let skip = (query.page.saturating_sub(1) * query.page_size) as usize;
            matching.into_iter().skip(skip).take(query.page_size as usize).collect()
        };
        Ok(ExamMarksPage { records, count })
    }

    async fn persist_marks(
        &self,
        record_id: RecordId,
        payload: &SubmissionPayload,
    ) -> Result<PersistOutcome, UpstreamError> {
        if let Some(message) = self.reject_next.lock().expect("lock").take() {
            return Err(UpstreamError::Rejected(message));
        }

        let mut records = self.records.lock().expect("lock");
        if let Some(record) = records.iter_mut().find(|record| record.id == record_id) {
            record.obtained_marks = Some(payload.obtained_marks);
        }
        self.persisted.lock().expect("lock").push((record_id, payload.clone()));
        Ok(PersistOutcome { success: true, message: Some("Marks saved".to_string()) })
    }

    async fn persist_attendance(
        &self,
        record_ids: &[RecordId],
        status: AttendanceStatus,
    ) -> Result<Vec<StudentExamRecord>, UpstreamError> {
        let mut records = self.records.lock().expect("lock");
        let mut updated = Vec::new();
        for record in records.iter_mut().filter(|record| record_ids.contains(&record.id)) {
            record.attendance_status = Some(status);
            updated.push(record.clone());
        }
        Ok(updated)
    }

    async fn list_sections(&self) -> Result<Vec<SectionOption>, UpstreamError> {
        Ok(vec![
            SectionOption { id: 1, title: Some("X".to_string()) },
            SectionOption { id: 2, title: Some("Y".to_string()) },
        ])
    }
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
