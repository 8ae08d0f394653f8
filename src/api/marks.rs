use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::reports;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::marks::{EntryOutcome, MarkingError};
use crate::paper::RecordId;
use crate::schemas::marks::{
    AttendanceResponse, AttendanceUpdateRequest, EntryResponse, ListMarksQuery,
    MarkEntryRequest, MarkingPageResponse, PaperSelectionRequest, PreviewResponse, RecordView,
    SubmitResponse,
};
use crate::services::exam_marks_client::SectionOption;
use crate::services::marking_session::{self, upstream_failure};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:exam_id/marks", get(list_marks))
        .route("/:exam_id/marks/:record_id/entries", put(enter_mark))
        .route("/:exam_id/marks/:record_id/paper", put(select_paper))
        .route("/:exam_id/marks/:record_id/preview", post(preview))
        .route("/:exam_id/marks/:record_id/submit", post(submit))
        .route("/:exam_id/attendance", post(update_attendance))
        .route("/:exam_id/report", get(reports::exam_report))
}

fn rejected(err: MarkingError, exam_id: i64, record_id: RecordId) -> ApiError {
    if !matches!(err, MarkingError::RecordNotFound(_) | MarkingError::Upstream(_)) {
        tracing::info!(exam_id, record_id, kind = err.kind(), error = %err, "Marks rejected");
        metrics::record_validation_failure(err.kind());
    }
    ApiError::from(err)
}

pub(crate) async fn list_sections(
    State(state): State<AppState>,
) -> Result<Json<Vec<SectionOption>>, ApiError> {
    let sections = state.gateway().list_sections().await.map_err(upstream_failure)?;
    Ok(Json(sections))
}

async fn list_marks(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    Query(params): Query<ListMarksQuery>,
) -> Result<Json<MarkingPageResponse>, ApiError> {
    params.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let query = params
        .to_upstream(exam_id, state.settings().upstream().page_size)
        .map_err(ApiError::BadRequest)?;

    let (count, records) =
        marking_session::load_page(state.gateway(), state.sessions(), query).await?;
    Ok(Json(MarkingPageResponse { exam_id, count, records }))
}

async fn enter_mark(
    State(state): State<AppState>,
    Path((exam_id, record_id)): Path<(i64, RecordId)>,
    Json(payload): Json<MarkEntryRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let (outcome, record) = state
        .sessions()
        .with_session(exam_id, |session| {
            let outcome = session.enter_mark(record_id, payload.question_id, &payload.value)?;
            Ok::<_, MarkingError>((outcome, session.view(record_id)?))
        })
        .await
        .map_err(|err| rejected(err, exam_id, record_id))?;

    let (marks, is_attempted) = match &outcome {
        EntryOutcome::Stored(value) => (Some(value.marks()), Some(value.attempted())),
        EntryOutcome::Cleared => (None, None),
    };
    tracing::debug!(exam_id, record_id, question_id = payload.question_id, ?outcome, "Mark entered");
    Ok(Json(EntryResponse { question_id: payload.question_id, marks, is_attempted, record }))
}

async fn select_paper(
    State(state): State<AppState>,
    Path((exam_id, record_id)): Path<(i64, RecordId)>,
    Json(payload): Json<PaperSelectionRequest>,
) -> Result<Json<RecordView>, ApiError> {
    let record = state
        .sessions()
        .with_session(exam_id, |session| {
            session.select_paper(record_id, payload.question_paper_id)?;
            session.view(record_id)
        })
        .await
        .map_err(|err| rejected(err, exam_id, record_id))?;
    Ok(Json(record))
}

async fn preview(
    State(state): State<AppState>,
    Path((exam_id, record_id)): Path<(i64, RecordId)>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let (payload, _) = state
        .sessions()
        .with_session(exam_id, |session| session.prepare_submission(record_id))
        .await
        .map_err(|err| rejected(err, exam_id, record_id))?;
    Ok(Json(PreviewResponse::new(record_id, payload)))
}

async fn submit(
    State(state): State<AppState>,
    Path((exam_id, record_id)): Path<(i64, RecordId)>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let outcome =
        marking_session::submit(state.gateway(), state.sessions(), exam_id, record_id).await?;
    Ok(Json(SubmitResponse {
        success: true,
        message: outcome.message.unwrap_or_else(|| "Marks saved successfully".to_string()),
        obtained_marks: outcome.obtained_marks,
        cleared_entries: outcome.cleared_entries,
    }))
}

async fn update_attendance(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    Json(payload): Json<AttendanceUpdateRequest>,
) -> Result<Json<AttendanceResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let updated = marking_session::update_attendance(
        state.gateway(),
        state.sessions(),
        exam_id,
        &payload.record_ids,
        payload.attendance_status,
    )
    .await?;
    Ok(Json(AttendanceResponse { updated, attendance_status: payload.attendance_status }))
}
