use axum::{
    extract::{Path, Query, State},
    Json,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::report::ReportOptions;
use crate::schemas::marks::{ListMarksQuery, ReportResponse};
use crate::services::marking_session;

pub(crate) async fn exam_report(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    Query(params): Query<ListMarksQuery>,
) -> Result<Json<ReportResponse>, ApiError> {
    params.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let query = params
        .to_upstream(exam_id, state.settings().upstream().page_size)
        .map_err(ApiError::BadRequest)?;
    let options = ReportOptions { tag_order: state.settings().report().tag_order.clone() };

    let (record_count, rows) =
        marking_session::fetch_report(state.gateway(), &query, &options).await?;
    let generated_at = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| ApiError::internal(err, "Failed to format report timestamp"))?;

    Ok(Json(ReportResponse { exam_id, generated_at, record_count, rows }))
}
