pub(crate) mod api;
pub(crate) mod core;
pub mod marks;
pub mod paper;
pub mod report;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::report::ReportOptions;
use crate::services::exam_marks_client::{ExamMarksQuery, HttpExamMarksGateway};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(settings.telemetry())?;
    core::metrics::init(&settings)?;

    let gateway = HttpExamMarksGateway::from_settings(settings.upstream())?;
    let state = AppState::new(settings, Arc::new(gateway));

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr())
        .await
        .with_context(|| format!("Failed to bind {}", state.settings().server_addr()))?;

    tracing::info!(
        addr = %state.settings().server_addr(),
        upstream = %state.settings().upstream().base_url,
        environment = %state.settings().runtime().environment.as_str(),
        "Exam marking API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    Ok(())
}

/// What `export_report` fetches and where it writes.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub exam_id: i64,
    pub output: Option<PathBuf>,
    pub search: Option<String>,
    pub section_ids: Vec<i64>,
}

impl ExportRequest {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("Exam_Marks_{}.csv", self.exam_id)))
    }
}

/// Fetches every record of an exam and writes the cohort report as CSV.
/// Returns the path written.
pub async fn export_report(request: ExportRequest) -> anyhow::Result<PathBuf> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(settings.telemetry())?;

    let gateway = HttpExamMarksGateway::from_settings(settings.upstream())?;
    let mut query = ExamMarksQuery::new(request.exam_id, settings.upstream().page_size);
    query.search = request.search.clone();
    query.section_ids = request.section_ids.clone();
    let options = ReportOptions { tag_order: settings.report().tag_order.clone() };

    let (records, rows) = services::marking_session::fetch_report(&gateway, &query, &options)
        .await
        .with_context(|| format!("Failed to build report for exam {}", request.exam_id))?;

    let path = request.output_path();
    let file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    report::write_csv(&rows, BufWriter::new(file))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(exam_id = request.exam_id, records, rows = rows.len(), path = %path.display(), "Report exported");
    Ok(path)
}
