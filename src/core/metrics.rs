use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const SUBMISSIONS_TOTAL: &str = "marking_submissions_total";
pub(crate) const VALIDATION_FAILURES_TOTAL: &str = "marking_validation_failures_total";
pub(crate) const REPORTS_BUILT_TOTAL: &str = "marking_reports_built_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_submission(outcome: &'static str) {
    metrics::counter!(SUBMISSIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_validation_failure(kind: &'static str) {
    metrics::counter!(VALIDATION_FAILURES_TOTAL, "kind" => kind).increment(1);
}

pub(crate) fn record_report_built() {
    metrics::counter!(REPORTS_BUILT_TOTAL).increment(1);
}
