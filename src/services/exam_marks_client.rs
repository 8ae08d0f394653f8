use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::core::config::UpstreamSettings;
use crate::marks::SubmissionPayload;
use crate::paper::{de, AttendanceStatus, RecordId, StudentExamRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SortSpec {
    pub(crate) field: String,
    pub(crate) order: SortOrder,
}

/// One page request against the exam marks listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExamMarksQuery {
    pub(crate) exam_id: i64,
    pub(crate) page: u32,
    pub(crate) page_size: u32,
    pub(crate) search: Option<String>,
    pub(crate) section_ids: Vec<i64>,
    pub(crate) sort: Option<SortSpec>,
    pub(crate) fetch_all: bool,
}

impl ExamMarksQuery {
    pub(crate) fn new(exam_id: i64, page_size: u32) -> Self {
        Self {
            exam_id,
            page: 1,
            page_size,
            search: None,
            section_ids: Vec::new(),
            sort: None,
            fetch_all: false,
        }
    }

    /// The same filters, every record.
    pub(crate) fn all(&self) -> Self {
        Self { page: 1, fetch_all: true, ..self.clone() }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params =
            vec![("page", self.page.to_string()), ("pageSize", self.page_size.to_string())];
        if let Some(search) = self.search.as_deref().filter(|search| !search.trim().is_empty()) {
            params.push(("searchQuery", search.trim().to_string()));
        }
        for section_id in &self.section_ids {
            params.push(("sectionId", section_id.to_string()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sortField", sort.field.clone()));
            params.push(("sortOrder", sort.order.as_str().to_string()));
        }
        if self.fetch_all {
            params.push(("isAllDataFetch", "true".to_string()));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub(crate) struct ExamMarksPage {
    #[serde(default, alias = "examMarks", alias = "rows", deserialize_with = "de::list")]
    pub(crate) records: Vec<StudentExamRecord>,
    #[serde(default, deserialize_with = "de::count")]
    pub(crate) count: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct PersistOutcome {
    #[serde(default)]
    pub(crate) success: bool,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub(crate) message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SectionOption {
    #[serde(deserialize_with = "de::id")]
    pub(crate) id: i64,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub(crate) title: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum UpstreamError {
    #[error("exam marks service unreachable: {0}")]
    Transport(String),
    #[error("exam marks service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Rejected(String),
    #[error("unexpected response from exam marks service: {0}")]
    Decode(String),
}

/// The external exam marks service.
#[async_trait]
pub(crate) trait ExamMarksGateway: Send + Sync {
    async fn fetch_exam_marks(&self, query: &ExamMarksQuery) -> Result<ExamMarksPage, UpstreamError>;

    /// `Ok` only when the service reports `success=true`.
    async fn persist_marks(
        &self,
        record_id: RecordId,
        payload: &SubmissionPayload,
    ) -> Result<PersistOutcome, UpstreamError>;

    async fn persist_attendance(
        &self,
        record_ids: &[RecordId],
        status: AttendanceStatus,
    ) -> Result<Vec<StudentExamRecord>, UpstreamError>;

    async fn list_sections(&self) -> Result<Vec<SectionOption>, UpstreamError>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpExamMarksGateway {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    max_retries: u32,
}

impl HttpExamMarksGateway {
    pub(crate) fn from_settings(settings: &UpstreamSettings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .context("Failed to build exam marks HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
            max_retries: settings.max_retries,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET with retries on transport failures and 5xx answers.
    async fn get_json(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<Value, UpstreamError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let response = self.authorized(self.client.get(url).query(params)).send().await;

            match response {
                Ok(resp) if resp.status().is_server_error() => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    tracing::warn!(url, attempt, status = status.as_u16(), "Exam marks GET failed");
                    last_error = Some(status_error(status, &body));
                }
                Ok(resp) => return read_json(resp).await,
                Err(err) => {
                    tracing::warn!(url, attempt, error = %err, "Exam marks GET unreachable");
                    last_error = Some(UpstreamError::Transport(err.to_string()));
                }
            }

            if attempt < self.max_retries {
                let backoff = Duration::from_secs(2_u64.saturating_pow(attempt));
                tokio::time::sleep(backoff).await;
            }
        }

        Err(last_error.unwrap_or_else(|| UpstreamError::Transport("no attempt made".to_string())))
    }

    async fn send_once(&self, request: RequestBuilder) -> Result<Value, UpstreamError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, UpstreamError> {
    let status = response.status();
    let raw_body = response.text().await.map_err(|err| UpstreamError::Transport(err.to_string()))?;

    if !status.is_success() {
        return Err(status_error(status, &raw_body));
    }
    if raw_body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&raw_body).map_err(|err| UpstreamError::Decode(err.to_string()))
}

fn status_error(status: StatusCode, raw_body: &str) -> UpstreamError {
    let body = serde_json::from_str::<Value>(raw_body)
        .map(|parsed| extract_error_message(&parsed))
        .unwrap_or_else(|_| raw_body.to_string());
    UpstreamError::Status { status: status.as_u16(), body }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, UpstreamError> {
    serde_json::from_value(value).map_err(|err| UpstreamError::Decode(err.to_string()))
}

/// Some deployments wrap payloads in `data`.
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl ExamMarksGateway for HttpExamMarksGateway {
    async fn fetch_exam_marks(&self, query: &ExamMarksQuery) -> Result<ExamMarksPage, UpstreamError> {
        let url = format!("{}/exam-marks/{}", self.base_url, query.exam_id);
        let body = self.get_json(&url, &query.params()).await?;
        let page: ExamMarksPage = decode(unwrap_data(body))?;
        tracing::debug!(
            exam_id = query.exam_id,
            page = query.page,
            fetch_all = query.fetch_all,
            records = page.records.len(),
            count = page.count,
            "Fetched exam marks"
        );
        Ok(page)
    }

    async fn persist_marks(
        &self,
        record_id: RecordId,
        payload: &SubmissionPayload,
    ) -> Result<PersistOutcome, UpstreamError> {
        let url = format!("{}/exam-marks/{}", self.base_url, record_id);
        let body = self.send_once(self.client.put(&url).json(payload)).await?;
        let outcome: PersistOutcome = decode(body)?;
        if !outcome.success {
            let message = outcome.message.unwrap_or_else(|| "An error occurred".to_string());
            tracing::warn!(record_id, message = %message, "Exam marks update rejected");
            return Err(UpstreamError::Rejected(message));
        }
        Ok(outcome)
    }

    async fn persist_attendance(
        &self,
        record_ids: &[RecordId],
        status: AttendanceStatus,
    ) -> Result<Vec<StudentExamRecord>, UpstreamError> {
        let url = format!("{}/exam-marks/attendance", self.base_url);
        let body = json!({ "examStudentMarkId": record_ids, "attendanceStatus": status });
        let response = self.send_once(self.client.patch(&url).json(&body)).await?;

        if response.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(UpstreamError::Rejected(extract_error_message(&response)));
        }
        let updated: Vec<StudentExamRecord> = match unwrap_data(response) {
            list @ Value::Array(_) => de::list(list).unwrap_or_default(),
            record @ Value::Object(_) => serde_json::from_value(record).into_iter().collect(),
            _ => Vec::new(),
        };
        Ok(updated)
    }

    async fn list_sections(&self) -> Result<Vec<SectionOption>, UpstreamError> {
        let url = format!("{}/sections", self.base_url);
        let body = self.get_json(&url, &[]).await?;
        match unwrap_data(body) {
            list @ Value::Array(_) => {
                de::list(list).map_err(|err| UpstreamError::Decode(err.to_string()))
            }
            other => Err(UpstreamError::Decode(format!("expected a section list, got {other}"))),
        }
    }
}

fn extract_error_message(payload: &Value) -> String {
    if let Some(detail) = payload.get("detail").and_then(Value::as_str) {
        return detail.to_string();
    }

    payload
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str))
        .unwrap_or("An error occurred")
        .to_string()
}
