use std::sync::Arc;

use crate::core::config::Settings;
use crate::services::exam_marks_client::ExamMarksGateway;
use crate::services::marking_session::MarkingSessions;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    gateway: Arc<dyn ExamMarksGateway>,
    sessions: MarkingSessions,
}

impl AppState {
    pub(crate) fn new(settings: Settings, gateway: Arc<dyn ExamMarksGateway>) -> Self {
        Self { inner: Arc::new(InnerState { settings, gateway, sessions: MarkingSessions::new() }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn gateway(&self) -> &dyn ExamMarksGateway {
        self.inner.gateway.as_ref()
    }

    pub(crate) fn sessions(&self) -> &MarkingSessions {
        &self.inner.sessions
    }
}
