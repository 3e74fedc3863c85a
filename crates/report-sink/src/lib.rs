//! Error-tracking collaborator.
//!
//! Learner dead-ends and adapter retry exhaustion are reported here as
//! structured records rather than bare log lines, so an external alerting
//! sink can page on them. `TracingSink` is the default production wiring;
//! `MemorySink` lets tests assert on exactly what was reported.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use challenger_core_types::{AuthorityId, StepOrder};

/// Severity of a report. Warning-level reports are informational (a retry
/// happened); error-level reports require a human to look.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportLevel {
    Warning,
    Error,
}

/// One structured report, tagged by the component and action that raised it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Report {
    pub level: ReportLevel,
    /// Component tag, e.g. "learner", "runner", "adapter:horizon-parking".
    pub component: String,
    /// Action tag, e.g. "locate_portal", "anti_bot_retry", "anti_bot_exhausted".
    pub action: String,
    pub message: String,
    pub authority: Option<AuthorityId>,
    pub pcn_number: Option<String>,
    pub registration: Option<String>,
    pub attempt: Option<u32>,
    pub step_order: Option<StepOrder>,
    pub reported_at: DateTime<Utc>,
}

impl Report {
    pub fn new(
        level: ReportLevel,
        component: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            component: component.into(),
            action: action.into(),
            message: message.into(),
            authority: None,
            pcn_number: None,
            registration: None,
            attempt: None,
            step_order: None,
            reported_at: Utc::now(),
        }
    }

    pub fn warning(
        component: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ReportLevel::Warning, component, action, message)
    }

    pub fn error(
        component: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ReportLevel::Error, component, action, message)
    }

    pub fn with_authority(mut self, authority: AuthorityId) -> Self {
        self.authority = Some(authority);
        self
    }

    pub fn with_pcn(mut self, pcn: impl Into<String>) -> Self {
        self.pcn_number = Some(pcn.into());
        self
    }

    pub fn with_registration(mut self, registration: impl Into<String>) -> Self {
        self.registration = Some(registration.into());
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_step(mut self, order: StepOrder) -> Self {
        self.step_order = Some(order);
        self
    }
}

/// Sink for structured reports. Submitting must never fail the caller:
/// implementations swallow their own transport problems.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn submit(&self, report: Report);
}

/// Default sink: emits reports as structured tracing events.
#[derive(Default)]
pub struct TracingSink;

#[async_trait]
impl ReportSink for TracingSink {
    async fn submit(&self, report: Report) {
        match report.level {
            ReportLevel::Warning => warn!(
                component = %report.component,
                action = %report.action,
                authority = ?report.authority,
                pcn = ?report.pcn_number,
                attempt = ?report.attempt,
                "{}",
                report.message
            ),
            ReportLevel::Error => error!(
                component = %report.component,
                action = %report.action,
                authority = ?report.authority,
                pcn = ?report.pcn_number,
                registration = ?report.registration,
                attempt = ?report.attempt,
                step = ?report.step_order,
                "{}",
                report.message
            ),
        }
    }
}

/// In-memory sink suitable for unit tests and early integration.
#[derive(Default)]
pub struct MemorySink {
    reports: Mutex<Vec<Report>>,
}

impl MemorySink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn count_by_level(&self, level: ReportLevel) -> usize {
        self.reports
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .count()
    }

    pub fn count_by_action(&self, action: &str) -> usize {
        self.reports
            .lock()
            .iter()
            .filter(|r| r.action == action)
            .count()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn submit(&self, report: Report) {
        self.reports.lock().push(report);
    }
}
