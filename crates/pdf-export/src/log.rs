//! Non-fatal export diagnostics

use std::path::PathBuf;

use scene::ObjectId;
use tracing::warn;

/// How bad a logged problem is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Drawn with a substitute, or skipped on purpose
    Warning,
    /// Could not be drawn at all
    Fail,
}

/// A diagnostic tied to the scene object it concerns
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub object_id: ObjectId,
    pub severity: Severity,
    pub message: String,
}

/// Problems collected during one export
#[derive(Debug, Clone, Default)]
pub struct ErrorLog {
    messages: Vec<LogMessage>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&mut self, object_id: ObjectId, message: impl Into<String>) {
        let message = message.into();
        warn!(object = object_id, "{}", message);
        self.messages.push(LogMessage {
            object_id,
            severity: Severity::Warning,
            message,
        });
    }

    pub fn fail(&mut self, object_id: ObjectId, message: impl Into<String>) {
        let message = message.into();
        warn!(object = object_id, failed = true, "{}", message);
        self.messages.push(LogMessage {
            object_id,
            severity: Severity::Fail,
            message,
        });
    }

    pub fn messages(&self) -> &[LogMessage] {
        &self.messages
    }

    pub fn warnings(&self) -> impl Iterator<Item = &LogMessage> {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }
}

/// Overall outcome of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Success,
    /// Files were written but something was substituted or skipped
    PartialSuccess,
    Failure,
}

/// What an export produced
#[derive(Debug)]
pub struct ExportReport {
    pub status: ExportStatus,
    pub log: ErrorLog,
    pub files: Vec<PathBuf>,
    /// Set when the export was aborted
    pub error: Option<crate::ExportError>,
}

impl ExportReport {
    /// Report for a finished export
    pub fn completed(log: ErrorLog, files: Vec<PathBuf>) -> Self {
        let status = if log.is_empty() {
            ExportStatus::Success
        } else {
            ExportStatus::PartialSuccess
        };
        Self {
            status,
            log,
            files,
            error: None,
        }
    }

    /// Report for an aborted export. `files` are the ones completed
    /// before the error.
    pub fn failed(log: ErrorLog, files: Vec<PathBuf>, error: crate::ExportError) -> Self {
        Self {
            status: ExportStatus::Failure,
            log,
            files,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExportStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_log() {
        let report = ExportReport::completed(ErrorLog::new(), vec![PathBuf::from("a.pdf")]);
        assert_eq!(report.status, ExportStatus::Success);

        let mut log = ErrorLog::new();
        log.warning(3, "Cannot export Engraving objects to PDF.");
        log.fail(4, "broken mesh");
        assert_eq!(log.warnings().count(), 1);
        let report = ExportReport::completed(log, Vec::new());
        assert_eq!(report.status, ExportStatus::PartialSuccess);
        assert_eq!(report.log.messages()[1].severity, Severity::Fail);
    }

    #[test]
    fn test_failed_report() {
        let mut log = ErrorLog::new();
        log.warning(8, "Reference to missing object 99, skipped.");
        let report = ExportReport::failed(
            log,
            vec![PathBuf::from("page00.pdf")],
            crate::ExportError::NothingToExport,
        );
        assert_eq!(report.status, ExportStatus::Failure);
        assert_eq!(report.files, vec![PathBuf::from("page00.pdf")]);
        assert_eq!(report.log.len(), 1);
        assert!(!report.is_success());
    }
}
