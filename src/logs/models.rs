//! Outcome log models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final status of a logged dispatch. This is the persisted schema and
/// stays stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Sent,
    Failed,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStatus::Sent => "sent",
            LogStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(LogStatus::Sent),
            "failed" => Some(LogStatus::Failed),
            _ => None,
        }
    }
}

/// One immutable row of the outcome log.
///
/// Subject and trigger are snapshots taken at send time; later edits to
/// the template or layout never change historical rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub trigger: String,
    pub template_id: String,
    pub subject: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

/// A row to append; id and created_at are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub trigger: String,
    pub template_id: String,
    pub subject: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub status: LogStatus,
    pub error_message: Option<String>,
    pub attempts: u32,
}

impl NewLogEntry {
    /// Check the row invariants before append.
    pub fn validate(&self) -> Result<(), String> {
        if self.to.is_empty() {
            return Err("Log entry must have at least one 'to' recipient".to_string());
        }
        if self.attempts == 0 {
            return Err("Log entry must record at least one attempt".to_string());
        }
        match (self.status, &self.error_message) {
            (LogStatus::Failed, None) => {
                Err("Failed log entry must carry an error message".to_string())
            }
            (LogStatus::Sent, Some(_)) => {
                Err("Sent log entry must not carry an error message".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Read-side filter over the log.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub trigger: Option<String>,
    pub status: Option<LogStatus>,
    /// Inclusive lower bound on created_at
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on created_at
    pub until: Option<DateTime<Utc>>,
}

impl LogFilter {
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(trigger) = &self.trigger {
            if &entry.trigger != trigger {
                return false;
            }
        }
        if let Some(status) = self.status {
            if entry.status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.created_at < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.created_at >= until {
                return false;
            }
        }
        true
    }
}

/// Query pagination.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry(status: LogStatus, error: Option<&str>) -> NewLogEntry {
        NewLogEntry {
            trigger: "welcome".to_string(),
            template_id: "welcome".to_string(),
            subject: "Hi".to_string(),
            to: vec!["ada@example.com".to_string()],
            cc: vec![],
            bcc: vec![],
            status,
            error_message: error.map(str::to_string),
            attempts: 1,
        }
    }

    #[test]
    fn test_invariants() {
        assert!(new_entry(LogStatus::Sent, None).validate().is_ok());
        assert!(new_entry(LogStatus::Failed, Some("boom")).validate().is_ok());

        assert!(new_entry(LogStatus::Failed, None).validate().is_err());
        assert!(new_entry(LogStatus::Sent, Some("boom")).validate().is_err());

        let mut empty_to = new_entry(LogStatus::Sent, None);
        empty_to.to.clear();
        assert!(empty_to.validate().is_err());

        let mut zero_attempts = new_entry(LogStatus::Sent, None);
        zero_attempts.attempts = 0;
        assert!(zero_attempts.validate().is_err());
    }

    #[test]
    fn test_status_roundtrip() {
        assert_eq!(LogStatus::parse("sent"), Some(LogStatus::Sent));
        assert_eq!(LogStatus::parse("failed"), Some(LogStatus::Failed));
        assert_eq!(LogStatus::parse("other"), None);
        assert_eq!(LogStatus::Sent.as_str(), "sent");
    }
}
