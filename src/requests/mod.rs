//! Arrival-ordered log of requests made against the store, backing the
//! console's request table.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary shown while the log is still empty.
pub const ZERO_STATE_SUMMARY: &str = "No requests for this project yet";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMethod {
    Get,
    Set,
    Update,
    Delete,
    Listen,
}

#[derive(Clone, Debug, Serialize)]
pub struct RequestRecord {
    pub method: RequestMethod,
    pub path: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RequestLog {
    inner: Arc<RequestLogInner>,
}

struct RequestLogInner {
    project_id: String,
    records: Mutex<Vec<RequestRecord>>,
}

impl RequestLog {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RequestLogInner {
                project_id: project_id.into(),
                records: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    pub(crate) fn record(&self, method: RequestMethod, path: impl Into<String>) {
        self.inner.records.lock().unwrap().push(RequestRecord {
            method,
            path: path.into(),
            at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.inner.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.lock().unwrap().is_empty()
    }

    /// Records in arrival order.
    pub fn records(&self) -> Vec<RequestRecord> {
        self.inner.records.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.inner.records.lock().unwrap().clear();
    }

    /// One-line summary for the request table header, or the zero state when
    /// nothing has been recorded yet.
    pub fn summary(&self) -> String {
        let count = self.len();
        match count {
            0 => ZERO_STATE_SUMMARY.to_string(),
            1 => format!("1 request for {}", self.inner.project_id),
            n => format!("{n} requests for {}", self.inner.project_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_shows_zero_state() {
        let log = RequestLog::new("demo");
        assert!(log.is_empty());
        assert_eq!(log.summary(), ZERO_STATE_SUMMARY);
    }

    #[test]
    fn summary_counts_requests() {
        let log = RequestLog::new("demo");
        log.record(RequestMethod::Set, "users/alice");
        assert_eq!(log.summary(), "1 request for demo");
        log.record(RequestMethod::Get, "users/alice");
        assert_eq!(log.summary(), "2 requests for demo");
    }

    #[test]
    fn records_preserve_arrival_order() {
        let log = RequestLog::new("demo");
        log.record(RequestMethod::Set, "users/a");
        log.record(RequestMethod::Delete, "users/a");
        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].method, RequestMethod::Set);
        assert_eq!(records[1].method, RequestMethod::Delete);
    }

    #[test]
    fn clear_returns_to_zero_state() {
        let log = RequestLog::new("demo");
        log.record(RequestMethod::Listen, "users");
        log.clear();
        assert_eq!(log.summary(), ZERO_STATE_SUMMARY);
    }
}
