//! Violation records and the fire-and-forget reporter.
//!
//! A violation is created the moment a rule fires, transmitted once, and
//! neither retried nor stored on failure. `ViolationSink::report` never
//! surfaces an error to its caller: any transport or serialization failure is
//! logged and swallowed, so a dropped report can never stall a monitoring
//! loop.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use url::Url;

/// Per-request timeout for the outbound POST.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// The kinds of suspicious events the monitors can flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    #[serde(rename = "Multiple Faces")]
    MultipleFaces,
    #[serde(rename = "Looking Away")]
    LookingAway,
    #[serde(rename = "Background Noise")]
    BackgroundNoise,
}

impl ViolationKind {
    /// Wire-format name, as the remote API expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::MultipleFaces => "Multiple Faces",
            ViolationKind::LookingAway => "Looking Away",
            ViolationKind::BackgroundNoise => "Background Noise",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flagged event, shaped as the remote API's JSON body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Violation {
    #[serde(rename = "studentId")]
    pub student_id: i64,
    #[serde(rename = "examId")]
    pub exam_id: i64,
    #[serde(rename = "violationType")]
    pub kind: ViolationKind,
    pub details: String,
}

/// The fixed identifiers for the candidate under watch. Configured once at
/// process start; both monitoring loops stamp them onto every violation.
#[derive(Clone, Copy, Debug)]
pub struct CandidateSession {
    pub student_id: i64,
    pub exam_id: i64,
}

impl CandidateSession {
    pub fn violation(&self, kind: ViolationKind, details: impl Into<String>) -> Violation {
        Violation {
            student_id: self.student_id,
            exam_id: self.exam_id,
            kind,
            details: details.into(),
        }
    }
}

/// Destination for flagged violations.
///
/// Implementations are best-effort by contract: `report` must not panic,
/// block indefinitely, or surface transport failures to the caller.
pub trait ViolationSink: Send + Sync {
    fn report(&self, violation: &Violation);
}

/// Posts violations to the remote proctoring API.
///
/// One outbound `POST <api_url>` per violation with a bearer-token
/// authorization header and the JSON body
/// `{studentId, examId, violationType, details}`. The response is not
/// inspected beyond a log line; there is no retry and no status branching.
pub struct HttpReporter {
    endpoint: Url,
    token: String,
}

impl HttpReporter {
    /// Validate the endpoint up front so a malformed URL fails at startup
    /// instead of once per violation.
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let endpoint = Url::parse(api_url)
            .with_context(|| format!("invalid violation endpoint '{api_url}'"))?;
        Ok(Self {
            endpoint,
            token: token.to_string(),
        })
    }
}

impl ViolationSink for HttpReporter {
    fn report(&self, violation: &Violation) {
        let request = ureq::post(self.endpoint.as_str())
            .timeout(REQUEST_TIMEOUT)
            .set("Authorization", &format!("Bearer {}", self.token));
        match request.send_json(violation) {
            Ok(response) => {
                log::info!(
                    "violation logged: {} (status {})",
                    violation.kind,
                    response.status()
                );
            }
            Err(err) => {
                log::warn!("failed to send violation {}: {}", violation.kind, err);
            }
        }
    }
}

/// Discards every violation. Useful for dry runs.
pub struct NullSink;

impl ViolationSink for NullSink {
    fn report(&self, _violation: &Violation) {}
}

/// Captures violations in memory so tests can assert on exactly what fired.
#[derive(Default)]
pub struct RecordingSink {
    recorded: Mutex<Vec<Violation>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Violation> {
        let mut recorded = self
            .recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut recorded)
    }
}

impl ViolationSink for RecordingSink {
    fn report(&self, violation: &Violation) {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(violation.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_serializes_to_wire_format() {
        let session = CandidateSession {
            student_id: 12,
            exam_id: 5,
        };
        let violation = session.violation(ViolationKind::MultipleFaces, "2 faces detected");
        let json = serde_json::to_value(&violation).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "studentId": 12,
                "examId": 5,
                "violationType": "Multiple Faces",
                "details": "2 faces detected",
            })
        );
    }

    #[test]
    fn kind_display_matches_wire_name() {
        assert_eq!(ViolationKind::LookingAway.to_string(), "Looking Away");
        assert_eq!(ViolationKind::BackgroundNoise.to_string(), "Background Noise");
    }

    #[test]
    fn reporter_rejects_malformed_endpoint() {
        assert!(HttpReporter::new("not a url", "token").is_err());
    }

    #[test]
    fn recording_sink_captures_in_order() {
        let sink = RecordingSink::new();
        let session = CandidateSession {
            student_id: 1,
            exam_id: 2,
        };
        sink.report(&session.violation(ViolationKind::LookingAway, "Face not centered"));
        sink.report(&session.violation(ViolationKind::BackgroundNoise, "High audio level detected"));
        let recorded = sink.take();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].kind, ViolationKind::LookingAway);
        assert_eq!(recorded[1].kind, ViolationKind::BackgroundNoise);
        assert!(sink.take().is_empty());
    }
}
