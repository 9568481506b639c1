use serde::Serialize;
use std::fmt;

/// What the submission panel shows. Lives for one page session only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    /// Requests are in flight. `job_id` is filled in once the proxy has
    /// reserved a job.
    InProgress { job_id: Option<String> },
    Success { message: String, job_id: String },
    Error { message: String },
}

impl SubmissionStatus {
    pub fn in_progress() -> Self {
        SubmissionStatus::InProgress { job_id: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        SubmissionStatus::Error {
            message: message.into(),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, SubmissionStatus::InProgress { .. })
    }

    /// Success and error are final for a submission; only these can be
    /// dismissed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionStatus::Success { .. } | SubmissionStatus::Error { .. }
        )
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            SubmissionStatus::InProgress { job_id } => job_id.as_deref(),
            SubmissionStatus::Success { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Idle => write!(f, "idle"),
            SubmissionStatus::InProgress { job_id: None } => write!(f, "submitting"),
            SubmissionStatus::InProgress {
                job_id: Some(job_id),
            } => write!(f, "submitting (job {})", job_id),
            SubmissionStatus::Success { message, job_id } if message.is_empty() => {
                write!(f, "job {} started", job_id)
            }
            SubmissionStatus::Success { message, job_id } => {
                write!(f, "{} (job {})", message, job_id)
            }
            SubmissionStatus::Error { message } => write!(f, "error: {}", message),
        }
    }
}
