use crate::config::DEFAULT_MAX_DESCRIPTION_CHARS;
use crate::models::{StartJobRequest, UploadUrlRequest, UploadUrlResponse};
use crate::submission::file::DatasetFile;
use crate::submission::status::SubmissionStatus;
use crate::submission::transport::{SubmissionTransport, TransportError};
use crate::utils::validation::{ValidationError, missing_file, validate_form};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub const INIT_FAILED_MESSAGE: &str = "Could not initialize upload session.";
pub const UPLOAD_FAILED_MESSAGE: &str = "File upload failed.";
pub const START_FAILED_MESSAGE: &str = "Failed to start the training job.";

/// Every variant's `Display` is the message shown to the user.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("{}", .0.message)]
    Validation(ValidationError),

    #[error("A submission is already in progress.")]
    AlreadySubmitting,

    #[error("Could not initialize upload session.")]
    InitFailed,

    #[error("File upload failed.")]
    UploadFailed(#[source] TransportError),

    #[error("{0}")]
    StartFailed(String),

    #[error("{0}")]
    Transport(#[from] TransportError),
}

/// The user's input at the moment they press submit.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub description: String,
    pub email: String,
    pub file: Option<DatasetFile>,
}

/// Drives one submission at a time through upload-URL request, direct
/// upload, and job start, publishing each status change.
pub struct SubmissionFlow<T> {
    transport: T,
    status: watch::Sender<SubmissionStatus>,
    max_description_chars: usize,
}

impl<T: SubmissionTransport> SubmissionFlow<T> {
    pub fn new(transport: T) -> Self {
        Self::with_description_limit(transport, DEFAULT_MAX_DESCRIPTION_CHARS)
    }

    pub fn with_description_limit(transport: T, max_description_chars: usize) -> Self {
        let (status, _) = watch::channel(SubmissionStatus::Idle);
        Self {
            transport,
            status,
            max_description_chars,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn status(&self) -> SubmissionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SubmissionStatus> {
        self.status.subscribe()
    }

    /// Closes the status panel. Only a finished submission is cleared;
    /// in-flight requests keep running. Returns whether anything changed.
    pub fn dismiss(&self) -> bool {
        self.status.send_if_modified(|status| {
            if status.is_terminal() {
                *status = SubmissionStatus::Idle;
                true
            } else {
                false
            }
        })
    }

    /// Runs the whole submission and returns the final status.
    ///
    /// Validation failures never touch the network. A call made while
    /// another submission is in flight is refused and leaves the published
    /// status alone.
    pub async fn submit(&self, form: &SubmissionForm) -> SubmissionStatus {
        if self.status.borrow().is_in_progress() {
            return SubmissionStatus::error(SubmitError::AlreadySubmitting.to_string());
        }

        let file = match self.validate(form) {
            Ok(file) => file,
            Err(e) => {
                warn!("Submission rejected: {}", e);
                return self.reject(e);
            }
        };

        let claimed = self.status.send_if_modified(|status| {
            if status.is_in_progress() {
                false
            } else {
                *status = SubmissionStatus::in_progress();
                true
            }
        });
        if !claimed {
            return SubmissionStatus::error(SubmitError::AlreadySubmitting.to_string());
        }

        let status = match self.run(form, file).await {
            Ok((message, job_id)) => {
                info!("✅ Training job {} started", job_id);
                SubmissionStatus::Success { message, job_id }
            }
            Err(e) => {
                error!("❌ Submission error: {:?}", e);
                SubmissionStatus::error(e.to_string())
            }
        };
        self.finish(status)
    }

    fn validate<'a>(&self, form: &'a SubmissionForm) -> Result<&'a DatasetFile, SubmitError> {
        validate_form(&form.description, &form.email, self.max_description_chars)
            .map_err(SubmitError::Validation)?;
        form.file
            .as_ref()
            .ok_or_else(|| SubmitError::Validation(missing_file()))
    }

    async fn run(
        &self,
        form: &SubmissionForm,
        file: &DatasetFile,
    ) -> Result<(String, String), SubmitError> {
        info!("🚀 Requesting upload URL for {} ({})", file.name(), file.formatted_size());
        let reply = self
            .transport
            .request_upload_url(&UploadUrlRequest {
                file_name: file.name().to_string(),
                file_type: file.content_type().to_string(),
            })
            .await?;

        let (signed_url, gcs_uri, job_id) = match reply {
            UploadUrlResponse {
                success: true,
                signed_url: Some(signed_url),
                gcs_uri: Some(gcs_uri),
                job_id: Some(job_id),
            } => (signed_url, gcs_uri, job_id),
            _ => return Err(SubmitError::InitFailed),
        };

        self.status.send_replace(SubmissionStatus::InProgress {
            job_id: Some(job_id.clone()),
        });

        info!("⬆️  Uploading dataset for job {}", job_id);
        self.transport
            .upload_dataset(&signed_url, file)
            .await
            .map_err(|e| match e {
                TransportError::Status { .. } => SubmitError::UploadFailed(e),
                other => SubmitError::Transport(other),
            })?;

        info!("🧠 Starting training job {}", job_id);
        let started = self
            .transport
            .start_training_job(&StartJobRequest {
                job_id: job_id.clone(),
                email: form.email.clone(),
                description: form.description.trim().to_string(),
                gcs_uri,
            })
            .await
            .map_err(|e| match e {
                TransportError::Status { error, .. } => SubmitError::StartFailed(
                    error.unwrap_or_else(|| START_FAILED_MESSAGE.to_string()),
                ),
                other => SubmitError::Transport(other),
            })?;

        Ok((started.message, started.job_id.unwrap_or(job_id)))
    }

    /// Publishes a validation failure unless another call has claimed the
    /// flow in the meantime; its in-flight status is never overwritten.
    fn reject(&self, e: SubmitError) -> SubmissionStatus {
        let status = SubmissionStatus::error(e.to_string());
        let published = self.status.send_if_modified(|current| {
            if current.is_in_progress() {
                false
            } else {
                *current = status.clone();
                true
            }
        });
        if published {
            status
        } else {
            SubmissionStatus::error(SubmitError::AlreadySubmitting.to_string())
        }
    }

    fn finish(&self, status: SubmissionStatus) -> SubmissionStatus {
        self.status.send_replace(status.clone());
        status
    }
}
