use crate::models::{ErrorBody, StartJobRequest, StartJobResponse, UploadTicket, UploadUrlRequest};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

pub const UPLOAD_URL_PATH: &str = "/generate-upload-url";
pub const START_JOB_PATH: &str = "/start-training-job";

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Manager request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Manager responded with {status}: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Manager returned an unreadable response: {0}")]
    Decode(String),
}

impl ManagerError {
    /// Upstream message without the status prefix, when the manager sent one
    pub fn upstream_message(&self) -> Option<&str> {
        match self {
            ManagerError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// The external job manager, seen through its HTTP contract.
#[async_trait]
pub trait ManagerService: Send + Sync {
    /// Reserves a job and a signed URL the browser can PUT the dataset to
    async fn generate_upload_url(
        &self,
        req: &UploadUrlRequest,
    ) -> Result<UploadTicket, ManagerError>;

    /// Kicks off training for an already uploaded dataset
    async fn start_training_job(
        &self,
        req: &StartJobRequest,
    ) -> Result<StartJobResponse, ManagerError>;
}

pub struct HttpManagerService {
    client: Client,
    base_url: String,
}

impl HttpManagerService {
    pub fn new(client: Client, base_url: &Url) -> Self {
        Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ManagerError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.build_url(path);
        debug!("Calling manager: POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(ManagerError::Rejected { status, message });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ManagerError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ManagerService for HttpManagerService {
    async fn generate_upload_url(
        &self,
        req: &UploadUrlRequest,
    ) -> Result<UploadTicket, ManagerError> {
        let ticket: UploadTicket = self.post(UPLOAD_URL_PATH, req).await?;
        info!("🎫 Upload URL issued for job {}", ticket.job_id);
        Ok(ticket)
    }

    async fn start_training_job(
        &self,
        req: &StartJobRequest,
    ) -> Result<StartJobResponse, ManagerError> {
        self.post(START_JOB_PATH, req).await
    }
}

/// Reads an error response body: the `{error}` field when the body is the
/// usual JSON shape, otherwise the raw text.
pub async fn error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.error,
        Err(_) if !text.trim().is_empty() => text.trim().to_string(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}
