use crate::api::handlers::forge::FORGE_TRANSFORMER_PATH;
use crate::config::ForgeConfig;
use crate::models::{ErrorBody, StartJobRequest, StartJobResponse, UploadUrlRequest, UploadUrlResponse};
use crate::services::manager::{HttpManagerService, ManagerError, ManagerService};
use crate::submission::file::DatasetFile;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, StatusCode};
use std::path::PathBuf;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not open {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Non-2xx answer. `error` is the `{error}` field of the body, if any.
    #[error("Request failed with status {status}")]
    Status {
        status: StatusCode,
        error: Option<String>,
    },

    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl From<ManagerError> for TransportError {
    fn from(err: ManagerError) -> Self {
        match err {
            ManagerError::Transport(e) => TransportError::Http(e),
            ManagerError::Rejected { status, message } => TransportError::Status {
                status,
                error: Some(message).filter(|m| !m.trim().is_empty()),
            },
            ManagerError::Decode(e) => TransportError::Decode(e),
        }
    }
}

/// The three remote calls a submission makes, in order.
#[async_trait]
pub trait SubmissionTransport: Send + Sync {
    /// Step 1: ask the local proxy for a signed upload URL.
    async fn request_upload_url(
        &self,
        req: &UploadUrlRequest,
    ) -> Result<UploadUrlResponse, TransportError>;

    /// Step 2: PUT the dataset straight to object storage.
    async fn upload_dataset(&self, signed_url: &str, file: &DatasetFile)
    -> Result<(), TransportError>;

    /// Step 3: ask the manager to start training.
    async fn start_training_job(
        &self,
        req: &StartJobRequest,
    ) -> Result<StartJobResponse, TransportError>;
}

/// Steps 1 and 2 go over plain HTTP; step 3 is delegated to the same
/// manager client the proxy uses.
pub struct HttpSubmissionTransport {
    client: Client,
    upload_url_endpoint: String,
    manager: HttpManagerService,
}

impl HttpSubmissionTransport {
    pub fn new(client: Client, forge_api_url: &Url, manager_url: &Url) -> Self {
        Self {
            upload_url_endpoint: join(forge_api_url, FORGE_TRANSFORMER_PATH),
            manager: HttpManagerService::new(client.clone(), manager_url),
            client,
        }
    }

    pub fn from_config(config: &ForgeConfig) -> anyhow::Result<Self> {
        let manager_url = config
            .manager_url
            .as_ref()
            .ok_or_else(|| anyhow!("MANAGER_SERVICE_URL must be set"))?;
        let client = config
            .http_client()
            .context("Failed to create HTTP client")?;
        Ok(Self::new(client, &config.forge_api_url, manager_url))
    }
}

fn join(base: &Url, path: &str) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), path)
}

async fn error_field(response: reqwest::Response) -> Option<String> {
    response
        .json::<ErrorBody>()
        .await
        .ok()
        .map(|body| body.error)
        .filter(|e| !e.is_empty())
}

#[async_trait]
impl SubmissionTransport for HttpSubmissionTransport {
    async fn request_upload_url(
        &self,
        req: &UploadUrlRequest,
    ) -> Result<UploadUrlResponse, TransportError> {
        debug!("POST {}", self.upload_url_endpoint);
        let response = self
            .client
            .post(&self.upload_url_endpoint)
            .json(req)
            .send()
            .await?;

        // Error statuses still carry a JSON body; `success` decides.
        response
            .json::<UploadUrlResponse>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn upload_dataset(
        &self,
        signed_url: &str,
        file: &DatasetFile,
    ) -> Result<(), TransportError> {
        debug!("PUT {} ({} bytes)", file.name(), file.size());
        let handle = tokio::fs::File::open(file.path())
            .await
            .map_err(|source| TransportError::File {
                path: file.path().to_path_buf(),
                source,
            })?;

        let response = self
            .client
            .put(signed_url)
            .header(CONTENT_TYPE, file.content_type())
            .header(CONTENT_LENGTH, file.size())
            .body(Body::wrap_stream(ReaderStream::new(handle)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                error: error_field(response).await,
            });
        }
        Ok(())
    }

    async fn start_training_job(
        &self,
        req: &StartJobRequest,
    ) -> Result<StartJobResponse, TransportError> {
        Ok(self.manager.start_training_job(req).await?)
    }
}
