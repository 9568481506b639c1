use mockito::{Matcher, ServerGuard};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use transmorpiq_forge::config::ForgeConfig;
use transmorpiq_forge::services::manager::{HttpManagerService, ManagerService};
use transmorpiq_forge::submission::{
    DatasetFile, HttpSubmissionTransport, SubmissionFlow, SubmissionForm, SubmissionStatus,
};
use transmorpiq_forge::{AppState, create_app};
use url::Url;

const DATASET: &str = "prompt,completion\nsummarize clause 4,tenant pays utilities\n";

/// Serves the real proxy on an ephemeral port, relaying to `manager_url`.
async fn spawn_forge(manager_url: &Url) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let manager: Arc<dyn ManagerService> =
        Arc::new(HttpManagerService::new(reqwest::Client::new(), manager_url));
    let app = create_app(AppState {
        manager: Some(manager),
        config: ForgeConfig::default(),
    });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{}", addr)).unwrap()
}

async fn dataset_form() -> (SubmissionForm, tempfile::NamedTempFile) {
    let mut tmp = tempfile::Builder::new()
        .prefix("leases")
        .suffix(".csv")
        .tempfile()
        .unwrap();
    tmp.write_all(DATASET.as_bytes()).unwrap();
    let file = DatasetFile::select(tmp.path(), ForgeConfig::default().max_file_size)
        .await
        .unwrap();

    let form = SubmissionForm {
        description: " Answer questions about residential leases ".to_string(),
        email: "ada@example.com".to_string(),
        file: Some(file),
    };
    (form, tmp)
}

async fn mock_upload_ticket(server: &mut ServerGuard, file_name: &str) -> mockito::Mock {
    let signed_url = format!("{}/upload/job-5", server.url());
    server
        .mock("POST", "/generate-upload-url")
        .match_body(Matcher::Json(json!({
            "fileName": file_name,
            "fileType": "text/csv"
        })))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "signedUrl": signed_url,
                "gcsUri": "gs://datasets/job-5/leases.csv",
                "jobId": "job-5"
            })
            .to_string(),
        )
        .create_async()
        .await
}

async fn flow_against(server: &ServerGuard) -> SubmissionFlow<HttpSubmissionTransport> {
    let manager_url = Url::parse(&server.url()).unwrap();
    let forge_url = spawn_forge(&manager_url).await;
    SubmissionFlow::new(HttpSubmissionTransport::new(
        reqwest::Client::new(),
        &forge_url,
        &manager_url,
    ))
}

#[tokio::test]
async fn test_three_step_submission_succeeds() {
    let mut server = mockito::Server::new_async().await;
    let (form, _tmp) = dataset_form().await;
    let file_name = form.file.as_ref().unwrap().name().to_string();

    let ticket = mock_upload_ticket(&mut server, &file_name).await;
    let upload = server
        .mock("PUT", "/upload/job-5")
        .match_header("content-type", "text/csv")
        .match_body(DATASET)
        .with_status(200)
        .create_async()
        .await;
    let start = server
        .mock("POST", "/start-training-job")
        .match_body(Matcher::Json(json!({
            "jobId": "job-5",
            "email": "ada@example.com",
            "description": "Answer questions about residential leases",
            "gcsUri": "gs://datasets/job-5/leases.csv"
        })))
        .with_header("content-type", "application/json")
        .with_body(json!({"message": "Training started", "jobId": "job-5"}).to_string())
        .create_async()
        .await;

    let flow = flow_against(&server).await;
    let status = flow.submit(&form).await;

    ticket.assert_async().await;
    upload.assert_async().await;
    start.assert_async().await;
    assert_eq!(
        status,
        SubmissionStatus::Success {
            message: "Training started".to_string(),
            job_id: "job-5".to_string(),
        }
    );
}

#[tokio::test]
async fn test_storage_failure_never_starts_job() {
    let mut server = mockito::Server::new_async().await;
    let (form, _tmp) = dataset_form().await;
    let file_name = form.file.as_ref().unwrap().name().to_string();

    mock_upload_ticket(&mut server, &file_name).await;
    server
        .mock("PUT", "/upload/job-5")
        .with_status(403)
        .with_body("<Error><Code>SignatureDoesNotMatch</Code></Error>")
        .create_async()
        .await;
    let start = server
        .mock("POST", "/start-training-job")
        .expect(0)
        .create_async()
        .await;

    let flow = flow_against(&server).await;
    let status = flow.submit(&form).await;

    start.assert_async().await;
    assert_eq!(status, SubmissionStatus::error("File upload failed."));
}

#[tokio::test]
async fn test_manager_rejection_surfaces_as_init_failure() {
    let mut server = mockito::Server::new_async().await;
    let (form, _tmp) = dataset_form().await;

    server
        .mock("POST", "/generate-upload-url")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": "signing key missing"}).to_string())
        .create_async()
        .await;
    let upload = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let flow = flow_against(&server).await;
    let status = flow.submit(&form).await;

    upload.assert_async().await;
    assert_eq!(
        status,
        SubmissionStatus::error("Could not initialize upload session.")
    );
}

#[tokio::test]
async fn test_job_start_error_message_is_shown() {
    let mut server = mockito::Server::new_async().await;
    let (form, _tmp) = dataset_form().await;
    let file_name = form.file.as_ref().unwrap().name().to_string();

    mock_upload_ticket(&mut server, &file_name).await;
    server
        .mock("PUT", "/upload/job-5")
        .with_status(200)
        .create_async()
        .await;
    server
        .mock("POST", "/start-training-job")
        .with_status(429)
        .with_header("content-type", "application/json")
        .with_body(json!({"error": "Too many jobs for this email"}).to_string())
        .create_async()
        .await;

    let flow = flow_against(&server).await;
    let status = flow.submit(&form).await;

    assert_eq!(
        status,
        SubmissionStatus::error("Too many jobs for this email")
    );
}

#[tokio::test]
async fn test_invalid_email_never_reaches_network() {
    let mut server = mockito::Server::new_async().await;
    let (mut form, _tmp) = dataset_form().await;
    form.email = "ada@localhost".to_string();

    let posts = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let puts = server
        .mock("PUT", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let flow = flow_against(&server).await;
    let status = flow.submit(&form).await;

    posts.assert_async().await;
    puts.assert_async().await;
    assert_eq!(
        status,
        SubmissionStatus::error("Please fill out all fields correctly.")
    );
}

#[tokio::test]
async fn test_unreachable_proxy_is_reported() {
    let server = mockito::Server::new_async().await;
    let (form, _tmp) = dataset_form().await;

    let closed = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let flow = SubmissionFlow::new(HttpSubmissionTransport::new(
        reqwest::Client::new(),
        &Url::parse(&format!("http://{}", closed)).unwrap(),
        &Url::parse(&server.url()).unwrap(),
    ));

    let status = flow.submit(&form).await;

    match status {
        SubmissionStatus::Error { message } => assert!(!message.is_empty()),
        other => panic!("expected an error status, got {other:?}"),
    }
    assert!(flow.dismiss());
    assert_eq!(flow.status(), SubmissionStatus::Idle);
}
