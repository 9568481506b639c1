use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of the local proxy's upload-URL request, also forwarded to the
/// manager service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    #[validate(length(min = 1, message = "fileName is required"))]
    pub file_name: String,
    #[validate(length(min = 1, message = "fileType is required"))]
    pub file_type: String,
}

/// What the manager service hands back for an upload request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub signed_url: String,
    pub gcs_uri: String,
    pub job_id: String,
}

/// Local proxy response. `success` is always true on a 2xx; failures use
/// [`ErrorBody`] instead.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub signed_url: Option<String>,
    #[serde(default)]
    pub gcs_uri: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
}

impl From<UploadTicket> for UploadUrlResponse {
    fn from(ticket: UploadTicket) -> Self {
        Self {
            success: true,
            signed_url: Some(ticket.signed_url),
            gcs_uri: Some(ticket.gcs_uri),
            job_id: Some(ticket.job_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartJobRequest {
    pub job_id: String,
    pub email: String,
    pub description: String,
    pub gcs_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartJobResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upload_request_uses_camel_case() {
        let req = UploadUrlRequest {
            file_name: "legal.pdf".to_string(),
            file_type: "application/pdf".to_string(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"fileName": "legal.pdf", "fileType": "application/pdf"}));
    }

    #[test]
    fn test_upload_response_tolerates_error_body() {
        let res: UploadUrlResponse =
            serde_json::from_value(json!({"error": "manager unavailable"})).unwrap();
        assert!(!res.success);
        assert!(res.signed_url.is_none());
    }

    #[test]
    fn test_ticket_becomes_successful_response() {
        let res = UploadUrlResponse::from(UploadTicket {
            signed_url: "https://storage.example/put".to_string(),
            gcs_uri: "gs://bucket/job-1/legal.pdf".to_string(),
            job_id: "job-1".to_string(),
        });
        let value = serde_json::to_value(&res).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["gcsUri"], "gs://bucket/job-1/legal.pdf");
        assert_eq!(value["jobId"], "job-1");
    }
}
