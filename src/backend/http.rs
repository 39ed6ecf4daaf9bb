//! HTTP answer-service backend
//!
//! Speaks the assistant server's JSON/multipart protocol: `POST /get_answer`
//! for questions, `POST /upload_doc` for documents, `POST /feedback` for
//! verdicts. The bearer token comes from the [`RequestContext`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::types::{
    AnswerReply, AssistantBackend, FeedbackVerdict, QuestionRequest, RequestContext, ServiceError,
    SourceDoc, UploadOutcome,
};

/// Wire shape for `POST /get_answer`.
#[derive(Debug, Serialize)]
struct GetAnswerRequest<'a> {
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetAnswerResponse {
    answer: String,
    question_id: String,
    #[serde(default)]
    sources: Vec<SourceDoc>,
}

/// Wire shape for `POST /feedback`.
#[derive(Debug, Serialize)]
struct FeedbackRequest<'a> {
    question_id: &'a str,
    status: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    results: Vec<UploadResult>,
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    status: String,
    filename: String,
    #[serde(default)]
    detail: Option<String>,
}

/// Failure body returned by the service on non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// HTTP backend configuration.
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
        }
    }
}

/// reqwest-based [`AssistantBackend`].
pub struct HttpBackend {
    config: HttpBackendConfig,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: HttpBackendConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    pub fn with_default_config() -> Self {
        Self::new(HttpBackendConfig::default())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        ctx: &RequestContext,
    ) -> reqwest::RequestBuilder {
        match &ctx.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn failure_detail(response: reqwest::Response) -> String {
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => format!("service returned {}", status),
        }
    }
}

fn upload_outcome_from_wire(result: UploadResult) -> Result<UploadOutcome, ServiceError> {
    match result.status.as_str() {
        "success" => Ok(UploadOutcome::Accepted {
            filename: result.filename,
        }),
        "pending" => Ok(UploadOutcome::AwaitingApproval {
            filename: result.filename,
        }),
        "error" => Ok(UploadOutcome::Rejected {
            detail: result
                .detail
                .unwrap_or_else(|| "upload failed".to_string()),
            filename: result.filename,
        }),
        other => Err(ServiceError::MalformedReply(format!(
            "unknown upload status '{}'",
            other
        ))),
    }
}

#[async_trait]
impl AssistantBackend for HttpBackend {
    async fn submit_question(
        &self,
        ctx: &RequestContext,
        request: QuestionRequest,
    ) -> Result<AnswerReply, ServiceError> {
        let payload = GetAnswerRequest {
            question: &request.question,
            image: request.attachment.as_ref().map(|a| a.to_data_url()),
        };

        let response = self
            .authorize(self.client.post(self.url("/get_answer")), ctx)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::Rejected(Self::failure_detail(response).await));
        }

        let body: GetAnswerResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedReply(e.to_string()))?;

        log::info!(
            "answer {} resolved with {} source(s)",
            body.question_id,
            body.sources.len()
        );

        Ok(AnswerReply {
            answer: body.answer,
            correlation_id: body.question_id,
            sources: body.sources,
        })
    }

    async fn upload_document(
        &self,
        ctx: &RequestContext,
        filename: &str,
        data: bytes::Bytes,
    ) -> Result<UploadOutcome, ServiceError> {
        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("files", part);

        let response = self
            .authorize(self.client.post(self.url("/upload_doc")), ctx)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::Rejected(Self::failure_detail(response).await));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedReply(e.to_string()))?;

        // Single-file upload; the service still answers with a result set.
        let result = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::MalformedReply("empty upload result set".to_string()))?;

        upload_outcome_from_wire(result)
    }

    async fn submit_feedback(
        &self,
        ctx: &RequestContext,
        correlation_id: &str,
        verdict: FeedbackVerdict,
    ) -> Result<(), ServiceError> {
        let payload = FeedbackRequest {
            question_id: correlation_id,
            status: verdict.as_str(),
        };

        let response = self
            .authorize(self.client.post(self.url("/feedback")), ctx)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ServiceError::Rejected(Self::failure_detail(response).await));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_status_maps_to_closed_outcome() {
        let accepted = upload_outcome_from_wire(UploadResult {
            status: "success".to_string(),
            filename: "guide.pdf".to_string(),
            detail: None,
        })
        .unwrap();
        assert_eq!(
            accepted,
            UploadOutcome::Accepted {
                filename: "guide.pdf".to_string()
            }
        );

        let pending = upload_outcome_from_wire(UploadResult {
            status: "pending".to_string(),
            filename: "notes.docx".to_string(),
            detail: None,
        })
        .unwrap();
        assert_eq!(
            pending,
            UploadOutcome::AwaitingApproval {
                filename: "notes.docx".to_string()
            }
        );

        let rejected = upload_outcome_from_wire(UploadResult {
            status: "error".to_string(),
            filename: "broken.csv".to_string(),
            detail: Some("unparseable".to_string()),
        })
        .unwrap();
        assert_eq!(
            rejected,
            UploadOutcome::Rejected {
                filename: "broken.csv".to_string(),
                detail: "unparseable".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_upload_status_is_malformed() {
        let result = upload_outcome_from_wire(UploadResult {
            status: "half-done".to_string(),
            filename: "x".to_string(),
            detail: None,
        });
        assert!(matches!(result, Err(ServiceError::MalformedReply(_))));
    }

    #[test]
    fn test_answer_wire_shape_decodes() {
        let body: GetAnswerResponse = serde_json::from_str(
            r#"{"answer":"Unplug it for 10 seconds.","question_id":"q1","sources":[{"filename":"router.md","id":"17"},{"filename":"faq.md"}]}"#,
        )
        .unwrap();
        assert_eq!(body.question_id, "q1");
        assert_eq!(body.sources.len(), 2);
        assert_eq!(body.sources[0].id.as_deref(), Some("17"));
        assert!(body.sources[1].id.is_none());
    }

    #[test]
    fn test_url_join_tolerates_trailing_slash() {
        let mut config = HttpBackendConfig::default();
        config.base_url = "http://host:9000/".to_string();
        let backend = HttpBackend::new(config);
        assert_eq!(backend.url("/get_answer"), "http://host:9000/get_answer");
    }
}
