use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::{Classification, ClassifierError, SentimentClassifier};

/// Attempts per call used by [`ClassifierConfig::new`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Inference endpoint, e.g. a Hugging Face model URL.
    pub url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    /// Total tries per call, including the first. `1` disables retries.
    pub max_attempts: u32,
    /// First backoff delay; doubles on each retry.
    pub retry_base_delay: Duration,
}

impl ClassifierConfig {
    pub fn new(url: String, token: Option<String>) -> Self {
        Self {
            url,
            token,
            timeout: Duration::from_secs(30),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_secs(1),
        }
    }

    /// Single attempt per call: failures surface immediately to the caller.
    pub fn without_retries(mut self) -> Self {
        self.max_attempts = 1;
        self
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

/// Text-classification endpoints answer either `[[{label, score}, ...]]`
/// or a flat `[{label, score}, ...]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<Classification>>),
    Flat(Vec<Classification>),
}

impl InferenceResponse {
    fn top(self) -> Option<Classification> {
        let labels = match self {
            InferenceResponse::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
            InferenceResponse::Flat(labels) => labels,
        };
        labels.into_iter().max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

#[derive(Debug, Deserialize)]
struct InferenceError {
    error: String,
}

/// HTTP client for a hosted text-classification model.
/// Retries on transport errors, 429 and 5xx with exponential backoff, up to
/// `max_attempts` tries.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: Client,
    url: Url,
    token: Option<String>,
    max_attempts: u32,
    retry_base_delay: Duration,
}

impl HttpClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let url = Url::parse(&config.url)
            .map_err(|e| ClassifierError::Init(format!("invalid classifier URL '{}': {e}", config.url)))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClassifierError::Init(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            token: config.token,
            max_attempts: config.max_attempts.max(1),
            retry_base_delay: config.retry_base_delay,
        })
    }

    async fn request(&self, text: &str) -> Result<Classification, ClassifierError> {
        let body = InferenceRequest { inputs: text };
        let mut last_error: Option<ClassifierError> = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = self.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "Classifier call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(self.url.clone()).json(&body);
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(ClassifierError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Classifier returned {}: {}", status, body);
                last_error = Some(ClassifierError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<InferenceError>(&body)
                    .map(|e| e.error)
                    .unwrap_or(body);
                return Err(ClassifierError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let bytes = response.bytes().await?;
            let parsed: InferenceResponse = serde_json::from_slice(&bytes)?;
            let top = parsed.top().ok_or(ClassifierError::EmptyResponse)?;

            debug!("Classifier label={} score={:.4}", top.label, top.score);
            return Ok(top);
        }

        Err(last_error.unwrap_or(ClassifierError::EmptyResponse))
    }
}

#[async_trait]
impl SentimentClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        self.request(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier_for(server: &mockito::ServerGuard, token: Option<&str>) -> HttpClassifier {
        HttpClassifier::new(ClassifierConfig {
            url: format!("{}/models/sentiment", server.url()),
            token: token.map(String::from),
            timeout: Duration::from_secs(5),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: Duration::from_millis(1),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_nested_response_picks_highest_score() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/sentiment")
            .match_body(mockito::Matcher::Json(serde_json::json!({"inputs": "mantap"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[[{"label":"NEGATIVE","score":0.1},{"label":"POSITIVE","score":0.9}]]"#)
            .create_async()
            .await;

        let top = classifier_for(&server, None).classify("mantap").await.unwrap();
        assert_eq!(top.label, "POSITIVE");
        assert_eq!(top.score, 0.9);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_flat_response_and_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/sentiment")
            .match_header("authorization", "Bearer hf_test")
            .with_status(200)
            .with_body(r#"[{"label":"neg","score":0.75},{"label":"pos","score":0.25}]"#)
            .create_async()
            .await;

        let top = classifier_for(&server, Some("hf_test"))
            .classify("lemot")
            .await
            .unwrap();
        assert_eq!(top.label, "neg");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/models/sentiment")
            .with_status(503)
            .with_body(r#"{"error":"Model is currently loading"}"#)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/models/sentiment")
            .with_status(200)
            .with_body(r#"[[{"label":"POSITIVE","score":0.6}]]"#)
            .create_async()
            .await;

        let top = classifier_for(&server, None).classify("bagus").await.unwrap();
        assert_eq!(top.label, "POSITIVE");
        failing.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/sentiment")
            .with_status(400)
            .with_body(r#"{"error":"Input is too long"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = classifier_for(&server, None).classify("x").await.unwrap_err();
        match err {
            ClassifierError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Input is too long");
            }
            other => panic!("unexpected error {other:?}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_label_list_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/sentiment")
            .with_status(200)
            .with_body("[[]]")
            .create_async()
            .await;

        let err = classifier_for(&server, None).classify("x").await.unwrap_err();
        assert!(matches!(err, ClassifierError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_single_attempt_config_does_not_retry() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/sentiment")
            .with_status(503)
            .with_body(r#"{"error":"Model is currently loading"}"#)
            .expect(1)
            .create_async()
            .await;

        let config = ClassifierConfig::new(format!("{}/models/sentiment", server.url()), None)
            .without_retries();
        let err = HttpClassifier::new(config)
            .unwrap()
            .classify("lemot")
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Api { status: 503, .. }));
        mock.assert_async().await;
    }

    #[test]
    fn test_invalid_url_fails_init() {
        let err = HttpClassifier::new(ClassifierConfig::new("::nope".to_string(), None)).unwrap_err();
        assert!(matches!(err, ClassifierError::Init(_)));
    }
}
