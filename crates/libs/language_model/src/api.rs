use bon::bon;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error (status {status}): {body}")]
    Api { status: StatusCode, body: String },
}

impl LlmError {
    /// Whether the failure is transient: rate limiting, timeouts, connection
    /// problems and server errors. Everything else fails the request for good.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.is_body()
                    || e.status().is_some_and(is_retryable_status)
            }
            Self::Api { status, .. } => is_retryable_status(*status),
            Self::Json(_) => false,
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ChatFullResponse {
    pub choices: Vec<FullChoice>,
}

#[derive(Debug, Deserialize)]
pub struct FullChoice {
    pub message: FullMessage,
}

#[derive(Debug, Deserialize)]
pub struct FullMessage {
    pub content: Option<String>,
}

impl ChatFullResponse {
    /// Text of the first choice, empty when the model returned nothing.
    #[must_use]
    pub fn into_text(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default()
    }
}

/// How the endpoint expects to be addressed and authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiStyle {
    /// `{base}/v1/chat/completions` with a bearer token.
    OpenAi,
    /// `{base}/openai/deployments/{model}/chat/completions?api-version=..`
    /// with an `api-key` header.
    Azure { api_version: String },
}

/// Chat-completions client. Owns its connection pool, which is released when
/// the last clone is dropped.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    style: ApiStyle,
    max_completion_tokens: Option<u32>,
}

#[bon]
impl ChatClient {
    #[builder(start_fn = with_base_url)]
    pub fn new(
        #[builder(start_fn)] base_url: &str,
        #[builder(into)] model: String,
        #[builder(into)] api_key: Option<String>,
        // Setting an api version switches the client to Azure addressing.
        #[builder(into)]
        api_version: Option<String>,
        timeout: Option<Duration>,
        max_completion_tokens: Option<u32>,
    ) -> LlmResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout.unwrap_or(Duration::from_secs(30)))
            .build()?;
        let style = match api_version {
            Some(api_version) => ApiStyle::Azure { api_version },
            None => ApiStyle::OpenAi,
        };
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            style,
            max_completion_tokens,
        })
    }

    #[builder]
    pub async fn chat(
        &self,
        #[builder(start_fn)] prompt: &str,
        system: Option<&str>,
    ) -> LlmResult<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));
        self.call(&messages).await
    }

    /// One request to the chat-completions endpoint. No retries happen here.
    pub async fn call(&self, messages: &[Message]) -> LlmResult<String> {
        let req_body = self.build_request(messages);
        let mut request = self.http.post(self.completions_url()).json(&req_body);
        if let Some(key) = &self.api_key {
            request = match self.style {
                ApiStyle::OpenAi => request.bearer_auth(key),
                ApiStyle::Azure { .. } => request.header("api-key", key),
            };
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Api {
                status,
                body: response.text().await.unwrap_or_default(),
            });
        }
        let full: ChatFullResponse = response.json().await?;
        let text = full.into_text();
        debug!(model = %self.model, chars = text.len(), "chat completion received");
        Ok(text)
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn completions_url(&self) -> String {
        match &self.style {
            ApiStyle::OpenAi => format!("{}/v1/chat/completions", self.base_url),
            ApiStyle::Azure { api_version } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.base_url, self.model, api_version
            ),
        }
    }

    fn build_request<'a>(&'a self, messages: &'a [Message]) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            max_completion_tokens: self.max_completion_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_version: Option<&str>) -> ChatClient {
        ChatClient::with_base_url("https://example.openai.azure.com/")
            .model("gpt-5-mini")
            .maybe_api_version(api_version)
            .build()
            .expect("client")
    }

    #[test]
    fn openai_style_url() {
        assert_eq!(
            client(None).completions_url(),
            "https://example.openai.azure.com/v1/chat/completions"
        );
    }

    #[test]
    fn azure_style_url_uses_deployment_and_version() {
        assert_eq!(
            client(Some("2024-12-01-preview")).completions_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-5-mini/chat/completions?api-version=2024-12-01-preview"
        );
    }

    #[test]
    fn request_omits_unset_token_bound() {
        let client = client(None);
        let messages = [Message::system("be brief"), Message::user("segment it")];
        let body = serde_json::to_value(client.build_request(&messages)).expect("serialize");

        assert_eq!(body["model"], "gpt-5-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "segment it");
        assert!(body.get("max_completion_tokens").is_none());
    }

    #[test]
    fn response_text_defaults_to_empty() {
        let full: ChatFullResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).expect("parse");
        assert_eq!(full.into_text(), "");

        let none: ChatFullResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("parse");
        assert_eq!(none.into_text(), "");
    }

    #[test]
    fn classifies_status_codes() {
        let api = |code: u16| LlmError::Api {
            status: StatusCode::from_u16(code).expect("status"),
            body: String::new(),
        };
        assert!(api(429).is_retryable());
        assert!(api(408).is_retryable());
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(!api(404).is_retryable());

        let json = serde_json::from_str::<ChatFullResponse>("not json").expect_err("bad json");
        assert!(!LlmError::Json(json).is_retryable());
    }
}
