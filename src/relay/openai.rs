use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::service;

pub const ROLE_SYSTEM: &str = "system";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Response parsing failed: {0}")]
    ParseFailed(#[from] serde_json::Error),

    #[error("Error response from API ({status}): {text}")]
    ErrorResponse { status: StatusCode, text: String },
}

impl From<ApiError> for service::Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::ErrorResponse { status, text } => service::Error::Upstream {
                status,
                body: text.into(),
            },
            other => service::Error::Internal(other.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OpenAIRequest<'a> {
    pub model: &'a str,
    pub temperature: f64,
    pub messages: &'a [OpenAIMessage],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAIMessage {
    pub role: Value,
    pub content: Value,
}

/// Pulls `choices[0].message.content` out of a completion, or `""` when any
/// step of that path is missing or the content is not a string.
pub fn extract_reply(response: &Value) -> &str {
    response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct OpenAIClient {
    http: reqwest::Client,
    url: Box<str>,
}

impl OpenAIClient {
    pub fn new(http: reqwest::Client, url: impl Into<Box<str>>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub async fn chat_completion(
        &self,
        api_key: &str,
        request: &OpenAIRequest<'_>,
    ) -> Result<Box<str>, ApiError> {
        let response = self
            .http
            .post(&*self.url)
            .bearer_auth(api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::ErrorResponse {
                status,
                text: response_text,
            });
        }

        let response: Value = serde_json::from_str(&response_text)?;
        Ok(extract_reply(&response).into())
    }
}
