//! HTTP utilities for control-plane REST API calls

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and masks potentially sensitive patterns
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        format!(
            "{}... [truncated, {} bytes total]",
            &body[..MAX_LOG_BODY_LENGTH],
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Failures below the operation layer, split so callers can tell a
/// transport fault from a backend verdict.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("failed to parse response JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

impl HttpError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HttpError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }
        )
    }
}

/// Pull the human-readable message out of an API error body, falling back
/// to the raw (sanitized) body.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    sanitize_for_log(body)
}

/// HTTP client wrapper for control-plane API calls
#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
}

impl ApiHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .user_agent(concat!("cloudctl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request to the API
    pub async fn get(&self, url: &str, token: &str) -> Result<Value, HttpError> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).bearer_auth(token).send().await?;
        Self::decode(response).await
    }

    /// Make a POST request to the API
    pub async fn post(
        &self,
        url: &str,
        token: &str,
        body: Option<&Value>,
    ) -> Result<Value, HttpError> {
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        Self::decode(response).await
    }

    /// Make a DELETE request to the API
    pub async fn delete(&self, url: &str, token: &str) -> Result<Value, HttpError> {
        tracing::debug!("DELETE {}", url);

        let response = self.client.delete(url).bearer_auth(token).send().await?;
        Self::decode(response).await
    }

    async fn decode(response: reqwest::Response) -> Result<Value, HttpError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error bodies to avoid leaking
            // sensitive data.
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(HttpError::Status {
                status,
                message: error_message(&body),
            });
        }

        // Handle empty response
        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(HttpError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_api_body() {
        let body = r#"{"error": {"code": 404, "message": "The resource was not found"}}"#;
        assert_eq!(error_message(body), "The resource was not found");
    }

    #[test]
    fn error_message_falls_back_to_sanitized_body() {
        let msg = error_message("plain\ttext failure");
        assert_eq!(msg, "plaintext failure");
    }

    #[test]
    fn not_found_is_distinguished() {
        let err = HttpError::Status {
            status: StatusCode::NOT_FOUND,
            message: "gone".to_string(),
        };
        assert!(err.is_not_found());

        let err = HttpError::Status {
            status: StatusCode::FORBIDDEN,
            message: "denied".to_string(),
        };
        assert!(!err.is_not_found());
    }
}
