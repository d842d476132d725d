use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GeminiSettings;
use crate::error::LookupError;

/// Error types for hosted model interactions
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Gemini servers are currently busy. Please try again in a few moments.")]
    ServerBusy,

    #[error("Network connection failed: {message}")]
    NetworkError { message: String },

    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {message}")]
    ParseError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl GeminiError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            GeminiError::ServerBusy => {
                "🚫 Gemini servers are currently busy. Please try again in a few moments."
                    .to_string()
            }
            GeminiError::NetworkError { .. } => {
                "🌐 Network connection failed. Please check your internet connection and try again."
                    .to_string()
            }
            GeminiError::Timeout { seconds } => {
                format!(
                    "⏰ Request timed out after {} seconds. The server might be overloaded.",
                    seconds
                )
            }
            GeminiError::ApiError { status, .. } => match *status {
                400 => "❌ The model rejected the request. Check the model name and prompt.".to_string(),
                429 => {
                    "🚫 Rate limit exceeded. Please wait a moment before trying again.".to_string()
                }
                _ => format!("❌ API error ({}). Please try again later.", status),
            },
            GeminiError::ParseError { .. } => {
                "⚠️ Failed to parse server response. Please try again.".to_string()
            }
            GeminiError::ConfigError { message } => {
                format!("⚙️ Configuration error: {}", message)
            }
        }
    }
}

impl From<GeminiError> for LookupError {
    fn from(error: GeminiError) -> Self {
        let message = error.to_string();
        match error {
            GeminiError::ConfigError { .. } => LookupError::Config { message },
            GeminiError::ParseError { .. } => LookupError::Parse { message },
            _ => LookupError::Transport { message },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Client for the Gemini `generateContent` REST endpoint
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    settings: GeminiSettings,
    timeout: u64,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keep the API key out of logs
        f.debug_struct("GeminiClient")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings, timeout: u64) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .user_agent("property_analyzer/0.1.0")
            .build()
            .map_err(|e| GeminiError::ConfigError {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            settings,
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Map reqwest errors to our custom error types
    fn map_reqwest_error(&self, error: reqwest::Error) -> GeminiError {
        if error.is_timeout() {
            return GeminiError::Timeout {
                seconds: self.timeout,
            };
        }

        if error.is_connect() {
            return GeminiError::NetworkError {
                message: "Failed to connect to server".to_string(),
            };
        }

        if error.is_decode() {
            return GeminiError::ParseError {
                message: error.to_string(),
            };
        }

        GeminiError::NetworkError {
            message: format!("Request error: {}", error),
        }
    }

    /// Handle error responses from the server
    async fn handle_error_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> GeminiError {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match status {
            StatusCode::SERVICE_UNAVAILABLE => GeminiError::ServerBusy,
            StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => GeminiError::ServerBusy,
            _ => GeminiError::ApiError {
                status: status.as_u16(),
                message: error_text,
            },
        }
    }

    /// Send one prompt as a single user turn and return the generated text.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        let Some(api_key) = self.settings.api_key.as_deref() else {
            return Err(GeminiError::ConfigError {
                message: "GEMINI_API_KEY is not set".to_string(),
            });
        };

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.handle_error_response(status, response).await);
        }

        let api_response: GenerateContentResponse =
            response.json().await.map_err(|e| GeminiError::ParseError {
                message: format!("Failed to parse API response: {}", e),
            })?;

        let candidate = api_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GeminiError::ParseError {
                message: "No candidates in API response".to_string(),
            })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(GeminiError::ParseError {
                message: "Empty content in API response".to_string(),
            });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_stay_config_errors() {
        let err: LookupError = GeminiError::ConfigError {
            message: "GEMINI_API_KEY is not set".into(),
        }
        .into();
        assert_eq!(err.kind(), "config");

        let err: LookupError = GeminiError::ServerBusy.into();
        assert_eq!(err.kind(), "transport");
    }

    #[test]
    fn user_message_mentions_status() {
        let err = GeminiError::ApiError {
            status: 500,
            message: "boom".into(),
        };
        assert!(err.user_message().contains("500"));
    }
}
