//! Illustration Generation
//!
//! Turns a finished image description into a rendered illustration through
//! an images/generations endpoint. A plain non-streamed POST that reuses
//! the pipeline's status classification and error taxonomy.

use crate::error::{snippet, PipelineError};
use crate::provider::classify_status;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

/// Image endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEndpoint {
    pub url: String,
    pub model: String,
    pub timeout: Duration,
}

impl ImageEndpoint {
    /// Zhipu GLM image generation endpoint.
    pub fn glm() -> Self {
        Self {
            url: "https://open.bigmodel.cn/api/paas/v4/images/generations".to_string(),
            model: "cogview-4".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn custom(url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            model: model.into(),
            timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: String,
}

/// Client for an images/generations endpoint
pub struct ImageClient {
    client: Client,
    endpoint: ImageEndpoint,
    user_id: Option<String>,
}

impl ImageClient {
    pub fn new(endpoint: ImageEndpoint) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Transport(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            user_id: None,
        })
    }

    /// Attach a stable user id to generation requests, as some services
    /// require for abuse tracking.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Render one illustration; returns the hosted image URL.
    pub async fn generate(
        &self,
        description: &str,
        size: &str,
        credential: &str,
    ) -> Result<String, PipelineError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(PipelineError::MissingCredential);
        }

        let request = ImageRequest {
            model: &self.endpoint.model,
            prompt: description,
            size,
            user_id: self.user_id.as_deref(),
        };
        let response = self
            .client
            .post(&self.endpoint.url)
            .timeout(self.endpoint.timeout)
            .header("Authorization", format!("Bearer {}", credential))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Timeout(self.endpoint.timeout)
                } else {
                    PipelineError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(classify_status(status, snippet(&body)));
        }

        let parsed: ImageResponse = serde_json::from_str(&body).map_err(|_| {
            PipelineError::MalformedPayload(format!("invalid image response: {}", snippet(&body)))
        })?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|image| image.url)
            .ok_or_else(|| {
                PipelineError::MalformedPayload("image response carried no URL".to_string())
            })
    }
}
