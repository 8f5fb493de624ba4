//! Anthropic Messages API vision backend.
//!
//! Requires ANTHROPIC_API_KEY (or CLAUDE_API_KEY).
//!
//! Rate limiting:
//! - Retries on 429 with exponential backoff, up to 3 times
//! - Respects Retry-After header from API

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{candidates_from_text, VisionBackend, VisionError, EXTRACTION_PROMPT};
use crate::config::VisionConfig;
use crate::models::RawCandidate;
use crate::rate_limit::{backoff_delay, parse_retry_after};

/// Maximum retry attempts on rate limit errors.
const MAX_RETRIES: u32 = 3;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Vision backend backed by a Claude model.
pub struct ClaudeVisionBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl ClaudeVisionBackend {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| VisionError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            api_key: config.api_key.clone(),
        })
    }

    fn build_request<'a>(&'a self, image: &[u8], media_type: &'a str) -> MessagesRequest<'a> {
        let data = base64::engine::general_purpose::STANDARD.encode(image);
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type,
                            data,
                        },
                    },
                    ContentBlock::Text {
                        text: EXTRACTION_PROMPT,
                    },
                ],
            }],
        }
    }

    async fn send(
        &self,
        api_key: &str,
        request: &MessagesRequest<'_>,
    ) -> Result<String, VisionError> {
        let url = format!("{}/v1/messages", self.endpoint);

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(request)
                .send()
                .await
                .map_err(|e| VisionError::ServiceUnavailable(e.to_string()))?;

            let status = response.status();
            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                if attempt >= MAX_RETRIES {
                    return Err(VisionError::RateLimited {
                        retry_after_secs: retry_after.and_then(|s| s.trim().parse().ok()),
                    });
                }

                let wait = parse_retry_after(retry_after.as_deref())
                    .unwrap_or_else(|| backoff_delay(attempt, 1000));
                warn!(
                    "Claude vision rate limited (attempt {}), waiting {:?}",
                    attempt + 1,
                    wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|e| VisionError::ServiceUnavailable(e.to_string()))?;

            if !status.is_success() {
                return Err(VisionError::ServiceUnavailable(format!(
                    "HTTP {}: {}",
                    status,
                    truncate(&body, 200)
                )));
            }
            return Ok(body);
        }
    }
}

/// Pull the candidates out of a Messages API response body.
///
/// A body that is not a Messages response at all is malformed; a response
/// whose text holds no usable array yields no candidates.
pub(crate) fn parse_messages_response(body: &str) -> Result<Vec<RawCandidate>, VisionError> {
    let response: MessagesResponse =
        serde_json::from_str(body).map_err(|e| VisionError::MalformedResponse(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(VisionError::ServiceUnavailable(error.message));
    }

    let text = response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(candidates_from_text(&text))
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl VisionBackend for ClaudeVisionBackend {
    fn name(&self) -> &str {
        "claude"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn availability_hint(&self) -> String {
        if self.api_key.is_some() {
            format!("Claude vision is available ({})", self.model)
        } else {
            "ANTHROPIC_API_KEY not set. Get an API key from https://console.anthropic.com/"
                .to_string()
        }
    }

    async fn extract(
        &self,
        image: &[u8],
        media_type: &str,
    ) -> Result<Vec<RawCandidate>, VisionError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            VisionError::NotConfigured("ANTHROPIC_API_KEY not set".to_string())
        })?;

        let request = self.build_request(image, media_type);
        let start = std::time::Instant::now();
        let body = self.send(api_key, &request).await?;
        let candidates = parse_messages_response(&body)?;

        debug!(
            "Claude vision returned {} candidates in {:?}",
            candidates.len(),
            start.elapsed()
        );
        Ok(candidates)
    }
}

impl std::fmt::Debug for ClaudeVisionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeVisionBackend")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
