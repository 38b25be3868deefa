use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::image::ImagePayload;

const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Google `generateContent` with inline image data
    #[serde(rename = "gemini")]
    Gemini,
    /// `/chat/completions` with an `image_url` part (OpenRouter, Groq, ...)
    #[serde(rename = "openai-compatible")]
    OpenAiCompatible,
    /// `/accounts/{id}/ai/run/{model}`
    #[serde(rename = "cloudflare-workers-ai")]
    CloudflareWorkersAi,
}

/// A provider with its credential resolved, ready to call.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: String,
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub account_id: Option<String>,
}

impl ProviderDescriptor {
    /// Identifier reported back to clients as `source`.
    pub fn source(&self) -> String {
        format!("{}/{}", self.name, self.model)
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("account_id", &self.account_id.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image: ImagePayload,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limited (429)")]
    RateLimited,
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("empty response")]
    EmptyResponse,
}

#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("No vision provider is configured; set an API key for at least one provider")]
    NoProviders,
    #[error("Vision provider request failed")]
    AllFailed { attempts: Vec<ProviderFailure> },
}

impl ChainError {
    /// One line per failed provider, for the `details` field.
    pub fn details(&self) -> String {
        match self {
            ChainError::NoProviders => String::new(),
            ChainError::AllFailed { attempts } => attempts
                .iter()
                .map(|a| format!("{}: {}", a.provider, a.error))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSuccess {
    pub source: String,
    pub text: String,
}

/// Seam between the fallback chain and the network.
#[async_trait]
pub trait VisionTransport: Send + Sync {
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &VisionRequest,
    ) -> Result<String, ProviderError>;
}

/// Try providers strictly in order; the first non-empty reply wins.
pub async fn attempt_extraction(
    providers: &[ProviderDescriptor],
    transport: &dyn VisionTransport,
    request: &VisionRequest,
) -> Result<ProviderSuccess, ChainError> {
    if providers.is_empty() {
        return Err(ChainError::NoProviders);
    }

    let mut attempts = Vec::new();
    for provider in providers {
        info!(
            provider = %provider.name,
            model = %provider.model,
            image_bytes = request.image.bytes().len(),
            "calling vision provider"
        );
        let outcome = transport
            .complete(provider, request)
            .await
            .and_then(|text| {
                let text = text.trim().to_string();
                if text.is_empty() {
                    Err(ProviderError::EmptyResponse)
                } else {
                    Ok(text)
                }
            });

        match outcome {
            Ok(text) => {
                info!(provider = %provider.name, chars = text.len(), "vision provider answered");
                return Ok(ProviderSuccess {
                    source: provider.source(),
                    text,
                });
            }
            Err(error) => {
                warn!(provider = %provider.name, error = %error, "vision provider failed");
                attempts.push(ProviderFailure {
                    provider: provider.name.clone(),
                    error,
                });
            }
        }
    }

    Err(ChainError::AllFailed { attempts })
}

/// reqwest-backed transport speaking each provider's wire format.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl VisionTransport for HttpTransport {
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        request: &VisionRequest,
    ) -> Result<String, ProviderError> {
        match provider.kind {
            ProviderKind::Gemini => gemini_complete(&self.client, provider, request).await,
            ProviderKind::OpenAiCompatible => {
                openai_compatible_complete(&self.client, provider, request).await
            }
            ProviderKind::CloudflareWorkersAi => {
                cloudflare_complete(&self.client, provider, request).await
            }
        }
    }
}

async fn send_json<B: Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    body: &B,
) -> Result<reqwest::Response, ProviderError> {
    let resp = client
        .post(url)
        .headers(headers)
        .json(body)
        .send()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;

    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: txt.chars().take(ERROR_BODY_LIMIT).collect(),
        });
    }
    Ok(resp)
}

fn bearer_headers(token: &str) -> Result<HeaderMap, ProviderError> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| ProviderError::Transport(format!("invalid credential header: {e}")))?;
    headers.insert(AUTHORIZATION, value);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

async fn gemini_complete(
    client: &reqwest::Client,
    provider: &ProviderDescriptor,
    request: &VisionRequest,
) -> Result<String, ProviderError> {
    #[derive(Serialize)]
    struct Req {
        contents: Vec<Content>,
        #[serde(rename = "generationConfig")]
        generation_config: GenerationConfig,
    }

    #[derive(Serialize)]
    struct Content {
        parts: Vec<Part>,
    }

    #[derive(Serialize)]
    #[serde(untagged)]
    enum Part {
        Text { text: String },
        Inline { inline_data: InlineData },
    }

    #[derive(Serialize)]
    struct InlineData {
        mime_type: String,
        data: String,
    }

    #[derive(Serialize)]
    struct GenerationConfig {
        temperature: f32,
    }

    #[derive(Deserialize)]
    struct Resp {
        #[serde(default)]
        candidates: Vec<Candidate>,
    }

    #[derive(Deserialize)]
    struct Candidate {
        content: Option<RespContent>,
    }

    #[derive(Deserialize)]
    struct RespContent {
        #[serde(default)]
        parts: Vec<RespPart>,
    }

    #[derive(Deserialize)]
    struct RespPart {
        text: Option<String>,
    }

    let body = Req {
        contents: vec![Content {
            parts: vec![
                Part::Text {
                    text: request.prompt.clone(),
                },
                Part::Inline {
                    inline_data: InlineData {
                        mime_type: request.image.mime().to_string(),
                        data: request.image.base64(),
                    },
                },
            ],
        }],
        generation_config: GenerationConfig { temperature: 0.1 },
    };

    let mut headers = HeaderMap::new();
    let key = HeaderValue::from_str(&provider.api_key)
        .map_err(|e| ProviderError::Transport(format!("invalid credential header: {e}")))?;
    headers.insert("x-goog-api-key", key);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let url = format!("{}/models/{}:generateContent", provider.base_url, provider.model);
    let resp = send_json(client, &url, headers, &body).await?;
    let out: Resp = resp
        .json()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

    let mut s = String::new();
    if let Some(content) = out.candidates.into_iter().next().and_then(|c| c.content) {
        for p in content.parts {
            if let Some(t) = p.text {
                s.push_str(&t);
            }
        }
    }
    Ok(s)
}

async fn openai_compatible_complete(
    client: &reqwest::Client,
    provider: &ProviderDescriptor,
    request: &VisionRequest,
) -> Result<String, ProviderError> {
    #[derive(Serialize)]
    struct Req {
        model: String,
        messages: Vec<Msg>,
        temperature: f32,
    }

    #[derive(Serialize)]
    struct Msg {
        role: &'static str,
        content: Vec<ContentPart>,
    }

    #[derive(Serialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum ContentPart {
        Text { text: String },
        ImageUrl { image_url: ImageUrl },
    }

    #[derive(Serialize)]
    struct ImageUrl {
        url: String,
    }

    #[derive(Deserialize)]
    struct Resp {
        #[serde(default)]
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: MsgOut,
    }

    #[derive(Deserialize)]
    struct MsgOut {
        content: Option<String>,
    }

    let body = Req {
        model: provider.model.clone(),
        messages: vec![Msg {
            role: "user",
            content: vec![
                ContentPart::Text {
                    text: request.prompt.clone(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: request.image.data_url(),
                    },
                },
            ],
        }],
        temperature: 0.1,
    };

    let url = format!("{}/chat/completions", provider.base_url);
    let resp = send_json(client, &url, bearer_headers(&provider.api_key)?, &body).await?;
    let out: Resp = resp
        .json()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

    Ok(out
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default())
}

async fn cloudflare_complete(
    client: &reqwest::Client,
    provider: &ProviderDescriptor,
    request: &VisionRequest,
) -> Result<String, ProviderError> {
    #[derive(Serialize)]
    struct Req<'a> {
        messages: Vec<Msg<'a>>,
        image: &'a [u8],
        max_tokens: u32,
    }

    #[derive(Serialize)]
    struct Msg<'a> {
        role: &'static str,
        content: &'a str,
    }

    #[derive(Deserialize)]
    struct Resp {
        result: Option<RunResult>,
    }

    // Text models answer in `response`, captioning models in `description`.
    #[derive(Deserialize)]
    struct RunResult {
        response: Option<String>,
        description: Option<String>,
    }

    let account = provider
        .account_id
        .as_deref()
        .ok_or_else(|| ProviderError::Transport("missing Cloudflare account id".to_string()))?;

    let body = Req {
        messages: vec![Msg {
            role: "user",
            content: &request.prompt,
        }],
        image: request.image.bytes(),
        max_tokens: 2048,
    };

    let url = format!(
        "{}/accounts/{}/ai/run/{}",
        provider.base_url, account, provider.model
    );
    let resp = send_json(client, &url, bearer_headers(&provider.api_key)?, &body).await?;
    let out: Resp = resp
        .json()
        .await
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

    Ok(out
        .result
        .and_then(|r| r.response.or(r.description))
        .unwrap_or_default())
}
