//! HTTP surface: status probe, extraction endpoint, permissive CORS.
//!
//! Every path serves the same method router, mirroring a single serverless
//! function mounted at any route.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::StatusCode,
    routing::{MethodRouter, get},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use slipscan_core::NormalizedTransaction;
use slipscan_finance::normalize_model_output;
use slipscan_ingest::NormalizeOptions;
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::error::{ApiError, ApiResult, panic_response};
use crate::image::{ImageError, ImagePayload};
use crate::llm::{ChainError, ProviderDescriptor, VisionRequest, VisionTransport, attempt_extraction};
use crate::prompt::build_prompt;

pub struct AppState {
    pub providers: Vec<ProviderDescriptor>,
    pub transport: Arc<dyn VisionTransport>,
}

impl AppState {
    pub fn new(providers: Vec<ProviderDescriptor>, transport: Arc<dyn VisionTransport>) -> Self {
        Self {
            providers,
            transport,
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.providers.is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<String>>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractResponse {
    /// True iff at least one transaction was extracted.
    pub success: bool,
    pub transactions: Vec<NormalizedTransaction>,
    pub count: usize,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub has_api_key: bool,
}

pub fn app_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let endpoint: MethodRouter<Arc<AppState>> = get(status)
        .post(extract)
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route("/", endpoint.clone())
        .route("/{*path}", endpoint)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let message = if state.has_api_key() {
        format!(
            "slipscan {} ({}) ready; POST an image to extract transactions",
            env!("CARGO_PKG_VERSION"),
            env!("SLIPSCAN_BUILD_SHA")
        )
    } else {
        "slipscan is running but no vision provider credential is configured".to_string()
    };
    Json(StatusResponse {
        status: "ok".to_string(),
        message,
        has_api_key: state.has_api_key(),
    })
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// The body is parsed as JSON whatever the content type; browsers post
/// `text/plain` to skip the CORS preflight.
async fn extract(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ExtractResponse>> {
    let req: ExtractRequest = serde_json::from_slice(&body?)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?;
    let resp = extract_transactions(
        &state.providers,
        state.transport.as_ref(),
        req,
        slipscan_core::today_local(),
    )
    .await?;
    Ok(Json(resp))
}

/// Validate the request, call the provider chain, normalize the reply.
pub async fn extract_transactions(
    providers: &[ProviderDescriptor],
    transport: &dyn VisionTransport,
    req: ExtractRequest,
    today: NaiveDate,
) -> ApiResult<ExtractResponse> {
    let raw_image = req.image.as_deref().ok_or(ImageError::Missing)?;
    let image = ImagePayload::parse(raw_image)?;

    if providers.is_empty() {
        return Err(ApiError::Config(ChainError::NoProviders.to_string()));
    }

    let members = req.members.unwrap_or_default();
    let opts = NormalizeOptions::new(today).with_members(members);
    let prompt = build_prompt(
        req.prompt.as_deref(),
        &opts.members,
        req.currency.as_deref(),
        today,
    );

    let request = VisionRequest { prompt, image };
    let reply = attempt_extraction(providers, transport, &request)
        .await
        .map_err(|e| chain_error(e, providers.len()))?;

    let transactions = normalize_model_output(&reply.text, &opts);
    info!(
        source = %reply.source,
        count = transactions.len(),
        "extraction finished"
    );

    Ok(ExtractResponse {
        success: !transactions.is_empty(),
        count: transactions.len(),
        transactions,
        source: reply.source,
    })
}

/// A lone provider failing is a 500; an exhausted fallback chain is a 503.
fn chain_error(err: ChainError, provider_count: usize) -> ApiError {
    match err {
        ChainError::NoProviders => ApiError::Config(err.to_string()),
        ChainError::AllFailed { .. } => {
            let status = if provider_count > 1 {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            let message = if provider_count > 1 {
                "All vision providers failed".to_string()
            } else {
                err.to_string()
            };
            ApiError::Upstream {
                status,
                message,
                details: err.details(),
            }
        }
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> axum::response::Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal server error".to_string()
    };
    tracing::error!(%message, "handler panicked");
    panic_response(&message)
}
