use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use slipscan_cli::llm::{ProviderError, VisionRequest};
use slipscan_cli::{AppState, ProviderDescriptor, ProviderKind, VisionTransport, app_router};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const PNG: &str = "data:image/png;base64,iVBORw0KGgo=";

/// Replies keyed by provider name; `None` means that provider errors.
struct Scripted {
    replies: Vec<(String, Option<String>)>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl VisionTransport for Scripted {
    async fn complete(
        &self,
        provider: &ProviderDescriptor,
        _request: &VisionRequest,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(provider.name.clone());
        match self.replies.iter().find(|(name, _)| name == &provider.name) {
            Some((_, Some(text))) => Ok(text.clone()),
            _ => Err(ProviderError::Status {
                status: 500,
                body: "boom".to_string(),
            }),
        }
    }
}

fn provider(name: &str) -> ProviderDescriptor {
    ProviderDescriptor {
        name: name.to_string(),
        kind: ProviderKind::OpenAiCompatible,
        base_url: "http://localhost".to_string(),
        model: "vision-test".to_string(),
        api_key: "k".to_string(),
        account_id: None,
    }
}

fn app(replies: &[(&str, Option<&str>)]) -> (Router, Arc<Scripted>) {
    let transport = Arc::new(Scripted {
        replies: replies
            .iter()
            .map(|(n, r)| (n.to_string(), r.map(str::to_string)))
            .collect(),
        calls: Mutex::new(Vec::new()),
    });
    let providers = replies.iter().map(|(n, _)| provider(n)).collect();
    let state = Arc::new(AppState::new(providers, transport.clone()));
    (app_router(state, 1024 * 1024), transport)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_status_reports_credentials() {
    let (router, _) = app(&[("gemini", Some("[]"))]);
    let resp = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["hasApiKey"], true);

    let (router, _) = app(&[]);
    let resp = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["hasApiKey"], false);
}

#[tokio::test]
async fn test_options_is_no_content_with_cors() {
    let (router, _) = app(&[]);
    let resp = router
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/")
                .header(header::ORIGIN, "https://app.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_browser_preflight_is_allowed() {
    let (router, _) = app(&[]);
    let resp = router
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/")
                .header(header::ORIGIN, "https://app.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn test_other_methods_are_rejected() {
    let (router, _) = app(&[]);
    let resp = router
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(resp).await, json!({ "error": "Method not allowed" }));
}

#[tokio::test]
async fn test_missing_image_is_bad_request() {
    let (router, transport) = app(&[("gemini", Some("[]"))]);
    let resp = router
        .oneshot(post_json("/", json!({ "prompt": "hi" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().to_lowercase().contains("image"));
    assert!(transport.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let (router, _) = app(&[("gemini", Some("[]"))]);
    let resp = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
}

#[tokio::test]
async fn test_no_providers_is_server_error() {
    let (router, _) = app(&[]);
    let resp = router
        .oneshot(post_json("/", json!({ "image": PNG })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["transactions"], json!([]));
    assert!(body["error"].as_str().unwrap().contains("No vision provider"));
}

#[tokio::test]
async fn test_single_provider_failure_is_500() {
    let (router, _) = app(&[("gemini", None)]);
    let resp = router
        .oneshot(post_json("/", json!({ "image": PNG })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["details"].as_str().unwrap().contains("gemini"));
}

#[tokio::test]
async fn test_exhausted_chain_is_503() {
    let (router, transport) = app(&[("gemini", None), ("groq", None)]);
    let resp = router
        .oneshot(post_json("/", json!({ "image": PNG })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "All vision providers failed");
    assert_eq!(body["transactions"], json!([]));
    let details = body["details"].as_str().unwrap();
    assert!(details.contains("gemini") && details.contains("groq"));
    assert_eq!(*transport.calls.lock().unwrap(), vec!["gemini", "groq"]);
}

#[tokio::test]
async fn test_fallback_success_reports_source() {
    let reply = "```json\n[{\"date\":\"2025-11-20\",\"description\":\"KFC Rundle Mall\",\
                 \"category\":\"food\",\"amount\":\"$12.50\",\"type\":\"expense\"}]\n```";
    let (router, _) = app(&[("gemini", None), ("openrouter", Some(reply))]);
    let resp = router
        .oneshot(post_json(
            "/",
            json!({ "image": PNG, "members": ["Ana", "Ben"] }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    assert_eq!(body["source"], "openrouter/vision-test");

    let tx = &body["transactions"][0];
    assert_eq!(tx["date"], "2025-11-20");
    assert_eq!(tx["category"], "food");
    assert_eq!(tx["amount"], 12.5);
    assert_eq!(tx["txType"], "expense");
    assert_eq!(tx["payer"], "Ana");
    assert_eq!(tx["involved"], json!(["Ana", "Ben"]));
}

#[tokio::test]
async fn test_unparseable_reply_is_empty_success_false() {
    let (router, _) = app(&[("gemini", Some("Sorry, I cannot read this image."))]);
    let resp = router
        .oneshot(post_json("/", json!({ "image": PNG })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["count"], 0);
    assert_eq!(body["transactions"], json!([]));
}

#[tokio::test]
async fn test_any_path_serves_the_endpoint() {
    let (router, _) = app(&[("gemini", Some("[]"))]);
    let resp = router
        .oneshot(post_json("/api/extract", json!({ "image": PNG })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["source"], "gemini/vision-test");
}

struct Exploding;

#[async_trait]
impl VisionTransport for Exploding {
    async fn complete(
        &self,
        _provider: &ProviderDescriptor,
        _request: &VisionRequest,
    ) -> Result<String, ProviderError> {
        panic!("transport exploded");
    }
}

#[tokio::test]
async fn test_panic_becomes_json_500_with_cors() {
    let state = Arc::new(AppState::new(vec![provider("gemini")], Arc::new(Exploding)));
    let router = app_router(state, 1024 * 1024);
    let mut req = post_json("/", json!({ "image": PNG }));
    req.headers_mut()
        .insert(header::ORIGIN, "https://app.example".parse().unwrap());

    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let body = body_json(resp).await;
    assert_eq!(body["error"], "transport exploded");
    assert_eq!(body["success"], false);
    assert_eq!(body["transactions"], json!([]));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (_, transport) = app(&[("gemini", Some("[]"))]);
    let state = Arc::new(AppState::new(vec![provider("gemini")], transport.clone()));
    let router = app_router(state, 64);
    let big = format!("data:image/png;base64,{}", "A".repeat(1024));
    let resp = router
        .oneshot(post_json("/", json!({ "image": big })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(transport.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_text_plain_body_is_parsed() {
    let (router, _) = app(&[("gemini", Some("[{\"description\":\"Cafe\",\"amount\":4}]"))]);
    let resp = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/")
                .header(header::CONTENT_TYPE, "text/plain;charset=UTF-8")
                .body(Body::from(json!({ "image": PNG }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_single_object_reply_through_endpoint() {
    let reply = "{\"description\":\"Dinner\",\"amount\":30,\"payer\":\"Ben\",\"involved\":[\"Ana\",\"Ben\"]}";
    let (router, _) = app(&[("gemini", Some(reply))]);
    let resp = router
        .oneshot(post_json(
            "/",
            json!({ "image": PNG, "members": ["Ana", "Ben", "Cy"] }),
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["transactions"][0]["payer"], "Ben");
    assert_eq!(body["transactions"][0]["involved"], json!(["Ana", "Ben"]));
}
