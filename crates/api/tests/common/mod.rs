#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vantage_api::app::build_router;
use vantage_api::config::ServerConfig;
use vantage_api::state::AppState;
use vantage_core::storage::StorageLayout;

/// A router over a throwaway storage root.
///
/// The storage root holds a project directory with:
/// - `P1` owned by `alice` and shared with `bob`
/// - `P2` owned by `carol`
/// - `LEGACY` with no owner
///
/// and an API key `key-alice` issued to `alice`.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub root: PathBuf,
    _tmp: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Build a test `ServerConfig` rooted at `root`.
///
/// Conversion scripts run through `sh` from `<root>/../scripts`.
pub fn test_config(root: &Path) -> ServerConfig {
    let mut config = ServerConfig::from_lookup(|_| None);
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.storage = StorageLayout::with_root(root);
    config.processor.interpreter = "sh".into();
    config.processor.scripts_dir = root.parent().unwrap_or(root).join("scripts");
    config.processor.mesh_script = "mesh.sh".into();
    config.processor.pointcloud_script = "pointcloud.sh".into();
    config.processor.gaussian_script = "gaussian.sh".into();
    config
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(|_| {})
}

/// Like [`build_test_app`], letting the caller adjust the configuration.
pub fn build_test_app_with(adjust: impl FnOnce(&mut ServerConfig)) -> TestApp {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path().join("Storage");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::create_dir_all(tmp.path().join("scripts")).unwrap();
    for name in ["mesh.sh", "pointcloud.sh", "gaussian.sh"] {
        std::fs::write(tmp.path().join("scripts").join(name), "exit 0\n").unwrap();
    }

    std::fs::write(
        root.join("projects.json"),
        r#"[
            {"id": "P1", "ownerId": "alice"},
            {"id": "P2", "ownerId": "carol"},
            {"id": "LEGACY", "ownerId": null}
        ]"#,
    )
    .unwrap();
    std::fs::write(root.join("sharing.json"), r#"{"P1": [{"email": "bob"}]}"#).unwrap();
    std::fs::write(
        root.join("integrations.json"),
        r#"{"apiKeys": {"alice": {"key": "key-alice"}}}"#,
    )
    .unwrap();

    let mut config = test_config(&root);
    adjust(&mut config);

    let state = AppState::from_config(config);
    TestApp {
        router: build_router(state.clone()),
        state,
        root,
        _tmp: tmp,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// GET without identity.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, Body::empty(), None).await
}

/// GET as `user` (via `X-User-Id`).
pub async fn get_as(app: Router, uri: &str, user: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(user), Body::empty(), None).await
}

/// POST a JSON body, optionally as `user`.
pub async fn post_json(app: Router, uri: &str, user: Option<&str>, body: Value) -> Response<Body> {
    send(
        app,
        Method::POST,
        uri,
        user,
        Body::from(body.to_string()),
        Some("application/json"),
    )
    .await
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Body,
    content_type: Option<&str>,
) -> Response<Body> {
    let mut headers = Vec::new();
    if let Some(user) = user {
        headers.push(("x-user-id", user));
    }
    if let Some(ct) = content_type {
        headers.push(("content-type", ct));
    }
    request(app, method, uri, &headers, body).await
}

/// Send a request with arbitrary headers.
pub async fn request(
    app: Router,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
    body: Body,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(body).unwrap()).await.unwrap()
}

/// POST a raw JSON string as `user`.
pub async fn post_raw(app: Router, uri: &str, user: &str, raw: &str) -> Response<Body> {
    send(
        app,
        Method::POST,
        uri,
        Some(user),
        Body::from(raw.to_string()),
        Some("application/json"),
    )
    .await
}

const BOUNDARY: &str = "vantage-test-boundary";

/// Encode a multipart form. Each part is `(name, filename, bytes)`.
/// Returns the body and its `content-type` header value.
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> (Vec<u8>, String) {
    let mut body = Vec::new();
    for (name, filename, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (body, format!("multipart/form-data; boundary={BOUNDARY}"))
}

/// POST a multipart form as `user`. Each part is `(name, filename, bytes)`.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    user: &str,
    parts: &[(&str, Option<&str>, &[u8])],
) -> Response<Body> {
    let (body, content_type) = multipart_body(parts);
    send(
        app,
        Method::POST,
        uri,
        Some(user),
        Body::from(body),
        Some(&content_type),
    )
    .await
}

/// A body that yields `chunks` one at a time, sleeping `delay` before each.
pub fn slow_body(chunks: Vec<Vec<u8>>, delay: Duration) -> Body {
    let chunks = futures::stream::iter(chunks);
    let stream = futures::StreamExt::then(chunks, move |chunk| async move {
        tokio::time::sleep(delay).await;
        Ok::<_, std::io::Error>(chunk)
    });
    Body::from_stream(stream)
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Poll a job until it reaches a terminal status.
pub async fn wait_for_terminal(app: &TestApp, job_id: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let json = body_json(get(app.router(), &format!("/api/v1/processing/status/{job_id}")).await).await;
        let status = json["data"]["status"].as_str().unwrap_or_default().to_string();
        if status == "completed" || status == "failed" {
            return json["data"].clone();
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} stuck in {status}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
