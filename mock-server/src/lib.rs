//! Stand-in for the eFront API used by the request handler's tests.
//!
//! Every route under `/API/` echoes back what it received: method, path,
//! basic-auth credentials, SDK version header, content type and the decoded
//! form body. Requests without basic credentials get a 401 in the same JSON
//! envelope the real API uses. `/status/{code}` answers with an arbitrary
//! status so callers can check that non-2xx bodies come back untouched.
//! `/redirect` answers 302 without following up, `/binary` returns bytes that
//! are not UTF-8 and `/slow/{secs}` holds the response back.

use std::time::Duration;

use axum::{
    extract::Path,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;

pub const SDK_VERSION_HEADER: &str = "eFrontPro-SDK-Version";

/// Body served by `/binary`.
pub const BINARY_BODY: [u8; 4] = [0xff, 0xfe, 0x00, 0x41];

/// What the server saw for one request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EchoedRequest {
    pub method: String,
    pub path: String,
    pub api_key: String,
    pub password: String,
    pub sdk_version: Option<String>,
    pub content_type: Option<String>,
    pub form: Vec<(String, String)>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/API/{*path}", get(echo).post(echo).put(echo))
        .route("/status/{code}", get(status).post(status).put(status))
        .route("/redirect", get(redirect))
        .route("/binary", get(binary))
        .route("/slow/{secs}", get(slow))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Response {
    let Some((api_key, password)) = basic_credentials(&headers) else {
        tracing::debug!(%method, path = uri.path(), "rejecting request without credentials");
        let envelope = json!({
            "success": false,
            "error": { "code": 401, "message": "Unauthorized" },
        });
        return (StatusCode::UNAUTHORIZED, Json(envelope)).into_response();
    };

    let content_type = header_str(&headers, header::CONTENT_TYPE.as_str());
    let form = match content_type.as_deref() {
        Some("application/x-www-form-urlencoded") => {
            serde_urlencoded::from_str(&body).unwrap_or_default()
        }
        _ => Vec::new(),
    };

    let echoed = EchoedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        api_key,
        password,
        sdk_version: header_str(&headers, SDK_VERSION_HEADER),
        content_type,
        form,
        body,
    };
    tracing::debug!(method = %echoed.method, path = %echoed.path, "echoing request");
    Json(echoed).into_response()
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn redirect() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, "/status/200")], "moved").into_response()
}

async fn binary() -> Response {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        BINARY_BODY.to_vec(),
    )
        .into_response()
}

async fn slow(Path(secs): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_secs(secs)).await;
    "slow"
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Decode `Authorization: Basic ...` into `(user, password)`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = header_str(headers, header::AUTHORIZATION.as_str())?;
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = String::from_utf8(BASE64.decode(encoded).ok()?).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}
