use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Response, StatusCode};
use serde::Serialize;
use tracing::error;

use rnbin_core::{DomainError, ErrorKind};

pub fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
    let mut resp = Response::new(Full::new(Bytes::from(json)));
    *resp.status_mut() = status;
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    resp
}

pub fn error_response(status: StatusCode, error: &str, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": error,
        "message": message,
        "status": status.as_u16()
    });
    json_response(status, &body)
}

pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "not_found", "Not Found")
}

pub fn invalid_input(message: &str) -> Response<Full<Bytes>> {
    error_response(StatusCode::BAD_REQUEST, ErrorKind::InvalidInput.as_str(), message)
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::MalformedKey | ErrorKind::InvalidShardReference => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BackendUnavailable => StatusCode::BAD_GATEWAY,
    }
}

/// Renders a domain error. Backend causes are logged, never sent to the client.
pub fn domain_error(err: &DomainError) -> Response<Full<Bytes>> {
    let kind = err.kind();
    let message = match kind {
        ErrorKind::BackendUnavailable => {
            error!(error = ?err, "Backend failure while serving request");
            "Storage backend unavailable".to_string()
        }
        _ => err.to_string(),
    };
    error_response(status_for(kind), kind.as_str(), &message)
}

pub fn content_response(content_type: &str, body: Bytes) -> Response<Full<Bytes>> {
    let content_type = header::HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| header::HeaderValue::from_static("application/octet-stream"));
    let mut resp = Response::new(Full::new(body));
    resp.headers_mut().insert(header::CONTENT_TYPE, content_type);
    resp
}
