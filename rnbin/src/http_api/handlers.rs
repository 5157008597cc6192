use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::{header, Request, Response, StatusCode};
use tracing::{debug, info};

use rnbin_core::{BlobInput, BlobService};

use super::responses;

/// Request headers carrying caller attributes, `x-rnbin-attr-<key>: <value>`.
const ATTRIBUTE_HEADER_PREFIX: &str = "x-rnbin-attr-";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Returns the form-decoded value of the first `name=` pair in the query.
pub fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(|value| value.into_owned())
        })
}

/// `POST /api/upload?sep=<tag>[&name=<origin>][&created_by=<id>]`
pub async fn upload<B>(
    service: &BlobService,
    req: Request<B>,
    max_upload_size: usize,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let query = req.uri().query();
    let Some(namespace) = query_param(query, "sep") else {
        return responses::invalid_input("Missing query parameter: sep");
    };
    let origin_name = query_param(query, "name");
    let created_by = query_param(query, "created_by");

    let content_type = match req.headers().get(header::CONTENT_TYPE) {
        Some(value) => match value.to_str() {
            Ok(value) => value.to_string(),
            Err(_) => return responses::invalid_input("Content-Type is not valid ASCII"),
        },
        None => DEFAULT_CONTENT_TYPE.to_string(),
    };

    let mut attributes = Vec::new();
    for (name, value) in req.headers() {
        let Some(key) = name.as_str().strip_prefix(ATTRIBUTE_HEADER_PREFIX) else {
            continue;
        };
        match value.to_str() {
            Ok(value) => attributes.push((key.to_string(), value.to_string())),
            Err(_) => {
                return responses::invalid_input(&format!(
                    "Attribute header {} is not valid ASCII",
                    name
                ))
            }
        }
    }

    let content = match Limited::new(req.into_body(), max_upload_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            return responses::error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                &format!("Upload exceeds {} bytes", max_upload_size),
            );
        }
        Err(err) => {
            debug!(error = %err, "Failed to read upload body");
            return responses::invalid_input("Failed to read request body");
        }
    };

    let mut input = BlobInput::new(content, content_type, namespace);
    if let Some(name) = origin_name {
        input = input.with_origin_name(name);
    }
    if let Some(creator) = created_by {
        input = input.with_created_by(creator);
    }
    for (key, value) in attributes {
        input = input.with_attribute(key, value);
    }

    match service.put(input).await {
        Ok(key) => {
            info!(key = key.as_str(), "Blob uploaded");
            responses::json_response(
                StatusCode::CREATED,
                &serde_json::json!({ "key": key.as_str() }),
            )
        }
        Err(err) => responses::domain_error(&err),
    }
}

/// `GET /api/download?key=<opaque>`
pub async fn download(service: &BlobService, query: Option<&str>) -> Response<Full<Bytes>> {
    let Some(key) = query_param(query, "key") else {
        return responses::invalid_input("Missing query parameter: key");
    };

    match service.get_with_meta(&key).await {
        Ok((content, meta)) => {
            let content_type = if meta.content_type.is_empty() {
                DEFAULT_CONTENT_TYPE
            } else {
                meta.content_type.as_str()
            };
            responses::content_response(content_type, content)
        }
        Err(err) => responses::domain_error(&err),
    }
}

/// `GET /api/meta?key=<opaque>`
pub async fn meta(service: &BlobService, query: Option<&str>) -> Response<Full<Bytes>> {
    let Some(key) = query_param(query, "key") else {
        return responses::invalid_input("Missing query parameter: key");
    };

    match service.get_meta(&key).await {
        Ok(meta) => responses::json_response(StatusCode::OK, &meta),
        Err(err) => responses::domain_error(&err),
    }
}

pub fn health() -> Response<Full<Bytes>> {
    responses::json_response(
        StatusCode::OK,
        &serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION")
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param() {
        let query = Some("sep=docs&name=hello%20world.txt&key=ab%2Fcd%40ns");
        assert_eq!(query_param(query, "sep").as_deref(), Some("docs"));
        assert_eq!(query_param(query, "name").as_deref(), Some("hello world.txt"));
        assert_eq!(query_param(query, "key").as_deref(), Some("ab/cd@ns"));
        assert_eq!(query_param(query, "created_by"), None);
        assert_eq!(query_param(None, "sep"), None);
    }

    #[test]
    fn test_query_param_plus_is_space() {
        let query = Some("name=hello+world.txt&created_by=a%2Bb");
        assert_eq!(query_param(query, "name").as_deref(), Some("hello world.txt"));
        assert_eq!(query_param(query, "created_by").as_deref(), Some("a+b"));
    }

    #[test]
    fn test_query_param_first_wins() {
        assert_eq!(query_param(Some("sep=a&sep=b"), "sep").as_deref(), Some("a"));
    }

    #[test]
    fn test_query_param_keeps_raw_separators() {
        let query = Some("key=abc123/docs/00ff-1a2b@1");
        assert_eq!(
            query_param(query, "key").as_deref(),
            Some("abc123/docs/00ff-1a2b@1")
        );
    }
}
