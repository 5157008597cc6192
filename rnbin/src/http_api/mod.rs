//! JSON/HTTP front of the blob service.
//!
//! Routes:
//! - `POST /api/upload?sep=<tag>[&name=<origin>][&created_by=<id>]`
//! - `GET /api/download?key=<opaque>`
//! - `GET /api/meta?key=<opaque>`
//! - `GET /health`

mod handlers;
mod responses;

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Method, Request, Response};
use tracing::info;

use rnbin_core::BlobService;

use crate::metrics::PrometheusMetrics;

/// Default cap on upload bodies, 32 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub struct HttpApi {
    service: Arc<BlobService>,
    metrics: PrometheusMetrics,
    max_upload_size: usize,
}

impl HttpApi {
    pub fn new(service: Arc<BlobService>, metrics: PrometheusMetrics, max_upload_size: usize) -> Self {
        Self {
            service,
            metrics,
            max_upload_size,
        }
    }

    /// Main request handler
    pub async fn handle_request<B>(
        &self,
        req: Request<B>,
    ) -> Result<Response<Full<Bytes>>, std::convert::Infallible>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let route = route_name(&method, &path);

        let resp = self.route_request(route, req).await;

        let elapsed = start.elapsed();
        let status = resp.status().as_u16();
        self.metrics.observe_http(route, status, elapsed);
        info!(
            method = %method,
            path = %path,
            status,
            elapsed_us = elapsed.as_micros() as u64,
            "HTTP request"
        );
        Ok(resp)
    }

    async fn route_request<B>(&self, route: &str, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let query = req.uri().query().map(str::to_string);
        let query = query.as_deref();

        match route {
            "upload" => handlers::upload(&self.service, req, self.max_upload_size).await,
            "download" => handlers::download(&self.service, query).await,
            "meta" => handlers::meta(&self.service, query).await,
            "health" => handlers::health(),
            _ => responses::not_found(),
        }
    }
}

/// Fixed label per route, so unknown paths cannot blow up metric cardinality.
fn route_name(method: &Method, path: &str) -> &'static str {
    match (method, path) {
        (&Method::POST, "/api/upload") => "upload",
        (&Method::GET, "/api/download") => "download",
        (&Method::GET, "/api/meta") => "meta",
        (&Method::GET, "/health") => "health",
        _ => "unknown",
    }
}
