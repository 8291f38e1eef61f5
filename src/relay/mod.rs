//! Response relay.
//!
//! Two axum integration shapes share one [`BotGuard`]:
//!
//! - [`edge::edge_middleware`] runs ahead of routing, forwards the verdict
//!   headers and rewrites bot traffic to the challenge page.
//! - [`handler::handler_middleware`] wraps a single route and redirects or
//!   blocks bots before the handler runs.

pub mod edge;
pub mod handler;

pub use edge::edge_middleware;
pub use handler::handler_middleware;

use crate::client::{Classifier, VerdictClient};
use crate::config::DataDomeConfig;
use crate::describer::{inspection_skip, InboundRequest, RequestDescriptor, SkipReason};
use crate::verdict::Verdict;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Body sent with a 429 block.
pub const BLOCK_BODY: &str = "too many requests";

/// Diagnostic header carrying classification time in milliseconds.
pub const HEADER_LATENCY: &str = "x-datadome-latency";

/// Result of inspecting one request.
#[derive(Debug, Clone)]
pub enum Inspection {
    /// Not sent for classification
    Skipped(SkipReason),
    /// Classified by the service
    Classified { verdict: Verdict, latency: Duration },
}

/// Shared state for both relay variants.
#[derive(Clone)]
pub struct BotGuard {
    classifier: Arc<dyn Classifier>,
    config: Arc<DataDomeConfig>,
    http: reqwest::Client,
}

impl BotGuard {
    /// Guard backed by the DataDome validation API.
    pub fn new(client: VerdictClient) -> Self {
        let config = Arc::new(client.config().clone());
        let http = client.http_client().clone();
        Self {
            classifier: Arc::new(client),
            config,
            http,
        }
    }

    /// Guard backed by any classifier.
    pub fn with_classifier(classifier: Arc<dyn Classifier>, config: DataDomeConfig) -> Self {
        Self {
            classifier,
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &DataDomeConfig {
        &self.config
    }

    /// Skip or classify a request.
    pub async fn inspect<R: InboundRequest + ?Sized>(&self, request: &R) -> Inspection {
        if let Some(reason) = inspection_skip(request) {
            debug!(
                path = request.path(),
                reason = reason.as_str(),
                "Skipping DataDome classification"
            );
            return Inspection::Skipped(reason);
        }

        let descriptor = RequestDescriptor::from_request(request, &self.config.relay.client_id_cookie);
        let started = Instant::now();
        let verdict = self.classifier.classify(&descriptor).await;
        let latency = started.elapsed();

        debug!(
            ip = %descriptor.ip,
            request = %descriptor.request,
            kind = verdict.kind().as_str(),
            latency_ms = latency.as_millis() as u64,
            "DataDome classification complete"
        );

        Inspection::Classified { verdict, latency }
    }

    /// Serve the content of `url` in place of the requested page.
    ///
    /// A failed or slow fetch degrades to a plain 403 so bot traffic is never
    /// handed to the application. The whole fetch, body included, must finish
    /// within `relay.rewrite_timeout_ms`.
    pub(crate) async fn rewrite(&self, url: &str) -> Response {
        let fetched = async {
            let upstream = self.http.get(url).send().await?;
            let status = upstream.status();
            let content_type = upstream.headers().get(http::header::CONTENT_TYPE).cloned();
            let body = upstream.bytes().await?;
            Ok::<_, reqwest::Error>((status, content_type, body))
        };

        let deadline = self.config.relay.rewrite_timeout();
        let Ok(fetched) = tokio::time::timeout(deadline, fetched).await else {
            tracing::warn!(
                url,
                timeout_ms = self.config.relay.rewrite_timeout_ms,
                "Timed out fetching DataDome rewrite target"
            );
            return forbidden();
        };

        match fetched {
            Ok((status, content_type, body)) => {
                let mut response = (status, body).into_response();
                if let Some(content_type) = content_type {
                    response
                        .headers_mut()
                        .insert(http::header::CONTENT_TYPE, content_type);
                }
                response
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Failed to fetch DataDome rewrite target");
                forbidden()
            }
        }
    }
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, "forbidden").into_response()
}

/// The 429 block response.
pub fn too_many_requests() -> Response {
    (StatusCode::TOO_MANY_REQUESTS, BLOCK_BODY).into_response()
}
