//! Edge-path relay, mounted ahead of routing.

use super::{too_many_requests, BotGuard, Inspection, HEADER_LATENCY};
use crate::verdict::VerdictKind;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

/// Classify the request, then forward it, rewrite it to the challenge page
/// or block it.
///
/// Skipped requests and credential errors pass through untouched. Every
/// other outcome carries the verdict headers and `x-datadome-latency`.
///
/// ```ignore
/// let app = Router::new()
///     .route("/", get(index))
///     .route_layer(middleware::from_fn_with_state(guard, edge_middleware));
/// ```
pub async fn edge_middleware(State(guard): State<BotGuard>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let inspection = guard.inspect(&parts).await;
    let request = Request::from_parts(parts, body);

    let (verdict, latency) = match inspection {
        Inspection::Skipped(_) => return next.run(request).await,
        Inspection::Classified { verdict, latency } => (verdict, latency),
    };

    let mut response = match verdict.kind() {
        VerdictKind::CredentialError => return next.run(request).await,
        VerdictKind::Redirect(url) => {
            debug!(url = %url, "Rewriting bot request to DataDome challenge");
            guard.rewrite(&url).await
        }
        VerdictKind::Block if guard.config().relay.block_unredirected_bots => too_many_requests(),
        VerdictKind::Allow
        | VerdictKind::Block
        | VerdictKind::Timeout
        | VerdictKind::UpstreamError => next.run(request).await,
    };

    verdict.headers.apply_to(response.headers_mut());

    if guard.config().relay.latency_header {
        response.headers_mut().insert(
            HEADER_LATENCY,
            HeaderValue::from(latency.as_millis() as u64),
        );
    }

    response
}
