//! Handler-wrapper relay for a single route.

use super::{too_many_requests, BotGuard, Inspection};
use crate::verdict::VerdictKind;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

/// Classify before the wrapped handler runs.
///
/// Bots are redirected to the verdict URL, or answered with 429 when there
/// is none; the handler is not invoked for them. Everything else reaches the
/// handler and its response is returned unchanged.
///
/// ```ignore
/// let app = Router::new().route(
///     "/api/hello",
///     get(hello).route_layer(middleware::from_fn_with_state(guard, handler_middleware)),
/// );
/// ```
pub async fn handler_middleware(State(guard): State<BotGuard>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let inspection = guard.inspect(&parts).await;

    if let Inspection::Classified { verdict, .. } = inspection {
        match verdict.kind() {
            VerdictKind::Redirect(url) => {
                debug!(path = %parts.uri.path(), url = %url, "Redirecting bot");
                return redirect(&url);
            }
            VerdictKind::Block => {
                debug!(path = %parts.uri.path(), "Blocking bot");
                return too_many_requests();
            }
            VerdictKind::Allow
            | VerdictKind::CredentialError
            | VerdictKind::Timeout
            | VerdictKind::UpstreamError => {}
        }
    }

    next.run(Request::from_parts(parts, body)).await
}

/// 307 to `url`. Falls back to the block response if `url` is not a valid
/// header value.
fn redirect(url: &str) -> Response {
    match header::HeaderValue::from_str(url) {
        Ok(location) => {
            (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
        }
        Err(_) => too_many_requests(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_response() {
        let response = redirect("https://geo.captcha-delivery.com/captcha/");
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "https://geo.captcha-delivery.com/captcha/"
        );
    }

    #[test]
    fn test_invalid_redirect_blocks() {
        let response = redirect("https://example.com/\n");
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
