//! Request correlation middleware.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

/// Propagate or generate `x-request-id` for end-to-end correlation.
pub async fn inject_request_id(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            format!("sloth-{:016x}", rng.gen::<u64>())
        });

    // Store for handler access.
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    // Echo back for end-to-end tracing.
    if let Ok(val) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", val);
    }

    response
}

/// Request correlation ID, extractable from `Request::extensions()`.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);
