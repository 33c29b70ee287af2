use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Records request count and latency per method, normalized path and status.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Replace generated ids in a path with `{id}` to bound label cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if is_uuid_like(segment) || is_prefixed_id(segment) || is_numeric_id(segment) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_uuid_like(s: &str) -> bool {
    // 8-4-4-4-12 hex characters
    s.len() == 36 && s.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// `sess_<uuid>`, `lvltest_<uuid>` and other ids minted by `utils::id`.
fn is_prefixed_id(s: &str) -> bool {
    s.split_once('_')
        .map(|(prefix, rest)| {
            !prefix.is_empty()
                && prefix.chars().all(|c| c.is_ascii_lowercase())
                && is_uuid_like(rest)
        })
        .unwrap_or(false)
}

fn is_numeric_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/api/v1/sessions/sess_550e8400-e29b-41d4-a716-446655440000"),
            "/api/v1/sessions/{id}"
        );
        assert_eq!(
            normalize_path(
                "/api/v1/sessions/sess_550e8400-e29b-41d4-a716-446655440000/attempts"
            ),
            "/api/v1/sessions/{id}/attempts"
        );
        assert_eq!(normalize_path("/api/v1/sessions/123"), "/api/v1/sessions/{id}");
        assert_eq!(normalize_path("/api/v1/users/me/home"), "/api/v1/users/me/home");
        assert_eq!(normalize_path("/health"), "/health");
    }

    #[test]
    fn test_is_prefixed_id() {
        assert!(is_prefixed_id("lvltest_550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_prefixed_id("widget-snapshot"));
        assert!(!is_prefixed_id("level_tests"));
        assert!(!is_prefixed_id("_550e8400-e29b-41d4-a716-446655440000"));
    }
}
