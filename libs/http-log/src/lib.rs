use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{error, info, trace, warn};

const SLOW_REQUEST: Duration = Duration::from_millis(500);

/// Access log for every request. Bodies are passed through untouched,
/// uploads can be far larger than anything worth holding in memory.
pub async fn print_request_response(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();
    trace!(
        "[{} {}] request content-length = {:?}",
        method,
        uri,
        content_length(req.headers())
    );

    let res = next.run(req).await;
    let status = res.status();
    let elapsed = start.elapsed();

    match level(status, elapsed) {
        Level::Error => error!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            status.as_u16(),
            elapsed.as_millis()
        ),
        Level::Warn => warn!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            status.as_u16(),
            elapsed.as_millis()
        ),
        Level::Info => info!(
            "[{} {}] [{}] {}ms",
            method,
            uri,
            status.as_u16(),
            elapsed.as_millis()
        ),
    }

    res
}

#[derive(Debug, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
    Error,
}

fn level(status: StatusCode, elapsed: Duration) -> Level {
    if status.is_server_error() {
        Level::Error
    } else if status.is_client_error() || elapsed > SLOW_REQUEST {
        Level::Warn
    } else {
        Level::Info
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}
