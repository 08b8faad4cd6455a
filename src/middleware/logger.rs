//! Per-request access log.

use std::time::Instant;

use tracing::info;

use super::{Middleware, Next};
use crate::request::Request;

/// Logs method, path, response status and elapsed wall-clock time of every
/// request passing through, after the inner chain has produced a response.
/// The response is returned untouched.
pub fn logger() -> Middleware {
    Middleware::from_fn(|req: Request, next: Next| async move {
        let method = req.method().clone();
        let path = req.path().to_owned();
        let started = Instant::now();

        let res = next.run(req).await;

        info!(
            %method,
            %path,
            status = res.status_code().as_u16(),
            elapsed = ?started.elapsed(),
            "http request"
        );
        res
    })
}
