//! Shared-secret authorization.

use std::sync::Arc;

use http::StatusCode;
use http::header::AUTHORIZATION;
use tracing::debug;

use super::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// Lets a request through only if its `Authorization` header equals
/// `secret` byte for byte. Anything else, including a missing header,
/// is answered with `401 Unauthorized` and the rest of the chain never runs.
pub fn auth(secret: impl Into<String>) -> Middleware {
    let secret: Arc<str> = Arc::from(secret.into());
    Middleware::from_fn(move |req: Request, next: Next| {
        let secret = Arc::clone(&secret);
        async move {
            let presented = req.headers().get(AUTHORIZATION).map(|v| v.as_bytes());
            if presented != Some(secret.as_bytes()) {
                debug!(path = %req.path(), "rejecting request without valid credential");
                return Response::error(StatusCode::UNAUTHORIZED);
            }
            next.run(req).await
        }
    })
}
