//! Numbered entry/exit markers.

use tracing::info;

use super::{Middleware, Next};
use crate::request::Request;

/// Emits a `started` event tagged with `id` before the rest of the chain
/// runs and a `finished` event after it returns. Handy for seeing in which
/// order a route's middleware actually executes.
pub fn trace(id: u32) -> Middleware {
    Middleware::from_fn(move |req: Request, next: Next| async move {
        info!(id, "started");
        let res = next.run(req).await;
        info!(id, "finished");
        res
    })
}
