//! Middleware layer.
//!
//! A [`Middleware`] turns a handler into another handler. Built with
//! [`Middleware::from_fn`], it receives each request together with a
//! [`Next`] standing for the rest of the chain, and decides whether (and
//! when) to call it:
//!
//! ```rust
//! use chainmux::middleware::{Middleware, Next};
//! use chainmux::{Request, Response};
//!
//! let stamp = Middleware::from_fn(|req: Request, next: Next| async move {
//!     // before
//!     let res: Response = next.run(req).await;
//!     // after
//!     res
//! });
//! ```
//!
//! Middleware lists compose as a right fold: for `[m1, m2, m3]` around `h`
//! the composed handler is `m1(m2(m3(h)))`, so `m1` runs first on the way in
//! and last on the way out.
//!
//! Built in:
//! - [`logger`]: one structured event per request with method, path, status, latency
//! - [`auth`]: shared-secret check on the `Authorization` header
//! - [`trace`]: numbered `started` / `finished` markers around the rest of the chain

mod auth;
mod logger;
mod trace;

pub use auth::auth;
pub use logger::logger;
pub use trace::trace;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

type Transform = dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static;

/// A handler transformer. Cheap to clone: clones share the same closure.
#[derive(Clone)]
pub struct Middleware(Arc<Transform>);

impl Middleware {
    /// Builds middleware from an async function of the request and the rest
    /// of the chain.
    pub fn from_fn<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + Send + 'static,
    {
        let f = Arc::new(f);
        Self(Arc::new(move |next: BoxedHandler| -> BoxedHandler {
            Arc::new(MiddlewareHandler { f: Arc::clone(&f), next })
        }))
    }

    pub(crate) fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (self.0)(next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware { .. }")
    }
}

/// The remainder of a middleware chain, ending in the route handler.
pub struct Next(BoxedHandler);

impl Next {
    /// Runs the rest of the chain. Dropping `Next` without calling this
    /// short-circuits every inner middleware and the handler.
    pub async fn run(self, req: Request) -> Response {
        self.0.call(req).await
    }
}

struct MiddlewareHandler<F> {
    f: Arc<F>,
    next: BoxedHandler,
}

impl<F, Fut, R> ErasedHandler for MiddlewareHandler<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.f)(req, Next(Arc::clone(&self.next)));
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Wraps `handler` in `chain`, first element outermost.
pub fn compose(handler: impl Handler, chain: &[Middleware]) -> BoxedHandler {
    fold(handler.into_boxed_handler(), chain.iter())
}

fn fold<'a, I>(handler: BoxedHandler, chain: I) -> BoxedHandler
where
    I: DoubleEndedIterator<Item = &'a Middleware>,
{
    chain.rev().fold(handler, |next, m| m.wrap(next))
}

/// An ordered middleware sequence owned by one router.
///
/// Cloning copies the sequence, so a clone and its source grow independently
/// from then on.
#[derive(Clone, Debug, Default)]
pub(crate) struct Chain(Vec<Middleware>);

impl Chain {
    pub(crate) fn push(&mut self, m: Middleware) {
        self.0.push(m);
    }

    /// Composes this chain followed by route-specific `extra` around `handler`.
    pub(crate) fn compose(&self, handler: impl Handler, extra: &[Middleware]) -> BoxedHandler {
        fold(handler.into_boxed_handler(), self.0.iter().chain(extra))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use http::StatusCode;

    use super::*;

    pub(crate) type Journal = Arc<Mutex<Vec<String>>>;

    /// Records `"{name}-before"` / `"{name}-after"` around the rest of the chain.
    pub(crate) fn recorder(name: &'static str, journal: &Journal) -> Middleware {
        let journal = Arc::clone(journal);
        Middleware::from_fn(move |req, next: Next| {
            let journal = Arc::clone(&journal);
            async move {
                journal.lock().unwrap().push(format!("{name}-before"));
                let res = next.run(req).await;
                journal.lock().unwrap().push(format!("{name}-after"));
                res
            }
        })
    }

    /// Leaf handler recording `"{name}"` and answering with its name.
    pub(crate) fn leaf(
        name: &'static str,
        journal: &Journal,
    ) -> impl Fn(Request) -> std::future::Ready<Response> + Send + Sync + 'static {
        let journal = Arc::clone(journal);
        move |_req| {
            journal.lock().unwrap().push(name.to_owned());
            std::future::ready(Response::text(name))
        }
    }

    fn get(path: &str) -> Request {
        Request::builder(http::Method::GET, path).unwrap().empty()
    }

    #[tokio::test]
    async fn runs_outer_first_and_unwinds_in_reverse() {
        let journal = Journal::default();
        let h = compose(leaf("H", &journal), &[recorder("A", &journal), recorder("B", &journal)]);

        let res = h.call(get("/")).await;

        assert_eq!(res.body(), b"H");
        assert_eq!(
            *journal.lock().unwrap(),
            ["A-before", "B-before", "H", "B-after", "A-after"]
        );
    }

    #[tokio::test]
    async fn empty_chain_is_the_bare_handler() {
        let journal = Journal::default();
        let h = compose(leaf("H", &journal), &[]);
        h.call(get("/")).await;
        assert_eq!(*journal.lock().unwrap(), ["H"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_layers() {
        let journal = Journal::default();
        let deny = Middleware::from_fn(|_req, _next: Next| async { StatusCode::FORBIDDEN });
        let h = compose(
            leaf("H", &journal),
            &[recorder("A", &journal), deny, recorder("B", &journal)],
        );

        let res = h.call(get("/")).await;

        assert_eq!(res.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(*journal.lock().unwrap(), ["A-before", "A-after"]);
    }

    #[tokio::test]
    async fn chain_then_extra_keeps_registration_order() {
        let journal = Journal::default();
        let mut chain = Chain::default();
        chain.push(recorder("outer", &journal));
        let h = chain.compose(leaf("H", &journal), &[recorder("route", &journal)]);

        h.call(get("/")).await;

        assert_eq!(
            *journal.lock().unwrap(),
            ["outer-before", "route-before", "H", "route-after", "outer-after"]
        );
    }

    #[test]
    fn cloned_chains_grow_independently() {
        let mut parent = Chain::default();
        parent.push(Middleware::from_fn(|req, next: Next| next.run(req)));
        let mut child = parent.clone();
        child.push(Middleware::from_fn(|req, next: Next| next.run(req)));
        parent.push(Middleware::from_fn(|req, next: Next| next.run(req)));
        parent.push(Middleware::from_fn(|req, next: Next| next.run(req)));

        assert_eq!(child.len(), 2);
        assert_eq!(parent.len(), 3);
    }
}
