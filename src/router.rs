//! Route registration with grouped middleware.
//!
//! A [`Router`] is a view onto a dispatch table plus the middleware every
//! route registered through it gets wrapped in. [`Router::group`] hands out
//! a child view on the same table with a snapshot of the parent's
//! middleware, so a group can stack its own middleware without touching its
//! parent or siblings.
//!
//! Routers are configured once at startup and then frozen into [`Routes`]:
//!
//! ```rust
//! use chainmux::middleware::{auth, logger, trace};
//! use chainmux::{Error, Request, Router};
//!
//! async fn hello(_req: Request) -> &'static str { "Hello, World!" }
//!
//! fn routes() -> Result<chainmux::Routes, Error> {
//!     let mut app = Router::new();
//!     app.middleware(logger());
//!
//!     app.group(|admin| {
//!         admin.middleware(auth("secret"));
//!         admin.get("/admin/", hello, &[trace(1)])?;
//!         Ok(())
//!     })?;
//!
//!     app.get("/hello", hello, &[])?;
//!     app.freeze()
//! }
//! # routes().unwrap();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Error;
use crate::handler::Handler;
use crate::method::Method;
use crate::middleware::{Chain, Middleware};
use crate::pattern::Pattern;
use crate::table::{Routes, Table};

/// The application router.
///
/// Registration methods return `&mut Self` so calls chain with `?`.
/// `Router` is deliberately `!Send`: it only exists on the thread that
/// configures it, and only [`Routes`] crosses into the server.
pub struct Router {
    table: Rc<RefCell<Table>>,
    chain: Chain,
}

impl Router {
    pub fn new() -> Self {
        Self { table: Rc::default(), chain: Chain::default() }
    }

    /// A router whose every route is wrapped in `middleware`, first element
    /// outermost.
    pub fn with(middleware: impl IntoIterator<Item = Middleware>) -> Self {
        let mut router = Self::new();
        for m in middleware {
            router.middleware(m);
        }
        router
    }

    /// Appends `m` to this router's middleware. Only routes registered
    /// afterwards, here or in groups created afterwards, are wrapped in it.
    pub fn middleware(&mut self, m: Middleware) -> &mut Self {
        self.chain.push(m);
        self
    }

    /// Runs `configure` against a child router that shares this router's
    /// dispatch table and starts from a copy of its middleware.
    pub fn group<F>(&mut self, configure: F) -> Result<&mut Self, Error>
    where
        F: FnOnce(&mut Router) -> Result<(), Error>,
    {
        let mut child = Router {
            table: Rc::clone(&self.table),
            chain: self.chain.clone(),
        };
        configure(&mut child)?;
        Ok(self)
    }

    /// Registers `handler` for `method` + `path`, wrapped in this router's
    /// middleware followed by `extra`.
    ///
    /// Fails if `path` is not a valid [`Pattern`] or the method + pattern pair
    /// is already taken.
    pub fn on(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        extra: &[Middleware],
    ) -> Result<&mut Self, Error> {
        let pattern = Pattern::parse(path)?;
        let composed = self.chain.compose(handler, extra);
        self.table.borrow_mut().insert(method, pattern, composed)?;
        Ok(self)
    }

    pub fn get(
        &mut self,
        path: &str,
        handler: impl Handler,
        extra: &[Middleware],
    ) -> Result<&mut Self, Error> {
        self.on(Method::Get, path, handler, extra)
    }

    pub fn post(
        &mut self,
        path: &str,
        handler: impl Handler,
        extra: &[Middleware],
    ) -> Result<&mut Self, Error> {
        self.on(Method::Post, path, handler, extra)
    }

    pub fn put(
        &mut self,
        path: &str,
        handler: impl Handler,
        extra: &[Middleware],
    ) -> Result<&mut Self, Error> {
        self.on(Method::Put, path, handler, extra)
    }

    pub fn delete(
        &mut self,
        path: &str,
        handler: impl Handler,
        extra: &[Middleware],
    ) -> Result<&mut Self, Error> {
        self.on(Method::Delete, path, handler, extra)
    }

    pub fn head(
        &mut self,
        path: &str,
        handler: impl Handler,
        extra: &[Middleware],
    ) -> Result<&mut Self, Error> {
        self.on(Method::Head, path, handler, extra)
    }

    pub fn options(
        &mut self,
        path: &str,
        handler: impl Handler,
        extra: &[Middleware],
    ) -> Result<&mut Self, Error> {
        self.on(Method::Options, path, handler, extra)
    }

    /// Ends configuration. The returned [`Routes`] is immutable and can be
    /// shared across any number of concurrent requests.
    pub fn freeze(self) -> Result<Routes, Error> {
        let table = Rc::try_unwrap(self.table).map_err(|_| Error::RouterInUse)?;
        Ok(Routes::new(table.into_inner()))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::middleware::tests::{Journal, leaf, recorder};
    use crate::request::Request;
    use crate::response::Response;

    async fn get(routes: &Routes, path: &str) -> Response {
        routes.dispatch(Request::builder(http::Method::GET, path).unwrap().empty()).await
    }

    fn take(journal: &Journal) -> Vec<String> {
        std::mem::take(&mut *journal.lock().unwrap())
    }

    #[tokio::test]
    async fn ancestor_then_route_middleware_each_run_once() {
        let j = Journal::default();
        let mut r = Router::with([recorder("root", &j)]);
        r.group(|g| {
            g.middleware(recorder("group", &j));
            g.group(|inner| {
                inner.middleware(recorder("inner", &j));
                inner.get("/deep", leaf("H", &j), &[recorder("route", &j)])?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        let routes = r.freeze().unwrap();

        assert_eq!(get(&routes, "/deep").await.body(), b"H");
        assert_eq!(
            take(&j),
            [
                "root-before", "group-before", "inner-before", "route-before",
                "H",
                "route-after", "inner-after", "group-after", "root-after",
            ]
        );
    }

    #[tokio::test]
    async fn group_middleware_is_invisible_to_siblings_and_parent() {
        let j = Journal::default();
        let mut r = Router::new();
        r.group(|g1| {
            g1.middleware(recorder("X", &j));
            g1.get("/one", leaf("one", &j), &[])?;
            Ok(())
        })
        .unwrap();
        r.group(|g2| {
            g2.get("/two", leaf("two", &j), &[])?;
            Ok(())
        })
        .unwrap();
        r.get("/three", leaf("three", &j), &[]).unwrap();
        let routes = r.freeze().unwrap();

        get(&routes, "/one").await;
        assert_eq!(take(&j), ["X-before", "one", "X-after"]);
        get(&routes, "/two").await;
        assert_eq!(take(&j), ["two"]);
        get(&routes, "/three").await;
        assert_eq!(take(&j), ["three"]);
    }

    #[tokio::test]
    async fn middleware_only_wraps_later_registrations() {
        let j = Journal::default();
        let mut r = Router::new();
        r.get("/before", leaf("before", &j), &[]).unwrap();
        r.middleware(recorder("late", &j));
        r.get("/after", leaf("after", &j), &[]).unwrap();
        let routes = r.freeze().unwrap();

        get(&routes, "/before").await;
        assert_eq!(take(&j), ["before"]);
        get(&routes, "/after").await;
        assert_eq!(take(&j), ["late-before", "after", "late-after"]);
    }

    #[tokio::test]
    async fn parent_middleware_added_after_group_creation_skips_the_group() {
        let j = Journal::default();
        let mut r = Router::new();
        r.group(|g| {
            g.get("/grouped", leaf("grouped", &j), &[])?;
            Ok(())
        })
        .unwrap();
        r.middleware(recorder("parent", &j));
        let routes = r.freeze().unwrap();

        get(&routes, "/grouped").await;
        assert_eq!(take(&j), ["grouped"]);
    }

    #[test]
    fn duplicate_registration_fails_at_configuration_time() {
        let j = Journal::default();
        let mut r = Router::new();
        r.get("/hello", leaf("a", &j), &[]).unwrap();
        let err = r.get("/hello", leaf("b", &j), &[]).err().unwrap();
        assert!(matches!(err, Error::DuplicateRoute { method: Method::Get, .. }));
        assert_eq!(err.to_string(), "route `GET /hello` is already registered");
    }

    #[test]
    fn duplicates_across_groups_share_one_table() {
        let j = Journal::default();
        let mut r = Router::new();
        r.get("/hello", leaf("a", &j), &[]).unwrap();
        let err = r
            .group(|g| {
                g.get("/hello", leaf("b", &j), &[])?;
                Ok(())
            })
            .err()
            .unwrap();
        assert!(matches!(err, Error::DuplicateRoute { .. }));
    }

    #[tokio::test]
    async fn every_registration_method_dispatches() -> Result<(), Error> {
        let j = Journal::default();
        let mut r = Router::new();
        r.get("/r", leaf("get", &j), &[])?
            .post("/r", leaf("post", &j), &[])?
            .put("/r", leaf("put", &j), &[])?
            .delete("/r", leaf("delete", &j), &[])?
            .head("/r", leaf("head", &j), &[])?
            .options("/r", leaf("options", &j), &[])?;
        let routes = r.freeze()?;

        for (method, body) in [
            (http::Method::GET, "get"),
            (http::Method::POST, "post"),
            (http::Method::PUT, "put"),
            (http::Method::DELETE, "delete"),
            (http::Method::HEAD, "head"),
            (http::Method::OPTIONS, "options"),
        ] {
            let res = routes.dispatch(Request::builder(method, "/r").unwrap().empty()).await;
            assert_eq!(res.status_code(), StatusCode::OK);
            assert_eq!(res.body(), body.as_bytes());
        }
        Ok(())
    }

    #[test]
    fn freeze_refuses_while_a_group_view_is_still_alive() {
        let j = Journal::default();
        let mut r = Router::new();
        let mut escaped = None;
        r.group(|g| {
            g.get("/kept", leaf("kept", &j), &[])?;
            escaped = Some(std::mem::take(g));
            Ok(())
        })
        .unwrap();

        assert!(matches!(r.freeze(), Err(Error::RouterInUse)));
        assert!(escaped.is_some());
    }

    #[test]
    fn invalid_patterns_fail_registration() {
        let j = Journal::default();
        let mut r = Router::new();
        assert!(matches!(r.get("hello", leaf("a", &j), &[]), Err(Error::InvalidPattern { .. })));
    }
}
