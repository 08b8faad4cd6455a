//! Dispatch table: (method, pattern) → composed handler.
//!
//! Exact patterns live in a radix tree ([`matchit`]), giving O(path-length)
//! lookup with `{name}` parameters. Subtree patterns are kept longest-first
//! and matched by prefix. A path resolves against every pattern covering
//! it, most specific first; the first one registered for the request method
//! handles it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use http::header::{ALLOW, HeaderValue, LOCATION};
use http::StatusCode;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::error::Error;
use crate::handler::{BoxedHandler, ErasedHandler};
use crate::method::Method;
use crate::pattern::{Kind, Pattern};
use crate::request::Request;
use crate::response::Response;

/// All handlers registered under one pattern.
struct Endpoint {
    pattern: Pattern,
    handlers: BTreeMap<Method, BoxedHandler>,
}

impl Endpoint {
    /// Handler for `method`; HEAD falls back to GET.
    fn handler(&self, method: Option<Method>) -> Option<&BoxedHandler> {
        let method = method?;
        self.handlers.get(&method).or_else(|| match method {
            Method::Head => self.handlers.get(&Method::Get),
            _ => None,
        })
    }

    fn allowed(&self) -> impl Iterator<Item = Method> + '_ {
        self.handlers.keys().copied().flat_map(|m| match m {
            Method::Get => vec![Method::Get, Method::Head],
            other => vec![other],
        })
    }
}

pub(crate) struct Table {
    endpoints: Vec<Endpoint>,
    by_pattern: HashMap<String, usize>,
    exact: MatchitRouter<usize>,
    /// Indices into `endpoints`, longest pattern first.
    subtrees: Vec<usize>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            by_pattern: HashMap::new(),
            exact: MatchitRouter::new(),
            subtrees: Vec::new(),
        }
    }
}

/// The outcome of resolving one request against the table.
pub(crate) enum Resolution<'a> {
    Found {
        handler: &'a BoxedHandler,
        params: HashMap<String, String>,
    },
    MethodNotAllowed(BTreeSet<Method>),
    Redirect(String),
    NotFound,
}

impl Table {
    /// Installs `handler` for `method` + `pattern`. Each pair can be
    /// registered once.
    pub(crate) fn insert(
        &mut self,
        method: Method,
        pattern: Pattern,
        handler: BoxedHandler,
    ) -> Result<(), Error> {
        let idx = match self.by_pattern.get(pattern.as_str()).copied() {
            Some(idx) => idx,
            None => self.add_endpoint(pattern)?,
        };

        let endpoint = &mut self.endpoints[idx];
        if endpoint.handlers.contains_key(&method) {
            return Err(Error::DuplicateRoute {
                method,
                pattern: endpoint.pattern.to_string(),
            });
        }
        endpoint.handlers.insert(method, handler);
        Ok(())
    }

    fn add_endpoint(&mut self, pattern: Pattern) -> Result<usize, Error> {
        let idx = self.endpoints.len();
        match pattern.kind() {
            Kind::Exact => {
                self.exact
                    .insert(pattern.as_str(), idx)
                    .map_err(|e| Error::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: e.to_string(),
                    })?;
            }
            Kind::Subtree => {
                let len = pattern.as_str().len();
                let at = self
                    .subtrees
                    .partition_point(|&i| self.endpoints[i].pattern.as_str().len() >= len);
                self.subtrees.insert(at, idx);
            }
        }
        self.by_pattern.insert(pattern.as_str().to_owned(), idx);
        self.endpoints.push(Endpoint { pattern, handlers: BTreeMap::new() });
        Ok(idx)
    }

    pub(crate) fn resolve(&self, method: &http::Method, path: &str) -> Resolution<'_> {
        let method = Method::from_http(method);
        let mut allowed = BTreeSet::new();

        if let Ok(matched) = self.exact.at(path) {
            let endpoint = &self.endpoints[*matched.value];
            if let Some(handler) = endpoint.handler(method) {
                let params = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect();
                return Resolution::Found { handler, params };
            }
            allowed.extend(endpoint.allowed());
        }

        for endpoint in self.subtrees.iter().map(|&i| &self.endpoints[i]) {
            if !endpoint.pattern.covers(path) {
                continue;
            }
            if let Some(handler) = endpoint.handler(method) {
                return Resolution::Found { handler, params: HashMap::new() };
            }
            allowed.extend(endpoint.allowed());
        }

        if !allowed.is_empty() {
            return Resolution::MethodNotAllowed(allowed);
        }

        let with_slash = format!("{path}/");
        let subtree = self.by_pattern.get(&with_slash);
        if subtree.is_some_and(|&i| self.endpoints[i].pattern.is_subtree()) {
            return Resolution::Redirect(with_slash);
        }

        Resolution::NotFound
    }
}

/// The frozen, immutable dispatch table a server runs on.
///
/// Obtained from [`Router::freeze`](crate::Router::freeze). Cheap to share
/// behind an [`Arc`]; no routes can be added once it exists.
#[derive(Clone)]
pub struct Routes {
    table: Arc<Table>,
}

impl Routes {
    pub(crate) fn new(table: Table) -> Self {
        Self { table: Arc::new(table) }
    }

    /// Routes one request and produces one response.
    ///
    /// Unmatched requests never reach middleware: they are answered here with
    /// `404`, `405` (with `Allow`) or a `301` to the trailing-slash subtree.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        match self.table.resolve(req.method(), req.path()) {
            Resolution::Found { handler, params } => {
                req.params = params;
                handler.call(req).await
            }
            Resolution::MethodNotAllowed(allowed) => {
                debug!(method = %req.method(), path = %req.path(), "method not allowed");
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                let mut res = Response::error(StatusCode::METHOD_NOT_ALLOWED);
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    res.headers.insert(ALLOW, value);
                }
                res
            }
            Resolution::Redirect(mut location) => {
                if let Some(query) = req.query() {
                    location.push('?');
                    location.push_str(query);
                }
                match HeaderValue::from_str(&location) {
                    Ok(value) => Response::builder()
                        .status(StatusCode::MOVED_PERMANENTLY)
                        .header(LOCATION, value)
                        .no_body(),
                    Err(_) => Response::error(StatusCode::NOT_FOUND),
                }
            }
            Resolution::NotFound => {
                debug!(method = %req.method(), path = %req.path(), "no route");
                Response::error(StatusCode::NOT_FOUND)
            }
        }
    }
}
