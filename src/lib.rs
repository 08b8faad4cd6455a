//! # chainmux
//!
//! A minimal HTTP router with grouped, composable middleware.
//!
//! Routes are registered per method and path. Middleware is attached to a
//! router (every later route gets it), to a group (only the group's routes
//! get it) or to a single route, and runs outermost-first on the way in and
//! innermost-first on the way out. Connection handling, HTTP/1.1 and HTTP/2
//! are hyper's job; static files are tower-http's.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use chainmux::middleware::{auth, logger};
//! use chainmux::{Error, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let mut app = Router::with([logger()]);
//!
//!     app.group(|admin| {
//!         admin.middleware(auth("secret"));
//!         admin.get("/admin/stats", stats, &[])?;
//!         Ok(())
//!     })?;
//!     app.get("/users/{id}", get_user, &[])?;
//!
//!     Server::bind("0.0.0.0:3000").serve(app.freeze()?).await
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn stats(_req: Request) -> &'static str {
//!     "ok"
//! }
//! ```
//!
//! ## Matching
//!
//! A pattern ending in `/` is a subtree and matches every path below it;
//! any other pattern matches exactly. See [`Pattern`]. A path that matches
//! a pattern but not its method is answered `405` with an `Allow` header;
//! a path matching nothing is `404`.

mod error;
mod form;
mod handler;
mod method;
mod pattern;
mod request;
mod response;
mod router;
mod server;
mod table;

pub mod app;
pub mod handlers;
pub mod logging;
pub mod middleware;

pub use error::Error;
pub use form::{Form, FormError, MAX_FORM_BODY};
pub use handler::{BoxedHandler, ErasedHandler, Handler};
pub use http::StatusCode;
pub use method::Method;
pub use pattern::Pattern;
pub use request::{Request, RequestBuilder};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{DRAIN_TIMEOUT, Server};
pub use table::Routes;
