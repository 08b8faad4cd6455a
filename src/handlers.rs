//! Sample handlers: a greeting, a form echo and a static file tree.

use std::path::PathBuf;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Empty};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{error, warn};

use crate::handler::Handler;
use crate::request::Request;
use crate::response::Response;

/// `Hello, World!` for `GET /hello`.
///
/// The handler checks path and method itself, so mounting it anywhere else
/// (for instance under a subtree) answers `404`, and non-GET methods that
/// reach it answer `405`.
pub async fn hello(req: Request) -> Response {
    if req.path() != "/hello" {
        return Response::error(StatusCode::NOT_FOUND);
    }
    if req.method() != http::Method::GET {
        return Response::error(StatusCode::METHOD_NOT_ALLOWED);
    }
    Response::text("Hello, World!")
}

/// Greets the `name` field and echoes the `address` field of a URL-encoded
/// form. Absent fields read as empty. Any parse failure is `400`.
pub async fn form(req: Request) -> Response {
    let form = match req.form() {
        Ok(form) => form,
        Err(e) => {
            warn!(error = %e, "rejecting malformed form");
            return Response::error(StatusCode::BAD_REQUEST);
        }
    };

    Response::text(format!(
        "Hello, {}!\nYour address is {}!",
        form.value("name"),
        form.value("address"),
    ))
}

/// Serves files below `root`, keyed by the full request path.
///
/// Directory paths serve their `index.html`; missing files are `404`.
pub fn files(root: PathBuf) -> impl Handler {
    let dir = ServeDir::new(root);
    move |req: Request| serve_file(dir.clone(), req)
}

async fn serve_file(dir: ServeDir, req: Request) -> Response {
    let mut lookup = http::Request::new(Empty::<Bytes>::new());
    *lookup.method_mut() = req.method().clone();
    *lookup.uri_mut() = req.uri().clone();
    *lookup.headers_mut() = req.headers().clone();

    let res = match dir.oneshot(lookup).await {
        Ok(res) => res,
        Err(e) => {
            error!(error = %e, path = %req.path(), "static file service failed");
            return Response::error(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let (parts, body) = res.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!(error = %e, path = %req.path(), "reading static file failed");
            return Response::error(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    Response { body, headers: parts.headers, status: parts.status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ErasedHandler;

    #[tokio::test]
    async fn hello_only_answers_its_own_path_and_get() {
        let res = hello(Request::builder(http::Method::GET, "/hello").unwrap().empty()).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"Hello, World!");

        let res = hello(Request::builder(http::Method::GET, "/foo/").unwrap().empty()).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

        let res = hello(Request::builder(http::Method::HEAD, "/hello").unwrap().empty()).await;
        assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn form_greets_and_echoes_address() {
        let req = Request::builder(http::Method::POST, "/form").unwrap()
            .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("name=Ana&address=Rua+X");
        let res = form(req).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"Hello, Ana!\nYour address is Rua X!");
    }

    #[tokio::test]
    async fn form_rejects_bad_encoding() {
        let req = Request::builder(http::Method::POST, "/form").unwrap()
            .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("name=%G1");
        assert_eq!(form(req).await.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn files_serve_index_and_miss_with_404() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(root.path().join("app.css"), "body{}").unwrap();
        let serve = files(root.path().to_path_buf()).into_boxed_handler();

        let res = serve.call(Request::builder(http::Method::GET, "/").unwrap().empty()).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"<h1>home</h1>");
        assert!(res.header("content-type").unwrap().starts_with("text/html"));

        let css = Request::builder(http::Method::GET, "/app.css").unwrap().empty();
        let res = serve.call(css).await;
        assert_eq!(res.body(), b"body{}");

        let missing = Request::builder(http::Method::GET, "/unknown").unwrap().empty();
        let res = serve.call(missing).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    }
}
