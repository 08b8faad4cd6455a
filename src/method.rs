//! HTTP method as a typed enum.
//!
//! Covers the methods routes can be registered for. Requests carrying any
//! other method never match a route; they resolve to `405 Method Not Allowed`
//! on a known path and `404 Not Found` otherwise.

use std::fmt;

/// A method a route can be registered for.
///
/// Variants are declared in wire-name order so that sorted collections
/// (such as the `Allow` header) come out alphabetical.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Method {
    Delete,
    Get,
    Head,
    Options,
    Post,
    Put,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Post    => "POST",
            Self::Put     => "PUT",
        }
    }

    /// Maps a request method onto a routable one. `None` for methods no
    /// route can be registered for (`PATCH`, `TRACE`, extensions, ...).
    pub fn from_http(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::DELETE  => Some(Self::Delete),
            http::Method::GET     => Some(Self::Get),
            http::Method::HEAD    => Some(Self::Head),
            http::Method::OPTIONS => Some(Self::Options),
            http::Method::POST    => Some(Self::Post),
            http::Method::PUT     => Some(Self::Put),
            _                     => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
