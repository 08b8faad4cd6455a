//! Sample server: static files, a form echo, a greeting, and three route
//! groups showing how middleware stacks compose.
//!
//! Run with:
//!   cargo run -- --static-dir ./static
//!
//! Try:
//!   curl http://localhost:7100/hello
//!   curl -d 'name=Ana&address=Rua+X' http://localhost:7100/form
//!   curl -H 'Authorization: secret' http://localhost:7100/foo/
//!   curl http://localhost:7100/bar/

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use chainmux::app::{self, Config};
use chainmux::{Server, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    if let Err(e) = logging::init(config.log_format) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    let routes = match app::router(&config).and_then(|router| router.freeze()) {
        Ok(routes) => routes,
        Err(e) => {
            error!("invalid route configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match Server::bind(config.addr.as_str()).serve(routes).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("server error: {e}");
            ExitCode::FAILURE
        }
    }
}
