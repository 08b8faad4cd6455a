//! The sample application: its configuration and route table.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::error::Error;
use crate::handlers::{files, form, hello};
use crate::middleware::{auth, logger, trace};
use crate::router::Router;

/// Runtime configuration, from flags or `CHAINMUX_*` environment variables.
#[derive(Clone, Debug, Parser)]
#[command(name = "chainmux", version, about = "Sample server for the chainmux router")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "CHAINMUX_ADDR", default_value = "localhost:7100")]
    pub addr: String,

    /// Directory served under `/`.
    #[arg(long, env = "CHAINMUX_STATIC_DIR", default_value = "./static")]
    pub static_dir: PathBuf,

    /// Value the `Authorization` header must carry on protected routes.
    #[arg(long, env = "CHAINMUX_AUTH_SECRET", default_value = "secret", hide_env_values = true)]
    pub auth_secret: String,

    #[arg(long, env = "CHAINMUX_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "localhost:7100".to_owned(),
            static_dir: PathBuf::from("./static"),
            auth_secret: "secret".to_owned(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Builds the sample route table.
///
/// ```text
/// [logger]
///   ├─ group [trace 1, trace 2, auth]  GET /foo/
///   ├─ group [trace 3]                 GET /bar/ +[trace 4], GET /baz/ +[trace 5]
///   ├─ GET  /       static files
///   ├─ POST /form   form echo
///   └─ GET  /hello  greeting
/// ```
pub fn router(config: &Config) -> Result<Router, Error> {
    let mut r = Router::with([logger()]);

    r.group(|r| {
        r.middleware(trace(1))
            .middleware(trace(2))
            .middleware(auth(config.auth_secret.as_str()));
        r.get("/foo/", hello, &[])?;
        Ok(())
    })?;

    r.group(|r| {
        r.middleware(trace(3));
        r.get("/bar/", hello, &[trace(4)])?
            .get("/baz/", hello, &[trace(5)])?;
        Ok(())
    })?;

    r.get("/", files(config.static_dir.clone()), &[])?
        .post("/form", form, &[])?
        .get("/hello", hello, &[])?;

    Ok(r)
}
