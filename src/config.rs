//! Runtime configuration, read once from the environment at startup.
//!
//! There is no configuration-file format and no flag-parsing framework
//! here, deliberately: this mirrors the rest of the crate's scale, just
//! lifted from a hardcoded constant to env-var overrides, which is the
//! minimum a deployable instance of this server needs.

use std::env;

const DEFAULT_PORT: u16 = 42069;
const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_UPSTREAM_BASE: &str = "https://httpbin.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub upstream_base: String,
}

impl Config {
    /// Build a `Config` from the environment, falling back to defaults
    /// for any variable that is unset or fails to parse.
    pub fn from_env() -> Config {
        let bind = env::var("HTTP_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let port = env::var("HTTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let upstream_base =
            env::var("HTTP_UPSTREAM_BASE").unwrap_or_else(|_| DEFAULT_UPSTREAM_BASE.to_string());

        Config {
            bind,
            port,
            upstream_base,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            upstream_base: DEFAULT_UPSTREAM_BASE.to_string(),
        }
    }
}
