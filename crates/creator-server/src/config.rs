//! Server Configuration
//!
//! Read from the environment after `.env` is loaded. Empty values count as
//! unset.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use creator_payments::checkout::DEFAULT_BASE_URL;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} is not a valid socket address: {value}")]
    BindAddr { name: &'static str, value: String },

    #[error("{name} must be an http(s) URL: {value}")]
    Url { name: &'static str, value: String },
}

/// Server settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    /// Paystack secret key; payments are disabled without it
    pub paystack_secret_key: Option<String>,

    pub paystack_base_url: String,

    /// JSON file replacing the built-in rate tables
    pub rate_tables_path: Option<PathBuf>,

    /// Public URL of this service, used for the Paystack callback
    pub public_base_url: Option<String>,
}

impl ServerConfig {
    /// Load from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::BindAddr {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let paystack_base_url = get("PAYSTACK_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        check_url("PAYSTACK_BASE_URL", &paystack_base_url)?;

        let public_base_url = get("PUBLIC_BASE_URL").map(|url| url.trim_end_matches('/').to_string());
        if let Some(url) = &public_base_url {
            check_url("PUBLIC_BASE_URL", url)?;
        }

        Ok(Self {
            bind_addr,
            paystack_secret_key: get("PAYSTACK_SECRET_KEY"),
            paystack_base_url,
            rate_tables_path: get("RATE_TABLES_PATH").map(PathBuf::from),
            public_base_url,
        })
    }

    /// Where Paystack sends the payer after checkout
    pub fn callback_url(&self) -> Option<String> {
        self.public_base_url
            .as_ref()
            .map(|base| format!("{base}/paystack/callback"))
    }
}

fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Url {
            name,
            value: value.to_string(),
        })
    }
}
