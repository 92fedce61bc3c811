//! Process settings read from the environment.
//!
//! `PAYROLL_BIND_ADDR` sets the HTTP listen address (default
//! `127.0.0.1:3000`), `PAYROLL_RULES_FILE` points at an optional JSON
//! rule file and `PAYROLL_LOG_LEVEL` sets the default log filter.  A
//! `.env` file in the working directory is honoured.

use crate::error::Result;
use crate::rules::PayrollRules;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub bind_addr: String,
    pub rules_file: Option<PathBuf>,
    pub log_level: String,
}

impl AppSettings {
    pub fn load() -> Self {
        dotenvy::dotenv().ok();

        Self {
            bind_addr: env::var("PAYROLL_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            rules_file: env::var("PAYROLL_RULES_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            log_level: env::var("PAYROLL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = if self.bind_addr.starts_with("localhost:") {
            self.bind_addr.replacen("localhost", "127.0.0.1", 1)
        } else {
            self.bind_addr.clone()
        };
        addr.parse().map_err(|err| {
            anyhow::anyhow!(
                "PAYROLL_BIND_ADDR {:?} is not a socket address: {err}",
                self.bind_addr
            )
        })
    }

    /// The configured rule file, or the standing rules when none is set.
    pub fn payroll_rules(&self) -> Result<PayrollRules> {
        match &self.rules_file {
            Some(path) => {
                info!(path = %path.display(), "loading payroll rules");
                PayrollRules::from_json_file(path)
            }
            None => Ok(PayrollRules::default()),
        }
    }
}
