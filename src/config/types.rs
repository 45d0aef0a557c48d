//! Server configuration as read from `tablerest.json` or the environment.

use crate::schema::AccessPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PORT: u16 = 3306;
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Backend connection. `host` and `username` are optional here so that validation can
/// name the missing one instead of failing deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub provider: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: String,
    /// Databases to introspect; empty means every non-system schema.
    #[serde(default)]
    pub databases: Vec<String>,
}

impl ConnectionConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub connection: ConnectionConfig,
    /// Rows per page; 0 disables paging.
    #[serde(default)]
    pub page_limit: u32,
    #[serde(default)]
    pub policies: Vec<AccessPolicy>,
    /// Extra display-name aliases keyed by subject path (`db.table` or `db.table.column`).
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}
