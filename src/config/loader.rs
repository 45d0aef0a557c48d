//! Load server config from a JSON file or from environment variables.

use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::Path;

pub const CONFIG_PATH_ENV: &str = "TABLEREST_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "tablerest.json";

/// Path from `TABLEREST_CONFIG`, default `tablerest.json`.
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into())
}

/// Parse and validate a config file.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ServerConfig, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let config = parse(&raw)?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Parse and validate config JSON.
pub fn parse(raw: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Build config from `MYSQL_*` and `TABLEREST_*` environment variables.
pub fn load_from_env() -> Result<ServerConfig, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// The config file when it exists, the environment otherwise.
pub fn load() -> Result<ServerConfig, ConfigError> {
    let path = config_path();
    if Path::new(&path).exists() {
        load_from_path(&path)
    } else {
        tracing::debug!(path = %path, "no config file, reading environment");
        load_from_env()
    }
}

pub(crate) fn from_lookup<F>(lookup: F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let port = match lookup("MYSQL_PORT") {
        Some(p) => Some(
            p.trim()
                .parse()
                .map_err(|_| ConfigError::Load(format!("MYSQL_PORT: invalid port '{}'", p)))?,
        ),
        None => None,
    };
    let page_limit = match lookup("TABLEREST_PAGE_LIMIT") {
        Some(p) => p
            .trim()
            .parse()
            .map_err(|_| ConfigError::Load(format!("TABLEREST_PAGE_LIMIT: invalid number '{}'", p)))?,
        None => 0,
    };
    let databases = lookup("MYSQL_DATABASES")
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let config = ServerConfig {
        connection: ConnectionConfig {
            provider: "mysql".into(),
            host: lookup("MYSQL_HOST"),
            port,
            username: lookup("MYSQL_USER"),
            password: lookup("MYSQL_PASSWORD").unwrap_or_default(),
            databases,
        },
        page_limit,
        policies: Vec::new(),
        aliases: Default::default(),
        bind: lookup("TABLEREST_BIND").unwrap_or_else(|| DEFAULT_BIND.into()),
        max_body_bytes: DEFAULT_MAX_BODY_BYTES,
    };
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn parses_file_with_defaults() {
        let config = parse(
            r#"{
                "connection": {"provider": "mysql", "host": "db", "username": "api"},
                "policies": [{"subject": "shop.secrets", "excluded": true}],
                "aliases": {"shop.orders": ["orders"]}
            }"#,
        )
        .unwrap();
        assert_eq!(config.connection.port(), 3306);
        assert_eq!(config.page_limit, 0);
        assert_eq!(config.bind, "0.0.0.0:3000");
        assert_eq!(config.max_body_bytes, 65536);
        assert!(config.policies[0].excluded);
        assert_eq!(config.aliases["shop.orders"], vec!["orders"]);
    }

    #[test]
    fn malformed_json_is_load_error() {
        assert!(matches!(parse("{"), Err(ConfigError::Load(_))));
    }

    #[test]
    fn builds_from_environment() {
        let config = from_lookup(env(&[
            ("MYSQL_HOST", "localhost"),
            ("MYSQL_PORT", "3307"),
            ("MYSQL_USER", "root"),
            ("MYSQL_DATABASES", "shop, hr,"),
            ("TABLEREST_PAGE_LIMIT", "25"),
        ]))
        .unwrap();
        assert_eq!(config.connection.port(), 3307);
        assert_eq!(config.connection.databases, vec!["shop", "hr"]);
        assert_eq!(config.page_limit, 25);
        assert_eq!(config.connection.password, "");
    }

    #[test]
    fn environment_without_host_is_rejected() {
        let err = from_lookup(env(&[("MYSQL_USER", "root")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingOption("host")));
    }

    #[test]
    fn bad_port_is_load_error() {
        let err = from_lookup(env(&[("MYSQL_HOST", "h"), ("MYSQL_USER", "u"), ("MYSQL_PORT", "x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
