//! Config validation: provider, required options, policy subjects and alias sets.

use crate::config::ServerConfig;
use crate::error::ConfigError;
use crate::naming::Name;
use regex::Regex;
use std::collections::HashSet;

pub const SUPPORTED_PROVIDERS: &[&str] = &["mysql"];

const SUBJECT_PATTERN: &str = r"^[A-Za-z0-9_$]+(\.[A-Za-z0-9_$]+){0,2}$";

pub fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    let conn = &config.connection;
    if !SUPPORTED_PROVIDERS.contains(&conn.provider.as_str()) {
        return Err(ConfigError::UnknownProvider(conn.provider.clone()));
    }
    if conn.host.as_deref().map_or(true, str::is_empty) {
        return Err(ConfigError::MissingOption("host"));
    }
    if conn.username.as_deref().map_or(true, str::is_empty) {
        return Err(ConfigError::MissingOption("username"));
    }

    let subject = Regex::new(SUBJECT_PATTERN).map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut seen = HashSet::new();
    for policy in &config.policies {
        if !subject.is_match(&policy.subject) {
            return Err(ConfigError::Validation(format!(
                "malformed policy subject '{}'",
                policy.subject
            )));
        }
        if !seen.insert(policy.subject.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate policy subject '{}'",
                policy.subject
            )));
        }
    }

    let mut names: Vec<Name> = Vec::with_capacity(config.aliases.len());
    for (path, aliases) in &config.aliases {
        if !subject.is_match(path) {
            return Err(ConfigError::Validation(format!("malformed alias subject '{}'", path)));
        }
        // Field aliases only clash within their own table; compare like with like.
        let name = Name::with_aliases(path.clone(), aliases.iter().map(|a| scoped(path, a)));
        if let Some(other) = names.iter().find(|n| n.overlaps(&name)) {
            return Err(ConfigError::Validation(format!(
                "aliases of '{}' overlap with '{}'",
                path,
                other.primary()
            )));
        }
        names.push(name);
    }
    Ok(())
}

/// Alias keyed by its owning scope: tables by name, columns by their table.
fn scoped(path: &str, alias: &str) -> String {
    match path.rsplit_once('.') {
        Some((owner, _)) if path.matches('.').count() == 2 => format!("{}.{}", owner, alias),
        _ => alias.to_string(),
    }
}
