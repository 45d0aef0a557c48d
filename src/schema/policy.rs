//! Declarative access policy attached to databases, tables and fields.
//! Enforcement belongs to whatever sits in front of the API; this is data only.

use serde::{Deserialize, Serialize};

/// Operations a key can unlock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Create,
    Read,
    Update,
    Delete,
    Rename,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

impl KeySet {
    pub fn key(&self, capability: Capability) -> Option<&str> {
        match capability {
            Capability::Create => self.create.as_deref(),
            Capability::Read => self.read.as_deref(),
            Capability::Update => self.update.as_deref(),
            Capability::Delete => self.delete.as_deref(),
            Capability::Rename => self.rename.as_deref(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// `db`, `db.table` or `db.table.column`.
    pub subject: String,
    #[serde(default)]
    pub excluded: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub keys: KeySet,
}

impl AccessPolicy {
    /// Fully open policy: nothing excluded, hidden or protected, no keys.
    pub fn open(subject: impl Into<String>) -> Self {
        AccessPolicy {
            subject: subject.into(),
            excluded: false,
            hidden: false,
            protected: false,
            keys: KeySet::default(),
        }
    }

    pub fn is_unprotected(&self) -> bool {
        !self.excluded && !self.hidden && !self.protected
    }

    /// Whether `token` unlocks `capability`. Unprotected subjects allow everything;
    /// a protected subject with no key configured for the capability allows nothing.
    pub fn unlocks(&self, capability: Capability, token: Option<&str>) -> bool {
        if !self.protected {
            return true;
        }
        match (self.keys.key(capability), token) {
            (Some(key), Some(token)) => key == token,
            _ => false,
        }
    }
}

/// Policy configured for `subject`, or a fresh open policy.
pub fn policy_for(subject: &str, policies: &[AccessPolicy]) -> AccessPolicy {
    policies
        .iter()
        .find(|p| p.subject == subject)
        .cloned()
        .unwrap_or_else(|| AccessPolicy::open(subject))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_open_and_fresh() {
        let mut a = policy_for("shop", &[]);
        let b = policy_for("shop", &[]);
        assert!(a.is_unprotected());
        a.hidden = true;
        assert!(!b.hidden);
    }

    #[test]
    fn configured_policy_wins() {
        let policies = vec![AccessPolicy {
            excluded: true,
            ..AccessPolicy::open("shop.secrets")
        }];
        assert!(policy_for("shop.secrets", &policies).excluded);
        assert!(!policy_for("shop.orders", &policies).excluded);
    }

    #[test]
    fn protected_requires_matching_key() {
        let policy = AccessPolicy {
            protected: true,
            keys: KeySet {
                read: Some("r-key".into()),
                ..KeySet::default()
            },
            ..AccessPolicy::open("shop.orders")
        };
        assert!(policy.unlocks(Capability::Read, Some("r-key")));
        assert!(!policy.unlocks(Capability::Read, Some("nope")));
        assert!(!policy.unlocks(Capability::Delete, Some("r-key")));
        assert!(AccessPolicy::open("x").unlocks(Capability::Delete, None));
    }

    #[test]
    fn deserializes_with_defaults() {
        let policy: AccessPolicy =
            serde_json::from_str(r#"{"subject":"shop.users.password","hidden":true}"#).unwrap();
        assert!(policy.hidden && !policy.excluded);
        assert_eq!(policy.keys, KeySet::default());
    }
}
