//! Display names with aliases for tables and fields.

use crate::error::SchemaError;
use std::collections::BTreeSet;

/// A primary name plus any number of aliases. The primary always matches.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Name {
    primary: String,
    aliases: BTreeSet<String>,
}

impl Name {
    pub fn new(primary: impl Into<String>) -> Self {
        Name {
            primary: primary.into(),
            aliases: BTreeSet::new(),
        }
    }

    pub fn with_aliases<I, S>(primary: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Name {
            primary: primary.into(),
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    /// True iff `name` equals the primary or one of the aliases.
    pub fn matches(&self, name: &str) -> bool {
        self.primary == name || self.aliases.contains(name)
    }

    /// True if the two names share a primary or any alias.
    pub fn overlaps(&self, other: &Name) -> bool {
        other.matches(&self.primary) || self.aliases.iter().any(|a| other.matches(a))
    }

    pub fn rename(&mut self, primary: impl Into<String>) {
        self.primary = primary.into();
    }

    pub fn add_alias(&mut self, alias: impl Into<String>) {
        self.aliases.insert(alias.into());
    }

    pub fn add_aliases<I, S>(&mut self, aliases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
    }

    pub fn remove_alias(&mut self, alias: &str) -> Result<(), SchemaError> {
        if self.aliases.remove(alias) {
            Ok(())
        } else {
            Err(SchemaError::UnknownAlias {
                name: self.primary.clone(),
                alias: alias.to_string(),
            })
        }
    }

    /// Copy of this name with `prefix` prepended to the primary and every alias.
    pub(crate) fn prefixed(&self, prefix: &str) -> Name {
        Name {
            primary: format!("{}{}", prefix, self.primary),
            aliases: self.aliases.iter().map(|a| format!("{}{}", prefix, a)).collect(),
        }
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_primary_and_aliases() {
        let name = Name::with_aliases("Thomas", ["Tom", "Tommy"]);
        assert!(name.matches("Thomas"));
        assert!(name.matches("Tommy"));
        assert!(!name.matches("Rob"));
    }

    #[test]
    fn add_then_remove_alias() {
        let mut name = Name::new("John");
        assert!(!name.matches("J"));
        name.add_aliases(["J", "Jon"]);
        assert!(name.matches("J") && name.matches("Jon"));
        name.remove_alias("J").unwrap();
        assert!(!name.matches("J"));
    }

    #[test]
    fn removing_unknown_alias_fails() {
        let mut name = Name::with_aliases("Johnathan", ["John"]);
        let err = name.remove_alias("Johnny").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownAlias { .. }));
        assert!(name.matches("John"));
    }

    #[test]
    fn overlap_through_alias() {
        let a = Name::with_aliases("orders", ["o"]);
        let b = Name::with_aliases("shop_orders", ["o"]);
        let c = Name::new("customers");
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(Name::new("orders").overlaps(&Name::with_aliases("x", ["orders"])));
    }

    #[test]
    fn prefix_applies_to_aliases() {
        let name = Name::with_aliases("name", ["label"]).prefixed("customer_id_");
        assert_eq!(name.primary(), "customer_id_name");
        assert!(name.matches("customer_id_label"));
    }
}
