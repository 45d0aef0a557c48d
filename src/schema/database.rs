//! Database model.

use crate::schema::policy::AccessPolicy;
use crate::schema::table::Table;

#[derive(Clone, Debug)]
pub struct Database {
    pub name: String,
    pub tables: Vec<Table>,
    pub policy: AccessPolicy,
}

impl Database {
    pub fn new(name: impl Into<String>, tables: Vec<Table>) -> Self {
        let name = name.into();
        Database {
            policy: AccessPolicy::open(name.clone()),
            name,
            tables,
        }
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}
