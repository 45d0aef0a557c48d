//! Table model.

use crate::naming::Name;
use crate::schema::field::Field;
use crate::schema::id::IdGenerator;
use crate::schema::policy::AccessPolicy;

#[derive(Clone, Debug)]
pub struct Table {
    pub name: String,
    /// `database.table`.
    pub qualified_name: String,
    /// `t<n>` once mounted into a context.
    pub storage_alias: Option<String>,
    pub display_name: Name,
    pub database: String,
    pub fields: Vec<Field>,
    pub policy: AccessPolicy,
    pub id_generator: IdGenerator,
}

impl Table {
    pub fn new(database: impl Into<String>, name: impl Into<String>, fields: Vec<Field>) -> Self {
        let (database, name) = (database.into(), name.into());
        let qualified_name = format!("{}.{}", database, name);
        let id_generator = fields
            .iter()
            .find(|f| f.is_primary())
            .map(|f| IdGenerator::for_type(&f.data_type))
            .unwrap_or_default();
        Table {
            display_name: Name::new(qualified_name.clone()),
            policy: AccessPolicy::open(qualified_name.clone()),
            qualified_name,
            storage_alias: None,
            name,
            database,
            fields,
            id_generator,
        }
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_id_generator(mut self, id_generator: IdGenerator) -> Self {
        self.id_generator = id_generator;
        self
    }

    /// Name a context over this table is served under: `database_table`.
    pub fn context_name(&self) -> String {
        self.qualified_name.replace('.', crate::context::REL_SEPARATOR)
    }

    pub fn field(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == column)
    }
}
