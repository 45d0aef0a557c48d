//! In-memory mirror of the introspected relational schema.

mod database;
mod field;
mod id;
mod policy;
mod table;

pub use database::Database;
pub use field::{Field, FieldRef, KeyKind};
pub use id::IdGenerator;
pub use policy::{policy_for, AccessPolicy, Capability, KeySet};
pub use table::Table;

use crate::context::Context;
use crate::error::SchemaError;

/// Every database the provider exposes. Immutable once contexts are compiled from it.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub databases: Vec<Database>,
}

impl Schema {
    pub fn new(databases: Vec<Database>) -> Self {
        Schema { databases }
    }

    pub fn database(&self, name: &str) -> Option<&Database> {
        self.databases.iter().find(|d| d.name == name)
    }

    /// Table by `database.table`.
    pub fn table(&self, qualified_name: &str) -> Option<&Table> {
        let (database, table) = qualified_name.split_once('.')?;
        self.database(database)?.table(table)
    }

    pub fn field(&self, field_ref: &FieldRef) -> Option<&Field> {
        self.database(&field_ref.database)?
            .table(&field_ref.table)?
            .field(&field_ref.column)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.databases.iter().flat_map(|d| d.tables.iter())
    }

    /// Checks that every element's names line up with its owner and that every relation resolves.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for db in &self.databases {
            for table in &db.tables {
                if table.database != db.name || table.qualified_name != format!("{}.{}", db.name, table.name) {
                    return Err(SchemaError::InvalidShape(format!(
                        "table '{}' does not belong to database '{}'",
                        table.qualified_name, db.name
                    )));
                }
                for field in &table.fields {
                    if field.database != db.name || field.table != table.name {
                        return Err(SchemaError::InvalidShape(format!(
                            "field '{}' does not belong to table '{}'",
                            field.qualified_name, table.qualified_name
                        )));
                    }
                    if let Some(target) = &field.relation {
                        if self.field(target).is_none() {
                            return Err(SchemaError::MissingReference {
                                kind: "field",
                                id: target.qualified_name(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// One context per table that is not excluded. Tables whose relations loop back on
    /// themselves, join too many tables or repeat a display name are skipped with a warning;
    /// any other failure aborts.
    pub fn contexts(&self) -> Result<Vec<Context>, SchemaError> {
        self.validate()?;
        let mut contexts = Vec::new();
        for db in self.databases.iter().filter(|d| !d.policy.excluded) {
            for table in db.tables.iter().filter(|t| !t.policy.excluded) {
                match Context::compile(self, table) {
                    Ok(ctx) => contexts.push(ctx),
                    Err(
                        e @ (SchemaError::CyclicSchema(_)
                        | SchemaError::DepthExceeded(_)
                        | SchemaError::TooManyTables(_)
                        | SchemaError::AmbiguousName { .. }),
                    ) => {
                        tracing::warn!(table = %table.qualified_name, error = %e, "skipping context");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(contexts)
    }
}
