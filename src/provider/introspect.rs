//! Assembles a `Schema` from raw catalog rows, applying policies and aliases.

use crate::schema::{policy_for, AccessPolicy, Database, Field, FieldRef, KeyKind, Schema, Table};
use std::collections::BTreeMap;

/// Backend-internal schemas that never become part of the API.
pub const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "mysql", "performance_schema", "sys"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnRow {
    pub database: String,
    pub table: String,
    pub name: String,
    /// Full type tag, e.g. `varchar(255)` or `int(10) unsigned`.
    pub column_type: String,
    pub nullable: bool,
    /// `PRI`, `UNI`, `MUL` or empty.
    pub column_key: String,
    pub has_default: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub source: FieldRef,
    pub target: FieldRef,
}

/// Catalog rows in backend order: schemata, base tables, columns by ordinal, foreign keys.
#[derive(Clone, Debug, Default)]
pub struct Introspection {
    pub databases: Vec<String>,
    /// `(database, table)`.
    pub tables: Vec<(String, String)>,
    pub columns: Vec<ColumnRow>,
    pub foreign_keys: Vec<ForeignKeyRow>,
}

impl Introspection {
    pub fn build(self, policies: &[AccessPolicy], aliases: &BTreeMap<String, Vec<String>>) -> Schema {
        let mut databases = Vec::new();
        for db_name in &self.databases {
            if SYSTEM_SCHEMAS.contains(&db_name.as_str()) {
                continue;
            }
            let db_policy = policy_for(db_name, policies);
            if db_policy.excluded {
                tracing::debug!(database = %db_name, "database excluded by policy");
                continue;
            }

            let mut tables = Vec::new();
            for (_, table_name) in self.tables.iter().filter(|(d, _)| d == db_name) {
                let subject = format!("{}.{}", db_name, table_name);
                let table_policy = policy_for(&subject, policies);
                if table_policy.excluded {
                    tracing::debug!(table = %subject, "table excluded by policy");
                    continue;
                }
                let fields = self
                    .columns
                    .iter()
                    .filter(|c| &c.database == db_name && &c.table == table_name)
                    .filter_map(|c| column_to_field(c, policies))
                    .collect();
                tables.push(Table::new(db_name.clone(), table_name.clone(), fields).with_policy(table_policy));
            }
            tracing::debug!(database = %db_name, tables = tables.len(), "introspected database");
            databases.push(Database::new(db_name.clone(), tables).with_policy(db_policy));
        }

        let mut schema = Schema::new(databases);
        for fk in &self.foreign_keys {
            link(&mut schema, fk);
        }
        apply_aliases(&mut schema, aliases);
        schema
    }
}

fn column_to_field(c: &ColumnRow, policies: &[AccessPolicy]) -> Option<Field> {
    let policy = policy_for(&format!("{}.{}.{}", c.database, c.table, c.name), policies);
    if policy.excluded {
        return None;
    }
    let mut field = Field::new(&c.database, &c.table, &c.name, &c.column_type)
        .nullable(c.nullable)
        .with_default(c.has_default)
        .with_policy(policy);
    field.key_kind = KeyKind::from_column_key(&c.column_key);
    Some(field)
}

/// Sets the relation when both ends survived exclusion.
fn link(schema: &mut Schema, fk: &ForeignKeyRow) {
    if schema.field(&fk.target).is_none() {
        return;
    }
    if let Some(field) = field_mut(schema, &fk.source) {
        *field = field.clone().references(fk.target.clone());
    }
}

fn field_mut<'a>(schema: &'a mut Schema, at: &FieldRef) -> Option<&'a mut Field> {
    schema
        .databases
        .iter_mut()
        .find(|d| d.name == at.database)?
        .tables
        .iter_mut()
        .find(|t| t.name == at.table)?
        .fields
        .iter_mut()
        .find(|f| f.name == at.column)
}

fn apply_aliases(schema: &mut Schema, aliases: &BTreeMap<String, Vec<String>>) {
    for (subject, names) in aliases {
        let parts: Vec<&str> = subject.split('.').collect();
        let applied = match parts.as_slice() {
            [db, table] => schema
                .databases
                .iter_mut()
                .find(|d| d.name == *db)
                .and_then(|d| d.tables.iter_mut().find(|t| t.name == *table))
                .map(|t| t.display_name.add_aliases(names.iter().cloned()))
                .is_some(),
            [db, table, column] => field_mut(schema, &FieldRef::new(*db, *table, *column))
                .map(|f| f.display_name.add_aliases(names.iter().cloned()))
                .is_some(),
            _ => false,
        };
        if !applied {
            tracing::warn!(subject = %subject, "alias subject not in schema, ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(table: &str, name: &str, ty: &str, key: &str) -> ColumnRow {
        ColumnRow {
            database: "shop".into(),
            table: table.into(),
            name: name.into(),
            column_type: ty.into(),
            nullable: false,
            column_key: key.into(),
            has_default: false,
        }
    }

    fn catalog() -> Introspection {
        Introspection {
            databases: vec!["mysql".into(), "shop".into()],
            tables: vec![
                ("shop".into(), "customers".into()),
                ("shop".into(), "orders".into()),
                ("shop".into(), "secrets".into()),
            ],
            columns: vec![
                col("customers", "id", "int(11)", "PRI"),
                col("customers", "name", "varchar(64)", ""),
                col("orders", "id", "int(11)", "PRI"),
                col("orders", "customer_id", "int(11)", "MUL"),
                col("secrets", "id", "char(32)", "PRI"),
            ],
            foreign_keys: vec![ForeignKeyRow {
                source: FieldRef::new("shop", "orders", "customer_id"),
                target: FieldRef::new("shop", "customers", "id"),
            }],
        }
    }

    #[test]
    fn builds_tables_and_relations() {
        let schema = catalog().build(&[], &BTreeMap::new());
        assert!(schema.database("mysql").is_none());
        let orders = schema.table("shop.orders").unwrap();
        let fk = orders.field("customer_id").unwrap();
        assert_eq!(fk.key_kind, KeyKind::Foreign);
        assert_eq!(fk.relation, Some(FieldRef::new("shop", "customers", "id")));
        assert!(schema.table("shop.secrets").unwrap().id_generator.generate().is_string());
        assert!(orders.id_generator.generate().is_number());
    }

    #[test]
    fn excluded_subjects_are_skipped() {
        let policies = vec![
            AccessPolicy {
                excluded: true,
                ..AccessPolicy::open("shop.secrets")
            },
            AccessPolicy {
                excluded: true,
                ..AccessPolicy::open("shop.customers")
            },
        ];
        let schema = catalog().build(&policies, &BTreeMap::new());
        assert!(schema.table("shop.secrets").is_none());
        let fk = schema.table("shop.orders").unwrap().field("customer_id").unwrap();
        assert!(fk.relation.is_none());
        assert_eq!(fk.key_kind, KeyKind::Multiple);
    }

    #[test]
    fn aliases_attach_to_tables_and_fields() {
        let mut aliases = BTreeMap::new();
        aliases.insert("shop.orders".to_string(), vec!["orders".to_string()]);
        aliases.insert("shop.customers.name".to_string(), vec!["label".to_string()]);
        aliases.insert("shop.nowhere".to_string(), vec!["x".to_string()]);
        let schema = catalog().build(&[], &aliases);
        assert!(schema.table("shop.orders").unwrap().display_name.matches("orders"));
        assert!(schema.table("shop.customers").unwrap().field("name").unwrap().display_name.matches("label"));
    }
}
