//! Column model.

use crate::naming::Name;
use crate::schema::policy::AccessPolicy;
use crate::sql::quoted;

/// Key role of a column, from the backend's `COLUMN_KEY` plus foreign-key discovery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyKind {
    #[default]
    None,
    Primary,
    Foreign,
    Unique,
    Multiple,
}

impl KeyKind {
    /// MySQL `COLUMN_KEY` values: `PRI`, `UNI`, `MUL` or empty.
    pub fn from_column_key(key: &str) -> Self {
        match key {
            "PRI" => KeyKind::Primary,
            "UNI" => KeyKind::Unique,
            "MUL" => KeyKind::Multiple,
            _ => KeyKind::None,
        }
    }
}

/// Address of a column in the schema. Relations are stored this way rather than as pointers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub database: String,
    pub table: String,
    pub column: String,
}

impl FieldRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        FieldRef {
            database: database.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn table_qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.database, self.table, self.column)
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    /// `database.table.column`.
    pub qualified_name: String,
    pub display_name: Name,
    /// `<table alias>.<column>` once mounted into a context.
    pub storage_alias: Option<String>,
    pub table: String,
    pub database: String,
    /// Raw backend type tag, e.g. `varchar(255)` or `int(11)`.
    pub data_type: String,
    pub nullable: bool,
    pub key_kind: KeyKind,
    pub has_default: bool,
    pub policy: AccessPolicy,
    /// Column this one references. One hop only.
    pub relation: Option<FieldRef>,
}

impl Field {
    pub fn new(
        database: impl Into<String>,
        table: impl Into<String>,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        let (database, table, name) = (database.into(), table.into(), name.into());
        let qualified_name = format!("{}.{}.{}", database, table, name);
        Field {
            display_name: Name::new(name.clone()),
            policy: AccessPolicy::open(qualified_name.clone()),
            qualified_name,
            storage_alias: None,
            name,
            table,
            database,
            data_type: data_type.into(),
            nullable: false,
            key_kind: KeyKind::None,
            has_default: false,
            relation: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.key_kind = KeyKind::Primary;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_default(mut self, has_default: bool) -> Self {
        self.has_default = has_default;
        self
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Marks this column as a foreign key to `target`. Primary keys keep their kind.
    pub fn references(mut self, target: FieldRef) -> Self {
        if self.key_kind != KeyKind::Primary {
            self.key_kind = KeyKind::Foreign;
        }
        self.relation = Some(target);
        self
    }

    pub fn is_primary(&self) -> bool {
        self.key_kind == KeyKind::Primary
    }

    /// Quoted column reference for SQL text: ``t1.`name` `` when aliased, else the bare column.
    pub fn sql_ref(&self) -> String {
        match self.storage_alias.as_deref().and_then(|a| a.split_once('.')) {
            Some((alias, column)) => format!("{}.{}", alias, quoted(column)),
            None => quoted(&self.name),
        }
    }

    pub(crate) fn type_contains(&self, needle: &str) -> bool {
        self.data_type.to_lowercase().contains(needle)
    }
}
