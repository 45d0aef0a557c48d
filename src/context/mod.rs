//! Context compiler: a root table plus every table reachable through its foreign keys,
//! joined under sequential aliases `t1, t2, ...` and exposed as one nested model.
//!
//! Tables are discovered depth-first in declared field order. Each relation yields one
//! join clause `<parent alias>.<fk column> = <child alias>.<referenced column>` and a
//! branch whose display names are prefixed with the foreign key's display name and `_`.

mod model;
mod pack;

pub use model::{branch_key, Model, ModelEntry, Node, BRANCH_SUFFIX};

use crate::error::{AppError, SchemaError};
use crate::schema::{Field, Schema, Table};
use crate::sql::{qualified_table, quoted};
use serde_json::{Map, Value};
use std::fmt;

/// Separator between relation path segments in display names and context names.
pub const REL_SEPARATOR: &str = "_";

/// Maximum number of relation hops followed from a root table.
pub const MAX_DEPTH: usize = 16;

/// Most tables one SELECT may join in MySQL.
pub const MAX_TABLES: usize = 61;

/// Equality between a foreign key column and the column it references.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Join {
    pub left_alias: String,
    pub left_column: String,
    pub right_alias: String,
    pub right_column: String,
}

impl Join {
    pub fn to_sql(&self) -> String {
        format!(
            "{}.{} = {}.{}",
            self.left_alias,
            quoted(&self.left_column),
            self.right_alias,
            quoted(&self.right_column)
        )
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} = {}.{}",
            self.left_alias, self.left_column, self.right_alias, self.right_column
        )
    }
}

/// Compiled view of one root table. Built once, read-only afterwards.
#[derive(Clone, Debug)]
pub struct Context {
    name: String,
    tables: Vec<Table>,
    model: Model,
    joins: Vec<Join>,
    required: Vec<Vec<String>>,
    flat: Vec<Field>,
}

impl Context {
    pub fn compile(schema: &Schema, root: &Table) -> Result<Context, SchemaError> {
        if schema.table(&root.qualified_name).is_none() {
            return Err(SchemaError::MissingReference {
                kind: "table",
                id: root.qualified_name.clone(),
            });
        }
        let mut compiler = Compiler {
            schema,
            tables: Vec::new(),
            joins: Vec::new(),
            required: Vec::new(),
            path: Vec::new(),
        };
        let model = compiler.mount(root, None)?;

        let mut leaves = Vec::new();
        model.collect_leaves(&mut leaves);
        if leaves.is_empty() {
            return Err(SchemaError::InvalidShape(format!(
                "table '{}' exposes no columns",
                root.qualified_name
            )));
        }
        let flat: Vec<Field> = leaves.into_iter().cloned().collect();
        if let Some(name) = shared_display_name(&flat) {
            return Err(SchemaError::AmbiguousName {
                context: root.context_name(),
                name,
            });
        }

        let ctx = Context {
            name: root.context_name(),
            tables: compiler.tables,
            model,
            joins: compiler.joins,
            required: compiler.required,
            flat,
        };
        tracing::debug!(context = %ctx.name, tables = ctx.tables.len(), joins = ctx.joins.len(), "compiled context");
        Ok(ctx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact context name, or any alias of the root table's display name.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.root().is_some_and(|t| t.display_name.matches(name))
    }

    pub fn root(&self) -> Option<&Table> {
        self.tables.first()
    }

    /// Joined table clones in discovery order; index 0 is the root.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Per joined table, the display names a create body must carry.
    pub fn required_fields(&self) -> &[Vec<String>] {
        &self.required
    }

    /// Leaf fields in canonical order: SELECT column order and row position order.
    pub fn flat_fields(&self) -> &[Field] {
        &self.flat
    }

    pub fn find_field(&self, display_name: &str) -> Option<&Field> {
        self.flat.iter().find(|f| f.display_name.matches(display_name))
    }

    /// Primary-key columns of the root table.
    pub fn primary_keys(&self) -> Vec<&Field> {
        self.model
            .nodes()
            .map(|n| n.field())
            .filter(|f| f.is_primary())
            .collect()
    }

    pub fn types_view(&self) -> Map<String, Value> {
        self.model.types_view()
    }

    /// `SELECT <leaves> FROM <tables> [WHERE <joins>]`. Callers appending predicates use
    /// `AND` when `joins()` is non-empty and `WHERE` otherwise.
    pub fn get_sql_parts(&self) -> String {
        let columns = self
            .flat
            .iter()
            .map(Field::sql_ref)
            .collect::<Vec<_>>()
            .join(", ");
        let from = self
            .tables
            .iter()
            .map(|t| {
                format!(
                    "{} AS {}",
                    qualified_table(&t.database, &t.name),
                    t.storage_alias.as_deref().unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {} FROM {}", columns, from);
        if !self.joins.is_empty() {
            let joins = self.joins.iter().map(Join::to_sql).collect::<Vec<_>>().join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&joins);
        }
        sql
    }

    /// Nested display-named object from one backend row in `flat_fields()` order.
    pub fn unpack_single(&self, row: &[Value]) -> Result<Value, AppError> {
        if row.len() != self.flat.len() {
            return Err(AppError::Contract(format!(
                "context '{}' expects rows of {} columns, got {}",
                self.name,
                self.flat.len(),
                row.len()
            )));
        }
        let mut values = row.iter();
        Ok(Value::Object(unpack_model(&self.model, &mut values)))
    }
}

fn unpack_model<'a>(model: &Model, values: &mut impl Iterator<Item = &'a Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for node in model.nodes() {
        let value = match node {
            Node::Leaf(_) => values.next().cloned().unwrap_or(Value::Null),
            Node::Relation { branch, .. } => Value::Object(unpack_model(branch, values)),
        };
        out.insert(node.field().display_name.primary().to_string(), value);
    }
    out
}

/// First display name or alias claimed by two leaves. Filter and order keys must be unambiguous.
fn shared_display_name(flat: &[Field]) -> Option<String> {
    flat.iter().enumerate().find_map(|(i, a)| {
        flat[i + 1..]
            .iter()
            .find(|b| a.display_name.overlaps(&b.display_name))
            .map(|_| a.display_name.primary().to_string())
    })
}

struct Compiler<'s> {
    schema: &'s Schema,
    tables: Vec<Table>,
    joins: Vec<Join>,
    required: Vec<Vec<String>>,
    /// Tables currently being expanded, root first.
    path: Vec<String>,
}

impl<'s> Compiler<'s> {
    fn mount(&mut self, table: &Table, prefix: Option<&str>) -> Result<Model, SchemaError> {
        if self.path.contains(&table.qualified_name) {
            let mut chain = self.path.clone();
            chain.push(table.qualified_name.clone());
            return Err(SchemaError::CyclicSchema(chain.join(" -> ")));
        }
        if self.path.len() > MAX_DEPTH {
            return Err(SchemaError::DepthExceeded(MAX_DEPTH));
        }
        if self.tables.len() >= MAX_TABLES {
            return Err(SchemaError::TooManyTables(MAX_TABLES));
        }

        let index = self.tables.len();
        let alias = format!("t{}", index + 1);
        let mut mounted = table.clone();
        mounted.storage_alias = Some(alias.clone());
        self.tables.push(mounted);
        self.required.push(Vec::new());
        self.path.push(table.qualified_name.clone());

        let mut model = Model::new(index);
        for source in table.fields.iter().filter(|f| !f.policy.excluded) {
            let mut field = source.clone();
            field.storage_alias = Some(format!("{}.{}", alias, source.name));
            if let Some(prefix) = prefix {
                field.display_name = source.display_name.prefixed(prefix);
            }
            let target = self.relation_target(&field)?;
            if target.is_none() && !field.is_primary() {
                self.required[index].push(field.display_name.primary().to_string());
            }
            let key = field.qualified_name.clone();
            let child_prefix = format!("{}{}", field.display_name.primary(), REL_SEPARATOR);
            model.entries.insert(key.clone(), ModelEntry::Field(field));

            if let Some((target_table, target_column)) = target {
                self.joins.push(Join {
                    left_alias: alias.clone(),
                    left_column: source.name.clone(),
                    right_alias: format!("t{}", self.tables.len() + 1),
                    right_column: target_column,
                });
                let branch = self.mount(target_table, Some(&child_prefix))?;
                model.entries.insert(branch_key(&key), ModelEntry::Branch(branch));
            }
        }

        self.path.pop();
        Ok(model)
    }

    /// Table and column `field` references, unless the relation points at something excluded.
    fn relation_target(&self, field: &Field) -> Result<Option<(&'s Table, String)>, SchemaError> {
        let Some(target) = &field.relation else {
            return Ok(None);
        };
        let schema: &'s Schema = self.schema;
        let table = schema
            .table(&target.table_qualified_name())
            .ok_or_else(|| SchemaError::MissingReference {
                kind: "table",
                id: target.table_qualified_name(),
            })?;
        let column = table.field(&target.column).ok_or_else(|| SchemaError::MissingReference {
            kind: "field",
            id: target.qualified_name(),
        })?;
        let database_excluded = schema
            .database(&table.database)
            .is_some_and(|d| d.policy.excluded);
        if database_excluded || table.policy.excluded || column.policy.excluded {
            return Ok(None);
        }
        Ok(Some((table, target.column.clone())))
    }
}
