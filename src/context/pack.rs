//! Write path: display-named payloads to model-keyed packs, and packs to INSERT/DELETE.
//!
//! A model pack is keyed by qualified column name. A foreign key's related row sits under
//! `<qualified_name>_branch`; a foreign key given as a plain value links to an existing row
//! and is stored under its own qualified name with no branch.

use super::model::{branch_key, lookup, Model, Node};
use super::Context;
use crate::error::AppError;
use crate::schema::Field;
use crate::sql::{qualified_table, quoted, QueryBuf};
use serde_json::{Map, Value};

impl Context {
    /// Builds a model pack from a display-named payload. Every non-key leaf must be present;
    /// missing primary keys are generated, and a related row's referenced column is filled
    /// with a fresh id from the related table before its own fields are packed.
    pub fn pack_single(&self, input: &Map<String, Value>) -> Result<Map<String, Value>, AppError> {
        self.pack_model(&self.model, input)
    }

    fn pack_model(&self, model: &Model, input: &Map<String, Value>) -> Result<Map<String, Value>, AppError> {
        reject_unknown_keys(model, input)?;
        let table = &self.tables[model.table_index];
        let mut out = Map::new();
        for node in model.nodes() {
            match node {
                Node::Leaf(field) => {
                    let value = match lookup(input, &field.display_name) {
                        Some(v) => v.clone(),
                        None if field.is_primary() => table.id_generator.generate(),
                        None => return Err(AppError::MissingField(field.display_name.primary().to_string())),
                    };
                    out.insert(field.qualified_name.clone(), value);
                }
                Node::Relation { field, branch } => {
                    let mut nested = match lookup(input, &field.display_name) {
                        Some(Value::Object(m)) => m.clone(),
                        None => Map::new(),
                        Some(link) => {
                            out.insert(field.qualified_name.clone(), link.clone());
                            continue;
                        }
                    };
                    if let Some(target) = field.relation.as_ref().and_then(|r| branch.column(&r.column)) {
                        if lookup(&nested, &target.display_name).is_none() {
                            let id = self.tables[branch.table_index].id_generator.generate();
                            nested.insert(target.display_name.primary().to_string(), id);
                        }
                    }
                    let packed = self.pack_model(branch, &nested)?;
                    out.insert(branch_key(&field.qualified_name), Value::Object(packed));
                }
            }
        }
        Ok(out)
    }

    /// Renames display-named keys to qualified names. Aliases are accepted. No values change.
    pub fn to_model_pack(&self, api: &Map<String, Value>) -> Result<Map<String, Value>, AppError> {
        to_model_keys(&self.model, api)
    }

    /// Renames qualified-name keys back to primary display names. No values change.
    pub fn pack_api(&self, packed: &Map<String, Value>) -> Result<Map<String, Value>, AppError> {
        to_display_keys(&self.model, packed)
    }

    /// Leaf values of a pack in `flat_fields()` order, i.e. the row the pack would select back as.
    pub fn pack_to_row(&self, packed: &Map<String, Value>) -> Result<Vec<Value>, AppError> {
        let mut row = Vec::with_capacity(self.flat.len());
        pack_leaves(&self.model, packed, &mut row)?;
        Ok(row)
    }

    /// One INSERT per table present in the pack. Related rows come before the row that
    /// references them so foreign keys are satisfied at each statement.
    pub fn post_sql_parts(&self, packed: &Map<String, Value>) -> Result<Vec<QueryBuf>, AppError> {
        let mut out = Vec::new();
        self.insert_rows(&self.model, packed, &mut out)?;
        Ok(out)
    }

    fn insert_rows(&self, model: &Model, packed: &Map<String, Value>, out: &mut Vec<QueryBuf>) -> Result<(), AppError> {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for node in model.nodes() {
            let field = node.field();
            if let Node::Relation { branch, .. } = node {
                if let Some(sub) = packed.get(&branch_key(&field.qualified_name)) {
                    let sub = as_object(sub, field)?;
                    self.insert_rows(branch, sub, out)?;
                }
            }
            let value = model.value_of(field, packed).ok_or_else(|| missing_in_pack(field))?;
            columns.push(quoted(&field.name));
            values.push(value.clone());
        }

        let table = &self.tables[model.table_index];
        let mut q = QueryBuf::new(format!(
            "INSERT INTO {} ({}) VALUES (",
            qualified_table(&table.database, &table.name),
            columns.join(", ")
        ));
        for (i, v) in values.into_iter().enumerate() {
            if i > 0 {
                q.push_sql(", ");
            }
            q.push_param(v);
        }
        q.push_sql(")");
        out.push(q);
        Ok(())
    }

    /// One DELETE by primary key per table present in the pack: the referencing row first,
    /// then the rows it references.
    pub fn del_sql_parts(&self, packed: &Map<String, Value>) -> Result<Vec<QueryBuf>, AppError> {
        let mut out = Vec::new();
        self.delete_rows(&self.model, packed, &mut out)?;
        Ok(out)
    }

    fn delete_rows(&self, model: &Model, packed: &Map<String, Value>, out: &mut Vec<QueryBuf>) -> Result<(), AppError> {
        let table = &self.tables[model.table_index];
        let keys: Vec<&Field> = model.nodes().map(|n| n.field()).filter(|f| f.is_primary()).collect();
        if keys.is_empty() {
            return Err(AppError::Integrity(format!(
                "table '{}' has no primary key to delete by",
                table.qualified_name
            )));
        }

        let mut q = QueryBuf::new(format!(
            "DELETE FROM {} WHERE ",
            qualified_table(&table.database, &table.name)
        ));
        for (i, key) in keys.into_iter().enumerate() {
            if i > 0 {
                q.push_sql(" AND ");
            }
            let value = model.value_of(key, packed).ok_or_else(|| missing_in_pack(key))?;
            q.push_sql(&format!("{} = ", quoted(&key.name)));
            q.push_param(value.clone());
        }
        out.push(q);

        for node in model.nodes() {
            if let Node::Relation { field, branch } = node {
                if let Some(sub) = packed.get(&branch_key(&field.qualified_name)) {
                    self.delete_rows(branch, as_object(sub, field)?, out)?;
                }
            }
        }
        Ok(())
    }
}

fn reject_unknown_keys(model: &Model, input: &Map<String, Value>) -> Result<(), AppError> {
    match input.keys().find(|k| model.node_by_display(k).is_none()) {
        Some(key) => Err(AppError::BadRequest(format!("unknown field '{}'", key))),
        None => Ok(()),
    }
}

fn to_model_keys(model: &Model, api: &Map<String, Value>) -> Result<Map<String, Value>, AppError> {
    reject_unknown_keys(model, api)?;
    let mut out = Map::new();
    for node in model.nodes() {
        let field = node.field();
        let Some(value) = lookup(api, &field.display_name) else {
            continue;
        };
        match (node, value) {
            (Node::Relation { branch, .. }, Value::Object(sub)) => {
                out.insert(branch_key(&field.qualified_name), Value::Object(to_model_keys(branch, sub)?));
            }
            _ => {
                out.insert(field.qualified_name.clone(), value.clone());
            }
        }
    }
    Ok(out)
}

fn to_display_keys(model: &Model, packed: &Map<String, Value>) -> Result<Map<String, Value>, AppError> {
    let mut out = Map::new();
    let mut consumed = 0;
    for node in model.nodes() {
        let field = node.field();
        let name = field.display_name.primary().to_string();
        if let Some(value) = packed.get(&field.qualified_name) {
            out.insert(name.clone(), value.clone());
            consumed += 1;
        }
        if let Node::Relation { branch, .. } = node {
            if let Some(sub) = packed.get(&branch_key(&field.qualified_name)) {
                out.insert(name, Value::Object(to_display_keys(branch, as_object(sub, field)?)?));
                consumed += 1;
            }
        }
    }
    if consumed != packed.len() {
        return Err(AppError::Contract(
            "model pack carries keys outside the context model".into(),
        ));
    }
    Ok(out)
}

fn pack_leaves(model: &Model, packed: &Map<String, Value>, row: &mut Vec<Value>) -> Result<(), AppError> {
    for node in model.nodes() {
        match node {
            Node::Leaf(field) => {
                let value = packed.get(&field.qualified_name).ok_or_else(|| missing_in_pack(field))?;
                row.push(value.clone());
            }
            Node::Relation { field, branch } => {
                let sub = packed
                    .get(&branch_key(&field.qualified_name))
                    .ok_or_else(|| missing_in_pack(field))?;
                pack_leaves(branch, as_object(sub, field)?, row)?;
            }
        }
    }
    Ok(())
}

fn as_object<'a>(value: &'a Value, field: &Field) -> Result<&'a Map<String, Value>, AppError> {
    value.as_object().ok_or_else(|| {
        AppError::Contract(format!("branch of '{}' is not an object", field.qualified_name))
    })
}

fn missing_in_pack(field: &Field) -> AppError {
    AppError::Contract(format!("model pack has no value for '{}'", field.qualified_name))
}
