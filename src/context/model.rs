//! Nested field model of a compiled context.

use crate::schema::Field;
use indexmap::IndexMap;
use serde_json::{Map, Value};

pub const BRANCH_SUFFIX: &str = "_branch";

/// Key under which the related table's sub-model of `qualified_name` is stored.
pub fn branch_key(qualified_name: &str) -> String {
    format!("{}{}", qualified_name, BRANCH_SUFFIX)
}

#[derive(Clone, Debug)]
pub enum ModelEntry {
    Field(Field),
    Branch(Model),
}

/// Fields of one joined table keyed by qualified name, in declared order. A foreign key
/// with a branch is immediately followed by `<qualified_name>_branch`.
#[derive(Clone, Debug)]
pub struct Model {
    /// Index of the table in the context's joined tables.
    pub table_index: usize,
    pub entries: IndexMap<String, ModelEntry>,
}

/// A field of a model together with its branch, if it has one.
#[derive(Clone, Copy, Debug)]
pub enum Node<'a> {
    Leaf(&'a Field),
    Relation { field: &'a Field, branch: &'a Model },
}

impl<'a> Node<'a> {
    pub fn field(&self) -> &'a Field {
        match self {
            Node::Leaf(f) => f,
            Node::Relation { field, .. } => field,
        }
    }
}

impl Model {
    pub(crate) fn new(table_index: usize) -> Self {
        Model {
            table_index,
            entries: IndexMap::new(),
        }
    }

    pub fn branch(&self, qualified_name: &str) -> Option<&Model> {
        match self.entries.get(&branch_key(qualified_name)) {
            Some(ModelEntry::Branch(m)) => Some(m),
            _ => None,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        self.entries.iter().filter_map(move |(key, entry)| match entry {
            ModelEntry::Field(field) => Some(match self.branch(key) {
                Some(branch) => Node::Relation { field, branch },
                None => Node::Leaf(field),
            }),
            ModelEntry::Branch(_) => None,
        })
    }

    /// Field of this model's own table by column name.
    pub fn column(&self, column: &str) -> Option<&Field> {
        self.nodes().map(|n| n.field()).find(|f| f.name == column)
    }

    pub fn node_by_display(&self, name: &str) -> Option<Node<'_>> {
        self.nodes().find(|n| n.field().display_name.matches(name))
    }

    pub(crate) fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Field>) {
        for node in self.nodes() {
            match node {
                Node::Leaf(f) => out.push(f),
                Node::Relation { branch, .. } => branch.collect_leaves(out),
            }
        }
    }

    /// Display name -> raw type tag, nested under each foreign key's display name.
    pub(crate) fn types_view(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for node in self.nodes() {
            let value = match node {
                Node::Leaf(f) => Value::String(f.data_type.clone()),
                Node::Relation { branch, .. } => Value::Object(branch.types_view()),
            };
            out.insert(node.field().display_name.primary().to_string(), value);
        }
        out
    }

    /// Value a model-keyed pack holds for `field` of this model's table. A foreign key
    /// takes its value from the referenced column of its branch, or from a scalar link.
    pub(crate) fn value_of<'p>(&self, field: &Field, packed: &'p Map<String, Value>) -> Option<&'p Value> {
        if let Some(v) = packed.get(&field.qualified_name) {
            return Some(v);
        }
        let branch = self.branch(&field.qualified_name)?;
        let target = field.relation.as_ref()?;
        let target_field = branch.column(&target.column)?;
        match packed.get(&branch_key(&field.qualified_name))? {
            Value::Object(sub) => branch.value_of(target_field, sub),
            _ => None,
        }
    }
}

/// Input value for `name`, by primary display name first and then by alias.
pub(crate) fn lookup<'a>(input: &'a Map<String, Value>, name: &crate::naming::Name) -> Option<&'a Value> {
    input
        .get(name.primary())
        .or_else(|| name.aliases().find_map(|a| input.get(a)))
}
