//! Statement buffer and identifier helpers shared by the context compiler and query translator.

use serde_json::Value;

/// Quote identifier for MySQL (safe: only from the introspected schema).
pub fn quoted(s: &str) -> String {
    format!("`{}`", s.replace('`', "``"))
}

/// Full qualified table name.
pub fn qualified_table(database: &str, table: &str) -> String {
    format!("{}.{}", quoted(database), quoted(table))
}

/// SQL text with `?` placeholders and the values bound to them, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    pub fn new(sql: impl Into<String>) -> Self {
        QueryBuf {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Appends a placeholder and binds `v` to it.
    pub fn push_param(&mut self, v: Value) {
        self.sql.push('?');
        self.params.push(v);
    }

    /// Appends another buffer's text and parameters.
    pub fn append(&mut self, other: QueryBuf) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_backticks() {
        assert_eq!(quoted("order"), "`order`");
        assert_eq!(quoted("we`ird"), "`we``ird`");
        assert_eq!(qualified_table("shop", "orders"), "`shop`.`orders`");
    }

    #[test]
    fn params_follow_placeholders() {
        let mut q = QueryBuf::new("SELECT 1 WHERE a = ");
        q.push_param(Value::from(3));
        q.push_sql(" AND b = ");
        q.push_param(Value::from("x"));
        assert_eq!(q.sql, "SELECT 1 WHERE a = ? AND b = ?");
        assert_eq!(q.params, vec![Value::from(3), Value::from("x")]);
    }
}
