//! Convert serde_json::Value to types that sqlx can bind against MySQL.

use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::Query;

pub type MySqlQuery<'q> = Query<'q, MySql, MySqlArguments>;

/// A value that can be bound to a MySQL statement. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(String),
    Json(Value),
}

impl From<&Value> for BindValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(u) = n.as_u64() {
                    BindValue::U64(u)
                } else {
                    BindValue::F64(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => BindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Json(v.clone()),
        }
    }
}

impl BindValue {
    pub fn bind_to<'q>(self, query: MySqlQuery<'q>) -> MySqlQuery<'q> {
        match self {
            BindValue::Null => query.bind(None::<String>),
            BindValue::Bool(b) => query.bind(b),
            BindValue::I64(n) => query.bind(n),
            BindValue::U64(n) => query.bind(n),
            BindValue::F64(n) => query.bind(n),
            BindValue::String(s) => query.bind(s),
            BindValue::Json(v) => query.bind(sqlx::types::Json(v)),
        }
    }
}

/// Binds every parameter in order.
pub fn bind_params<'q>(mut query: MySqlQuery<'q>, params: &[Value]) -> MySqlQuery<'q> {
    for p in params {
        query = BindValue::from(p).bind_to(query);
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_keep_their_kind() {
        assert_eq!(BindValue::from(&json!(7)), BindValue::I64(7));
        assert_eq!(BindValue::from(&json!(u64::MAX)), BindValue::U64(u64::MAX));
        assert_eq!(BindValue::from(&json!(1.5)), BindValue::F64(1.5));
    }

    #[test]
    fn structured_values_bind_as_json() {
        assert_eq!(BindValue::from(&json!({"a": 1})), BindValue::Json(json!({"a": 1})));
        assert_eq!(BindValue::from(&Value::Null), BindValue::Null);
        assert_eq!(BindValue::from(&json!("x")), BindValue::String("x".into()));
    }
}
