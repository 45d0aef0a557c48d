//! Query-string vocabulary: reserved parameters, comparators and value kinds.

use crate::error::AppError;
use crate::schema::Field;
use serde_json::Value;

pub const ORDER_BY: &str = "order_by";
pub const ORDER_DIR: &str = "order_dir";
pub const PAGE: &str = "page";
pub const SEARCH: &str = "q";

/// Parameters that are never field filters.
pub const RESERVED: &[&str] = &[ORDER_BY, ORDER_DIR, PAGE, SEARCH];

/// `<field>_comp=<COMPARATOR>` selects the comparison for `<field>`.
pub const COMPARATOR_SUFFIX: &str = "_comp";

pub fn is_reserved(key: &str) -> bool {
    RESERVED.contains(&key)
}

/// How a filter value is parsed before it is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Boolean,
    Integer,
    Float,
    Untyped,
}

impl ParamKind {
    /// From the raw type tag; the first matching rule wins.
    pub fn of(field: &Field) -> Self {
        if field.type_contains("char") || field.type_contains("text") {
            ParamKind::String
        } else if field.type_contains("tinyint") {
            ParamKind::Boolean
        } else if field.type_contains("int") {
            ParamKind::Integer
        } else if field.type_contains("float") || field.type_contains("real") {
            ParamKind::Float
        } else {
            ParamKind::Untyped
        }
    }

    pub fn parse(self, key: &str, raw: &str) -> Result<Value, AppError> {
        let bad = |what: &str| AppError::BadRequest(format!("parameter '{}' must be {}, got '{}'", key, what, raw));
        match self {
            ParamKind::String | ParamKind::Untyped => Ok(Value::String(raw.to_string())),
            ParamKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                _ => Err(bad("a boolean")),
            },
            ParamKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| raw.trim().parse::<u64>().map(Value::from))
                .map_err(|_| bad("an integer")),
            ParamKind::Float => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::from)
                .ok_or_else(|| bad("a number")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Comparator {
    #[default]
    Eq,
    Like,
    Gt,
    Lt,
    Gte,
    Lte,
    Ne,
}

impl Comparator {
    /// Case-insensitive `EQ|LIKE|GT|LT|GTE|LTE|NE`.
    pub fn parse(token: &str) -> Result<Self, AppError> {
        match token.to_ascii_uppercase().as_str() {
            "EQ" => Ok(Comparator::Eq),
            "LIKE" => Ok(Comparator::Like),
            "GT" => Ok(Comparator::Gt),
            "LT" => Ok(Comparator::Lt),
            "GTE" => Ok(Comparator::Gte),
            "LTE" => Ok(Comparator::Lte),
            "NE" => Ok(Comparator::Ne),
            _ => Err(AppError::BadRequest(format!("unknown comparator '{}'", token))),
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Like => "LIKE",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Gte => ">=",
            Comparator::Lte => "<=",
            Comparator::Ne => "<>",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind(ty: &str) -> ParamKind {
        ParamKind::of(&Field::new("d", "t", "c", ty))
    }

    #[test]
    fn kinds_follow_type_tag() {
        assert_eq!(kind("varchar(64)"), ParamKind::String);
        assert_eq!(kind("mediumtext"), ParamKind::String);
        assert_eq!(kind("tinyint(1)"), ParamKind::Boolean);
        assert_eq!(kind("bigint(20) unsigned"), ParamKind::Integer);
        assert_eq!(kind("float"), ParamKind::Float);
        assert_eq!(kind("datetime"), ParamKind::Untyped);
    }

    #[test]
    fn values_parse_per_kind() {
        assert_eq!(ParamKind::Integer.parse("id", "42").unwrap(), json!(42));
        assert_eq!(ParamKind::Boolean.parse("on", "TRUE").unwrap(), json!(true));
        assert_eq!(ParamKind::Float.parse("p", "1.5").unwrap(), json!(1.5));
        assert_eq!(ParamKind::String.parse("n", "7").unwrap(), json!("7"));
        assert!(matches!(ParamKind::Integer.parse("id", "abc"), Err(AppError::BadRequest(_))));
        assert!(matches!(ParamKind::Float.parse("p", "NaN"), Err(AppError::BadRequest(_))));
        assert!(matches!(ParamKind::Boolean.parse("on", "yes"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn comparators() {
        assert_eq!(Comparator::parse("gte").unwrap().sql(), ">=");
        assert_eq!(Comparator::parse("NE").unwrap().sql(), "<>");
        assert!(Comparator::parse("ABOUT").is_err());
        assert_eq!(Comparator::default(), Comparator::Eq);
    }
}
