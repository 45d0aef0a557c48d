//! Primary-key value generators.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Length of a simple-form UUID string.
const UUID_LEN: usize = 32;

/// Produces fresh primary-key values for a table. Cheap to clone; can be replaced per table.
#[derive(Clone)]
pub struct IdGenerator(Arc<dyn Fn() -> Value + Send + Sync>);

impl IdGenerator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        IdGenerator(Arc::new(f))
    }

    /// Simple-form v4 UUID string.
    pub fn random_uuid() -> Self {
        IdGenerator::new(|| Value::String(uuid::Uuid::new_v4().simple().to_string()))
    }

    /// Leading `len` characters of a simple-form v4 UUID, for short CHAR/VARCHAR keys.
    pub fn random_short_uuid(len: usize) -> Self {
        IdGenerator::new(move || {
            let mut id = uuid::Uuid::new_v4().simple().to_string();
            id.truncate(len.max(1));
            Value::String(id)
        })
    }

    /// Positive 31-bit integer taken from a v4 UUID, so it fits any signed INT column.
    pub fn random_int() -> Self {
        IdGenerator::random_int_up_to(i32::MAX as i64)
    }

    /// Integer in `1..=max` taken from a v4 UUID.
    pub fn random_int_up_to(max: i64) -> Self {
        let max = max.max(1) as u128;
        IdGenerator::new(move || {
            let n = (uuid::Uuid::new_v4().as_u128() % max) as i64 + 1;
            Value::Number(n.into())
        })
    }

    /// Generator suited to a raw column type tag such as `smallint(5) unsigned` or `char(8)`.
    pub fn for_type(data_type: &str) -> Self {
        let tag = data_type.trim().to_ascii_lowercase();
        let base = tag.split(|c: char| c == '(' || c.is_whitespace()).next().unwrap_or_default();
        let unsigned = tag.contains("unsigned");
        let int_max = |signed: i64, wide: i64| if unsigned { wide } else { signed };
        match base {
            "tinyint" => IdGenerator::random_int_up_to(int_max(127, 255)),
            "smallint" => IdGenerator::random_int_up_to(int_max(32_767, 65_535)),
            "mediumint" => IdGenerator::random_int_up_to(int_max(8_388_607, 16_777_215)),
            "int" | "integer" | "bigint" => IdGenerator::random_int(),
            "char" | "varchar" => match declared_length(&tag) {
                Some(len) if len < UUID_LEN => IdGenerator::random_short_uuid(len),
                _ => IdGenerator::random_uuid(),
            },
            _ => IdGenerator::random_uuid(),
        }
    }

    pub fn generate(&self) -> Value {
        (self.0)()
    }
}

/// `N` in `char(N)` / `varchar(N)`.
fn declared_length(tag: &str) -> Option<usize> {
    let (_, rest) = tag.split_once('(')?;
    let (len, _) = rest.split_once(')')?;
    len.trim().parse().ok()
}

impl Default for IdGenerator {
    fn default() -> Self {
        IdGenerator::random_uuid()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdGenerator(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique_strings() {
        let generator = IdGenerator::default();
        let (a, b) = (generator.generate(), generator.generate());
        assert!(a.is_string());
        assert_ne!(a, b);
    }

    fn ints(data_type: &str) -> Vec<i64> {
        let generator = IdGenerator::for_type(data_type);
        (0..200).map(|_| generator.generate().as_i64().unwrap()).collect()
    }

    #[test]
    fn int_columns_get_positive_integers() {
        assert!(ints("int(11)").iter().all(|n| *n > 0 && *n <= i32::MAX as i64));
        assert!(ints("bigint(20) unsigned").iter().all(|n| *n > 0 && *n <= i32::MAX as i64));
        assert!(IdGenerator::for_type("varchar(36)").generate().is_string());
    }

    #[test]
    fn small_int_columns_stay_in_range() {
        assert!(ints("tinyint(4)").iter().all(|n| (1..=127).contains(n)));
        assert!(ints("tinyint(3) unsigned").iter().all(|n| (1..=255).contains(n)));
        assert!(ints("smallint(6)").iter().all(|n| (1..=32_767).contains(n)));
        assert!(ints("smallint(5) unsigned").iter().all(|n| (1..=65_535).contains(n)));
        assert!(ints("mediumint(9)").iter().all(|n| (1..=8_388_607).contains(n)));
        assert!(ints("mediumint(8) unsigned").iter().all(|n| (1..=16_777_215).contains(n)));
    }

    #[test]
    fn short_string_keys_are_truncated() {
        let id = IdGenerator::for_type("char(8)").generate();
        assert_eq!(id.as_str().unwrap().len(), 8);
        let id = IdGenerator::for_type("VARCHAR(12)").generate();
        assert_eq!(id.as_str().unwrap().len(), 12);
        let id = IdGenerator::for_type("varchar(255)").generate();
        assert_eq!(id.as_str().unwrap().len(), 32);
    }

    #[test]
    fn non_integer_types_containing_int_get_strings() {
        assert!(IdGenerator::for_type("point").generate().is_string());
    }
}
