//! Translates query-string parameters into parameterized SELECTs over a context.

use crate::context::Context;
use crate::error::AppError;
use crate::schema::Field;
use crate::service::params::*;
use crate::sql::QueryBuf;
use serde_json::Value;
use std::collections::BTreeMap;

/// A list query plus the page it asks for, when paging is on.
#[derive(Clone, Debug, PartialEq)]
pub struct ListQuery {
    pub query: QueryBuf,
    pub page: Option<u64>,
}

/// SELECT for `GET /<model>`. Fails with `BadRequest` on any unknown or malformed parameter.
pub fn translate_multiple(
    ctx: &Context,
    params: &BTreeMap<String, String>,
    page_limit: u32,
) -> Result<ListQuery, AppError> {
    let filter = match params.get(SEARCH) {
        Some(term) => search(ctx, params, term)?,
        None => structured(ctx, params)?,
    };

    let mut query = QueryBuf::new(ctx.get_sql_parts());
    if !filter.is_empty() {
        query.push_sql(connector(ctx));
        query.append(filter);
    }

    let page = page_number(params, page_limit)?;
    match ordering(ctx, params)? {
        Some((field, dir)) => query.push_sql(&format!(" ORDER BY {} {}", field.sql_ref(), dir)),
        None if page.is_some() => {
            if let [key] = ctx.primary_keys().as_slice() {
                query.push_sql(&format!(" ORDER BY {} ASC", key.sql_ref()));
            }
        }
        None => {}
    }

    if let Some(page) = page {
        let offset = (page - 1)
            .checked_mul(u64::from(page_limit))
            .ok_or_else(|| AppError::BadRequest(format!("page {} is out of range", page)))?;
        query.push_sql(" LIMIT ");
        query.push_param(Value::from(page_limit));
        query.push_sql(" OFFSET ");
        query.push_param(Value::from(offset));
    }
    Ok(ListQuery { query, page })
}

/// SELECT for `GET /<model>/<id>`. The context must expose exactly one primary key.
pub fn translate_single(ctx: &Context, id: &str) -> Result<QueryBuf, AppError> {
    let keys = ctx.primary_keys();
    let key = match keys.as_slice() {
        [key] => *key,
        [] => {
            return Err(AppError::Integrity(format!(
                "no primary key field found for '{}'",
                ctx.name()
            )))
        }
        _ => {
            return Err(AppError::Integrity(format!(
                "'{}' has a composite primary key; single lookups need exactly one",
                ctx.name()
            )))
        }
    };
    let value = ParamKind::of(key).parse(key.display_name.primary(), id)?;
    let mut query = QueryBuf::new(ctx.get_sql_parts());
    query.push_sql(connector(ctx));
    query.push_sql(&format!("{} = ", key.sql_ref()));
    query.push_param(value);
    Ok(query)
}

fn connector(ctx: &Context) -> &'static str {
    if ctx.joins().is_empty() {
        " WHERE "
    } else {
        " AND "
    }
}

/// `(f1 LIKE ? OR f2 LIKE ? ...)` over every flattened field.
fn search(ctx: &Context, params: &BTreeMap<String, String>, term: &str) -> Result<QueryBuf, AppError> {
    if let Some(key) = params.keys().find(|k| !is_reserved(k)) {
        return Err(AppError::BadRequest(format!(
            "parameter '{}' cannot be combined with 'q'",
            key
        )));
    }
    let pattern = Value::String(format!("%{}%", term));
    let mut filter = QueryBuf::new("(");
    for (i, field) in ctx.flat_fields().iter().enumerate() {
        if i > 0 {
            filter.push_sql(" OR ");
        }
        filter.push_sql(&format!("{} LIKE ", field.sql_ref()));
        filter.push_param(pattern.clone());
    }
    filter.push_sql(")");
    Ok(filter)
}

/// AND-joined `field <op> ?` for every field parameter.
fn structured(ctx: &Context, params: &BTreeMap<String, String>) -> Result<QueryBuf, AppError> {
    let mut filters: Vec<(&str, &Field)> = Vec::new();
    let mut comparators: BTreeMap<&str, &str> = BTreeMap::new();
    for key in params.keys() {
        if is_reserved(key) {
            continue;
        }
        if let Some(field) = ctx.find_field(key) {
            filters.push((key.as_str(), field));
            continue;
        }
        match key.strip_suffix(COMPARATOR_SUFFIX) {
            Some(target) if ctx.find_field(target).is_some() => {
                comparators.insert(target, key.as_str());
            }
            _ => return Err(AppError::BadRequest(format!("unknown parameter '{}'", key))),
        }
    }
    if let Some((target, key)) = comparators.iter().find(|(t, _)| !params.contains_key(**t)) {
        return Err(AppError::BadRequest(format!(
            "'{}' given without a '{}' filter",
            key, target
        )));
    }

    let mut filter = QueryBuf::default();
    for (i, (key, field)) in filters.into_iter().enumerate() {
        let raw = &params[key];
        let comparator = match comparators.get(key) {
            Some(comp_key) => Comparator::parse(&params[*comp_key])?,
            None => Comparator::Eq,
        };
        let value = match comparator {
            Comparator::Like => Value::String(format!("%{}%", raw)),
            _ => ParamKind::of(field).parse(key, raw)?,
        };
        if i > 0 {
            filter.push_sql(" AND ");
        }
        filter.push_sql(&format!("{} {} ", field.sql_ref(), comparator.sql()));
        filter.push_param(value);
    }
    Ok(filter)
}

fn ordering<'c>(ctx: &'c Context, params: &BTreeMap<String, String>) -> Result<Option<(&'c Field, &'static str)>, AppError> {
    match (params.get(ORDER_BY), params.get(ORDER_DIR)) {
        (None, None) => Ok(None),
        (Some(by), Some(dir)) => {
            let field = ctx
                .find_field(by)
                .ok_or_else(|| AppError::BadRequest(format!("'order_by' names no field: '{}'", by)))?;
            let dir = match dir.to_ascii_uppercase().as_str() {
                "ASC" => "ASC",
                "DESC" => "DESC",
                _ => return Err(AppError::BadRequest(format!("'order_dir' must be ASC or DESC, got '{}'", dir))),
            };
            Ok(Some((field, dir)))
        }
        _ => Err(AppError::BadRequest(
            "'order_by' and 'order_dir' must both be present".into(),
        )),
    }
}

fn page_number(params: &BTreeMap<String, String>, page_limit: u32) -> Result<Option<u64>, AppError> {
    match (params.get(PAGE), page_limit) {
        (None, 0) => Ok(None),
        (Some(_), 0) => Err(AppError::BadRequest("'page' given but paging is disabled".into())),
        (None, _) => Err(AppError::BadRequest("'page' parameter is required".into())),
        (Some(raw), _) => match raw.trim().parse::<u64>() {
            Ok(page) if page > 0 => Ok(Some(page)),
            _ => Err(AppError::BadRequest(format!("'page' must be a positive integer, got '{}'", raw))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Database, FieldRef, Schema, Table};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const BASE: &str = "SELECT t1.`id`, t1.`total`, t2.`id`, t2.`name` FROM `shop`.`orders` AS t1, \
                        `shop`.`customers` AS t2 WHERE t1.`customer_id` = t2.`id`";

    fn ctx() -> Context {
        let customers = Table::new(
            "shop",
            "customers",
            vec![
                Field::new("shop", "customers", "id", "int(11)").primary_key(),
                Field::new("shop", "customers", "name", "varchar(64)"),
            ],
        );
        let orders = Table::new(
            "shop",
            "orders",
            vec![
                Field::new("shop", "orders", "id", "int(11)").primary_key(),
                Field::new("shop", "orders", "total", "float"),
                Field::new("shop", "orders", "customer_id", "int(11)")
                    .references(FieldRef::new("shop", "customers", "id")),
            ],
        );
        let schema = Schema::new(vec![Database::new("shop", vec![orders, customers])]);
        Context::compile(&schema, schema.table("shop.orders").unwrap()).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn bad(pairs: &[(&str, &str)], page_limit: u32) -> bool {
        matches!(translate_multiple(&ctx(), &params(pairs), page_limit), Err(AppError::BadRequest(_)))
    }

    #[test]
    fn no_parameters_selects_everything() {
        let list = translate_multiple(&ctx(), &params(&[]), 0).unwrap();
        assert_eq!(list.query.sql, BASE);
        assert!(list.query.params.is_empty());
        assert_eq!(list.page, None);
    }

    #[test]
    fn structured_filters_are_bound() {
        let list = translate_multiple(
            &ctx(),
            &params(&[("customer_id_name", "ann"), ("customer_id_name_comp", "like"), ("total", "9.5"), ("total_comp", "GTE")]),
            0,
        )
        .unwrap();
        assert_eq!(
            list.query.sql,
            format!("{} AND t2.`name` LIKE ? AND t1.`total` >= ?", BASE)
        );
        assert_eq!(list.query.params, vec![json!("%ann%"), json!(9.5)]);
    }

    #[test]
    fn search_spans_every_field() {
        let list = translate_multiple(&ctx(), &params(&[("q", "an")]), 0).unwrap();
        assert_eq!(
            list.query.sql,
            format!(
                "{} AND (t1.`id` LIKE ? OR t1.`total` LIKE ? OR t2.`id` LIKE ? OR t2.`name` LIKE ?)",
                BASE
            )
        );
        assert_eq!(list.query.params.len(), 4);
        assert!(bad(&[("q", "an"), ("id", "1")], 0));
    }

    #[test]
    fn unknown_keys_always_fail() {
        assert!(bad(&[("nope", "1")], 0));
        assert!(bad(&[("id", "1"), ("nope", "1")], 0));
        assert!(bad(&[("customer_id", "1")], 0));
        assert!(bad(&[("nope_comp", "EQ")], 0));
    }

    #[test]
    fn comparator_rules() {
        assert!(bad(&[("id", "1"), ("id_comp", "ABOUT")], 0));
        assert!(bad(&[("id_comp", "GT")], 0));
        assert!(bad(&[("id", "one")], 0));
    }

    #[test]
    fn ordering_rules() {
        assert!(bad(&[("order_by", "id")], 0));
        assert!(bad(&[("order_dir", "ASC")], 0));
        assert!(bad(&[("order_by", "id"), ("order_dir", "sideways")], 0));
        assert!(bad(&[("order_by", "nope"), ("order_dir", "asc")], 0));

        let list = translate_multiple(&ctx(), &params(&[("order_by", "customer_id_name"), ("order_dir", "desc")]), 0).unwrap();
        assert_eq!(list.query.sql, format!("{} ORDER BY t2.`name` DESC", BASE));
    }

    #[test]
    fn paging_rules() {
        assert!(bad(&[("page", "1")], 0));
        assert!(bad(&[], 10));
        assert!(bad(&[("page", "0")], 10));
        assert!(bad(&[("page", "-2")], 10));
        assert!(bad(&[("page", "two")], 10));

        let list = translate_multiple(&ctx(), &params(&[("page", "3")]), 10).unwrap();
        assert_eq!(list.page, Some(3));
        assert_eq!(list.query.sql, format!("{} ORDER BY t1.`id` ASC LIMIT ? OFFSET ?", BASE));
        assert_eq!(list.query.params, vec![json!(10), json!(20)]);
    }

    #[test]
    fn single_lookup_by_primary_key() {
        let q = translate_single(&ctx(), "7").unwrap();
        assert_eq!(q.sql, format!("{} AND t1.`id` = ?", BASE));
        assert_eq!(q.params, vec![json!(7)]);
        assert!(matches!(translate_single(&ctx(), "x"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn single_lookup_needs_one_key() {
        let log = Table::new("shop", "log", vec![Field::new("shop", "log", "line", "text")]);
        let schema = Schema::new(vec![Database::new("shop", vec![log])]);
        let ctx = Context::compile(&schema, schema.table("shop.log").unwrap()).unwrap();
        assert!(matches!(translate_single(&ctx, "1"), Err(AppError::Integrity(_))));
        let list = translate_multiple(&ctx, &params(&[("line", "x")]), 0).unwrap();
        assert_eq!(list.query.sql, "SELECT t1.`line` FROM `shop`.`log` AS t1 WHERE t1.`line` = ?");
    }
}
