//! SQL statement construction.
//!
//! Pure string building: `select`, `insert` and `update` statements from an
//! operation's parts and a compiled [`Predicate`]. Tables are aliased `a`
//! unless the caller already aliased them.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::{Mapping, Pagination, Predicate, scalar_text};
use crate::Error;

/// Projection used by count statements.
pub const COUNT_COLUMNS: &str = "count(a.id) as count";

/// Ordering applied when the caller sets none.
pub const DEFAULT_ORDER: &str = "a.id desc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
}

/// How write statements render literal values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quoting {
    /// JSON string literals (`"v"`), as MySQL accepts them.
    #[default]
    Json,
    /// Standard SQL literals (`'v'`, embedded quotes doubled). Required by
    /// engines that read double-quoted text as an identifier.
    Standard,
}

impl Quoting {
    /// Render a value as a string literal.
    pub fn literal(self, value: &Value) -> String {
        let text = scalar_text(value);
        match self {
            Quoting::Json => Value::String(text).to_string(),
            Quoting::Standard => format!("'{}'", text.replace('\'', "''")),
        }
    }
}

/// A statement ready for an executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Everything a `select` needs besides the predicate.
#[derive(Debug, Clone, Copy)]
pub struct SelectParts<'a> {
    pub table: &'a str,
    pub columns: &'a str,
    pub joins: &'a [String],
    pub group: &'a [String],
    pub order: &'a [String],
    pub pagination: Option<Pagination>,
}

impl<'a> SelectParts<'a> {
    /// Bare parts: no joins, grouping, ordering or pagination.
    pub fn new(table: &'a str, columns: &'a str) -> Self {
        Self { table, columns, joins: &[], group: &[], order: &[], pagination: None }
    }
}

/// Build `select ... from table as a [joins] where ... [group] order by ... [limit]`.
///
/// The limit clause is emitted only when pagination carries a non-zero cap.
pub fn select(parts: &SelectParts<'_>, predicate: &Predicate) -> Statement {
    let mut sql = vec![format!("select {} from {}", parts.columns, aliased(parts.table))];

    sql.extend(parts.joins.iter().cloned());
    sql.push(predicate.render());
    sql.extend(parts.group.iter().cloned());

    let order = if parts.order.is_empty() { DEFAULT_ORDER.to_string() } else { parts.order.join(" , ") };
    sql.push(format!("order by {order}"));

    if let Some(Pagination { start, limit: Some(limit) }) = parts.pagination
        && limit != 0
    {
        sql.push(format!("limit {start}, {limit}"));
    }

    Statement { kind: StatementKind::Select, sql: sql.join(" ") }
}

/// Build the row count for a table, its joins and a predicate.
pub fn count(table: &str, joins: &[String], predicate: &Predicate) -> Statement {
    let parts = SelectParts { joins, ..SelectParts::new(table, COUNT_COLUMNS) };
    select(&parts, predicate)
}

/// Build `insert into table (`id`, ...) values (NULL, ...)`.
///
/// Any `id` in `values` is dropped so the store assigns one. Column names are
/// backtick-quoted and values rendered with `quoting`.
pub fn insert(table: &str, values: &Mapping, quoting: Quoting) -> Statement {
    let mut columns = vec!["`id`".to_string()];
    let mut literals = vec!["NULL".to_string()];

    for (key, value) in values.iter().filter(|(key, _)| key.as_str() != "id") {
        columns.push(quote_column(key));
        literals.push(quoting.literal(value));
    }

    Statement {
        kind: StatementKind::Insert,
        sql: format!("insert into {table} ({}) values ({})", columns.join(", "), literals.join(", ")),
    }
}

/// Build `update table as a set `k` = <literal>, ... where ( ... )`.
///
/// # Errors
///
/// Returns `Error::InvalidInput` when `values` has nothing to assign besides `id`.
pub fn update(table: &str, values: &Mapping, predicate: &Predicate, quoting: Quoting) -> Result<Statement, Error> {
    let assignments: Vec<String> = values
        .iter()
        .filter(|(key, _)| key.as_str() != "id")
        .map(|(key, value)| format!("{} = {}", quote_column(key), quoting.literal(value)))
        .collect();

    if assignments.is_empty() {
        return Err(Error::InvalidInput(format!("nothing to update in {table}")));
    }

    Ok(Statement {
        kind: StatementKind::Update,
        sql: format!("update {} set {} where ( {} )", aliased(table), assignments.join(", "), predicate.conditions()),
    })
}

fn aliased(table: &str) -> String {
    if table.contains("as a") { table.to_string() } else { format!("{table} as a") }
}

fn quote_column(key: &str) -> String {
    Value::String(key.to_string()).to_string().replace('"', "`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn predicate(entries: &[(&str, Value)]) -> Predicate {
        let mut filter = Mapping::new();
        for (key, value) in entries {
            filter.insert(key.to_string(), value.clone());
        }
        Predicate::compile(&filter)
    }

    #[test]
    fn test_select_defaults() {
        let parts = SelectParts { pagination: Some(Pagination::default()), ..SelectParts::new("users", "a.*") };
        let stmt = select(&parts, &predicate(&[]));
        assert_eq!(stmt.kind, StatementKind::Select);
        assert_eq!(stmt.sql, "select a.* from users as a where a.id >= 1 order by a.id desc limit 0, 15");
    }

    #[test]
    fn test_select_keeps_existing_alias() {
        let stmt = select(&SelectParts::new("users as a", "a.name"), &predicate(&[]));
        assert!(stmt.sql.starts_with("select a.name from users as a where"));
        assert!(!stmt.sql.contains("as a as a"));
    }

    #[test]
    fn test_select_without_pagination_has_no_limit() {
        let stmt = select(&SelectParts::new("users", "a.*"), &predicate(&[]));
        assert!(!stmt.sql.contains("limit"));

        let uncapped = SelectParts { pagination: Some(Pagination { start: 10, limit: None }), ..SelectParts::new("users", "a.*") };
        assert!(!select(&uncapped, &predicate(&[])).sql.contains("limit"));

        let zero = SelectParts { pagination: Some(Pagination { start: 0, limit: Some(0) }), ..SelectParts::new("users", "a.*") };
        assert!(!select(&zero, &predicate(&[])).sql.contains("limit"));
    }

    #[test]
    fn test_select_full() {
        let joins = vec!["left join roles as r on r.id = a.role_id".to_string()];
        let group = vec!["group by a.role_id".to_string()];
        let order = vec!["a.name asc".to_string(), "a.id desc".to_string()];
        let parts = SelectParts {
            table: "users",
            columns: "a.role_id, count(a.id)",
            joins: &joins,
            group: &group,
            order: &order,
            pagination: Some(Pagination { start: 30, limit: Some(10) }),
        };
        let stmt = select(&parts, &predicate(&[("like name", json!("ann"))]));
        assert_eq!(
            stmt.sql,
            "select a.role_id, count(a.id) from users as a left join roles as r on r.id = a.role_id \
             where a.id >= 1 AND name like '%ann%' group by a.role_id order by a.name asc , a.id desc limit 30, 10"
        );
    }

    #[test]
    fn test_count() {
        let joins = vec!["inner join accounts as c on c.id = a.account_id".to_string()];
        let stmt = count("users", &joins, &predicate(&[("status", json!("active"))]));
        assert_eq!(
            stmt.sql,
            "select count(a.id) as count from users as a inner join accounts as c on c.id = a.account_id \
             where a.id >= 1 AND status = 'active' order by a.id desc"
        );
    }

    #[test]
    fn test_insert_drops_id_and_quotes() {
        let mut values = Mapping::new();
        values.insert("id".to_string(), json!(99));
        values.insert("name".to_string(), json!("Zoë \"Z\""));
        values.insert("age".to_string(), json!(30));
        let stmt = insert("users", &values, Quoting::Json);
        assert_eq!(stmt.kind, StatementKind::Insert);
        assert_eq!(stmt.sql, r#"insert into users (`id`, `name`, `age`) values (NULL, "Zoë \"Z\"", "30")"#);
    }

    #[test]
    fn test_insert_without_values() {
        assert_eq!(insert("logs", &Mapping::new(), Quoting::Json).sql, "insert into logs (`id`) values (NULL)");
    }

    #[test]
    fn test_update() {
        let mut values = Mapping::new();
        values.insert("id".to_string(), json!(5));
        values.insert("name".to_string(), json!("ann"));
        values.insert("active".to_string(), json!(true));
        let stmt = update("users", &values, &predicate(&[("id", json!(5))]), Quoting::Json).unwrap();
        assert_eq!(stmt.kind, StatementKind::Update);
        assert_eq!(stmt.sql, r#"update users as a set `name` = "ann", `active` = "1" where ( a.id >= 1 AND id = '5' )"#);
    }

    #[test]
    fn test_update_with_nothing_to_assign() {
        let mut values = Mapping::new();
        values.insert("id".to_string(), json!(5));
        let result = update("users", &values, &predicate(&[]), Quoting::Standard);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_standard_quoting_escapes_single_quotes() {
        let mut values = Mapping::new();
        values.insert("name".to_string(), json!("O'Brien"));
        values.insert("email".to_string(), json!("name"));
        let stmt = insert("users", &values, Quoting::Standard);
        assert_eq!(stmt.sql, "insert into users (`id`, `name`, `email`) values (NULL, 'O''Brien', 'name')");

        let stmt = update("users", &values, &predicate(&[("id", json!(1))]), Quoting::Standard).unwrap();
        assert_eq!(
            stmt.sql,
            "update users as a set `name` = 'O''Brien', `email` = 'name' where ( a.id >= 1 AND id = '1' )"
        );
    }

    #[test]
    fn test_literal() {
        assert_eq!(Quoting::Json.literal(&json!("say \"hi\"")), r#""say \"hi\"""#);
        assert_eq!(Quoting::Standard.literal(&json!(true)), "'1'");
        assert_eq!(Quoting::Standard.literal(&json!(null)), "''");
    }
}
