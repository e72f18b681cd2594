//! Filter compilation into SQL boolean fragments.
//!
//! A filter maps raw keys to values. A key may start with an operator token
//! (`"like name"`, `">= age"`, `"in status"`); the token selects the clause
//! shape and the rest of the key is the column. Keys are trimmed before the
//! operator is matched, and the column is trimmed after the token is removed.
//!
//! Every compiled predicate starts with the scoping clause `a.id >= 1`, so an
//! empty filter still renders a bounded `where` clause.
//!
//! Values are interpolated verbatim; see the module docs of [`crate::query`].

use serde_json::Value;

use super::{Mapping, scalar_text};
use crate::Error;

/// Clause every predicate starts with.
pub const BASE_CLAUSE: &str = "a.id >= 1";

/// Logical connector placed before a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    pub fn as_str(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Operator selected by a filter key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    LikeAfter,
    LikeBefore,
    LikeOr,
    NotLike,
    Like,
    Or,
    In,
    Is,
    NotIn,
    Dif,
    Lte,
    Gte,
    Lt,
    Gt,
    Sql,
    FindOr,
    FindAnd,
    /// No recognized prefix: plain equality.
    Eq,
}

/// Prefix table in match order; longer and more specific tokens come first.
const PREFIXES: &[(&str, Operator)] = &[
    ("likeAfter ", Operator::LikeAfter),
    ("likeBefore ", Operator::LikeBefore),
    ("like or ", Operator::LikeOr),
    ("notlike ", Operator::NotLike),
    ("like ", Operator::Like),
    ("or ", Operator::Or),
    ("in ", Operator::In),
    ("is ", Operator::Is),
    ("notin ", Operator::NotIn),
    ("dif ", Operator::Dif),
    ("<=", Operator::Lte),
    (">=", Operator::Gte),
    ("<", Operator::Lt),
    (">", Operator::Gt),
    ("sql", Operator::Sql),
    ("findOr", Operator::FindOr),
    ("findAnd", Operator::FindAnd),
];

impl Operator {
    /// Split a raw filter key into its operator and column.
    pub fn parse(raw_key: &str) -> (Operator, &str) {
        let key = raw_key.trim();
        PREFIXES
            .iter()
            .find_map(|(prefix, op)| key.strip_prefix(prefix).map(|column| (*op, column.trim())))
            .unwrap_or((Operator::Eq, key))
    }
}

/// One compiled filter entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// `None` for raw SQL fragments and the base clause.
    pub connector: Option<Connector>,
    pub fragment: String,
}

impl Clause {
    fn and(fragment: String) -> Self {
        Self { connector: Some(Connector::And), fragment }
    }

    fn or(fragment: String) -> Self {
        Self { connector: Some(Connector::Or), fragment }
    }

    fn raw(fragment: String) -> Self {
        Self { connector: None, fragment }
    }

    fn render(&self) -> String {
        match self.connector {
            Some(connector) => format!("{} {}", connector.as_str(), self.fragment),
            None => self.fragment.clone(),
        }
    }
}

/// Compiled filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// Compile a filter, degrading unknown operator prefixes to equality.
    pub fn compile(filter: &Mapping) -> Self {
        let mut clauses = vec![Clause::raw(BASE_CLAUSE.to_string())];
        clauses.extend(filter.iter().map(|(key, value)| {
            let (op, column) = Operator::parse(key);
            compile_entry(op, column, value)
        }));
        Self { clauses }
    }

    /// Compile a filter, rejecting keys that look like an unknown operator.
    ///
    /// A key that matches no operator but still contains whitespace after
    /// trimming (`"between age"`) is reported instead of becoming
    /// `between age = '...'`.
    pub fn compile_strict(filter: &Mapping) -> Result<Self, Error> {
        for key in filter.keys() {
            let (op, column) = Operator::parse(key);
            if op == Operator::Eq && column.contains(char::is_whitespace) {
                return Err(Error::MalformedFilterKey(key.clone()));
            }
        }
        Ok(Self::compile(filter))
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The conditions without the `where` keyword.
    pub fn conditions(&self) -> String {
        self.clauses.iter().map(Clause::render).collect::<Vec<_>>().join(" ")
    }

    /// The full `where ...` clause.
    pub fn render(&self) -> String {
        format!("where {}", self.conditions())
    }
}

fn compile_entry(op: Operator, column: &str, value: &Value) -> Clause {
    let value = scalar_text(value);
    match op {
        Operator::LikeAfter => Clause::and(format!("{column} like '{value}%'")),
        Operator::LikeBefore => Clause::and(format!("{column} like '%{value}'")),
        Operator::LikeOr => {
            if column.ends_with(')') {
                let column = column.replace(')', "");
                Clause::or(format!("{} like '%{value}%' )", column.trim()))
            } else {
                Clause::or(format!("{column} like '%{value}%'"))
            }
        }
        Operator::NotLike => Clause::and(format!("{column} NOT LIKE '{value}'")),
        Operator::Like => Clause::and(format!("{column} like '%{value}%'")),
        Operator::Or => Clause::or(format!("{column} = '{value}'")),
        Operator::In => Clause::and(format!("{column} in {}", parenthesize(&value))),
        Operator::Is => Clause::and(format!("{column} IS {value}")),
        Operator::NotIn => Clause::and(format!("{column} not in {}", parenthesize(&value))),
        Operator::Dif => Clause::and(format!("{column} != '{value}'")),
        Operator::Lte => Clause::and(format!("{column} <= {value}")),
        Operator::Gte => Clause::and(format!("{column} >= {value}")),
        Operator::Lt => Clause::and(format!("{column} < {value}")),
        Operator::Gt => Clause::and(format!("{column} > {value}")),
        Operator::Sql => Clause::raw(value),
        Operator::FindOr => Clause::and(find_in_set(column, &value, " OR ")),
        Operator::FindAnd => Clause::and(find_in_set(column, &value, " AND ")),
        Operator::Eq => Clause::and(format!("{column} = '{value}'")),
    }
}

/// Lists are normally passed pre-parenthesized; bare lists get wrapped.
fn parenthesize(list: &str) -> String {
    let list = list.trim();
    if list.starts_with('(') { list.to_string() } else { format!("({list})") }
}

fn find_in_set(column: &str, values: &str, joiner: &str) -> String {
    values
        .split(',')
        .map(|v| format!("FIND_IN_SET(\"{v}\", {column})"))
        .collect::<Vec<_>>()
        .join(joiner)
}
