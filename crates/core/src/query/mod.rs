//! Query construction: operations, predicates and SQL statements.
//!
//! Filter values and write values are interpolated into SQL text verbatim.
//! Nothing in this module escapes or parameterizes caller input; callers must
//! only pass trusted values through filters, joins, ordering and grouping.

pub mod operation;
pub mod predicate;
pub mod statement;

use serde_json::Value;

pub use operation::{DEFAULT_PAGE_SIZE, Operation, OperationBuilder, OperationKind, Pagination};
pub use predicate::{Clause, Connector, Operator, Predicate};
pub use statement::{Quoting, SelectParts, Statement, StatementKind};

/// Ordered string-keyed mapping of scalar values.
///
/// Iteration order is insertion order, which keeps generated SQL and
/// fingerprints deterministic.
pub type Mapping = serde_json::Map<String, Value>;

/// Render a scalar the way it is interpolated into SQL and fingerprints.
///
/// Booleans follow the loose string cast (`true` is `"1"`, `false` is empty),
/// null is empty, and nested values fall back to their JSON text.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) | Value::Null => String::new(),
        other => other.to_string(),
    }
}
