//! Operation fingerprints used as cache keys.
//!
//! The key material is the operation's arguments flattened in a fixed order:
//! scalars contribute their text, mappings contribute `-key-value` per entry in
//! iteration order. The table name is cut out and the rest is slugged and
//! prefixed with the operation kind. The slug folds case and drops operator
//! tokens, so the unslugged material (table name removed) is hashed after it:
//! `> age`, `< age` and `age` keys, or `Ann` and `ann` values, never collide.
//! Everything runs through HMAC-SHA256 with an embedded secret.

use std::sync::LazyLock;

use hmac::{Hmac, Mac};
use regex::Regex;
use sha2::Sha256;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::query::{Mapping, Operation, OperationKind, Pagination, scalar_text};

type HmacSha256 = Hmac<Sha256>;

const FINGERPRINT_SECRET: &[u8] = b"CACHEMODE";

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]+").expect("valid regex"));
static DASH_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid regex"));

/// One positional argument of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintArg {
    Text(String),
    Pairs(Vec<(String, String)>),
}

impl FingerprintArg {
    fn text(value: impl Into<String>) -> Self {
        FingerprintArg::Text(value.into())
    }

    fn mapping(mapping: &Mapping) -> Self {
        FingerprintArg::Pairs(mapping.iter().map(|(k, v)| (k.clone(), scalar_text(v))).collect())
    }

    fn list(items: &[String]) -> Self {
        FingerprintArg::Pairs(items.iter().enumerate().map(|(i, item)| (i.to_string(), item.clone())).collect())
    }

    fn pagination(pagination: Option<Pagination>) -> Self {
        let mut pairs = Vec::new();
        if let Some(Pagination { start, limit }) = pagination {
            pairs.push(("start".to_string(), start.to_string()));
            if let Some(limit) = limit {
                pairs.push(("limit".to_string(), limit.to_string()));
            }
        }
        FingerprintArg::Pairs(pairs)
    }
}

/// Positional arguments of an operation, in fingerprint order.
pub fn fingerprint_args(op: &Operation) -> Vec<FingerprintArg> {
    use FingerprintArg as A;

    let table = A::text(&op.table);
    match op.kind {
        OperationKind::Add => vec![table, A::mapping(&op.values), A::text("1")],
        OperationKind::Alter => vec![table, A::mapping(&op.values), A::mapping(&op.filter)],
        OperationKind::Disable => vec![table, A::mapping(&op.filter)],
        OperationKind::Get | OperationKind::List => vec![
            table,
            A::text(&op.columns),
            A::mapping(&op.filter),
            A::pagination(op.pagination),
            A::list(&op.joins),
            A::list(&op.order),
            A::list(&op.group),
        ],
        OperationKind::Count => vec![table, A::mapping(&op.filter), A::list(&op.joins)],
        OperationKind::Mock => vec![
            table,
            A::text(&op.columns),
            A::mapping(&op.filter),
            A::pagination(op.pagination),
            A::list(&op.order),
            A::list(&op.group),
        ],
    }
}

/// Fingerprint of an operation.
pub fn operation_fingerprint(op: &Operation) -> String {
    compute_fingerprint(op.kind, &op.table, &fingerprint_args(op))
}

/// Compute a fingerprint from an operation kind, its table and its arguments.
///
/// Returns 64 lowercase hex characters.
pub fn compute_fingerprint(kind: OperationKind, table: &str, args: &[FingerprintArg]) -> String {
    let mut material = String::new();
    for arg in args {
        match arg {
            FingerprintArg::Text(text) => material.push_str(text),
            FingerprintArg::Pairs(pairs) => {
                for (key, value) in pairs {
                    material.push('-');
                    material.push_str(key);
                    material.push('-');
                    material.push_str(value);
                }
            }
        }
    }

    let slugged = slugify(&material);
    let without_table = if table.is_empty() { slugged } else { slugged.replace(table, "") };
    let mut tail = slugify(&without_table);
    if !tail.is_empty() {
        tail.insert(0, '-');
    }
    let raw = if table.is_empty() { material } else { material.replacen(table, "", 1) };

    let mut mac = HmacSha256::new_from_slice(FINGERPRINT_SECRET).expect("HMAC accepts keys of any length");
    mac.update(kind.as_str().as_bytes());
    mac.update(tail.as_bytes());
    mac.update(b"\n");
    mac.update(raw.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Reduce text to a lowercase, hyphen-separated ASCII slug.
pub fn slugify(text: &str) -> String {
    let dashed = NON_ALNUM.replace_all(text, "-");
    let ascii: String = dashed.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let cleaned = NON_WORD.replace_all(&ascii, "");
    let collapsed = DASH_RUNS.replace_all(cleaned.trim_matches('-'), "-");
    collapsed.to_lowercase()
}
