//! Shared fixtures: an in-memory `unit.test` model served over the mock
//! transport with real `search_read` semantics (filter, sort, offset, limit).

#![allow(dead_code)]

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::{Value, json};

use openerp_pager::{Collection, MockTransport, ModelConfig, ModelQuery, PagerError, SyncAdapter};

pub const SEARCH_READ: &str = "/web/dataset/search_read";
pub const READ_GROUP: &str = "/web/dataset/call_kw/unit.test/read_group";

/// `{id: i, name: "item i"}` for `i` in `1..=n`.
pub fn universe(n: i64) -> Vec<Value> {
    (1..=n).map(|i| json!({"id": i, "name": format!("item {}", i)})).collect()
}

pub fn collection(mock: Arc<MockTransport>) -> Collection {
    let model = ModelConfig::new("unit.test").unwrap();
    Collection::new(ModelQuery::new(model, SyncAdapter::new(mock)))
}

/// Numbers and numeric strings compare as numbers, like a typed column.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    fn number(v: &Value) -> Option<f64> {
        v.as_f64().or_else(|| v.as_str()?.parse().ok())
    }
    match (number(a), number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => match (a.as_str(), b.as_str()) {
            (Some(x), Some(y)) => Some(x.cmp(y)),
            _ => (a == b).then_some(Ordering::Equal),
        },
    }
}

fn matches(record: &Value, condition: &Value) -> Result<bool, PagerError> {
    let field = condition[0]
        .as_str()
        .ok_or_else(|| PagerError::Transport(format!("bad condition {}", condition)))?;
    let actual = &record[field];
    let expected = &condition[2];
    let ord = compare(actual, expected);
    let hit = match condition[1].as_str() {
        Some("=") => ord == Some(Ordering::Equal),
        Some("!=") => ord != Some(Ordering::Equal),
        Some("<") => ord == Some(Ordering::Less),
        Some("<=") => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        Some(">") => ord == Some(Ordering::Greater),
        Some(">=") => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        Some("in") => expected
            .as_array()
            .is_some_and(|values| values.iter().any(|v| compare(actual, v) == Some(Ordering::Equal))),
        other => return Err(PagerError::Transport(format!("unsupported operator {:?}", other))),
    };
    Ok(hit)
}

/// Evaluate one `search_read` call against `records`.
pub fn search_read(records: &[Value], params: &Value) -> Result<Value, PagerError> {
    let mut hits = Vec::new();
    for record in records {
        let mut keep = true;
        for condition in params["domain"].as_array().into_iter().flatten() {
            if !matches(record, condition)? {
                keep = false;
                break;
            }
        }
        if keep {
            hits.push(record.clone());
        }
    }

    let sort = params["sort"].as_str().unwrap_or("");
    let keys: Vec<(String, bool)> = sort
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|clause| {
            let mut parts = clause.split_whitespace();
            let field = parts.next().unwrap_or_default().to_string();
            let desc = parts.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
            (field, desc)
        })
        .collect();
    hits.sort_by(|a, b| {
        for (field, desc) in &keys {
            let ord = compare(&a[field], &b[field]).unwrap_or(Ordering::Equal);
            let ord = if *desc { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    let length = hits.len();
    let offset = params["offset"].as_u64().unwrap_or(0) as usize;
    let limit = params["limit"]
        .as_u64()
        .filter(|&l| l > 0)
        .map(|l| l as usize)
        .unwrap_or(usize::MAX);
    let page: Vec<Value> = hits.into_iter().skip(offset).take(limit).collect();
    Ok(json!({"length": length, "records": page}))
}

/// A mock answering `search_read` from `records`.
pub fn backend(records: Vec<Value>) -> Arc<MockTransport> {
    Arc::new(MockTransport::new().route(SEARCH_READ, move |params| search_read(&records, params)))
}

pub fn ids(collection: &Collection) -> Vec<i64> {
    collection
        .records()
        .iter()
        .map(|r| r.get_i64("id").unwrap())
        .collect()
}
