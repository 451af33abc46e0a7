//! RPC reply -> collection items.

use serde_json::{Map, Value};

use crate::domain::Domain;
use crate::error::PagerError;
use crate::group::{GroupModel, GroupQuery, GroupRow, GroupScope};
use crate::options::FetchOptions;
use crate::record::Record;

/// Contents of a collection: records or group rows, never both.
pub enum Items {
    Flat(Vec<Record>),
    Grouped(Vec<Box<dyn GroupModel>>),
}

impl Default for Items {
    fn default() -> Self {
        Items::Flat(Vec::new())
    }
}

impl Items {
    pub fn len(&self) -> usize {
        match self {
            Items::Flat(records) => records.len(),
            Items::Grouped(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A mapped reply.
pub struct Mapped {
    pub items: Items,
    /// Backend total for flat fetches (`length`), group count for grouped ones.
    pub total: Option<u64>,
}

/// Turns `search_read` / `read_group` replies into [`Items`].
///
/// A reply that does not have the promised shape is a
/// [`PagerError::Mapping`], never an empty or partial list.
pub struct ResultMapper;

impl ResultMapper {
    pub(crate) fn map(
        response: Value,
        options: &FetchOptions,
        scope: GroupScope,
    ) -> Result<Mapped, PagerError> {
        if options.is_grouped() {
            Self::map_groups(response, options, scope)
        } else {
            Self::map_records(response)
        }
    }

    /// `{"length": n, "records": [...]}` -> records in backend order.
    pub fn map_records(response: Value) -> Result<Mapped, PagerError> {
        let mut body = match response {
            Value::Object(body) => body,
            other => {
                return Err(PagerError::Mapping(format!(
                    "search_read: expected an object, got {}",
                    kind(&other)
                )));
            }
        };
        let records = match body.remove("records") {
            Some(Value::Array(records)) => records,
            Some(other) => {
                return Err(PagerError::Mapping(format!(
                    "search_read: 'records' is {}",
                    kind(&other)
                )));
            }
            None => return Err(PagerError::Mapping("search_read: missing 'records'".into())),
        };

        let records = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| match record {
                Value::Object(fields) => Ok(Record::new(fields)),
                other => Err(PagerError::Mapping(format!(
                    "search_read: record #{} is {}",
                    i,
                    kind(&other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total = body
            .get("length")
            .and_then(Value::as_u64)
            .or(Some(records.len() as u64));
        Ok(Mapped {
            items: Items::Flat(records),
            total,
        })
    }

    /// `[{<field>, count, __domain}, ...]` -> one group item per row.
    pub(crate) fn map_groups(
        response: Value,
        options: &FetchOptions,
        scope: GroupScope,
    ) -> Result<Mapped, PagerError> {
        let rows = match response {
            Value::Array(rows) => rows,
            other => {
                return Err(PagerError::Mapping(format!(
                    "read_group: expected a list, got {}",
                    kind(&other)
                )));
            }
        };
        let field = options
            .group_by
            .first()
            .ok_or_else(|| PagerError::Mapping("read_group: no group-by field".into()))?;

        let mut groups: Vec<Box<dyn GroupModel>> = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            let fields = match row {
                Value::Object(fields) => fields,
                other => {
                    return Err(PagerError::Mapping(format!(
                        "read_group: row #{} is {}",
                        i,
                        kind(&other)
                    )));
                }
            };
            let row = group_row(i, field, fields, scope.clone())?;
            let item: Box<dyn GroupModel> = match &options.group_model {
                Some(factory) => factory(row),
                None => Box::new(GroupQuery::from_row(row)),
            };
            groups.push(item);
        }

        let total = Some(groups.len() as u64);
        Ok(Mapped {
            items: Items::Grouped(groups),
            total,
        })
    }
}

fn group_row(
    index: usize,
    field: &str,
    fields: Map<String, Value>,
    scope: GroupScope,
) -> Result<GroupRow, PagerError> {
    // "date:month" groups come back under the bare field name.
    let base = field.split(':').next().unwrap_or(field);
    let value = fields
        .get(field)
        .or_else(|| fields.get(base))
        .cloned()
        .ok_or_else(|| PagerError::Mapping(format!("read_group: row #{} lacks '{}'", index, field)))?;

    // Odoo names the count `<field>_count` (lazy) or `__count`; plain
    // `count` is accepted as well.
    let count = ["count".to_string(), format!("{}_count", base), "__count".to_string()]
        .iter()
        .find_map(|key| fields.get(key).and_then(Value::as_u64))
        .ok_or_else(|| PagerError::Mapping(format!("read_group: row #{} has no count", index)))?;

    let domain: Domain = match fields.get("__domain") {
        Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
            PagerError::Mapping(format!("read_group: row #{} has an invalid __domain: {}", index, e))
        })?,
        None => {
            return Err(PagerError::Mapping(format!(
                "read_group: row #{} lacks __domain",
                index
            )));
        }
    };

    Ok(GroupRow::new(value, count, domain, fields, scope))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::collection::ModelQuery;
    use crate::config::ModelConfig;
    use crate::mock::MockTransport;
    use crate::record::RecordId;
    use crate::sync::SyncAdapter;

    fn scope() -> GroupScope {
        let adapter = SyncAdapter::new(Arc::new(MockTransport::new()));
        GroupScope {
            query: ModelQuery::new(ModelConfig::new("unit.test").unwrap(), adapter),
            parent: FetchOptions::new(),
        }
    }

    fn records(mapped: &Mapped) -> &[Record] {
        match &mapped.items {
            Items::Flat(records) => records,
            Items::Grouped(_) => panic!("expected flat items"),
        }
    }

    #[test]
    fn records_keep_backend_order() {
        let mapped = ResultMapper::map_records(json!({
            "length": 250,
            "records": [{"id": 3}, {"id": 1}, {"id": 2}],
        }))
        .unwrap();
        let ids: Vec<_> = records(&mapped).iter().map(|r| r.id().unwrap()).collect();
        assert_eq!(ids, [RecordId::Int(3), RecordId::Int(1), RecordId::Int(2)]);
        assert_eq!(mapped.total, Some(250));
    }

    #[test]
    fn total_defaults_to_record_count() {
        let mapped = ResultMapper::map_records(json!({"records": [{"id": 1}]})).unwrap();
        assert_eq!(mapped.total, Some(1));
    }

    #[test]
    fn missing_records_is_a_mapping_error() {
        let err = ResultMapper::map_records(json!({"length": 3})).err().unwrap();
        assert!(matches!(err, PagerError::Mapping(_)));
        let err = ResultMapper::map_records(json!([])).err().unwrap();
        assert!(matches!(err, PagerError::Mapping(_)));
        let err = ResultMapper::map_records(json!({"records": [1, 2]})).err().unwrap();
        assert_eq!(err.to_string(), "mapping: search_read: record #0 is a number");
    }

    #[test]
    fn group_rows_from_count_variants() {
        let opts = FetchOptions::new().group_by(["category"]);
        let mapped = ResultMapper::map_groups(
            json!([
                {"category": "cat1", "count": 5, "__domain": [["category", "=", "cat1"]]},
                {"category": "cat2", "category_count": 10, "__domain": [["category", "=", "cat2"]]},
                {"category": false, "__count": 2, "__domain": [["category", "=", false]]},
            ]),
            &opts,
            scope(),
        )
        .unwrap();
        let Items::Grouped(groups) = &mapped.items else { panic!("expected groups") };
        let summary: Vec<_> = groups.iter().map(|g| (g.value().clone(), g.count())).collect();
        assert_eq!(
            summary,
            [(json!("cat1"), 5), (json!("cat2"), 10), (json!(false), 2)]
        );
        assert!(groups.iter().all(|g| g.is::<GroupQuery>()));
        assert_eq!(mapped.total, Some(3));
    }

    #[test]
    fn date_granularity_reads_bare_field() {
        let opts = FetchOptions::new().group_by(["date:month"]);
        let mapped = ResultMapper::map_groups(
            json!([{"date": "March 2024", "date_count": 4, "__domain": [["date", ">=", "2024-03-01"]]}]),
            &opts,
            scope(),
        )
        .unwrap();
        let Items::Grouped(groups) = &mapped.items else { panic!("expected groups") };
        assert_eq!(groups[0].value(), &json!("March 2024"));
        assert_eq!(groups[0].count(), 4);
    }

    #[test]
    fn zero_groups_is_empty() {
        let opts = FetchOptions::new().group_by(["category"]);
        let mapped = ResultMapper::map_groups(json!([]), &opts, scope()).unwrap();
        assert!(mapped.items.is_empty());
        assert!(matches!(mapped.items, Items::Grouped(_)));
    }

    #[test]
    fn malformed_group_rows_are_rejected() {
        let opts = FetchOptions::new().group_by(["category"]);
        for bad in [
            json!({"records": []}),
            json!([{"category": "cat1", "count": 5}]),
            json!([{"category": "cat1", "__domain": []}]),
            json!([{"count": 5, "__domain": []}]),
            json!([{"category": "cat1", "count": 5, "__domain": "bad"}]),
        ] {
            let err = ResultMapper::map_groups(bad, &opts, scope()).err().unwrap();
            assert!(matches!(err, PagerError::Mapping(_)));
        }
    }
}
