//! Flat fetches: filters, ordering, limit/offset.

mod common;

use std::sync::Arc;

use serde_json::{Value, json};

use openerp_pager::{Domain, FetchOptions, MockTransport, Operator, RecordId};

use common::{SEARCH_READ, backend, collection, ids, universe};

#[tokio::test]
async fn fetch_all_records() {
    let mock = backend(universe(100));
    let mut list = collection(mock.clone());

    list.fetch(FetchOptions::new()).await.unwrap();

    assert_eq!(list.len(), 100);
    assert!(!list.is_grouped());
    assert_eq!(list.get(42).unwrap().get_str("name"), Some("item 42"));
    assert_eq!(list.total(), Some(100));
    assert_eq!(mock.calls_to(SEARCH_READ).len(), 1);
}

#[tokio::test]
async fn filter_on_numeric_string_matches_one_record() {
    let mock = backend(universe(100));
    let mut list = collection(mock.clone());

    let filter = Domain::from_triples([("id", "=", json!("42"))]).unwrap();
    list.fetch(FetchOptions::new().filter(filter)).await.unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list.at(0).unwrap().get_str("name"), Some("item 42"));
    // The string goes out untouched; the backend does the typed comparison.
    assert_eq!(mock.calls()[0].params["domain"], json!([["id", "=", "42"]]));
}

#[tokio::test]
async fn filter_with_descending_order() {
    let mock = backend(universe(100));
    let mut list = collection(mock.clone());

    list.fetch(
        FetchOptions::new()
            .filter(Domain::new().with("id", Operator::Le, "42"))
            .order(["-id"]),
    )
    .await
    .unwrap();

    assert_eq!(list.len(), 42);
    assert_eq!(list.at(0).unwrap().get_str("name"), Some("item 42"));
    assert_eq!(ids(&list), (1..=42).rev().collect::<Vec<_>>());
    assert_eq!(mock.calls()[0].params["sort"], "id DESC");
}

#[tokio::test]
async fn limit_and_offset_page_through() {
    let mock = backend(universe(100));
    let mut list = collection(mock.clone());

    list.fetch(FetchOptions::new().limit(10).offset(42)).await.unwrap();

    // Offset counts skipped records: the page starts at the 43rd one.
    assert_eq!(ids(&list), (43..=52).collect::<Vec<_>>());
    assert_eq!(list.total(), Some(100));
    let params = &mock.calls()[0].params;
    assert_eq!(params["limit"], 10);
    assert_eq!(params["offset"], 42);
}

/// Backend double whose paging reads `offset` as the first id and walks ids
/// downwards whenever a sort is given, answering only the first filter
/// condition.
fn id_walking_backend() -> Arc<MockTransport> {
    Arc::new(MockTransport::new().route(SEARCH_READ, |params| {
        let mut offset = params["offset"].as_i64().filter(|&o| o > 0).unwrap_or(1);
        let mut limit = params["limit"].as_i64().filter(|&l| l > 0).unwrap_or(100);
        let reverse = params["sort"].as_str().is_some_and(|s| !s.is_empty());
        let condition = params["domain"].get(0).cloned();
        let bound = |v: &Value| -> i64 {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
                .unwrap_or(0)
        };

        if reverse {
            std::mem::swap(&mut offset, &mut limit);
        }
        let ids: Vec<i64> = if reverse {
            (limit..=offset).rev().collect()
        } else {
            (offset..offset + limit).collect()
        };

        let records: Vec<Value> = ids
            .into_iter()
            .filter(|&i| match &condition {
                None => true,
                Some(c) if c[1] == "=" => bound(&c[2]) == i,
                Some(c) if c[1] == "<=" => bound(&c[2]) >= i,
                Some(_) => false,
            })
            .map(|i| json!({"id": i, "name": format!("item {}", i)}))
            .collect();
        Ok(json!({"records": records}))
    }))
}

#[tokio::test]
async fn concurrent_fetches_against_id_walking_backend() {
    let mock = id_walking_backend();
    let mut by_id = collection(mock.clone());
    let mut up_to = collection(mock.clone());
    let mut page = collection(mock.clone());

    let (r1, r2, r3) = futures::join!(
        by_id.fetch(FetchOptions::new().filter(Domain::from_triples([("id", "=", json!("42"))]).unwrap())),
        up_to.fetch(
            FetchOptions::new()
                .filter(Domain::from_triples([("id", "<=", json!("42"))]).unwrap())
                .order(["-id"]),
        ),
        page.fetch(FetchOptions::new().limit(10).offset(42)),
    );
    r1.unwrap();
    r2.unwrap();
    r3.unwrap();

    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id.at(0).unwrap().get_str("name"), Some("item 42"));

    assert_eq!(up_to.len(), 42);
    assert_eq!(up_to.at(0).unwrap().get_str("name"), Some("item 42"));

    assert_eq!(page.len(), 10);
    assert_eq!(page.at(0).unwrap().get_str("name"), Some("item 42"));

    // No `length` in these replies: the total is the page size.
    assert_eq!(page.total(), Some(10));
    assert_eq!(mock.calls().len(), 3);
}

#[tokio::test]
async fn limit_offset_order_permutations_round_trip() {
    let records = universe(100);
    let mock = backend(records);
    let mut list = collection(mock);

    let limits = [None, Some(1), Some(7), Some(100), Some(150)];
    let offsets = [None, Some(0), Some(5), Some(99), Some(120)];
    let orders: [&[&str]; 3] = [&[], &["id"], &["-id"]];

    for limit in limits {
        for offset in offsets {
            for order in orders {
                let mut opts = FetchOptions::new().order(order.iter().copied());
                opts.limit = limit;
                opts.offset = offset;
                list.fetch(opts).await.unwrap();

                let mut expected: Vec<i64> = (1..=100).collect();
                if order == ["-id"] {
                    expected.reverse();
                }
                let expected: Vec<i64> = expected
                    .into_iter()
                    .skip(offset.unwrap_or(0))
                    .take(limit.unwrap_or(usize::MAX))
                    .collect();
                assert_eq!(
                    ids(&list),
                    expected,
                    "limit={:?} offset={:?} order={:?}",
                    limit,
                    offset,
                    order
                );
                assert_eq!(list.total(), Some(100));
            }
        }
    }
}

#[tokio::test]
async fn records_keep_string_ids() {
    let mock = Arc::new(MockTransport::new().route(SEARCH_READ, |_| {
        Ok(json!({"records": [{"id": "a1", "name": "first"}, {"id": "b2", "name": "second"}]}))
    }));
    let mut list = collection(mock);
    list.fetch(FetchOptions::new()).await.unwrap();

    assert_eq!(list.get("b2").unwrap().get_str("name"), Some("second"));
    assert_eq!(list.at(0).unwrap().id(), Some(RecordId::Str("a1".into())));
    assert!(list.get(1).is_none());
}

#[tokio::test]
async fn fields_and_context_are_forwarded() {
    let mock = backend(universe(3));
    let mut list = collection(mock.clone());
    let mut context = serde_json::Map::new();
    context.insert("lang".into(), json!("fr_FR"));

    list.fetch(FetchOptions::new().fields(["id", "name"]).context(context))
        .await
        .unwrap();

    let params = &mock.calls()[0].params;
    assert_eq!(params["fields"], json!(["id", "name"]));
    assert_eq!(params["context"], json!({"lang": "fr_FR"}));
    assert_eq!(params["model"], "unit.test");
}
