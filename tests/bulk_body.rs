use mongo_river::{Action, BulkBody, EsOperation, OpTime, RiverError};
use serde_json::{json, Map, Value};

const MB: usize = 1024 * 1024;

fn entry(action: Action, doc: Value) -> EsOperation {
    EsOperation {
        action,
        index: "testing".to_string(),
        doc_type: "user".to_string(),
        id: "123".to_string(),
        document: match doc {
            Value::Object(m) => m,
            _ => Map::new(),
        },
        ts: OpTime::ZERO,
    }
}

#[test]
fn test_add_index() {
    let mut bulk = BulkBody::new(MB);
    bulk.add(&entry(Action::Index, json!({"alias": "Johnny"})))
        .unwrap();

    let valid = b"{\"index\":{\"_index\":\"testing\",\"_type\":\"user\",\"_id\":\"123\"}}\n{\"alias\":\"Johnny\"}\n";
    assert_eq!(bulk.bytes(), valid);
}

#[test]
fn test_add_update() {
    let mut bulk = BulkBody::new(MB);
    bulk.add(&entry(Action::Update, json!({"alias": "New Johnny"})))
        .unwrap();

    let valid = b"{\"update\":{\"_index\":\"testing\",\"_type\":\"user\",\"_id\":\"123\"}}\n{\"doc\":{\"alias\":\"New Johnny\"},\"doc_as_upsert\":true}\n";
    assert_eq!(bulk.bytes(), valid);
}

#[test]
fn test_add_delete_has_no_document_line() {
    let mut bulk = BulkBody::new(MB);
    bulk.add(&entry(Action::Delete, json!({"ignored": true})))
        .unwrap();

    let valid = b"{\"delete\":{\"_index\":\"testing\",\"_type\":\"user\",\"_id\":\"123\"}}\n";
    assert_eq!(bulk.bytes(), valid);
}

#[test]
fn test_update_with_empty_document_is_rejected() {
    let mut bulk = BulkBody::new(MB);
    let err = bulk.add(&entry(Action::Update, json!({}))).unwrap_err();
    assert!(matches!(err, RiverError::EmptyUpdate));
    // the body stays untouched so the batch is still valid.
    assert_eq!(bulk.len(), 0);
}

#[test]
fn test_body_full_on_max_bytes() {
    let mut bulk = BulkBody::new(10);
    let stuff = entry(Action::Index, json!({"alias": "Johnny"}));

    // First add is admitted whole, the bound is only checked on entry.
    bulk.add(&stuff).unwrap();
    assert!(bulk.len() > 10);
    let len_after_first = bulk.len();

    // Second add finds the body at/over the bound: finalized, not written.
    assert!(matches!(bulk.add(&stuff), Err(RiverError::BufferFull)));
    assert_eq!(bulk.len(), len_after_first + 1);

    // Finalized bodies keep rejecting without growing.
    assert!(matches!(bulk.add(&stuff), Err(RiverError::BufferFull)));
    assert_eq!(bulk.len(), len_after_first + 1);

    let tail = &bulk.bytes()[bulk.len() - 2..];
    assert_eq!(tail, b"\n\n");
}

#[test]
fn test_body_always_starts_with_header_and_ends_with_newline() {
    let mut bulk = BulkBody::new(MB);
    bulk.add(&entry(Action::Index, json!({"a": 1}))).unwrap();
    bulk.add(&entry(Action::Delete, json!({}))).unwrap();
    bulk.done();

    assert!(bulk.bytes().starts_with(b"{\"index\":"));
    assert!(bulk.bytes().ends_with(b"\n\n"));
}

#[test]
fn test_done_appends_exactly_once() {
    let mut bulk = BulkBody::new(MB);
    bulk.add(&entry(Action::Index, json!({"foo": "bar"})))
        .unwrap();
    let before = bulk.len();
    bulk.done();
    assert_eq!(bulk.len(), before + 1);
    bulk.done();
    assert_eq!(bulk.len(), before + 1);

    // Once done, nothing more is admitted.
    let stuff = entry(Action::Index, json!({"foo": "bar"}));
    assert!(matches!(bulk.add(&stuff), Err(RiverError::BufferFull)));
}

#[test]
fn test_reset_clears_done_flag() {
    let mut bulk = BulkBody::new(MB);
    let stuff = entry(Action::Index, json!({"foo": "bar"}));
    bulk.add(&stuff).unwrap();
    bulk.done();

    bulk.reset();
    assert_eq!(bulk.len(), 0);
    // adding works again, and done appends again afterwards.
    bulk.add(&stuff).unwrap();
    let before = bulk.len();
    bulk.done();
    assert_eq!(bulk.len(), before + 1);
}
