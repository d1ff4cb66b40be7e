//! Integration tests that need a running mongodb, run them with
//! `cargo test -- --ignored` against a disposable server.

use bson::oid::ObjectId;
use bson::{doc, Document, Timestamp};
use mongo_river::{Action, EsMapper, OplogEntry};
use mongodb::sync::Client;
use std::collections::HashMap;

struct Context {
    pub client: Client,
}

impl Context {
    pub fn new() -> Self {
        let client = Client::with_uri_str(
            option_env!("RIVER_TEST_SOURCE").unwrap_or("mongodb://localhost:27017"),
        )
        .unwrap();
        Context { client }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.client.database("river_test").drop(None).unwrap();
    }
}

#[test]
#[ignore]
fn test_unset_update_refetches_full_document() {
    let context = Context::new();
    let coll = context
        .client
        .database("river_test")
        .collection::<Document>("conversations");
    let id = ObjectId::parse_str("50eadae392cd864e50cd0dbc").unwrap();
    coll.insert_one(
        doc! {"_id": id, "alias": "Johnny", "foo": "bar", "fooboo": "barbar"},
        None,
    )
    .unwrap();

    let entry = OplogEntry::from_doc(doc! {
        "ts": Timestamp { time: 1390926193, increment: 5220 },
        "op": "u",
        "ns": "river_test.conversations",
        "o": {
            "$set": { "alias": "Hello" },
            "$unset": { "foo": 1 },
        },
        "o2": { "_id": id },
    })
    .unwrap();

    let mut index_map = HashMap::new();
    index_map.insert("river_test".to_string(), "testing".to_string());
    let mapper = EsMapper::new(index_map, Vec::new(), Some(context.client.clone()));

    let op = mapper.map(&entry).unwrap();
    // an $unset upgrades the update to a re-index of the stored document.
    assert_eq!(op.action, Action::Index);
    assert_eq!(op.document.len(), 4);
    assert_eq!(
        op.document.get("alias").and_then(|v| v.as_str()),
        Some("Johnny")
    );
}
