// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Serialization of the public value types.
//!
//!   cargo test -p understory_outline --features serde --test serde

#![cfg(feature = "serde")]

use serde_json::json;
use understory_outline::{Destination, Edit, Item, Tristate};

#[test]
fn destination_json_shape() {
    let destinations = [
        Destination::ToRoot,
        Destination::RootIndex(2),
        Destination::OnItem(7_u32),
        Destination::UnderItem(7, 0),
    ];
    let value = serde_json::to_value(destinations).unwrap();
    assert_eq!(
        value,
        json!(["ToRoot", {"RootIndex": 2}, {"OnItem": 7}, {"UnderItem": [7, 0]}])
    );
    let back: Vec<Destination<u32>> = serde_json::from_value(value).unwrap();
    assert_eq!(back, destinations);
}

#[test]
fn edit_script_survives_serialization() {
    let edits = vec![
        Edit::Remove {
            parent: Some(1_u64),
            offset: 1,
            id: 3,
        },
        Edit::Insert {
            parent: None,
            offset: 0,
            id: 3,
        },
        Edit::Reload { id: 1 },
    ];
    let text = serde_json::to_string(&edits).unwrap();
    assert!(text.contains(r#"{"Remove":{"parent":1,"offset":1,"id":3}}"#), "{text}");
    assert!(text.contains(r#"{"Insert":{"parent":null,"offset":0,"id":3}}"#), "{text}");
    let back: Vec<Edit<u64>> = serde_json::from_str(&text).unwrap();
    assert_eq!(back, edits);
}

#[test]
fn items_nest_children() {
    let forest = vec![
        Item::with_children("a".to_owned(), vec![Item::new("b".to_owned())]),
        Item::new("c".to_owned()),
    ];
    let value = serde_json::to_value(&forest).unwrap();
    assert_eq!(
        value,
        json!([
            {"value": "a", "children": [{"value": "b", "children": []}]},
            {"value": "c", "children": []},
        ])
    );
    let back: Vec<Item<String>> = serde_json::from_value(value).unwrap();
    assert_eq!(back, forest);
}

#[test]
fn tristate_is_a_plain_string() {
    assert_eq!(serde_json::to_string(&Tristate::Mixed).unwrap(), r#""Mixed""#);
    let on: Tristate = serde_json::from_str(r#""On""#).unwrap();
    assert_eq!(on, Tristate::On);
}
