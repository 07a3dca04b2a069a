//! Common test helpers shared across the integration test suite.

#![allow(dead_code)]

use bibsift::{ParsedRecordMap, StreamEvent};
use serde_json::{json, Value};

/// Keywords of the reference filtering scenario.
pub const SCENARIO_KEYWORDS: [&str; 2] = ["HT012734817", "HT012734833"];

/// Path of the MARC-XML fixture.
pub const ALMA_SAMPLE: &str = "tests/data/alma_sample.xml";

/// Builds a record with one 035 entity holding `value` plus a title literal.
pub fn record_with_035(id: &str, value: &str) -> Vec<StreamEvent> {
    vec![
        StreamEvent::record_start(id),
        StreamEvent::literal("001", format!("99{id}")),
        StreamEvent::entity_start("035  "),
        StreamEvent::literal("a", value),
        StreamEvent::EntityEnd,
        StreamEvent::entity_start("24510"),
        StreamEvent::literal("a", "Title"),
        StreamEvent::EntityEnd,
        StreamEvent::RecordEnd,
    ]
}

/// The three records of the reference scenario: A matches exactly, B only
/// contains a keyword as a substring, C is unrelated.
pub fn scenario_batch() -> (Vec<StreamEvent>, Vec<StreamEvent>, Vec<StreamEvent>) {
    (
        record_with_035("A", "HT012734817"),
        record_with_035("B", "XHT012734817Y"),
        record_with_035("C", "(OCoLC)123456"),
    )
}

/// Builds a parsed resource with `items` holdings.
pub fn resource_with_items(id: &str, items: usize) -> ParsedRecordMap {
    let items: Vec<Value> = (0..items)
        .map(|i| {
            json!({
                "id": format!("http://lobid.org/items/{id}:DE-465:{i}#!"),
                "type": ["Item", "PhysicalObject"],
                "itemOf": { "id": format!("http://lobid.org/resources/{id}#!") },
                "describedBy": { "id": format!("http://lobid.org/resources/{id}") },
                "heldBy": { "id": "http://lobid.org/organisations/DE-465#!" }
            })
        })
        .collect();
    json!({
        "@context": "http://lobid.org/resources/context.jsonld",
        "id": format!("http://lobid.org/resources/{id}#!"),
        "hbzId": id,
        "title": "Geschichte der Stadt Köln",
        "hasItem": items
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}
