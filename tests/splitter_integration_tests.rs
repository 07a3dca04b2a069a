//! Integration tests for splitting resources into item and resource documents.

mod common;

use bibsift::splitter::fields;
use bibsift::{
    split_batch, BatchReport, DocumentType, GraphEncoder, ItemSplitter, JsonGraphEncoder,
    ParsedRecordMap, SiftError, SplitDocument, SplitterConfig,
};
use common::resource_with_items;
use serde_json::Value;

fn split(record: ParsedRecordMap) -> Vec<SplitDocument> {
    let mut splitter = ItemSplitter::new(SplitterConfig::default(), Vec::new()).unwrap();
    splitter.split(record).unwrap();
    splitter.into_receiver()
}

#[test]
fn test_cardinality_and_parent_links() {
    for k in [0, 1, 5] {
        let docs = split(resource_with_items("HT012734817", k));
        assert_eq!(docs.len(), k + 1);

        let resource = docs.last().unwrap();
        assert_eq!(resource.doc_type, DocumentType::Resource);
        assert_eq!(resource.id, "HT012734817");

        for item in &docs[..k] {
            assert_eq!(item.doc_type, DocumentType::Item);
            assert_eq!(item.parent_id.as_deref(), Some(resource.id.as_str()));
        }
    }
}

#[test]
fn test_resource_graph_reparsed_has_no_items() {
    let docs = split(resource_with_items("HT012734817", 3));
    let resource: Value = serde_json::from_str(&docs[3].graph).unwrap();
    assert!(resource.get("hasItem").is_none());
    assert_eq!(resource["hbzId"], "HT012734817");
    assert_eq!(resource["title"], "Geschichte der Stadt Köln");
}

#[test]
fn test_item_graphs_never_embed_parent() {
    let docs = split(resource_with_items("HT012734817", 2));
    for item in &docs[..2] {
        let graph: Value = serde_json::from_str(&item.graph).unwrap();
        assert!(graph.get("itemOf").is_none());
        assert!(graph.get("describedBy").is_none());
        assert!(!item.graph.contains("resources/HT012734817"));
        assert_eq!(graph["heldBy"]["id"], "http://lobid.org/organisations/DE-465#!");
    }
}

#[test]
fn test_item_ids_normalised() {
    let docs = split(resource_with_items("HT012734817", 2));
    assert_eq!(docs[0].id, "HT012734817:DE-465:0");
    assert_eq!(docs[1].id, "HT012734817:DE-465:1");
}

#[test]
fn test_index_writer_field_names() {
    let docs = split(resource_with_items("HT1", 1));

    let item = serde_json::to_value(&docs[0]).unwrap();
    for key in [fields::GRAPH, fields::TYPE, fields::ID, fields::PARENT] {
        assert!(item.get(key).is_some(), "item lacks {key}");
    }
    assert_eq!(item[fields::TYPE], "item");

    let resource = docs[1].to_index_fields();
    assert_eq!(resource.len(), 3);
    assert!(!resource.contains_key(fields::PARENT));

    let back: SplitDocument = serde_json::from_value(item).unwrap();
    assert_eq!(back, docs[0]);
}

#[test]
fn test_custom_field_names() {
    let config = SplitterConfig::new()
        .with_id_field("almaMmsId")
        .with_items_field("holdings")
        .with_item_id_field("@id")
        .with_back_reference_keys(["parent"])
        .with_domain_prefix("https://example.org/")
        .with_trailing_marker("#it$")
        .without_item_context();
    let record = serde_json::json!({
        "almaMmsId": "990001",
        "holdings": [ { "@id": "https://example.org/holdings/H1#it", "parent": "990001" } ]
    })
    .as_object()
    .cloned()
    .unwrap();

    let mut splitter = ItemSplitter::new(config, Vec::new()).unwrap();
    splitter.split(record).unwrap();
    let docs = splitter.into_receiver();

    assert_eq!(docs[0].id, "H1");
    assert_eq!(docs[0].parent_id.as_deref(), Some("990001"));
    let item: Value = serde_json::from_str(&docs[0].graph).unwrap();
    assert!(item.get("parent").is_none());
    assert!(item.get("@context").is_none());
    let resource: Value = serde_json::from_str(&docs[1].graph).unwrap();
    assert!(resource.get("holdings").is_none());
}

/// Encoder refusing any graph that carries a given key.
struct RejectKey(&'static str);

impl GraphEncoder for RejectKey {
    fn encode(&self, graph: &ParsedRecordMap) -> bibsift::Result<String> {
        if graph.contains_key(self.0) {
            return Err(SiftError::Serialization(
                <serde_json::Error as serde::ser::Error>::custom("refusing graph"),
            ));
        }
        JsonGraphEncoder::new().encode(graph)
    }
}

#[test]
fn test_batch_reports_failed_documents() {
    // Resources carry hbzId, items do not: every resource fails, items survive.
    let mut splitter =
        ItemSplitter::with_encoder(SplitterConfig::default(), RejectKey("hbzId"), Vec::new())
            .unwrap();
    let records = vec![resource_with_items("HT1", 2), resource_with_items("HT2", 1)];
    let stats = split_batch(records, &mut splitter).unwrap();

    let report = BatchReport::from_split(stats);
    assert!(report.has_failures());
    assert_eq!(stats.records, 2);
    assert_eq!(stats.items, 3);
    assert_eq!(stats.resources, 0);
    assert_eq!(stats.failed, 2);
    assert!(splitter
        .receiver()
        .iter()
        .all(|d| d.doc_type == DocumentType::Item));
}

#[test]
fn test_missing_identifier_aborts_batch() {
    let mut bad = resource_with_items("HT1", 1);
    bad.shift_remove("hbzId");
    let records = vec![resource_with_items("HT0", 1), bad, resource_with_items("HT2", 1)];

    let mut splitter = ItemSplitter::new(SplitterConfig::default(), Vec::new()).unwrap();
    let err = split_batch(records, &mut splitter).unwrap_err();
    assert!(err.is_structural());
    assert_eq!(splitter.receiver().len(), 2);
}
