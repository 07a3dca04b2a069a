//! Splitting of parsed resources into indexable documents.
//!
//! A parsed bibliographic resource may embed its holdings as a list of child
//! "item" maps. [`ItemSplitter`] turns one such resource into one document per
//! item plus one document for the resource itself, so that an index writer can
//! store items as children of their resource:
//!
//! 1. the resource identifier is read from the configured id field;
//! 2. every item has its back-reference keys stripped, its identifier
//!    normalised, and is emitted as an `item` document whose parent is the
//!    resource;
//! 3. the item list is removed from the resource, which is emitted last as a
//!    `resource` document.
//!
//! A resource with `k` items always yields `k + 1` documents, items first.
//! If one document fails to encode, the failure is logged and counted and the
//! remaining documents are still emitted.
//!
//! # Examples
//!
//! ```
//! use bibsift::splitter::{DocumentType, ItemSplitter, SplitterConfig};
//! use serde_json::json;
//!
//! # fn main() -> bibsift::Result<()> {
//! let record = json!({
//!     "hbzId": "HT012734817",
//!     "hasItem": [
//!         { "id": "http://lobid.org/items/HT012734817:DE-5:1234#!", "itemOf": "HT012734817" }
//!     ]
//! });
//!
//! let mut splitter = ItemSplitter::new(SplitterConfig::default(), Vec::new())?;
//! splitter.split(record.as_object().cloned().unwrap_or_default())?;
//!
//! let docs = splitter.into_receiver();
//! assert_eq!(docs.len(), 2);
//! assert_eq!(docs[0].doc_type, DocumentType::Item);
//! assert_eq!(docs[0].id, "HT012734817:DE-5:1234");
//! assert_eq!(docs[0].parent_id.as_deref(), Some("HT012734817"));
//! assert_eq!(docs[1].doc_type, DocumentType::Resource);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SiftError};
use crate::event::ObjectReceiver;

/// A parsed resource: string keys to JSON values, in insertion order.
pub type ParsedRecordMap = serde_json::Map<String, Value>;

/// Field names the downstream index writer expects on every document.
pub mod fields {
    /// Serialized graph payload
    pub const GRAPH: &str = "graph";
    /// Document type (`item` or `resource`)
    pub const TYPE: &str = "_type";
    /// Document identifier
    pub const ID: &str = "_id";
    /// Parent resource identifier (items only)
    pub const PARENT: &str = "_parent";
}

/// Kind of a split document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// A child holding of a resource
    Item,
    /// The bibliographic resource itself
    Resource,
}

impl DocumentType {
    /// The wire name of this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Resource => "resource",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One independently indexable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitDocument {
    /// Document identifier
    #[serde(rename = "_id")]
    pub id: String,
    /// Item or resource
    #[serde(rename = "_type")]
    pub doc_type: DocumentType,
    /// Identifier of the parent resource; `None` for resources
    #[serde(rename = "_parent", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Encoded graph of the document
    pub graph: String,
}

impl SplitDocument {
    /// Creates an item document linked to `parent_id`.
    pub fn item(id: impl Into<String>, parent_id: impl Into<String>, graph: String) -> Self {
        Self {
            id: id.into(),
            doc_type: DocumentType::Item,
            parent_id: Some(parent_id.into()),
            graph,
        }
    }

    /// Creates a resource document.
    pub fn resource(id: impl Into<String>, graph: String) -> Self {
        Self {
            id: id.into(),
            doc_type: DocumentType::Resource,
            parent_id: None,
            graph,
        }
    }

    /// The document as the flat string map an index writer consumes, keyed
    /// by the names in [`fields`].
    #[must_use]
    pub fn to_index_fields(&self) -> IndexMap<&'static str, String> {
        let mut map = IndexMap::with_capacity(4);
        map.insert(fields::GRAPH, self.graph.clone());
        map.insert(fields::TYPE, self.doc_type.as_str().to_string());
        map.insert(fields::ID, self.id.clone());
        if let Some(parent) = &self.parent_id {
            map.insert(fields::PARENT, parent.clone());
        }
        map
    }
}

/// Turns a resource or item map into its serialized graph form.
pub trait GraphEncoder {
    /// Encodes one graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be represented.
    fn encode(&self, graph: &ParsedRecordMap) -> Result<String>;
}

/// JSON encoder for graphs, compact by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonGraphEncoder {
    pretty: bool,
}

impl JsonGraphEncoder {
    /// Compact JSON output.
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented JSON output.
    #[must_use]
    pub const fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl GraphEncoder for JsonGraphEncoder {
    fn encode(&self, graph: &ParsedRecordMap) -> Result<String> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(graph)?
        } else {
            serde_json::to_string(graph)?
        };
        Ok(encoded)
    }
}

/// Configuration for [`ItemSplitter`].
///
/// # Examples
///
/// ```
/// use bibsift::splitter::SplitterConfig;
///
/// let config = SplitterConfig::new()
///     .with_id_field("almaMmsId")
///     .with_domain_prefix("https://example.org/")
///     .without_item_context();
/// assert_eq!(config.items_field, "hasItem");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Field holding the resource identifier.
    pub id_field: String,
    /// Field holding the list of item maps.
    pub items_field: String,
    /// Field holding each item's raw identifier.
    pub item_id_field: String,
    /// Keys removed from every item before encoding. These point back at the
    /// parent resource or duplicate its provenance.
    pub back_reference_keys: Vec<String>,
    /// Base path stripped (up to the last `/` after it) from raw item ids.
    /// Empty disables the strip.
    pub domain_prefix: String,
    /// Regular expression for a trailing marker removed from raw item ids.
    /// Empty disables the strip.
    pub trailing_marker: String,
    /// JSON-LD context set as `@context` on every item graph.
    pub item_context: Option<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            id_field: "hbzId".to_string(),
            items_field: "hasItem".to_string(),
            item_id_field: "id".to_string(),
            back_reference_keys: vec!["itemOf".to_string(), "describedBy".to_string()],
            domain_prefix: "http://lobid.org/".to_string(),
            trailing_marker: "#!$".to_string(),
            item_context: Some("http://lobid.org/resources/context.jsonld".to_string()),
        }
    }
}

impl SplitterConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource identifier field.
    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Sets the item list field.
    #[must_use]
    pub fn with_items_field(mut self, field: impl Into<String>) -> Self {
        self.items_field = field.into();
        self
    }

    /// Sets the item identifier field.
    #[must_use]
    pub fn with_item_id_field(mut self, field: impl Into<String>) -> Self {
        self.item_id_field = field.into();
        self
    }

    /// Replaces the back-reference keys stripped from items.
    #[must_use]
    pub fn with_back_reference_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.back_reference_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the domain prefix stripped from item ids.
    #[must_use]
    pub fn with_domain_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.domain_prefix = prefix.into();
        self
    }

    /// Sets the trailing marker pattern stripped from item ids.
    #[must_use]
    pub fn with_trailing_marker(mut self, pattern: impl Into<String>) -> Self {
        self.trailing_marker = pattern.into();
        self
    }

    /// Sets the `@context` added to item graphs.
    #[must_use]
    pub fn with_item_context(mut self, context: impl Into<String>) -> Self {
        self.item_context = Some(context.into());
        self
    }

    /// Leaves item graphs without an added `@context`.
    #[must_use]
    pub fn without_item_context(mut self) -> Self {
        self.item_context = None;
        self
    }
}

/// Running counts of a splitter's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitStats {
    /// Resources processed
    pub records: usize,
    /// Item documents emitted
    pub items: usize,
    /// Resource documents emitted
    pub resources: usize,
    /// Documents skipped because they failed to encode
    pub failed: usize,
}

impl SplitStats {
    /// Documents handed to the receiver.
    #[must_use]
    pub const fn emitted(&self) -> usize {
        self.items + self.resources
    }
}

impl fmt::Display for SplitStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records split into {} items and {} resources, {} failed",
            self.records, self.items, self.resources, self.failed
        )
    }
}

/// Decomposes parsed resources into item and resource documents.
#[derive(Debug)]
pub struct ItemSplitter<R, E = JsonGraphEncoder> {
    config: SplitterConfig,
    domain_pattern: Option<Regex>,
    marker_pattern: Option<Regex>,
    encoder: E,
    receiver: R,
    stats: SplitStats,
}

impl<R: ObjectReceiver<SplitDocument>> ItemSplitter<R> {
    /// Creates a splitter encoding graphs as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the trailing marker is not a valid regular
    /// expression.
    pub fn new(config: SplitterConfig, receiver: R) -> Result<Self> {
        Self::with_encoder(config, JsonGraphEncoder::new(), receiver)
    }
}

impl<R: ObjectReceiver<SplitDocument>, E: GraphEncoder> ItemSplitter<R, E> {
    /// Creates a splitter with a custom graph encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the trailing marker is not a valid regular
    /// expression.
    pub fn with_encoder(config: SplitterConfig, encoder: E, receiver: R) -> Result<Self> {
        let domain_pattern = if config.domain_prefix.is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                "{}.*/",
                regex::escape(&config.domain_prefix)
            ))?)
        };
        let marker_pattern = if config.trailing_marker.is_empty() {
            None
        } else {
            Some(Regex::new(&config.trailing_marker)?)
        };

        Ok(Self {
            config,
            domain_pattern,
            marker_pattern,
            encoder,
            receiver,
            stats: SplitStats::default(),
        })
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Counts of documents emitted and failed so far.
    #[must_use]
    pub fn stats(&self) -> SplitStats {
        self.stats
    }

    /// The downstream stage.
    #[must_use]
    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    /// Consumes the splitter and returns the downstream stage.
    pub fn into_receiver(self) -> R {
        self.receiver
    }

    /// Turns a raw item identifier into its indexable form.
    ///
    /// Everything from the domain prefix up to the last `/` that follows it is
    /// removed, then the trailing marker.
    ///
    /// ```
    /// # use bibsift::splitter::{ItemSplitter, SplitterConfig};
    /// # fn main() -> bibsift::Result<()> {
    /// let splitter = ItemSplitter::new(SplitterConfig::default(), Vec::new())?;
    /// assert_eq!(
    ///     splitter.normalize_item_id("http://lobid.org/items/HT018:DE-6:2#!"),
    ///     "HT018:DE-6:2"
    /// );
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn normalize_item_id(&self, raw: &str) -> String {
        let without_domain = match &self.domain_pattern {
            Some(pattern) => pattern.replace_all(raw, ""),
            None => raw.into(),
        };
        match &self.marker_pattern {
            Some(pattern) => pattern.replace(&without_domain, "").into_owned(),
            None => without_domain.into_owned(),
        }
    }

    /// Splits one resource and hands its documents to the receiver, items
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::MissingIdentifier`], [`SiftError::InvalidItems`] or
    /// [`SiftError::MissingItemIdentifier`] when the resource cannot be
    /// correlated; nothing is emitted for it in that case. Receiver errors are
    /// propagated. Encoding failures are not errors: the affected document is
    /// logged, counted in [`SplitStats::failed`] and skipped.
    pub fn split(&mut self, mut record: ParsedRecordMap) -> Result<()> {
        let resource_id = scalar_id(record.get(&self.config.id_field))
            .ok_or_else(|| SiftError::MissingIdentifier(self.config.id_field.clone()))?;
        let items = self.take_items(&mut record, &resource_id)?;

        self.stats.records += 1;
        debug!(resource = %resource_id, items = items.len(), "splitting resource");

        for (item_id, mut item) in items {
            for key in &self.config.back_reference_keys {
                item.shift_remove(key);
            }
            if let Some(context) = &self.config.item_context {
                item.insert("@context".to_string(), Value::String(context.clone()));
            }
            self.emit(item_id, DocumentType::Item, Some(resource_id.as_str()), &item)?;
        }

        self.emit(resource_id.clone(), DocumentType::Resource, None, &record)
    }

    /// Removes the item list from `record` and resolves every item's
    /// normalised id, so that a bad item is reported before any document is
    /// emitted. An id that normalises to nothing counts as missing.
    fn take_items(
        &self,
        record: &mut ParsedRecordMap,
        resource_id: &str,
    ) -> Result<Vec<(String, ParsedRecordMap)>> {
        let items = match record.shift_remove(&self.config.items_field) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(SiftError::InvalidItems {
                    resource_id: resource_id.to_string(),
                    reason: format!(
                        "field {:?} is not a list (found {})",
                        self.config.items_field,
                        json_kind(&other)
                    ),
                })
            },
        };

        items
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let item = match value {
                    Value::Object(item) => item,
                    other => {
                        return Err(SiftError::InvalidItems {
                            resource_id: resource_id.to_string(),
                            reason: format!("item #{index} is {}, not a map", json_kind(&other)),
                        })
                    },
                };
                let item_id = scalar_id(item.get(&self.config.item_id_field))
                    .map(|raw| self.normalize_item_id(&raw))
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| SiftError::MissingItemIdentifier {
                        resource_id: resource_id.to_string(),
                        index,
                    })?;
                Ok((item_id, item))
            })
            .collect()
    }

    fn emit(
        &mut self,
        id: String,
        doc_type: DocumentType,
        parent_id: Option<&str>,
        graph: &ParsedRecordMap,
    ) -> Result<()> {
        let encoded = match self.encoder.encode(graph) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(
                    document = %id,
                    kind = %doc_type,
                    parent = parent_id.unwrap_or("-"),
                    error = %err,
                    "failed to encode document; skipping it"
                );
                self.stats.failed += 1;
                return Ok(());
            },
        };

        let document = match parent_id {
            Some(parent) => SplitDocument::item(id, parent, encoded),
            None => SplitDocument::resource(id, encoded),
        };
        self.receiver.process(document)?;
        match doc_type {
            DocumentType::Item => self.stats.items += 1,
            DocumentType::Resource => self.stats.resources += 1,
        }
        Ok(())
    }
}

impl<R, E> ObjectReceiver<ParsedRecordMap> for ItemSplitter<R, E>
where
    R: ObjectReceiver<SplitDocument>,
    E: GraphEncoder,
{
    fn process(&mut self, obj: ParsedRecordMap) -> Result<()> {
        self.split(obj)
    }

    fn reset_stream(&mut self) -> Result<()> {
        self.receiver.reset_stream()
    }

    fn close_stream(&mut self) -> Result<()> {
        self.receiver.close_stream()
    }
}

fn scalar_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a map",
    }
}
