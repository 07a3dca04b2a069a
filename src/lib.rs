#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # bibsift: filtering and splitting bibliographic record streams
//!
//! The transformation core of a MARC-to-index pipeline. Records arrive as a
//! push-based stream of events (record start/end, entity start/end,
//! literals) and leave either as filtered event streams, as XML strings, or as
//! item/resource documents ready for an index writer.
//!
//! ## Filtering a MARC-XML stream
//!
//! ```
//! use bibsift::{ContainsFilter, KeywordMatcher, MarcXmlDecoder, XmlEncoder, XmlEncoderConfig};
//! use bibsift::event::StreamReceiver;
//!
//! # fn main() -> bibsift::Result<()> {
//! let xml = r#"<collection>
//!   <record><controlfield tag="001">HT012734817</controlfield></record>
//!   <record><controlfield tag="001">XHT012734817Y</controlfield></record>
//! </collection>"#;
//!
//! let matcher = KeywordMatcher::from_whitespace_separated("HT012734817 HT012734833")?;
//! let encoder = XmlEncoder::new(XmlEncoderConfig::default(), Vec::new());
//! let mut filter = ContainsFilter::new(matcher, encoder);
//!
//! MarcXmlDecoder::new().decode_str(xml, &mut filter)?;
//! filter.close_stream()?;
//!
//! let documents = filter.into_receiver().into_receiver();
//! assert_eq!(documents.len(), 1);
//! assert!(documents[0].contains("HT012734817"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`event`]: Stream vocabulary and receiver traits
//! - [`matcher`]: Whole-word multi-keyword matching
//! - [`buffer`]: Capture and replay of one record
//! - [`filter`]: Keyword filter over record streams
//! - [`splitter`]: Resource/item document splitting
//! - [`xml_encoder`]: Flat XML encoding of records
//! - [`batch_logger`]: Progress logging stage
//! - [`marcxml`]: MARC-XML event decoder
//! - [`batch`]: Batch drivers and run reports
//! - [`error`]: Error types and result type

pub mod batch;
pub mod batch_logger;
pub mod buffer;
pub mod error;
pub mod event;
pub mod filter;
pub mod marcxml;
pub mod matcher;
pub mod splitter;
pub mod xml_encoder;

pub use batch::{filter_batch, split_batch, BatchReport};
pub use batch_logger::BatchLogger;
pub use buffer::RecordBuffer;
pub use error::{Result, SiftError};
pub use event::{EventCollector, ObjectReceiver, StreamEvent, StreamReceiver};
pub use filter::{ContainsFilter, FilterStats};
pub use marcxml::MarcXmlDecoder;
pub use matcher::{KeywordMatch, KeywordMatcher};
pub use splitter::{
    DocumentType, GraphEncoder, ItemSplitter, JsonGraphEncoder, ParsedRecordMap, SplitDocument,
    SplitStats, SplitterConfig,
};
pub use xml_encoder::{XmlEncoder, XmlEncoderConfig};
