//! MARC-XML to event stream decoding.
//!
//! [`MarcXmlDecoder`] reads MARC-XML (a `<collection>` of `<record>`s or bare
//! records) with quick-xml and pushes the record structure into a
//! [`StreamReceiver`]. No field mapping happens here:
//!
//! | MARC-XML | Event |
//! |---|---|
//! | `<record>` … `</record>` | `RecordStart` (id = 1-based position) … `RecordEnd` |
//! | `<leader>text</leader>` | `Literal("leader", text)` |
//! | `<controlfield tag="001">text</controlfield>` | `Literal("001", text)` |
//! | `<datafield tag="245" ind1="1" ind2="0">` … | `EntityStart("24510")` … `EntityEnd` |
//! | `<subfield code="a">text</subfield>` | `Literal("a", text)` |
//!
//! Namespace prefixes (`marc:record`) are ignored. Missing indicators are
//! rendered as blanks. If decoding fails inside a record, the receiver is
//! reset before the error is returned, so no stage is left mid-record.
//!
//! # Examples
//!
//! ```
//! use bibsift::event::{EventCollector, StreamEvent};
//! use bibsift::marcxml::MarcXmlDecoder;
//!
//! # fn main() -> bibsift::Result<()> {
//! let xml = r#"<collection xmlns="http://www.loc.gov/MARC21/slim">
//!   <record>
//!     <controlfield tag="001">990001</controlfield>
//!     <datafield tag="035" ind1=" " ind2=" "><subfield code="a">(DE-605)HT012734817</subfield></datafield>
//!   </record>
//! </collection>"#;
//!
//! let mut collector = EventCollector::new();
//! let count = MarcXmlDecoder::new().decode_str(xml, &mut collector)?;
//!
//! assert_eq!(count, 1);
//! assert_eq!(collector.events()[1], StreamEvent::literal("001", "990001"));
//! assert_eq!(collector.events()[2], StreamEvent::entity_start("035  "));
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, SiftError};
use crate::event::StreamReceiver;

/// Literal name used for the record leader.
pub const LEADER_LITERAL: &str = "leader";

/// Streaming MARC-XML decoder.
#[derive(Debug, Default)]
pub struct MarcXmlDecoder {
    records: usize,
}

/// Leaf element whose text is being collected.
#[derive(Debug)]
enum Pending {
    Leader,
    Control(String),
    Subfield(String),
}

struct DecodeState<'a, R: ?Sized> {
    receiver: &'a mut R,
    records: &'a mut usize,
    in_record: bool,
    pending: Option<Pending>,
    text: String,
    decoded: usize,
}

impl MarcXmlDecoder {
    /// Creates a decoder. Record ids start at `1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records decoded by this instance across all inputs.
    #[must_use]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Decodes MARC-XML held in a string.
    ///
    /// Returns the number of records decoded from this input.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::Xml`] for malformed XML and any error the
    /// receiver reports.
    pub fn decode_str<R: StreamReceiver + ?Sized>(
        &mut self,
        xml: &str,
        receiver: &mut R,
    ) -> Result<usize> {
        self.decode_reader(xml.as_bytes(), receiver)
    }

    /// Decodes a MARC-XML file.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::Io`] if the file cannot be opened, otherwise as
    /// [`decode_str`](Self::decode_str).
    pub fn decode_path<P: AsRef<Path>, R: StreamReceiver + ?Sized>(
        &mut self,
        path: P,
        receiver: &mut R,
    ) -> Result<usize> {
        let file = File::open(path)?;
        self.decode_reader(BufReader::new(file), receiver)
    }

    /// Decodes MARC-XML from any buffered reader.
    ///
    /// # Errors
    ///
    /// As [`decode_str`](Self::decode_str).
    pub fn decode_reader<B: BufRead, R: StreamReceiver + ?Sized>(
        &mut self,
        input: B,
        receiver: &mut R,
    ) -> Result<usize> {
        let mut reader = Reader::from_reader(input);
        let mut state = DecodeState {
            receiver,
            records: &mut self.records,
            in_record: false,
            pending: None,
            text: String::new(),
            decoded: 0,
        };

        if let Err(err) = state.pump(&mut reader) {
            if state.in_record {
                // Downstream stages must not stay in the middle of a record.
                state.in_record = false;
                state.receiver.reset_stream()?;
            }
            return Err(err);
        }
        Ok(state.decoded)
    }
}

impl<R: StreamReceiver + ?Sized> DecodeState<'_, R> {
    fn pump<B: BufRead>(&mut self, reader: &mut Reader<B>) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => self.open(&e)?,
                Event::Empty(e) => {
                    self.open(&e)?;
                    self.close(e.local_name().as_ref())?;
                },
                Event::End(e) => self.close(e.local_name().as_ref())?,
                Event::Text(t) => {
                    if self.pending.is_some() {
                        self.text.push_str(&t.unescape()?);
                    }
                },
                Event::CData(c) => {
                    if self.pending.is_some() {
                        self.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        if self.in_record {
            return Err(SiftError::Xml("input ended inside a record".to_string()));
        }
        Ok(())
    }

    fn open(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let local = e.local_name();
        match local.as_ref() {
            b"record" => {
                if self.in_record {
                    return Err(SiftError::Xml("nested <record> element".to_string()));
                }
                self.in_record = true;
                *self.records += 1;
                self.receiver.start_record(&self.records.to_string())
            },
            _ if !self.in_record => Ok(()),
            b"leader" => {
                self.begin_text(Pending::Leader);
                Ok(())
            },
            b"controlfield" => {
                let tag = attribute(e, b"tag")?.unwrap_or_default();
                self.begin_text(Pending::Control(tag));
                Ok(())
            },
            b"datafield" => {
                let tag = attribute(e, b"tag")?.unwrap_or_default();
                let ind1 = attribute(e, b"ind1")?.unwrap_or_else(|| " ".to_string());
                let ind2 = attribute(e, b"ind2")?.unwrap_or_else(|| " ".to_string());
                self.receiver.start_entity(&format!("{tag}{ind1}{ind2}"))
            },
            b"subfield" => {
                let code = attribute(e, b"code")?.unwrap_or_default();
                self.begin_text(Pending::Subfield(code));
                Ok(())
            },
            _ => Ok(()),
        }
    }

    fn close(&mut self, local: &[u8]) -> Result<()> {
        if !self.in_record {
            return Ok(());
        }
        match local {
            b"leader" | b"controlfield" | b"subfield" => {
                let Some(pending) = self.pending.take() else {
                    return Ok(());
                };
                let name = match &pending {
                    Pending::Leader => LEADER_LITERAL,
                    Pending::Control(tag) => tag.as_str(),
                    Pending::Subfield(code) => code.as_str(),
                };
                self.receiver.literal(name, &self.text)?;
                self.text.clear();
                Ok(())
            },
            b"datafield" => self.receiver.end_entity(),
            b"record" => {
                self.in_record = false;
                self.decoded += 1;
                self.receiver.end_record()
            },
            _ => Ok(()),
        }
    }

    fn begin_text(&mut self, pending: Pending) {
        self.pending = Some(pending);
        self.text.clear();
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| SiftError::Xml(err.to_string()))?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventCollector, StreamEvent};

    const TWO_RECORDS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<marc:collection xmlns:marc="http://www.loc.gov/MARC21/slim">
  <marc:record>
    <marc:leader>00000nam a2200000 c 4500</marc:leader>
    <marc:controlfield tag="001">990001</marc:controlfield>
    <marc:datafield tag="245" ind1="1" ind2="0">
      <marc:subfield code="a">Fish &amp; Chips</marc:subfield>
      <marc:subfield code="c"><![CDATA[<anon>]]></marc:subfield>
    </marc:datafield>
  </marc:record>
  <marc:record>
    <marc:controlfield tag="001">990002</marc:controlfield>
  </marc:record>
</marc:collection>"#;

    #[test]
    fn test_decodes_structure() {
        let mut collector = EventCollector::new();
        let count = MarcXmlDecoder::new()
            .decode_str(TWO_RECORDS, &mut collector)
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(
            collector.events(),
            &[
                StreamEvent::record_start("1"),
                StreamEvent::literal("leader", "00000nam a2200000 c 4500"),
                StreamEvent::literal("001", "990001"),
                StreamEvent::entity_start("24510"),
                StreamEvent::literal("a", "Fish & Chips"),
                StreamEvent::literal("c", "<anon>"),
                StreamEvent::EntityEnd,
                StreamEvent::RecordEnd,
                StreamEvent::record_start("2"),
                StreamEvent::literal("001", "990002"),
                StreamEvent::RecordEnd,
            ]
        );
    }

    #[test]
    fn test_missing_indicators_become_blanks() {
        let xml = r#"<record><datafield tag="035"><subfield code="a">x</subfield></datafield></record>"#;
        let mut collector = EventCollector::new();
        MarcXmlDecoder::new().decode_str(xml, &mut collector).unwrap();
        assert_eq!(collector.events()[1], StreamEvent::entity_start("035  "));
    }

    #[test]
    fn test_empty_subfield_yields_empty_literal() {
        let xml = r#"<record><datafield tag="500" ind1=" " ind2=" "><subfield code="a"/></datafield></record>"#;
        let mut collector = EventCollector::new();
        MarcXmlDecoder::new().decode_str(xml, &mut collector).unwrap();
        assert_eq!(collector.events()[2], StreamEvent::literal("a", ""));
    }

    #[test]
    fn test_ids_continue_across_inputs() {
        let mut decoder = MarcXmlDecoder::new();
        let mut collector = EventCollector::new();
        decoder.decode_str("<record/>", &mut collector).unwrap();
        decoder.decode_str("<record></record>", &mut collector).unwrap();
        assert_eq!(decoder.records(), 2);
        assert_eq!(collector.events()[2], StreamEvent::record_start("2"));
    }

    #[test]
    fn test_truncated_input_is_error() {
        let mut collector = EventCollector::new();
        let err = MarcXmlDecoder::new()
            .decode_str("<record><leader>x</leader>", &mut collector)
            .unwrap_err();
        assert!(matches!(err, SiftError::Xml(_)));
    }

    #[test]
    fn test_failure_inside_record_resets_receiver() {
        let mut decoder = MarcXmlDecoder::new();
        let matcher = crate::matcher::KeywordMatcher::new(["HT1"]).unwrap();
        let mut filter = crate::filter::ContainsFilter::new(matcher, EventCollector::new());

        let truncated = r#"<record><controlfield tag="001">HT1</controlfield>"#;
        let err = decoder.decode_str(truncated, &mut filter).unwrap_err();
        assert!(matches!(err, SiftError::Xml(_)));
        assert!(!filter.is_buffering());
        assert_eq!(filter.receiver().resets(), 1);

        let complete = r#"<record><controlfield tag="001">HT1</controlfield></record>"#;
        let count = decoder.decode_str(complete, &mut filter).unwrap();
        assert_eq!(count, 1);
        assert_eq!(filter.receiver().record_count(), 1);
    }

    #[test]
    fn test_malformed_xml_inside_record_resets_receiver() {
        let mut collector = EventCollector::new();
        let result = MarcXmlDecoder::new().decode_str("<record><leader>x</record>", &mut collector);
        assert!(matches!(result, Err(SiftError::Xml(_))));
        assert_eq!(collector.resets(), 1);
    }

    #[test]
    fn test_failure_outside_record_does_not_reset() {
        let mut collector = EventCollector::new();
        let result = MarcXmlDecoder::new().decode_str("<collection></record>", &mut collector);
        assert!(result.is_err());
        assert_eq!(collector.resets(), 0);
    }

    #[test]
    fn test_mismatched_tags_are_error() {
        let mut collector = EventCollector::new();
        let result = MarcXmlDecoder::new().decode_str("<record></datafield>", &mut collector);
        assert!(matches!(result, Err(SiftError::Xml(_))));
    }
}
