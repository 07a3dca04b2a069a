//! Flat XML encoding of record streams.
//!
//! [`XmlEncoder`] renders every literal of a record as one element named after
//! the literal, wraps the record in a configurable preamble and postamble, and
//! hands the finished document downstream as a single string per record.
//! Entity boundaries are not rendered. The default preamble and postamble
//! produce an OAI Dublin Core (`oai_dc`) document.
//!
//! Literal values are escaped with quick-xml, so `<`, `>`, `&`, `'` and `"` in
//! the data cannot break the document structure. Literal names are used as
//! element names verbatim; a name that is empty or contains whitespace or
//! markup characters is rejected with [`SiftError::Xml`].
//!
//! # Examples
//!
//! ```
//! use bibsift::event::StreamReceiver;
//! use bibsift::xml_encoder::{XmlEncoder, XmlEncoderConfig};
//!
//! # fn main() -> bibsift::Result<()> {
//! let config = XmlEncoderConfig::new()
//!     .with_preamble("<dc>\n")
//!     .with_postamble("</dc>\n");
//! let mut encoder = XmlEncoder::new(config, Vec::new());
//!
//! encoder.start_record("1")?;
//! encoder.literal("dc:title", "Fish & Chips")?;
//! encoder.end_record()?;
//!
//! assert_eq!(
//!     encoder.receiver()[0],
//!     "<dc>\n<dc:title>\n\tFish &amp; Chips\n</dc:title>\n</dc>\n"
//! );
//! # Ok(())
//! # }
//! ```

use quick_xml::escape::escape;

use crate::error::{Result, SiftError};
use crate::event::{ObjectReceiver, StreamReceiver};

/// Default preamble: XML declaration and the `oai_dc:dc` root element.
pub const OAI_DC_PREAMBLE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n\
<oai_dc:dc \n\
\txmlns:oai_dc=\"http://www.openarchives.org/OAI/2.0/oai_dc/\" \n\
\txmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\" \n\
\txmlns:dcterms=\"http://purl.org/dc/terms/\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \n\
\txsi:schemaLocation=\"http://www.openarchives.org/OAI/2.0/oai_dc/ http://www.openarchives.org/OAI/2.0/oai_dc.xsd\">\n";

/// Default postamble closing the `oai_dc:dc` root element.
pub const OAI_DC_POSTAMBLE: &str = "</oai_dc:dc>\n";

/// Configuration for [`XmlEncoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlEncoderConfig {
    /// Text written before the first literal of each record.
    pub preamble: String,
    /// Text written after the last literal of each record.
    pub postamble: String,
}

impl Default for XmlEncoderConfig {
    fn default() -> Self {
        Self {
            preamble: OAI_DC_PREAMBLE.to_string(),
            postamble: OAI_DC_POSTAMBLE.to_string(),
        }
    }
}

impl XmlEncoderConfig {
    /// Creates a configuration with the OAI Dublin Core wrapper.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the preamble.
    #[must_use]
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Sets the postamble.
    #[must_use]
    pub fn with_postamble(mut self, postamble: impl Into<String>) -> Self {
        self.postamble = postamble.into();
        self
    }
}

/// Stream sink producing one XML string per record.
#[derive(Debug)]
pub struct XmlEncoder<R> {
    config: XmlEncoderConfig,
    buffer: String,
    result: Option<String>,
    receiver: R,
}

impl<R: ObjectReceiver<String>> XmlEncoder<R> {
    /// Creates an encoder delivering documents to `receiver`.
    pub fn new(config: XmlEncoderConfig, receiver: R) -> Self {
        Self {
            config,
            buffer: String::new(),
            result: None,
            receiver,
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &XmlEncoderConfig {
        &self.config
    }

    /// The most recently completed document, if any.
    #[must_use]
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    /// The downstream stage.
    #[must_use]
    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    /// Consumes the encoder and returns the downstream stage.
    pub fn into_receiver(self) -> R {
        self.receiver
    }
}

impl<R: ObjectReceiver<String>> StreamReceiver for XmlEncoder<R> {
    fn start_record(&mut self, _id: &str) -> Result<()> {
        self.buffer.clear();
        self.buffer.push_str(&self.config.preamble);
        Ok(())
    }

    fn end_record(&mut self) -> Result<()> {
        self.buffer.push_str(&self.config.postamble);
        let document = std::mem::take(&mut self.buffer);
        self.result = Some(document.clone());
        self.receiver.process(document)
    }

    fn start_entity(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn end_entity(&mut self) -> Result<()> {
        Ok(())
    }

    fn literal(&mut self, name: &str, value: &str) -> Result<()> {
        if !is_tag_safe(name) {
            return Err(SiftError::Xml(format!("invalid element name {name:?}")));
        }
        self.buffer.push('<');
        self.buffer.push_str(name);
        self.buffer.push_str(">\n\t");
        self.buffer.push_str(&escape(value));
        self.buffer.push_str("\n</");
        self.buffer.push_str(name);
        self.buffer.push_str(">\n");
        Ok(())
    }

    fn reset_stream(&mut self) -> Result<()> {
        self.buffer.clear();
        self.receiver.reset_stream()
    }

    fn close_stream(&mut self) -> Result<()> {
        self.buffer.clear();
        self.receiver.close_stream()
    }
}

/// True if `name` can stand between `<` and `>` without changing the markup.
fn is_tag_safe(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '<' | '>' | '&' | '"' | '\'' | '/' | '='))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(config: XmlEncoderConfig, literals: &[(&str, &str)]) -> String {
        let mut encoder = XmlEncoder::new(config, Vec::new());
        encoder.start_record("r1").unwrap();
        for (name, value) in literals {
            encoder.literal(name, value).unwrap();
        }
        encoder.end_record().unwrap();
        encoder.into_receiver().remove(0)
    }

    #[test]
    fn test_default_wrapper() {
        let xml = encode(XmlEncoderConfig::default(), &[("dc:title", "Title")]);
        assert!(xml.starts_with(OAI_DC_PREAMBLE));
        assert!(xml.ends_with(OAI_DC_POSTAMBLE));
        assert!(xml.contains("<dc:title>\n\tTitle\n</dc:title>\n"));
    }

    #[test]
    fn test_special_characters_escaped() {
        let xml = encode(
            XmlEncoderConfig::new().with_preamble("").with_postamble(""),
            &[("v", r#"<b> & "q" 'a'"#)],
        );
        assert_eq!(
            xml,
            "<v>\n\t&lt;b&gt; &amp; &quot;q&quot; &apos;a&apos;\n</v>\n"
        );
    }

    #[test]
    fn test_unsafe_literal_names_rejected() {
        let mut encoder = XmlEncoder::new(XmlEncoderConfig::default(), Vec::new());
        encoder.start_record("r1").unwrap();
        for name in ["", "a b", "x><y", "a/", "t=\"1\""] {
            let err = encoder.literal(name, "v").unwrap_err();
            assert!(matches!(err, SiftError::Xml(_)), "{name:?} accepted");
        }
        encoder.literal("001", "990001").unwrap();
        encoder.literal("dc:title", "t").unwrap();
        encoder.end_record().unwrap();
        assert!(encoder.receiver()[0].contains("<001>\n\t990001\n</001>\n"));
    }

    #[test]
    fn test_entities_not_rendered() {
        let mut encoder = XmlEncoder::new(
            XmlEncoderConfig::new().with_preamble("[").with_postamble("]"),
            Vec::new(),
        );
        encoder.start_record("r1").unwrap();
        encoder.start_entity("245 10").unwrap();
        encoder.literal("a", "x").unwrap();
        encoder.end_entity().unwrap();
        encoder.end_record().unwrap();
        assert_eq!(encoder.result(), Some("[<a>\n\tx\n</a>\n]"));
    }

    #[test]
    fn test_one_string_per_record() {
        let mut encoder = XmlEncoder::new(XmlEncoderConfig::default(), Vec::new());
        for id in ["1", "2"] {
            encoder.start_record(id).unwrap();
            encoder.literal("dc:identifier", id).unwrap();
            encoder.literal("dc:title", "t").unwrap();
            encoder.end_record().unwrap();
        }
        let docs = encoder.into_receiver();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].matches(OAI_DC_PREAMBLE).count(), 1);
        assert!(docs[1].contains("\t2\n"));
        assert!(!docs[1].contains("\t1\n"));
    }

    #[test]
    fn test_empty_record_is_wrapper_only() {
        let xml = encode(XmlEncoderConfig::default(), &[]);
        assert_eq!(xml, format!("{OAI_DC_PREAMBLE}{OAI_DC_POSTAMBLE}"));
    }
}
