//! XML utilities for the Office Open XML workbook parts.
//! Provides a reader wrapper with helper traits for attribute and text
//! processing, and a small writer wrapper for emitting parts.

use crate::error::MdrError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// XML reader wrapper configured for workbook parts
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader; empty elements are expanded so `<c/>` yields Start and End
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event from the reader
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, MdrError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(MdrError::XmlError(error)),
        }
    }
}

/// Helper trait for XML attributes providing convenient value extraction and parsing
pub(crate) trait XmlAttributeHelper<'a> {
    /// Gets the unescaped attribute value as a string
    fn get_value(&self) -> Result<Cow<'a, str>, MdrError>;

    /// Parses the attribute value to the specified type
    fn parse_value<T: FromStr>(&self) -> Result<T, MdrError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, MdrError> {
        Ok(self.unescape_value()?)
    }

    fn parse_value<T: FromStr>(&self) -> Result<T, MdrError> {
        self.get_value()?
            .parse()
            .map_err(|_| match std::str::from_utf8(&self.value) {
                Ok(value) => MdrError::XmlHelperError(XmlError::ParseAttributeValueError(value.to_string())),
                Err(error) => MdrError::StringEncodingError(error),
            })
    }
}

/// Helper trait for XML nodes providing attribute access methods
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, MdrError>;

    /// Parses an attribute value to the specified type
    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, MdrError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, MdrError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }

    fn parse_attribute_value<T: FromStr>(&self, name: &str) -> Result<Option<T>, MdrError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.parse_value())
            .transpose()
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from BytesText event
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), MdrError>;

    /// Appends text content from BytesRef event (handles entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), MdrError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_text(&mut self, text: &BytesText) -> Result<(), MdrError> {
        self.push_str(&text.xml_content()?);
        Ok(())
    }

    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), MdrError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

/// Buffered XML writer for one workbook part.
pub(crate) struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Creates a writer and emits the standalone UTF-8 declaration
    pub(crate) fn new() -> Result<XmlWriter, MdrError> {
        let mut writer = Writer::new(Vec::with_capacity(4096));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(XmlWriter { writer })
    }

    /// Opens an element with attributes
    pub(crate) fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MdrError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    /// Writes a self-closing element
    pub(crate) fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MdrError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<(), MdrError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Writes escaped character data. Carriage returns are written as
    /// `&#13;`; a raw `\r\n` reads back as `\n`.
    pub(crate) fn text(&mut self, text: &str) -> Result<(), MdrError> {
        for (index, segment) in text.split('\r').enumerate() {
            if index > 0 {
                self.writer.write_event(Event::GeneralRef(BytesRef::new("#13")))?;
            }
            if !segment.is_empty() {
                self.writer.write_event(Event::Text(BytesText::new(segment)))?;
            }
        }
        Ok(())
    }

    /// Writes `<name attributes>text</name>`
    pub(crate) fn element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), MdrError> {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_xml_events;
    use std::io::Cursor;

    #[test]
    fn writer_escapes_text_and_attributes() {
        let mut writer = XmlWriter::new().unwrap();
        writer.start("root", &[("name", "a&b")]).unwrap();
        writer.element("t", &[], "x < y").unwrap();
        writer.empty("c", &[("r", "A1")]).unwrap();
        writer.end("root").unwrap();
        let xml = String::from_utf8(writer.into_bytes()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(xml.contains("<root name=\"a&amp;b\">"));
        assert!(xml.contains("<t>x &lt; y</t>"));
        assert!(xml.contains("<c r=\"A1\"/>"));
    }

    #[test]
    fn carriage_returns_survive_write_and_read() -> Result<(), MdrError> {
        let mut writer = XmlWriter::new()?;
        writer.element("t", &[], "line1\r\nline2\r")?;
        let bytes = writer.into_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("<t>line1&#13;\nline2&#13;</t>"));

        let mut reader = XmlReader::new(Cursor::new(bytes.as_slice()));
        let mut text = String::new();
        match_xml_events!(reader => {
            Event::Text(event) => text.push_bytes_text(&event)?,
            Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
        });
        assert_eq!(text, "line1\r\nline2\r");
        Ok(())
    }

    #[test]
    fn reader_resolves_entities_and_attributes() -> Result<(), MdrError> {
        let xml = r#"<root><c r="B2" n="7">Fish &amp; Chips &#65;</c></root>"#;
        let mut reader = XmlReader::new(Cursor::new(xml.as_bytes()));
        let mut text = String::new();
        let mut reference = String::new();
        let mut number = 0u32;
        match_xml_events!(reader => {
            Event::Start(event) if event.name().as_ref() == b"c" => {
                reference = event.get_attribute_value("r")?.unwrap_or_default().to_string();
                number = event.parse_attribute_value("n")?.unwrap_or_default();
            }
            Event::Text(event) => text.push_bytes_text(&event)?,
            Event::GeneralRef(event) => text.push_bytes_ref(&event)?,
        });
        assert_eq!(reference, "B2");
        assert_eq!(number, 7);
        assert_eq!(text, "Fish & Chips A");
        Ok(())
    }
}
