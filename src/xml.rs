//! XML reading cursor and writer used by document decoders and encoders
//!
//! Decoders walk a document with [`ElementReader`] the way a pull parser is
//! used: open the root, then repeatedly ask for the next child of the element
//! being read until its end tag is reached. Every structural problem becomes
//! a [`ParseError`] naming the element and attribute involved.

use std::borrow::Cow;
use std::fmt::Display;
use std::str::FromStr;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{ParseError, Result, SchemaError};
use crate::version::SchemaVersion;

/// An element start tag with its attributes resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement {
    name: String,
    namespace: Option<String>,
    /// Default namespace and prefix bindings in scope for the content
    default_namespace: Option<String>,
    prefixes: Vec<(String, String)>,
    attributes: Vec<(String, String)>,
    empty: bool,
    position: u64,
}

impl StartElement {
    /// Local element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace declared on this element for its own prefix, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Attributes other than namespace declarations, in document order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True for `<element/>`
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Byte offset of the start tag
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn required_attribute(&self, name: &str) -> std::result::Result<&str, ParseError> {
        self.attribute(name).ok_or_else(|| ParseError::MissingAttribute {
            element: self.name.clone(),
            attribute: name.to_string(),
            position: self.position,
        })
    }

    /// Parse an optional attribute; `expected` describes valid values
    pub fn parse_attribute<T: FromStr>(
        &self,
        name: &str,
        expected: &str,
    ) -> std::result::Result<Option<T>, ParseError> {
        self.attribute(name)
            .map(|value| {
                value
                    .parse::<T>()
                    .map_err(|_| self.invalid_attribute(name, value, expected))
            })
            .transpose()
    }

    /// Parse a required attribute; `expected` describes valid values
    pub fn parse_required_attribute<T: FromStr>(
        &self,
        name: &str,
        expected: &str,
    ) -> std::result::Result<T, ParseError> {
        let value = self.required_attribute(name)?;
        value
            .parse::<T>()
            .map_err(|_| self.invalid_attribute(name, value, expected))
    }

    /// Reject any attribute not in `allowed`
    pub fn allow_attributes(&self, allowed: &[&str]) -> std::result::Result<(), ParseError> {
        match self.attributes.iter().find(|(k, _)| !allowed.contains(&k.as_str())) {
            Some((key, _)) => Err(self.unexpected_attribute(key)),
            None => Ok(()),
        }
    }

    pub fn unexpected_attribute(&self, attribute: &str) -> ParseError {
        ParseError::UnexpectedAttribute {
            element: self.name.clone(),
            attribute: attribute.to_string(),
            position: self.position,
        }
    }

    pub fn invalid_attribute(&self, attribute: &str, value: &str, expected: &str) -> ParseError {
        ParseError::InvalidAttributeValue {
            element: self.name.clone(),
            attribute: attribute.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
            position: self.position,
        }
    }

    /// Error for a child this element does not allow
    pub fn unexpected_element(&self, child: &StartElement) -> ParseError {
        ParseError::UnexpectedElement {
            parent: self.name.clone(),
            element: child.name.clone(),
            position: child.position,
        }
    }

    /// Error for a required child that never appeared
    pub fn missing_element(&self, child: &str) -> ParseError {
        ParseError::MissingElement {
            parent: self.name.clone(),
            element: child.to_string(),
        }
    }

    pub fn invalid_text(&self, value: &str, expected: &str) -> ParseError {
        ParseError::InvalidText {
            element: self.name.clone(),
            value: value.to_string(),
            expected: expected.to_string(),
            position: self.position,
        }
    }

    /// Store a value for a child that may appear at most once
    pub fn store_once<T>(
        &self,
        child: &StartElement,
        slot: &mut Option<T>,
        value: T,
    ) -> std::result::Result<(), ParseError> {
        if slot.is_some() {
            return Err(self.duplicate_element(child));
        }
        *slot = Some(value);
        Ok(())
    }

    /// Error for a child that appeared more often than allowed
    pub fn duplicate_element(&self, child: &StartElement) -> ParseError {
        ParseError::DuplicateElement {
            parent: self.name.clone(),
            element: child.name.clone(),
            position: child.position,
        }
    }
}

/// Pull cursor over one XML document
pub struct ElementReader<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> ElementReader<'a> {
    /// Open a document and read up to (and including) its root start tag
    pub fn open(raw: &'a str) -> std::result::Result<(Self, StartElement), ParseError> {
        let mut reader = Reader::from_str(raw);
        reader.config_mut().trim_text(true);
        let mut cursor = Self { reader };

        loop {
            let position = cursor.position();
            match cursor.next_event()? {
                Event::Start(e) => {
                    let root = Self::element(&e, false, position, None)?;
                    return Ok((cursor, root));
                }
                Event::Empty(e) => {
                    let root = Self::element(&e, true, position, None)?;
                    return Ok((cursor, root));
                }
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
                Event::Eof => {
                    return Err(ParseError::Syntax {
                        position,
                        message: "document has no root element".to_string(),
                    })
                }
                _ => {
                    return Err(ParseError::Syntax {
                        position,
                        message: "content before root element".to_string(),
                    })
                }
            }
        }
    }

    /// Next child element of `parent`, or `None` once its end tag is read
    ///
    /// A child returned here must be consumed (by reading its own children to
    /// the end, [`read_text`](Self::read_text) or [`skip`](Self::skip)) before
    /// asking for the next sibling.
    pub fn next_child(
        &mut self,
        parent: &StartElement,
    ) -> std::result::Result<Option<StartElement>, ParseError> {
        if parent.empty {
            return Ok(None);
        }

        loop {
            let position = self.position();
            match self.next_event()? {
                Event::Start(e) => return Self::child(&e, false, position, parent).map(Some),
                Event::Empty(e) => return Self::child(&e, true, position, parent).map(Some),
                Event::End(e) => {
                    Self::check_end(&e, parent, position)?;
                    return Ok(None);
                }
                Event::Text(_) | Event::CData(_) => {
                    return Err(ParseError::UnexpectedText {
                        element: parent.name.clone(),
                        position,
                    })
                }
                Event::Eof => {
                    return Err(ParseError::UnexpectedEof {
                        element: parent.name.clone(),
                    })
                }
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => continue,
            }
        }
    }

    /// Read the text content of a simple element
    ///
    /// Text and CDATA sections are joined first and the result is trimmed
    /// once, so `<![CDATA[ ]]>` reads as an empty string.
    pub fn read_text(&mut self, element: &StartElement) -> std::result::Result<String, ParseError> {
        if element.empty {
            return Ok(String::new());
        }

        let mut text = String::new();
        loop {
            let position = self.position();
            match self.next_event()? {
                Event::Text(t) => {
                    let value = t.unescape().map_err(|e| syntax(position, e))?;
                    text.push_str(&value);
                }
                Event::CData(c) => {
                    let bytes = c.into_inner();
                    text.push_str(&utf8(&bytes, position)?);
                }
                Event::End(e) => {
                    Self::check_end(&e, element, position)?;
                    return Ok(text.trim().to_string());
                }
                Event::Start(e) | Event::Empty(e) => {
                    let child = Self::element(&e, true, position, Some(element))?;
                    return Err(element.unexpected_element(&child));
                }
                Event::Eof => {
                    return Err(ParseError::UnexpectedEof {
                        element: element.name.clone(),
                    })
                }
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => continue,
            }
        }
    }

    /// Read and parse the text content of a simple element
    pub fn parse_text<T: FromStr>(
        &mut self,
        element: &StartElement,
        expected: &str,
    ) -> std::result::Result<T, ParseError> {
        let text = self.read_text(element)?;
        text.parse::<T>()
            .map_err(|_| element.invalid_text(&text, expected))
    }

    /// Read the end tag of an element that allows no content
    pub fn expect_end(&mut self, element: &StartElement) -> std::result::Result<(), ParseError> {
        match self.next_child(element)? {
            Some(child) => Err(element.unexpected_element(&child)),
            None => Ok(()),
        }
    }

    /// Consume an element and everything inside it
    pub fn skip(&mut self, element: &StartElement) -> std::result::Result<(), ParseError> {
        if element.empty {
            return Ok(());
        }

        let mut depth = 0usize;
        loop {
            match self.next_event()? {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(()),
                Event::End(_) => depth -= 1,
                Event::Eof => {
                    return Err(ParseError::UnexpectedEof {
                        element: element.name.clone(),
                    })
                }
                _ => continue,
            }
        }
    }

    /// Check that nothing but comments follows the root element
    pub fn finish(mut self) -> std::result::Result<(), ParseError> {
        loop {
            let position = self.position();
            match self.next_event()? {
                Event::Eof => return Ok(()),
                Event::Comment(_) | Event::PI(_) => continue,
                _ => {
                    return Err(ParseError::Syntax {
                        position,
                        message: "content after root element".to_string(),
                    })
                }
            }
        }
    }

    fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn next_event(&mut self) -> std::result::Result<Event<'a>, ParseError> {
        let position = self.position();
        self.reader.read_event().map_err(|e| syntax(position, e))
    }

    fn check_end(
        end: &BytesEnd<'_>,
        element: &StartElement,
        position: u64,
    ) -> std::result::Result<(), ParseError> {
        let qname = end.name();
        let name = utf8(qname.local_name().as_ref(), position)?.into_owned();
        if name != element.name {
            return Err(ParseError::Syntax {
                position,
                message: format!("expected </{}>, found </{}>", element.name, name),
            });
        }
        Ok(())
    }

    /// A nested element, which must stay in its parent's namespace
    fn child(
        start: &BytesStart<'_>,
        empty: bool,
        position: u64,
        parent: &StartElement,
    ) -> std::result::Result<StartElement, ParseError> {
        let child = Self::element(start, empty, position, Some(parent))?;
        if child.namespace != parent.namespace {
            return Err(ParseError::ForeignNamespace {
                element: child.name,
                namespace: child.namespace.unwrap_or_default(),
                expected: parent.namespace.clone().unwrap_or_default(),
                position,
            });
        }
        Ok(child)
    }

    fn element(
        start: &BytesStart<'_>,
        empty: bool,
        position: u64,
        parent: Option<&StartElement>,
    ) -> std::result::Result<StartElement, ParseError> {
        let qname = start.name();
        let name = utf8(qname.local_name().as_ref(), position)?.into_owned();
        let prefix = qname
            .prefix()
            .map(|p| utf8(p.as_ref(), position).map(Cow::into_owned))
            .transpose()?;

        let mut default_namespace = parent.and_then(|p| p.default_namespace.clone());
        let mut prefixes = parent.map(|p| p.prefixes.clone()).unwrap_or_default();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| syntax(position, e))?;
            let key = utf8(attr.key.as_ref(), position)?.into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| syntax(position, e))?
                .into_owned();

            if key == "xmlns" {
                default_namespace = Some(value);
            } else if let Some(p) = key.strip_prefix("xmlns:") {
                prefixes.retain(|(bound, _)| bound != p);
                prefixes.push((p.to_string(), value));
            } else {
                attributes.push((key, value));
            }
        }

        let namespace = match prefix {
            None => default_namespace.clone(),
            Some(prefix) => prefixes
                .iter()
                .find(|(p, _)| *p == prefix)
                .map(|(_, ns)| ns.clone()),
        };

        Ok(StartElement {
            name,
            namespace,
            default_namespace,
            prefixes,
            attributes,
            empty,
            position,
        })
    }
}

fn syntax(position: u64, err: impl Display) -> ParseError {
    ParseError::Syntax {
        position,
        message: err.to_string(),
    }
}

fn utf8(bytes: &[u8], position: u64) -> std::result::Result<Cow<'_, str>, ParseError> {
    std::str::from_utf8(bytes)
        .map(Cow::Borrowed)
        .map_err(|e| syntax(position, e))
}

/// Output formatting for encoded documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Spaces per nesting level; 0 writes everything on one line
    pub indent: usize,
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>`
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 4,
            declaration: false,
        }
    }
}

/// Writer handed to document encoders
///
/// The root element can only be written through [`start_root`](Self::start_root)
/// or [`empty_root`](Self::empty_root), which stamp it with the namespace of the
/// version being written.
pub struct ElementWriter {
    writer: Writer<Vec<u8>>,
    version: SchemaVersion,
    open: Vec<String>,
    root_written: bool,
}

impl ElementWriter {
    pub(crate) fn new(version: SchemaVersion, options: &WriteOptions) -> Result<Self> {
        let mut writer = if options.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', options.indent)
        } else {
            Writer::new(Vec::new())
        };
        if options.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(write_failed)?;
        }
        Ok(Self {
            writer,
            version,
            open: Vec::new(),
            root_written: false,
        })
    }

    /// The version being written
    pub fn version(&self) -> &SchemaVersion {
        &self.version
    }

    /// Open the root element
    pub fn start_root(&mut self, attributes: &[(&str, &str)]) -> Result<()> {
        let start = self.root_tag(attributes)?;
        self.writer.write_event(Event::Start(start)).map_err(write_failed)?;
        self.open.push(self.version.local_name.clone());
        Ok(())
    }

    /// Write the root as `<name .../>`
    pub fn empty_root(&mut self, attributes: &[(&str, &str)]) -> Result<()> {
        let start = self.root_tag(attributes)?;
        self.writer.write_event(Event::Empty(start)).map_err(write_failed)
    }

    /// Open a nested element
    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.ensure_inside_root(name)?;
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(start)).map_err(write_failed)?;
        self.open.push(name.to_string());
        Ok(())
    }

    /// Write `<name .../>`
    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.ensure_inside_root(name)?;
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(start)).map_err(write_failed)
    }

    /// Write `<name>text</name>`
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.ensure_inside_root(name)?;
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(write_failed)?;
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_failed)?;
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(write_failed)
    }

    /// Close the innermost open element
    pub fn end(&mut self) -> Result<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| SchemaError::InvalidModel("no open element to close".to_string()))?;
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(write_failed)
    }

    pub(crate) fn finish(self) -> Result<String> {
        if !self.root_written {
            return Err(SchemaError::InvalidModel(format!(
                "encoder for {} wrote no root element",
                self.version
            )));
        }
        if let Some(name) = self.open.last() {
            return Err(SchemaError::InvalidModel(format!(
                "encoder for {} left <{}> open",
                self.version, name
            )));
        }
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| SchemaError::InvalidModel(e.to_string()))
    }

    fn root_tag(&mut self, attributes: &[(&str, &str)]) -> Result<BytesStart<'static>> {
        if self.root_written {
            return Err(SchemaError::InvalidModel(format!(
                "encoder for {} wrote a second root element",
                self.version
            )));
        }
        self.root_written = true;
        let namespace = self.version.namespace_uri();
        let mut start = BytesStart::new(self.version.local_name.clone());
        start.push_attribute(("xmlns", namespace.as_str()));
        for &attribute in attributes {
            start.push_attribute(attribute);
        }
        Ok(start)
    }

    fn ensure_inside_root(&self, name: &str) -> Result<()> {
        if self.open.is_empty() {
            return Err(SchemaError::InvalidModel(format!(
                "<{}> written outside the root element",
                name
            )));
        }
        Ok(())
    }
}

fn write_failed(err: impl Display) -> SchemaError {
    SchemaError::Io(std::io::Error::other(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<!-- leading comment -->
<root xmlns="urn:jboss:root:1.0" a="1" b="x &amp; y">
    <first value="10"/>
    <second>  some text  </second>
    <nested><inner/><inner/></nested>
</root>
"#;

    #[test]
    fn test_walks_document() {
        let (mut reader, root) = ElementReader::open(DOC).unwrap();
        assert_eq!(root.name(), "root");
        assert_eq!(root.namespace(), Some("urn:jboss:root:1.0"));
        assert_eq!(root.attribute("b"), Some("x & y"));
        assert_eq!(root.attributes().count(), 2);

        let first = reader.next_child(&root).unwrap().unwrap();
        assert_eq!(first.name(), "first");
        assert!(first.is_empty());
        assert_eq!(first.parse_required_attribute::<u32>("value", "an integer").unwrap(), 10);
        assert!(reader.next_child(&first).unwrap().is_none());

        let second = reader.next_child(&root).unwrap().unwrap();
        assert_eq!(reader.read_text(&second).unwrap(), "some text");

        let nested = reader.next_child(&root).unwrap().unwrap();
        reader.skip(&nested).unwrap();

        assert!(reader.next_child(&root).unwrap().is_none());
        reader.finish().unwrap();
    }

    #[test]
    fn test_prefixed_root_namespace() {
        let (_, root) = ElementReader::open(r#"<x:root xmlns:x="urn:jboss:root:2.0"/>"#).unwrap();
        assert_eq!(root.name(), "root");
        assert_eq!(root.namespace(), Some("urn:jboss:root:2.0"));
    }

    #[test]
    fn test_cdata_text_is_trimmed() {
        let (mut reader, root) = ElementReader::open(
            "<root><blank><![CDATA[ ]]></blank><mixed> a <![CDATA[ b ]]></mixed></root>",
        )
        .unwrap();

        let blank = reader.next_child(&root).unwrap().unwrap();
        assert_eq!(reader.read_text(&blank).unwrap(), "");

        let mixed = reader.next_child(&root).unwrap().unwrap();
        assert_eq!(reader.read_text(&mixed).unwrap(), "a b");
    }

    #[test]
    fn test_children_inherit_root_namespace() {
        let doc = r#"<x:root xmlns:x="urn:jboss:root:2.0"><x:child/><x:other xmlns:x="urn:jboss:root:2.0"/></x:root>"#;
        let (mut reader, root) = ElementReader::open(doc).unwrap();

        let child = reader.next_child(&root).unwrap().unwrap();
        assert_eq!(child.namespace(), Some("urn:jboss:root:2.0"));
        let other = reader.next_child(&root).unwrap().unwrap();
        assert_eq!(other.name(), "other");
        assert!(reader.next_child(&root).unwrap().is_none());
    }

    #[test]
    fn test_child_in_foreign_namespace() {
        let (mut reader, root) =
            ElementReader::open(r#"<root xmlns="urn:jboss:root:1.0"><first xmlns="urn:other"/></root>"#).unwrap();
        match reader.next_child(&root) {
            Err(ParseError::ForeignNamespace { element, namespace, expected, .. }) => {
                assert_eq!(element, "first");
                assert_eq!(namespace, "urn:other");
                assert_eq!(expected, "urn:jboss:root:1.0");
            }
            other => panic!("expected ForeignNamespace, got {other:?}"),
        }

        let (mut reader, root) =
            ElementReader::open(r#"<root xmlns="urn:jboss:root:1.0"><y:first/></root>"#).unwrap();
        assert!(matches!(
            reader.next_child(&root),
            Err(ParseError::ForeignNamespace { ref namespace, .. }) if namespace.is_empty()
        ));
    }

    #[test]
    fn test_missing_and_unexpected_attributes() {
        let (_, root) = ElementReader::open(r#"<root other="1"/>"#).unwrap();
        assert!(matches!(
            root.required_attribute("value"),
            Err(ParseError::MissingAttribute { ref attribute, .. }) if attribute == "value"
        ));
        assert!(matches!(
            root.allow_attributes(&["value"]),
            Err(ParseError::UnexpectedAttribute { ref attribute, .. }) if attribute == "other"
        ));
        assert!(matches!(
            root.parse_attribute::<u32>("other", "an integer"),
            Ok(Some(1))
        ));
    }

    #[test]
    fn test_text_is_rejected_where_elements_belong() {
        let (mut reader, root) = ElementReader::open("<root>stray</root>").unwrap();
        assert!(matches!(
            reader.next_child(&root),
            Err(ParseError::UnexpectedText { ref element, .. }) if element == "root"
        ));
    }

    #[test]
    fn test_truncated_document() {
        let (mut reader, root) = ElementReader::open("<root><child>").unwrap();
        let child = reader.next_child(&root).unwrap().unwrap();
        assert!(reader.next_child(&child).is_err());
    }

    #[test]
    fn test_content_after_root() {
        let (mut reader, root) = ElementReader::open("<root/><again/>").unwrap();
        assert!(reader.next_child(&root).unwrap().is_none());
        assert!(matches!(reader.finish(), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(ElementReader::open("   "), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn test_writer_stamps_namespace() {
        let version = SchemaVersion::new("root", 3, 0);
        let mut writer = ElementWriter::new(version, &WriteOptions { indent: 0, declaration: false }).unwrap();
        writer.start_root(&[("mode", "a<b")]).unwrap();
        writer.empty("child", &[("value", "1")]).unwrap();
        writer.text_element("text", "x & y").unwrap();
        writer.end().unwrap();
        let xml = writer.finish().unwrap();
        assert_eq!(
            xml,
            r#"<root xmlns="urn:jboss:root:3.0" mode="a&lt;b"><child value="1"/><text>x &amp; y</text></root>"#
        );
    }

    #[test]
    fn test_writer_rejects_misuse() {
        let options = WriteOptions::default();
        let writer = ElementWriter::new(SchemaVersion::new("root", 1, 0), &options).unwrap();
        assert!(writer.finish().is_err());

        let mut writer = ElementWriter::new(SchemaVersion::new("root", 1, 0), &options).unwrap();
        assert!(writer.empty("child", &[]).is_err());
        writer.start_root(&[]).unwrap();
        assert!(writer.finish().is_err());

        let mut writer = ElementWriter::new(SchemaVersion::new("root", 1, 0), &options).unwrap();
        writer.empty_root(&[]).unwrap();
        assert!(writer.empty_root(&[]).is_err());
    }
}
