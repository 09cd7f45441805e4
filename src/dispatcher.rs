//! Parser Dispatcher
//!
//! Binds every version of a [`SchemaRegistry`] to the decoder for its
//! document structure, and the current version to the encoder used for all
//! output. Dispatchers are assembled with a [`DispatcherBuilder`] on the
//! startup path and are read-only once built.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, trace, warn};

use crate::error::{ParseError, Result, SchemaError};
use crate::model::ModelNode;
use crate::registry::SchemaRegistry;
use crate::version::SchemaVersion;
use crate::xml::{ElementReader, ElementWriter, StartElement, WriteOptions};

/// Decodes one schema version of a document into the configuration model
///
/// The reader is positioned just after the root start tag; implementations
/// consume the root's content up to its end tag.
pub trait DocumentReader: Send + Sync {
    fn read(
        &self,
        reader: &mut ElementReader<'_>,
        root: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError>;
}

impl<F> DocumentReader for F
where
    F: Fn(&mut ElementReader<'_>, &StartElement) -> std::result::Result<ModelNode, ParseError>
        + Send
        + Sync,
{
    fn read(
        &self,
        reader: &mut ElementReader<'_>,
        root: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError> {
        self(reader, root)
    }
}

/// Encodes the configuration model in the current schema version
pub trait DocumentWriter: Send + Sync {
    fn write(&self, model: &ModelNode, writer: &mut ElementWriter) -> Result<()>;
}

impl<F> DocumentWriter for F
where
    F: Fn(&ModelNode, &mut ElementWriter) -> Result<()> + Send + Sync,
{
    fn write(&self, model: &ModelNode, writer: &mut ElementWriter) -> Result<()> {
        self(model, writer)
    }
}

/// A decoded document together with the version it was written in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub version: SchemaVersion,
    pub model: ModelNode,
}

struct ParserEntry {
    reader: Box<dyn DocumentReader>,
    writer: Option<Box<dyn DocumentWriter>>,
}

/// Collects parser bindings before freezing them into a [`ParserDispatcher`]
pub struct DispatcherBuilder {
    registry: SchemaRegistry,
    readers: BTreeMap<SchemaVersion, Box<dyn DocumentReader>>,
    writer: Option<Box<dyn DocumentWriter>>,
    options: WriteOptions,
}

impl DispatcherBuilder {
    pub fn new(registry: SchemaRegistry) -> Self {
        Self {
            registry,
            readers: BTreeMap::new(),
            writer: None,
            options: WriteOptions::default(),
        }
    }

    /// Bind the decoder for a registered version
    pub fn register_parser(
        &mut self,
        version: &SchemaVersion,
        reader: impl DocumentReader + 'static,
    ) -> Result<&mut Self> {
        if !self.registry.contains(version) {
            return Err(SchemaError::UnregisteredVersion(version.namespace_uri()));
        }
        if self.readers.contains_key(version) {
            return Err(SchemaError::DuplicateVersion {
                local_name: version.local_name.clone(),
                major: version.major,
                minor: version.minor,
            });
        }
        self.readers.insert(version.clone(), Box::new(reader));
        Ok(self)
    }

    /// Bind the encoder for the registry's current version
    pub fn register_writer(&mut self, writer: impl DocumentWriter + 'static) -> &mut Self {
        self.writer = Some(Box::new(writer));
        self
    }

    /// Formatting used by [`ParserDispatcher::encode`]
    pub fn write_options(&mut self, options: WriteOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Validate the bindings and freeze them
    pub fn build(mut self) -> Result<ParserDispatcher> {
        let current = self.registry.current()?.clone();

        if let Some(missing) = self
            .registry
            .versions()
            .iter()
            .find(|v| !self.readers.contains_key(*v))
        {
            return Err(SchemaError::MissingDecoder(missing.namespace_uri()));
        }

        let writer = self
            .writer
            .take()
            .ok_or_else(|| SchemaError::NoEncoderRegistered(current.namespace_uri()))?;

        let mut entries: BTreeMap<SchemaVersion, ParserEntry> = self
            .readers
            .into_iter()
            .map(|(version, reader)| (version, ParserEntry { reader, writer: None }))
            .collect();
        if let Some(entry) = entries.get_mut(&current) {
            entry.writer = Some(writer);
        }

        info!(
            kind = %self.registry.local_name(),
            versions = self.registry.len(),
            current = %current.namespace_uri(),
            "parser dispatcher ready"
        );

        Ok(ParserDispatcher {
            registry: self.registry,
            entries,
            current,
            options: self.options,
        })
    }
}

/// Immutable namespace → parser lookup for one document kind
pub struct ParserDispatcher {
    registry: SchemaRegistry,
    entries: BTreeMap<SchemaVersion, ParserEntry>,
    current: SchemaVersion,
    options: WriteOptions,
}

impl fmt::Debug for ParserDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserDispatcher")
            .field("registry", &self.registry)
            .field("current", &self.current)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ParserDispatcher {
    pub fn builder(registry: SchemaRegistry) -> DispatcherBuilder {
        DispatcherBuilder::new(registry)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Root element name of the document kind
    pub fn local_name(&self) -> &str {
        self.registry.local_name()
    }

    /// The version every document is written in
    pub fn current(&self) -> &SchemaVersion {
        &self.current
    }

    /// Decode a document declared to be in `namespace_uri`
    ///
    /// Fails without producing any model if the namespace is unknown, the
    /// document's root does not match it, or the decoder rejects the content.
    pub fn decode(&self, namespace_uri: &str, raw: &str) -> Result<ModelNode> {
        let result = self.try_decode(namespace_uri, raw);
        if let Err(err) = &result {
            warn!(namespace = %namespace_uri, error = %err, "rejected configuration document");
        }
        result
    }

    /// Decode a document using the namespace declared on its own root element
    pub fn read(&self, raw: &str) -> Result<Decoded> {
        let namespace = root_namespace(raw)?;
        let model = self.decode(&namespace, raw)?;
        let version = self.registry.resolve(&namespace)?.clone();
        Ok(Decoded { version, model })
    }

    /// Encode a model in the current schema version
    pub fn encode(&self, model: &ModelNode) -> Result<String> {
        if model.name != self.local_name() {
            return Err(SchemaError::InvalidModel(format!(
                "'{}' model cannot be written as <{}>",
                model.name,
                self.local_name()
            )));
        }

        let encoder = self
            .entries
            .get(&self.current)
            .and_then(|entry| entry.writer.as_deref())
            .ok_or_else(|| SchemaError::NoEncoderRegistered(self.current.namespace_uri()))?;

        let mut writer = ElementWriter::new(self.current.clone(), &self.options)?;
        encoder.write(model, &mut writer)?;
        let output = writer.finish()?;
        debug!(namespace = %self.current.namespace_uri(), bytes = output.len(), "encoded configuration model");
        Ok(output)
    }

    /// Re-write a document of any supported version in the current version
    pub fn upgrade(&self, raw: &str) -> Result<String> {
        let decoded = self.read(raw)?;
        self.encode(&decoded.model)
    }

    fn try_decode(&self, namespace_uri: &str, raw: &str) -> Result<ModelNode> {
        let version = self.registry.resolve(namespace_uri)?;
        trace!(namespace = %namespace_uri, "namespace resolved");

        let entry = self
            .entries
            .get(version)
            .ok_or_else(|| SchemaError::MissingDecoder(version.namespace_uri()))?;
        trace!(version = %version, "version matched");

        let malformed = |source: ParseError| SchemaError::MalformedDocument {
            namespace: namespace_uri.to_string(),
            source,
        };

        let (mut reader, root) = ElementReader::open(raw).map_err(malformed)?;
        if root.name() != version.local_name {
            return Err(malformed(ParseError::RootMismatch {
                expected: version.local_name.clone(),
                found: root.name().to_string(),
            }));
        }
        let expected = version.namespace_uri();
        if root.namespace() != Some(expected.as_str()) {
            return Err(malformed(ParseError::NamespaceMismatch {
                expected,
                found: root.namespace().unwrap_or_default().to_string(),
            }));
        }

        // The model only leaves this function once the whole document,
        // trailing content included, has been accepted.
        let model = entry.reader.read(&mut reader, &root).map_err(malformed)?;
        reader.finish().map_err(malformed)?;

        debug!(version = %version, "decoded configuration document");
        Ok(model)
    }
}

/// Namespace declared on a document's root element
pub fn root_namespace(raw: &str) -> Result<String> {
    let (_, root) = ElementReader::open(raw).map_err(|source| SchemaError::MalformedDocument {
        namespace: String::new(),
        source,
    })?;
    root.namespace()
        .map(str::to_string)
        .ok_or_else(|| SchemaError::UnknownNamespace(format!("<{}> declares no namespace", root.name())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::with_versions("shared-session-config", &[(1, 0), (2, 0)]).unwrap()
    }

    fn v(major: u32, minor: u32) -> SchemaVersion {
        SchemaVersion::new("shared-session-config", major, minor)
    }

    // 1.0 spells the limit as an attribute on the root, 2.0 as a child element.
    fn read_1_0(
        reader: &mut ElementReader<'_>,
        root: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError> {
        root.allow_attributes(&["max-active-sessions"])?;
        let mut model = ModelNode::new("shared-session-config");
        model.set_optional(
            "max-active-sessions",
            root.parse_attribute::<u32>("max-active-sessions", "an integer")?
                .map(|n| n.to_string()),
        );
        if let Some(child) = reader.next_child(root)? {
            return Err(root.unexpected_element(&child));
        }
        Ok(model)
    }

    fn read_2_0(
        reader: &mut ElementReader<'_>,
        root: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError> {
        root.allow_attributes(&[])?;
        let mut model = ModelNode::new("shared-session-config");
        while let Some(child) = reader.next_child(root)? {
            match child.name() {
                "max-active-sessions" => {
                    let value: u32 = child.parse_required_attribute("value", "an integer")?;
                    model.set_attribute("max-active-sessions", value.to_string());
                    reader.skip(&child)?;
                }
                _ => return Err(root.unexpected_element(&child)),
            }
        }
        Ok(model)
    }

    fn write_2_0(model: &ModelNode, writer: &mut ElementWriter) -> Result<()> {
        match model.attribute("max-active-sessions") {
            Some(value) => {
                writer.start_root(&[])?;
                writer.empty("max-active-sessions", &[("value", value)])?;
                writer.end()
            }
            None => writer.empty_root(&[]),
        }
    }

    fn dispatcher() -> ParserDispatcher {
        let mut builder = ParserDispatcher::builder(registry());
        builder.register_parser(&v(1, 0), read_1_0).unwrap();
        builder.register_parser(&v(2, 0), read_2_0).unwrap();
        builder.register_writer(write_2_0);
        builder.write_options(WriteOptions { indent: 0, declaration: false });
        builder.build().unwrap()
    }

    #[test]
    fn test_decode_each_version() {
        let d = dispatcher();
        let old = d
            .decode(
                "urn:jboss:shared-session-config:1.0",
                r#"<shared-session-config xmlns="urn:jboss:shared-session-config:1.0" max-active-sessions="5"/>"#,
            )
            .unwrap();
        let new = d
            .decode(
                "urn:jboss:shared-session-config:2.0",
                r#"<shared-session-config xmlns="urn:jboss:shared-session-config:2.0"><max-active-sessions value="5"/></shared-session-config>"#,
            )
            .unwrap();
        assert_eq!(old, new);
    }

    #[test]
    fn test_encode_uses_current_version() {
        let d = dispatcher();
        let model = ModelNode::new("shared-session-config").with_attribute("max-active-sessions", "7");
        let xml = d.encode(&model).unwrap();
        assert_eq!(
            xml,
            r#"<shared-session-config xmlns="urn:jboss:shared-session-config:2.0"><max-active-sessions value="7"/></shared-session-config>"#
        );
        assert_eq!(d.decode("urn:jboss:shared-session-config:2.0", &xml).unwrap(), model);
    }

    #[test]
    fn test_encode_rejects_model_of_another_kind() {
        let d = dispatcher();
        let result = d.encode(&ModelNode::new("subsystem").with_attribute("max-active-sessions", "7"));
        assert!(matches!(result, Err(SchemaError::InvalidModel(_))));
    }

    #[test]
    fn test_upgrade_old_document() {
        let d = dispatcher();
        let upgraded = d
            .upgrade(r#"<shared-session-config xmlns="urn:jboss:shared-session-config:1.0"/>"#)
            .unwrap();
        assert_eq!(
            upgraded,
            r#"<shared-session-config xmlns="urn:jboss:shared-session-config:2.0"/>"#
        );
    }

    #[test]
    fn test_read_reports_version() {
        let d = dispatcher();
        let decoded = d
            .read(r#"<shared-session-config xmlns="urn:jboss:shared-session-config:1.0" max-active-sessions="1"/>"#)
            .unwrap();
        assert_eq!(decoded.version, v(1, 0));
        assert_eq!(decoded.model.attribute("max-active-sessions"), Some("1"));
    }

    #[test]
    fn test_unknown_namespace() {
        let d = dispatcher();
        let result = d.decode("urn:jboss:subsystem:1.0", r#"<subsystem xmlns="urn:jboss:subsystem:1.0"/>"#);
        assert!(matches!(result, Err(SchemaError::UnknownNamespace(_))));

        let result = d.read(r#"<shared-session-config/>"#);
        assert!(matches!(result, Err(SchemaError::UnknownNamespace(_))));
    }

    #[test]
    fn test_unknown_version() {
        let d = dispatcher();
        let result = d.read(r#"<shared-session-config xmlns="urn:jboss:shared-session-config:3.0"/>"#);
        assert!(matches!(result, Err(SchemaError::UnknownVersion { major: 3, .. })));
    }

    #[test]
    fn test_malformed_documents() {
        let d = dispatcher();
        let ns = "urn:jboss:shared-session-config:2.0";
        let cases = [
            // wrong value type
            r#"<shared-session-config xmlns="urn:jboss:shared-session-config:2.0"><max-active-sessions value="x"/></shared-session-config>"#,
            // missing attribute
            r#"<shared-session-config xmlns="urn:jboss:shared-session-config:2.0"><max-active-sessions/></shared-session-config>"#,
            // unexpected child
            r#"<shared-session-config xmlns="urn:jboss:shared-session-config:2.0"><other/></shared-session-config>"#,
            // namespace on the document disagrees with the one given
            r#"<shared-session-config xmlns="urn:jboss:shared-session-config:1.0"/>"#,
            // wrong root element
            r#"<subsystem xmlns="urn:jboss:shared-session-config:2.0"/>"#,
            // trailing content after an otherwise valid document
            r#"<shared-session-config xmlns="urn:jboss:shared-session-config:2.0"/><extra/>"#,
            // not XML
            "<shared-session-config",
        ];
        for raw in cases {
            match d.decode(ns, raw) {
                Err(SchemaError::MalformedDocument { namespace, .. }) => assert_eq!(namespace, ns),
                other => panic!("expected MalformedDocument for {raw}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_register_parser_for_unknown_version() {
        let mut builder = ParserDispatcher::builder(registry());
        let result = builder.register_parser(&v(3, 0), read_2_0);
        assert!(matches!(result, Err(SchemaError::UnregisteredVersion(_))));
    }

    #[test]
    fn test_register_parser_twice() {
        let mut builder = ParserDispatcher::builder(registry());
        builder.register_parser(&v(1, 0), read_1_0).unwrap();
        assert!(matches!(
            builder.register_parser(&v(1, 0), read_2_0),
            Err(SchemaError::DuplicateVersion { .. })
        ));
    }

    #[test]
    fn test_build_without_encoder() {
        let mut builder = ParserDispatcher::builder(registry());
        builder.register_parser(&v(1, 0), read_1_0).unwrap();
        builder.register_parser(&v(2, 0), read_2_0).unwrap();
        match builder.build() {
            Err(SchemaError::NoEncoderRegistered(ns)) => {
                assert_eq!(ns, "urn:jboss:shared-session-config:2.0")
            }
            other => panic!("expected NoEncoderRegistered, got {other:?}"),
        }
    }

    #[test]
    fn test_build_without_every_decoder() {
        let mut builder = ParserDispatcher::builder(registry());
        builder.register_parser(&v(2, 0), read_2_0).unwrap();
        builder.register_writer(write_2_0);
        assert!(matches!(builder.build(), Err(SchemaError::MissingDecoder(ns)) if ns.ends_with(":1.0")));
    }

    #[test]
    fn test_build_empty_registry() {
        let builder = ParserDispatcher::builder(SchemaRegistry::new("subsystem"));
        assert!(matches!(builder.build(), Err(SchemaError::EmptyRegistry(_))));
    }

    #[test]
    fn test_dispatcher_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ParserDispatcher>();
    }
}
