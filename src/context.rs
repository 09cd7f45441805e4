//! Host-side entry point routing documents to the dispatcher of their kind

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::dispatcher::{Decoded, ParserDispatcher};
use crate::error::{Result, SchemaError};
use crate::kinds::{opentracing, shared_session};
use crate::model::ModelNode;
use crate::xml::{ElementReader, WriteOptions};

/// Dispatchers keyed by the root element name of their document kind
#[derive(Debug, Default)]
pub struct ParsingContext {
    dispatchers: BTreeMap<String, ParserDispatcher>,
}

impl ParsingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with every built-in document kind registered
    pub fn standard(options: WriteOptions) -> Result<Self> {
        let mut context = Self::new();
        context.register(shared_session::dispatcher(options.clone())?)?;
        context.register(opentracing::dispatcher(options)?)?;
        info!(kinds = context.dispatchers.len(), "parsing context ready");
        Ok(context)
    }

    /// Add the dispatcher for a document kind
    pub fn register(&mut self, dispatcher: ParserDispatcher) -> Result<&mut Self> {
        let kind = dispatcher.local_name().to_string();
        if self.dispatchers.contains_key(&kind) {
            return Err(SchemaError::DuplicateKind(kind));
        }
        debug!(kind = %kind, current = %dispatcher.current(), "registered document kind");
        self.dispatchers.insert(kind, dispatcher);
        Ok(self)
    }

    pub fn dispatcher(&self, kind: &str) -> Option<&ParserDispatcher> {
        self.dispatchers.get(kind)
    }

    /// Registered dispatchers, ordered by kind
    pub fn dispatchers(&self) -> impl Iterator<Item = &ParserDispatcher> {
        self.dispatchers.values()
    }

    /// Decode a document of any registered kind
    pub fn read(&self, raw: &str) -> Result<Decoded> {
        self.dispatcher_for(raw)?.read(raw)
    }

    /// Read and decode a file
    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<Decoded> {
        let raw = std::fs::read_to_string(path)?;
        self.read(&raw)
    }

    /// Encode a model at the current version of `kind`
    pub fn write(&self, kind: &str, model: &ModelNode) -> Result<String> {
        self.lookup(kind)?.encode(model)
    }

    /// Re-write a document of any registered kind at its current version
    pub fn upgrade(&self, raw: &str) -> Result<String> {
        self.dispatcher_for(raw)?.upgrade(raw)
    }

    fn dispatcher_for(&self, raw: &str) -> Result<&ParserDispatcher> {
        let (_, root) = ElementReader::open(raw).map_err(|source| SchemaError::MalformedDocument {
            namespace: String::new(),
            source,
        })?;
        self.lookup(root.name())
    }

    fn lookup(&self, kind: &str) -> Result<&ParserDispatcher> {
        self.dispatchers
            .get(kind)
            .ok_or_else(|| SchemaError::UnknownNamespace(format!("no document kind '{}' is registered", kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::SchemaVersion;

    fn context() -> ParsingContext {
        ParsingContext::standard(WriteOptions { indent: 0, declaration: false }).unwrap()
    }

    #[test]
    fn test_routes_by_root_element() {
        let ctx = context();

        let session = ctx
            .read(r#"<shared-session-config xmlns="urn:jboss:shared-session-config:1.0"/>"#)
            .unwrap();
        assert_eq!(session.version, SchemaVersion::new("shared-session-config", 1, 0));

        let tracing = ctx.read(r#"<subsystem xmlns="urn:jboss:subsystem:2.0"/>"#).unwrap();
        assert_eq!(tracing.version, SchemaVersion::new("subsystem", 2, 0));
    }

    #[test]
    fn test_unknown_kind() {
        let err = context().read(r#"<undertow xmlns="urn:jboss:undertow:1.0"/>"#).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownNamespace(_)));

        let err = context().write("undertow", &ModelNode::new("undertow")).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownNamespace(_)));
    }

    #[test]
    fn test_duplicate_kind() {
        let mut ctx = context();
        let again = opentracing::dispatcher(WriteOptions::default()).unwrap();
        let err = ctx.register(again).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateKind(ref kind) if kind == "subsystem"));
    }

    #[test]
    fn test_write_uses_current_version() {
        let xml = context().write("subsystem", &ModelNode::new("subsystem")).unwrap();
        assert_eq!(xml, r#"<subsystem xmlns="urn:jboss:subsystem:3.0"/>"#);
    }

    #[test]
    fn test_write_rejects_model_of_another_kind() {
        let err = context()
            .write("subsystem", &ModelNode::new("shared-session-config"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidModel(_)));
    }

    #[test]
    fn test_read_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracing.xml");
        std::fs::write(&path, r#"<subsystem xmlns="urn:jboss:subsystem:3.0"/>"#).unwrap();

        let decoded = context().read_path(&path).unwrap();
        assert_eq!(decoded.version.major, 3);

        let missing = context().read_path(dir.path().join("absent.xml")).unwrap_err();
        assert!(matches!(missing, SchemaError::Io(_)));
    }
}
