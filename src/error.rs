//! Error types for schema resolution and parser dispatch

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema registry and dispatcher errors
///
/// `DuplicateVersion`, `EmptyRegistry`, `UnregisteredVersion`, `MissingDecoder`,
/// `NoEncoderRegistered` and `DuplicateKind` are startup defects: the static
/// declarations are wrong and the host should refuse to start.
/// `UnknownNamespace`, `UnknownVersion` and `MalformedDocument` reject an
/// untrusted configuration document.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema version already registered: {local_name} {major}.{minor}")]
    DuplicateVersion {
        local_name: String,
        major: u32,
        minor: u32,
    },

    #[error("Schema registry for '{0}' has no versions")]
    EmptyRegistry(String),

    #[error("Schema version is not part of the registry: {0}")]
    UnregisteredVersion(String),

    #[error("No decoder bound for {0}")]
    MissingDecoder(String),

    #[error("No encoder bound for current version {0}")]
    NoEncoderRegistered(String),

    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    #[error("Unknown version {major}.{minor} of '{local_name}' ({namespace})")]
    UnknownVersion {
        namespace: String,
        local_name: String,
        major: u32,
        minor: u32,
    },

    #[error("Malformed document for {namespace}: {source}")]
    MalformedDocument {
        namespace: String,
        #[source]
        source: ParseError,
    },

    #[error("Invalid configuration model: {0}")]
    InvalidModel(String),

    #[error("Document kind already registered: {0}")]
    DuplicateKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Structural errors raised while reading a document.
///
/// Every variant carries the element (and attribute, where there is one) it
/// was raised for, plus the byte offset in the input when it is known.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("unexpected end of document inside <{element}>")]
    UnexpectedEof { element: String },

    #[error("expected root element <{expected}>, found <{found}>")]
    RootMismatch { expected: String, found: String },

    #[error("root element declares namespace '{found}', expected '{expected}'")]
    NamespaceMismatch { expected: String, found: String },

    #[error("<{element}> is in namespace '{namespace}', expected the document namespace '{expected}' (byte {position})")]
    ForeignNamespace {
        element: String,
        namespace: String,
        expected: String,
        position: u64,
    },

    #[error("<{element}> is missing required attribute '{attribute}' (byte {position})")]
    MissingAttribute {
        element: String,
        attribute: String,
        position: u64,
    },

    #[error("<{element}> has unexpected attribute '{attribute}' (byte {position})")]
    UnexpectedAttribute {
        element: String,
        attribute: String,
        position: u64,
    },

    #[error("<{element}> attribute '{attribute}' has invalid value '{value}', expected {expected} (byte {position})")]
    InvalidAttributeValue {
        element: String,
        attribute: String,
        value: String,
        expected: String,
        position: u64,
    },

    #[error("unexpected element <{element}> inside <{parent}> (byte {position})")]
    UnexpectedElement {
        parent: String,
        element: String,
        position: u64,
    },

    #[error("<{element}> may appear only once inside <{parent}> (byte {position})")]
    DuplicateElement {
        parent: String,
        element: String,
        position: u64,
    },

    #[error("<{parent}> is missing required element <{element}>")]
    MissingElement { parent: String, element: String },

    #[error("<{element}> has invalid content '{value}', expected {expected} (byte {position})")]
    InvalidText {
        element: String,
        value: String,
        expected: String,
        position: u64,
    },

    #[error("<{element}> does not allow text content (byte {position})")]
    UnexpectedText { element: String, position: u64 },

    #[error("<{element}> attribute '{attribute}' refers to undeclared '{value}'")]
    UnresolvedReference {
        element: String,
        attribute: String,
        value: String,
    },
}

impl SchemaError {
    /// True for errors that reject an input document rather than signal a
    /// broken static declaration.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            SchemaError::UnknownNamespace(_)
                | SchemaError::UnknownVersion { .. }
                | SchemaError::MalformedDocument { .. }
        )
    }
}
