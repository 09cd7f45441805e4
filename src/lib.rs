//! Subsystem Schemas
//!
//! Versioned XML namespace resolution and parser dispatch for subsystem
//! configuration documents.
//!
//! ## Features
//!
//! - **Strict Namespaces**: `urn:jboss:<name>:<major>.<minor>` is parsed exactly; anything else is rejected
//! - **Version Registry**: each document kind declares a closed, ordered set of schema versions
//! - **Dispatch**: a document is decoded by the reader bound to the version its root declares
//! - **Upgrade on Write**: models are always written in the current version
//! - **Checksum Validation**: SHA256 over a model's JSON shows whether a migration preserved it
//!
//! ## Architecture
//!
//! ```text
//! document ──root xmlns──▶ SchemaRegistry::resolve ──▶ SchemaVersion
//!                                                          │
//!                          ParserDispatcher ◀──────────────┘
//!                               │ reader for that version
//!                               ▼
//!                           ModelNode ──writer for current──▶ document
//! ```
//!
//! ```
//! use subsystem_schemas::{ParsingContext, WriteOptions};
//!
//! let context = ParsingContext::standard(WriteOptions::default()).unwrap();
//! let decoded = context
//!     .read(r#"<subsystem xmlns="urn:jboss:subsystem:1.0"/>"#)
//!     .unwrap();
//! assert_eq!(decoded.version.to_string(), "subsystem 1.0");
//! ```

pub mod checksum;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod expiration;
pub mod kinds;
pub mod model;
pub mod registry;
pub mod schema;
pub mod version;
pub mod xml;

pub use checksum::Checksum;
pub use config::SchemaConfig;
pub use context::ParsingContext;
pub use dispatcher::{Decoded, DispatcherBuilder, DocumentReader, DocumentWriter, ParserDispatcher};
pub use error::{ParseError, Result, SchemaError};
pub use expiration::{Expiration, ExpirationMetaData};
pub use kinds::{OpenTracingSchema, SharedSessionConfigSchema};
pub use model::ModelNode;
pub use registry::SchemaRegistry;
pub use schema::VersionedSchema;
pub use version::{NamespaceUri, SchemaVersion};
pub use xml::{ElementReader, ElementWriter, StartElement, WriteOptions};
