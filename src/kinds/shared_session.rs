//! `shared-session-config` documents
//!
//! Session manager settings shared by all web modules of an application.
//! Version 2.0 dropped `replication-trigger`; 1.0 documents that still carry
//! it are accepted and the value is discarded.
//!
//! ```xml
//! <shared-session-config xmlns="urn:jboss:shared-session-config:2.0">
//!     <max-active-sessions value="1000"/>
//!     <replication-config>
//!         <cache-name>web.dist</cache-name>
//!         <replication-granularity>ATTRIBUTE</replication-granularity>
//!     </replication-config>
//!     <session-config>
//!         <session-timeout>30</session-timeout>
//!         <cookie-config>
//!             <name>JSESSIONID</name>
//!             <http-only>true</http-only>
//!         </cookie-config>
//!         <tracking-mode>COOKIE</tracking-mode>
//!     </session-config>
//!     <session-id-separator>.</session-id-separator>
//! </shared-session-config>
//! ```

use tracing::warn;

use crate::dispatcher::{DocumentReader, ParserDispatcher};
use crate::error::{ParseError, Result, SchemaError};
use crate::expiration::Expiration;
use crate::model::ModelNode;
use crate::schema::VersionedSchema;
use crate::xml::{ElementReader, ElementWriter, StartElement, WriteOptions};

pub const ROOT: &str = "shared-session-config";
pub const MAX_ACTIVE_SESSIONS: &str = "max-active-sessions";
pub const SESSION_ID_SEPARATOR: &str = "session-id-separator";
pub const SESSION_CONFIG: &str = "session-config";
pub const SESSION_TIMEOUT: &str = "session-timeout";
pub const TRACKING_MODE: &str = "tracking-mode";
pub const COOKIE_CONFIG: &str = "cookie-config";
pub const REPLICATION_CONFIG: &str = "replication-config";
pub const CACHE_NAME: &str = "cache-name";
pub const REPLICATION_GRANULARITY: &str = "replication-granularity";
pub const REPLICATION_TRIGGER: &str = "replication-trigger";

/// Session timeout applied when none is configured, in minutes
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: i64 = 30;

/// Text children of `<cookie-config>`, in schema order
const COOKIE_TEXT: &[&str] = &["name", "domain", "path", "comment"];
/// Boolean children of `<cookie-config>`, in schema order
const COOKIE_FLAGS: &[&str] = &["http-only", "secure"];
const COOKIE_MAX_AGE: &str = "max-age";

/// Versions of the shared session configuration schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedSessionConfigSchema {
    V1_0,
    V2_0,
}

impl VersionedSchema for SharedSessionConfigSchema {
    const LOCAL_NAME: &'static str = ROOT;
    const ALL: &'static [Self] = &[Self::V1_0, Self::V2_0];

    fn major(self) -> u32 {
        match self {
            Self::V1_0 => 1,
            Self::V2_0 => 2,
        }
    }

    fn minor(self) -> u32 {
        0
    }
}

xml_enum! {
    /// How the session id travels between client and server
    pub enum TrackingMode {
        Cookie => "COOKIE",
        Url => "URL",
        Ssl => "SSL",
    }
}

xml_enum! {
    /// Unit of session state replicated on change
    pub enum ReplicationGranularity {
        Session => "SESSION",
        Attribute => "ATTRIBUTE",
    }
}

xml_enum! {
    /// 1.0 only: which session access marks attributes dirty
    pub enum ReplicationTrigger {
        Set => "SET",
        SetAndGet => "SET_AND_GET",
        SetAndNonPrimitiveGet => "SET_AND_NON_PRIMITIVE_GET",
        Access => "ACCESS",
    }
}

/// Reader for one version of the schema
#[derive(Debug, Clone, Copy)]
pub struct SharedSessionConfigReader {
    schema: SharedSessionConfigSchema,
}

impl SharedSessionConfigReader {
    pub fn new(schema: SharedSessionConfigSchema) -> Self {
        Self { schema }
    }

    fn read_session_config(
        &self,
        reader: &mut ElementReader<'_>,
        element: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError> {
        element.allow_attributes(&[])?;
        let mut node = ModelNode::new(SESSION_CONFIG);
        let mut timeout = None;
        let mut cookie = None;
        let mut modes: Vec<TrackingMode> = Vec::new();

        while let Some(child) = reader.next_child(element)? {
            child.allow_attributes(&[])?;
            match child.name() {
                SESSION_TIMEOUT => {
                    let minutes: i32 = reader.parse_text(&child, "a number of minutes")?;
                    element.store_once(&child, &mut timeout, minutes)?;
                }
                COOKIE_CONFIG => {
                    let value = self.read_cookie_config(reader, &child)?;
                    element.store_once(&child, &mut cookie, value)?;
                }
                TRACKING_MODE => {
                    let mode: TrackingMode = reader.parse_text(&child, &TrackingMode::expected())?;
                    if !modes.contains(&mode) {
                        modes.push(mode);
                    }
                }
                _ => return Err(element.unexpected_element(&child)),
            }
        }

        node.set_optional(SESSION_TIMEOUT, timeout.map(|t| t.to_string()));
        if !modes.is_empty() {
            let joined: Vec<&str> = modes.iter().map(|m| m.as_str()).collect();
            node.set_attribute(TRACKING_MODE, joined.join(","));
        }
        if let Some(cookie) = cookie {
            node.push_child(cookie);
        }
        Ok(node)
    }

    fn read_cookie_config(
        &self,
        reader: &mut ElementReader<'_>,
        element: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError> {
        element.allow_attributes(&[])?;
        let mut node = ModelNode::new(COOKIE_CONFIG);

        while let Some(child) = reader.next_child(element)? {
            child.allow_attributes(&[])?;
            let name = child.name();
            let value = if COOKIE_TEXT.contains(&name) {
                reader.read_text(&child)?
            } else if COOKIE_FLAGS.contains(&name) {
                reader.parse_text::<bool>(&child, "true or false")?.to_string()
            } else if name == COOKIE_MAX_AGE {
                reader.parse_text::<i32>(&child, "a number of seconds")?.to_string()
            } else {
                return Err(element.unexpected_element(&child));
            };

            if node.attribute(name).is_some() {
                return Err(element.duplicate_element(&child));
            }
            node.set_attribute(name, value);
        }
        Ok(node)
    }

    fn read_replication_config(
        &self,
        reader: &mut ElementReader<'_>,
        element: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError> {
        element.allow_attributes(&[])?;
        let mut node = ModelNode::new(REPLICATION_CONFIG);
        let mut cache = None;
        let mut granularity = None;
        let mut trigger = None;

        while let Some(child) = reader.next_child(element)? {
            child.allow_attributes(&[])?;
            match child.name() {
                CACHE_NAME => {
                    let value = reader.read_text(&child)?;
                    element.store_once(&child, &mut cache, value)?;
                }
                REPLICATION_GRANULARITY => {
                    let value: ReplicationGranularity =
                        reader.parse_text(&child, &ReplicationGranularity::expected())?;
                    element.store_once(&child, &mut granularity, value)?;
                }
                REPLICATION_TRIGGER if self.schema == SharedSessionConfigSchema::V1_0 => {
                    let value: ReplicationTrigger =
                        reader.parse_text(&child, &ReplicationTrigger::expected())?;
                    element.store_once(&child, &mut trigger, value)?;
                }
                _ => return Err(element.unexpected_element(&child)),
            }
        }

        if let Some(trigger) = trigger {
            warn!(
                element = REPLICATION_TRIGGER,
                value = %trigger,
                "ignoring element no longer supported by the current schema"
            );
        }
        node.set_optional(CACHE_NAME, cache);
        node.set_optional(REPLICATION_GRANULARITY, granularity.map(|g| g.as_str()));
        Ok(node)
    }
}

impl DocumentReader for SharedSessionConfigReader {
    fn read(
        &self,
        reader: &mut ElementReader<'_>,
        root: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError> {
        root.allow_attributes(&[])?;
        let mut max_active = None;
        let mut separator = None;
        let mut session = None;
        let mut replication = None;

        while let Some(child) = reader.next_child(root)? {
            match child.name() {
                MAX_ACTIVE_SESSIONS => {
                    child.allow_attributes(&["value"])?;
                    let value: u32 = child.parse_required_attribute("value", "a non-negative integer")?;
                    reader.expect_end(&child)?;
                    root.store_once(&child, &mut max_active, value)?;
                }
                SESSION_ID_SEPARATOR => {
                    child.allow_attributes(&[])?;
                    let value = reader.read_text(&child)?;
                    if value.is_empty() {
                        return Err(child.invalid_text(&value, "a non-empty separator"));
                    }
                    root.store_once(&child, &mut separator, value)?;
                }
                SESSION_CONFIG => {
                    let node = self.read_session_config(reader, &child)?;
                    root.store_once(&child, &mut session, node)?;
                }
                REPLICATION_CONFIG => {
                    let node = self.read_replication_config(reader, &child)?;
                    root.store_once(&child, &mut replication, node)?;
                }
                _ => return Err(root.unexpected_element(&child)),
            }
        }

        let mut model = ModelNode::new(ROOT);
        model.set_optional(MAX_ACTIVE_SESSIONS, max_active.map(|n| n.to_string()));
        model.set_optional(SESSION_ID_SEPARATOR, separator);
        if let Some(node) = replication {
            model.push_child(node);
        }
        if let Some(node) = session {
            model.push_child(node);
        }
        Ok(model)
    }
}

/// Writes the model in the 2.0 shape
pub fn write_current(model: &ModelNode, writer: &mut ElementWriter) -> Result<()> {
    model.ensure_known(
        &[MAX_ACTIVE_SESSIONS, SESSION_ID_SEPARATOR],
        &[REPLICATION_CONFIG, SESSION_CONFIG],
    )?;
    if model.is_empty() {
        return writer.empty_root(&[]);
    }

    writer.start_root(&[])?;

    if let Some(max) = model.parse_attribute::<u32>(MAX_ACTIVE_SESSIONS)? {
        writer.empty(MAX_ACTIVE_SESSIONS, &[("value", max.to_string().as_str())])?;
    }

    if let Some(replication) = model.single_child(REPLICATION_CONFIG)? {
        replication.ensure_known(&[CACHE_NAME, REPLICATION_GRANULARITY], &[])?;
        writer.start(REPLICATION_CONFIG, &[])?;
        if let Some(cache) = replication.attribute(CACHE_NAME) {
            writer.text_element(CACHE_NAME, cache)?;
        }
        if let Some(granularity) = replication.parse_attribute::<ReplicationGranularity>(REPLICATION_GRANULARITY)? {
            writer.text_element(REPLICATION_GRANULARITY, granularity.as_str())?;
        }
        writer.end()?;
    }

    if let Some(session) = model.single_child(SESSION_CONFIG)? {
        write_session_config(session, writer)?;
    }

    if let Some(separator) = model.attribute(SESSION_ID_SEPARATOR) {
        writer.text_element(SESSION_ID_SEPARATOR, separator)?;
    }

    writer.end()
}

fn write_session_config(session: &ModelNode, writer: &mut ElementWriter) -> Result<()> {
    session.ensure_known(&[SESSION_TIMEOUT, TRACKING_MODE], &[COOKIE_CONFIG])?;
    writer.start(SESSION_CONFIG, &[])?;

    if let Some(timeout) = session.parse_attribute::<i32>(SESSION_TIMEOUT)? {
        writer.text_element(SESSION_TIMEOUT, &timeout.to_string())?;
    }

    if let Some(cookie) = session.single_child(COOKIE_CONFIG)? {
        let mut known: Vec<&str> = COOKIE_TEXT.to_vec();
        known.extend_from_slice(COOKIE_FLAGS);
        known.push(COOKIE_MAX_AGE);
        cookie.ensure_known(&known, &[])?;

        writer.start(COOKIE_CONFIG, &[])?;
        for &key in COOKIE_TEXT {
            if let Some(value) = cookie.attribute(key) {
                writer.text_element(key, value)?;
            }
        }
        for &key in COOKIE_FLAGS {
            if let Some(flag) = cookie.parse_attribute::<bool>(key)? {
                writer.text_element(key, &flag.to_string())?;
            }
        }
        if let Some(max_age) = cookie.parse_attribute::<i32>(COOKIE_MAX_AGE)? {
            writer.text_element(COOKIE_MAX_AGE, &max_age.to_string())?;
        }
        writer.end()?;
    }

    if let Some(modes) = session.attribute(TRACKING_MODE) {
        for mode in modes.split(',') {
            let mode: TrackingMode = mode.parse().map_err(|value| {
                SchemaError::InvalidModel(format!(
                    "'{}' has invalid tracking mode '{}'",
                    SESSION_CONFIG, value
                ))
            })?;
            writer.text_element(TRACKING_MODE, mode.as_str())?;
        }
    }

    writer.end()
}

/// Session expiration configured by a decoded model
pub fn session_expiration(model: &ModelNode) -> Result<Expiration> {
    let minutes = match model.single_child(SESSION_CONFIG)? {
        Some(session) => session.parse_attribute::<i32>(SESSION_TIMEOUT)?.map(i64::from),
        None => None,
    };
    Ok(Expiration::from_minutes(minutes.unwrap_or(DEFAULT_SESSION_TIMEOUT_MINUTES)))
}

/// Dispatcher for every version of the schema
pub fn dispatcher(options: WriteOptions) -> Result<ParserDispatcher> {
    let mut builder = ParserDispatcher::builder(SharedSessionConfigSchema::registry()?);
    for &schema in SharedSessionConfigSchema::ALL {
        builder.register_parser(&schema.version(), SharedSessionConfigReader::new(schema))?;
    }
    builder.register_writer(write_current).write_options(options);
    builder.build()
}
