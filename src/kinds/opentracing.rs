//! The tracing `subsystem` document
//!
//! 1.0 is an empty marker element. 2.0 introduced named Jaeger tracer
//! configurations and a `default-tracer` reference; 3.0 added the reporter
//! flush interval.

use std::collections::BTreeSet;

use crate::dispatcher::{DocumentReader, ParserDispatcher};
use crate::error::{ParseError, Result, SchemaError};
use crate::model::ModelNode;
use crate::schema::VersionedSchema;
use crate::xml::{ElementReader, ElementWriter, StartElement, WriteOptions};

pub const ROOT: &str = "subsystem";
pub const DEFAULT_TRACER: &str = "default-tracer";
pub const JAEGER_TRACER: &str = "jaeger-tracer";
pub const NAME: &str = "name";
pub const PROPAGATION: &str = "propagation";
pub const SAMPLER_TYPE: &str = "sampler-type";
pub const SAMPLER_PARAM: &str = "sampler-param";
pub const REPORTER_FLUSH_INTERVAL: &str = "reporter-flush-interval";

/// Versions of the tracing subsystem schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenTracingSchema {
    V1_0,
    V2_0,
    V3_0,
}

impl VersionedSchema for OpenTracingSchema {
    const LOCAL_NAME: &'static str = ROOT;
    const ALL: &'static [Self] = &[Self::V1_0, Self::V2_0, Self::V3_0];

    fn major(self) -> u32 {
        match self {
            Self::V1_0 => 1,
            Self::V2_0 => 2,
            Self::V3_0 => 3,
        }
    }

    fn minor(self) -> u32 {
        0
    }
}

impl OpenTracingSchema {
    fn tracer_attributes(self) -> &'static [&'static str] {
        match self {
            Self::V1_0 => &[],
            Self::V2_0 => &[NAME, PROPAGATION, SAMPLER_TYPE, SAMPLER_PARAM],
            Self::V3_0 => &[NAME, PROPAGATION, SAMPLER_TYPE, SAMPLER_PARAM, REPORTER_FLUSH_INTERVAL],
        }
    }
}

xml_enum! {
    /// Jaeger sampling strategy
    pub enum SamplerType {
        Const => "const",
        Probabilistic => "probabilistic",
        RateLimiting => "ratelimiting",
    }
}

xml_enum! {
    /// Trace context header format
    pub enum Propagation {
        Jaeger => "JAEGER",
        B3 => "B3",
    }
}

/// Parse a comma separated propagation list, dropping repeats
fn parse_propagation(value: &str) -> std::result::Result<Vec<Propagation>, String> {
    let mut formats = Vec::new();
    for item in value.split(',') {
        let format: Propagation = item.trim().parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

fn join_propagation(formats: &[Propagation]) -> String {
    formats.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(",")
}

fn parse_sampler_param(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|p| p.is_finite() && *p >= 0.0)
}

/// Reader for one version of the schema
#[derive(Debug, Clone, Copy)]
pub struct OpenTracingReader {
    schema: OpenTracingSchema,
}

impl OpenTracingReader {
    pub fn new(schema: OpenTracingSchema) -> Self {
        Self { schema }
    }

    fn read_tracer(
        &self,
        reader: &mut ElementReader<'_>,
        element: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError> {
        element.allow_attributes(self.schema.tracer_attributes())?;
        let mut node = ModelNode::new(JAEGER_TRACER);

        let name = element.required_attribute(NAME)?;
        if name.is_empty() {
            return Err(element.invalid_attribute(NAME, name, "a non-empty name"));
        }
        node.set_attribute(NAME, name);

        if let Some(value) = element.attribute(PROPAGATION) {
            let formats = parse_propagation(value).map_err(|_| {
                element.invalid_attribute(
                    PROPAGATION,
                    value,
                    &format!("a comma separated list of {}", Propagation::expected()),
                )
            })?;
            node.set_attribute(PROPAGATION, join_propagation(&formats));
        }

        let sampler: Option<SamplerType> = element.parse_attribute(SAMPLER_TYPE, &SamplerType::expected())?;
        node.set_optional(SAMPLER_TYPE, sampler.map(|s| s.as_str()));

        if let Some(value) = element.attribute(SAMPLER_PARAM) {
            let param = parse_sampler_param(value)
                .ok_or_else(|| element.invalid_attribute(SAMPLER_PARAM, value, "a non-negative decimal"))?;
            node.set_attribute(SAMPLER_PARAM, param.to_string());
        }

        let interval: Option<u32> =
            element.parse_attribute(REPORTER_FLUSH_INTERVAL, "a number of milliseconds")?;
        node.set_optional(REPORTER_FLUSH_INTERVAL, interval.map(|i| i.to_string()));

        reader.expect_end(element)?;
        Ok(node)
    }
}

impl DocumentReader for OpenTracingReader {
    fn read(
        &self,
        reader: &mut ElementReader<'_>,
        root: &StartElement,
    ) -> std::result::Result<ModelNode, ParseError> {
        let mut model = ModelNode::new(ROOT);

        if self.schema == OpenTracingSchema::V1_0 {
            root.allow_attributes(&[])?;
            reader.expect_end(root)?;
            return Ok(model);
        }

        root.allow_attributes(&[DEFAULT_TRACER])?;
        let mut names = BTreeSet::new();

        while let Some(child) = reader.next_child(root)? {
            if child.name() != JAEGER_TRACER {
                return Err(root.unexpected_element(&child));
            }
            let tracer = self.read_tracer(reader, &child)?;
            let name = tracer.attribute(NAME).unwrap_or_default().to_string();
            if !names.insert(name.clone()) {
                return Err(child.invalid_attribute(NAME, &name, "a name not used by another tracer"));
            }
            model.push_child(tracer);
        }

        if let Some(default) = root.attribute(DEFAULT_TRACER) {
            if !names.contains(default) {
                return Err(ParseError::UnresolvedReference {
                    element: ROOT.to_string(),
                    attribute: DEFAULT_TRACER.to_string(),
                    value: default.to_string(),
                });
            }
            model.set_attribute(DEFAULT_TRACER, default);
        }

        Ok(model)
    }
}

/// Writes the model in the 3.0 shape
pub fn write_current(model: &ModelNode, writer: &mut ElementWriter) -> Result<()> {
    model.ensure_known(&[DEFAULT_TRACER], &[JAEGER_TRACER])?;

    let mut names = BTreeSet::new();
    for tracer in model.children_named(JAEGER_TRACER) {
        let name = tracer.required_attribute(NAME)?;
        if !names.insert(name) {
            return Err(SchemaError::InvalidModel(format!("tracer '{}' is defined twice", name)));
        }
    }

    let mut root_attributes = Vec::new();
    if let Some(default) = model.attribute(DEFAULT_TRACER) {
        if !names.contains(default) {
            return Err(SchemaError::InvalidModel(format!(
                "{} '{}' does not name a tracer",
                DEFAULT_TRACER, default
            )));
        }
        root_attributes.push((DEFAULT_TRACER, default));
    }

    if names.is_empty() {
        return writer.empty_root(&root_attributes);
    }

    writer.start_root(&root_attributes)?;
    for tracer in model.children_named(JAEGER_TRACER) {
        write_tracer(tracer, writer)?;
    }
    writer.end()
}

fn write_tracer(tracer: &ModelNode, writer: &mut ElementWriter) -> Result<()> {
    let known = OpenTracingSchema::V3_0.tracer_attributes();
    tracer.ensure_known(known, &[])?;

    let invalid = |key: &str, value: &str| {
        SchemaError::InvalidModel(format!("'{}' key '{}' has invalid value '{}'", JAEGER_TRACER, key, value))
    };

    let mut values: Vec<(&str, String)> = Vec::new();
    for &key in known {
        let Some(value) = tracer.attribute(key) else {
            continue;
        };
        let canonical = match key {
            PROPAGATION => join_propagation(&parse_propagation(value).map_err(|_| invalid(key, value))?),
            SAMPLER_TYPE => value
                .parse::<SamplerType>()
                .map_err(|_| invalid(key, value))?
                .to_string(),
            SAMPLER_PARAM => parse_sampler_param(value)
                .ok_or_else(|| invalid(key, value))?
                .to_string(),
            REPORTER_FLUSH_INTERVAL => value
                .parse::<u32>()
                .map_err(|_| invalid(key, value))?
                .to_string(),
            _ => value.to_string(),
        };
        values.push((key, canonical));
    }

    let attributes: Vec<(&str, &str)> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();
    writer.empty(JAEGER_TRACER, &attributes)
}

/// Dispatcher for every version of the schema
pub fn dispatcher(options: WriteOptions) -> Result<ParserDispatcher> {
    let mut builder = ParserDispatcher::builder(OpenTracingSchema::registry()?);
    for &schema in OpenTracingSchema::ALL {
        builder.register_parser(&schema.version(), OpenTracingReader::new(schema))?;
    }
    builder.register_writer(write_current).write_options(options);
    builder.build()
}
