//! Schema loading, caching and validation.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use jsonschema::{Draft, JSONSchema, ValidationError};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};

/// Schema for the standard agent output envelope.
pub const AGENT_OUTPUT_SCHEMA: &str = "agent-output-schema.json";

/// Schema for envelopes exchanged through the mailbox.
pub const INTER_AGENT_MESSAGE_SCHEMA: &str = "inter-agent-message-schema.json";

/// Schema for the result data of the security scanner workflow.
pub const SECURITY_FINDINGS_SCHEMA: &str = "security-findings-schema.json";

/// Schema documents compiled into the crate, used when no schema directory
/// provides a document of the same name.
pub const BUNDLED_SCHEMAS: &[(&str, &str)] = &[
    (
        AGENT_OUTPUT_SCHEMA,
        include_str!("../schemas/agent-output-schema.json"),
    ),
    (
        INTER_AGENT_MESSAGE_SCHEMA,
        include_str!("../schemas/inter-agent-message-schema.json"),
    ),
    (
        SECURITY_FINDINGS_SCHEMA,
        include_str!("../schemas/security-findings-schema.json"),
    ),
];

/// Outcome of validating one instance against one schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// Build a failing report. An empty error list still yields one entry so
    /// that a failure is never silent.
    pub fn invalid(mut errors: Vec<String>) -> Self {
        if errors.is_empty() {
            errors.push("$: instance rejected by schema".to_string());
        }
        Self {
            valid: false,
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Convert into a `Result`, carrying every violation on failure.
    pub fn into_result(self) -> SchemaResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(SchemaError::ValidationFailed(self.errors))
        }
    }
}

/// A parsed schema document together with its compiled validator.
pub struct LoadedSchema {
    name: String,
    document: Value,
    validator: JSONSchema,
}

impl LoadedSchema {
    fn compile(name: &str, document: Value) -> SchemaResult<Self> {
        let validator = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&document)
            .map_err(|e| SchemaError::InvalidSchema {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            document,
            validator,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw schema document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    fn check(&self, instance: &Value) -> ValidationReport {
        match self.validator.validate(instance) {
            Ok(()) => ValidationReport::valid(),
            Err(errors) => ValidationReport::invalid(errors.map(|e| format_error(&e)).collect()),
        }
    }
}

impl fmt::Debug for LoadedSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Render a violation as `path: message`, with a dotted instance path and
/// `$` standing for the document root.
fn format_error(error: &ValidationError<'_>) -> String {
    let pointer = error.instance_path.to_string();
    let path = pointer.trim_start_matches('/').replace('/', ".");
    let path = if path.is_empty() { "$".to_string() } else { path };
    format!("{}: {}", path, error)
}

/// The single enforcement point for wire-format correctness.
///
/// A gateway is constructed once and shared (usually as `Arc<SchemaGateway>`)
/// with the mailbox and output builder. Each instance keeps its own cache.
pub struct SchemaGateway {
    schemas_dir: Option<PathBuf>,
    cache: RwLock<HashMap<String, Arc<LoadedSchema>>>,
}

impl SchemaGateway {
    /// Create a gateway that resolves schemas from `schemas_dir`, falling back
    /// to the bundled documents.
    pub fn new(schemas_dir: impl Into<PathBuf>) -> Self {
        Self {
            schemas_dir: Some(schemas_dir.into()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a gateway that only knows the bundled documents.
    pub fn bundled() -> Self {
        Self {
            schemas_dir: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn schemas_dir(&self) -> Option<&Path> {
        self.schemas_dir.as_deref()
    }

    /// Resolve a schema by name, parsing and compiling it on first use.
    pub fn load_schema(&self, name: &str) -> SchemaResult<Arc<LoadedSchema>> {
        if let Some(schema) = self.cache.read().get(name) {
            return Ok(Arc::clone(schema));
        }

        let document = self.resolve(name)?;
        let schema = Arc::new(LoadedSchema::compile(name, document)?);

        let mut cache = self.cache.write();
        // Another caller may have raced us here; keep whichever landed first.
        let entry = cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::clone(&schema));
        Ok(Arc::clone(entry))
    }

    fn resolve(&self, name: &str) -> SchemaResult<Value> {
        if name.is_empty() || Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
            return Err(SchemaError::InvalidName(name.to_string()));
        }

        if let Some(dir) = &self.schemas_dir {
            let path = dir.join(name);
            if path.is_file() {
                debug!("Loading schema {} from {:?}", name, path);
                let content = fs::read_to_string(&path)?;
                return serde_json::from_str(&content)
                    .map_err(|source| SchemaError::Parse { path, source });
            }
        }

        match BUNDLED_SCHEMAS.iter().find(|(bundled, _)| *bundled == name) {
            Some((_, content)) => {
                debug!("Loading bundled schema {}", name);
                Ok(serde_json::from_str(content)?)
            }
            None => Err(SchemaError::NotFound(name.to_string())),
        }
    }

    /// Validate `instance` against the named schema.
    ///
    /// An invalid instance is reported through the returned
    /// [`ValidationReport`]; only an unknown or broken schema is an error.
    pub fn validate(&self, instance: &Value, schema_name: &str) -> SchemaResult<ValidationReport> {
        let schema = self.load_schema(schema_name)?;
        let report = schema.check(instance);
        if !report.valid {
            debug!(
                "Instance rejected by {} with {} violation(s)",
                schema_name,
                report.errors.len()
            );
        }
        Ok(report)
    }

    /// Validate and fail fast with every violation joined into one error.
    pub fn validate_and_raise(&self, instance: &Value, schema_name: &str) -> SchemaResult<()> {
        self.validate(instance, schema_name)?.into_result()
    }

    /// Number of schemas currently cached.
    pub fn cached_count(&self) -> usize {
        self.cache.read().len()
    }
}

impl Default for SchemaGateway {
    fn default() -> Self {
        Self::bundled()
    }
}

impl fmt::Debug for SchemaGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaGateway")
            .field("schemas_dir", &self.schemas_dir)
            .field("cached", &self.cache.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
