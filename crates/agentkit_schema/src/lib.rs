//! # agentkit_schema
//!
//! The schema validation gateway used by every agentkit component that emits
//! an envelope.
//!
//! Schemas are resolved by logical file name, first from an optional schema
//! directory and then from the documents bundled with this crate. Parsed and
//! compiled schemas are cached for the lifetime of the gateway instance.
//!
//! ## Example
//!
//! ```rust,no_run
//! use agentkit_schema::{SchemaGateway, AGENT_OUTPUT_SCHEMA};
//! use serde_json::json;
//!
//! let gateway = SchemaGateway::bundled();
//! let report = gateway
//!     .validate(&json!({ "schema_version": 123 }), AGENT_OUTPUT_SCHEMA)
//!     .unwrap();
//! if !report.valid {
//!     for error in &report.errors {
//!         eprintln!("{}", error);
//!     }
//! }
//! ```

pub mod error;
pub mod gateway;

pub use error::{SchemaError, SchemaResult};
pub use gateway::{
    LoadedSchema, SchemaGateway, ValidationReport, AGENT_OUTPUT_SCHEMA, BUNDLED_SCHEMAS,
    INTER_AGENT_MESSAGE_SCHEMA, SECURITY_FINDINGS_SCHEMA,
};
