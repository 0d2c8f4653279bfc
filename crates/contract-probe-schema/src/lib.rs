#![warn(missing_docs)]
//! # contract-probe-schema
//!
//! ## Purpose
//! Holds named JSON Schema documents and checks response bodies against them.
//!
//! ## Responsibilities
//! - Register schemas once per run and reject re-registration.
//! - Reject documents that do not compile as JSON Schema.
//! - Report structural violations as `(pointer, expected, actual)` triples.
//! - Ship the bundled schema set for the users API.
//!
//! ## Data flow
//! Frozen `contracts/schemas/*.schema.json` -> [`bundled_registry`] ->
//! [`SchemaRegistry::get`] -> [`validate`] -> [`Violation`] list consumed by
//! the runner.
//!
//! ## Error model
//! Unknown names return [`SchemaError::NotFound`]; the runner treats that as a
//! harness bug and errors the case. Violations are data, not errors.
//!
//! ## Limitations
//! Structural validation checks the root type and every `required` property:
//! presence, coarse type, and recursion into its children. Optional properties
//! are not type-checked. Use [`Schema::strict_violations`] for full-draft
//! conformance.
//!
//! ## Example
//! ```rust
//! use contract_probe_schema::{SchemaRegistry, validate};
//! use serde_json::json;
//!
//! let mut registry = SchemaRegistry::new();
//! registry
//!     .register("token", json!({"type": "object", "required": ["token"]}))
//!     .unwrap();
//! let schema = registry.get("token").unwrap();
//! let violations = validate(&json!({}), schema.document());
//! assert_eq!(violations[0].pointer, "/token");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use contract_probe_core::{Violation, join_pointer};
use jsonschema::JSONSchema;
use jsonschema::error::ValidationErrorKind;
use serde_json::Value;
use thiserror::Error;

/// Paginated user listing.
pub const GET_ALL_USERS: &str = "get_all_users";
/// Single user lookup.
pub const GET_SINGLE_USER: &str = "get_single_user";
/// User created from `name`/`job`.
pub const POST_USER: &str = "post_user";
/// User created from profile fields.
pub const GET_CREATED_USER: &str = "get_created_user";
/// User updated from `name`/`job`.
pub const PUT_USER: &str = "put_user";
/// Registration accepted.
pub const REGISTER_USER_SUCCESSFUL: &str = "register_user_successful";
/// Registration rejected.
pub const REGISTER_USER_UNSUCCESSFUL: &str = "register_user_unsuccessful";

macro_rules! bundled {
    ($name:expr, $file:literal) => {
        (
            $name,
            include_str!(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/../../contracts/schemas/",
                $file
            )),
        )
    };
}

/// Schema documents shipped with the binary, keyed by registry name.
pub const BUNDLED_SCHEMAS: &[(&str, &str)] = &[
    bundled!(GET_ALL_USERS, "get_all_users.schema.json"),
    bundled!(GET_SINGLE_USER, "get_single_user.schema.json"),
    bundled!(POST_USER, "post_user.schema.json"),
    bundled!(GET_CREATED_USER, "get_created_user.schema.json"),
    bundled!(PUT_USER, "put_user.schema.json"),
    bundled!(REGISTER_USER_SUCCESSFUL, "register_user_successful.schema.json"),
    bundled!(REGISTER_USER_UNSUCCESSFUL, "register_user_unsuccessful.schema.json"),
];

/// One registered, compiled schema.
pub struct Schema {
    name: String,
    document: Value,
    compiled: JSONSchema,
}

impl Schema {
    /// Compiles a schema document.
    ///
    /// # Errors
    /// Returns [`SchemaError::InvalidSchema`] when the document is not a JSON
    /// object or fails to compile.
    pub fn compile(name: impl Into<String>, document: Value) -> Result<Self, SchemaError> {
        let name = name.into();
        if !document.is_object() {
            return Err(SchemaError::InvalidSchema {
                name,
                reason: "schema document must be a JSON object".to_string(),
            });
        }

        let compiled = JSONSchema::compile(&document).map_err(|error| SchemaError::InvalidSchema {
            name: name.clone(),
            reason: error.to_string(),
        })?;

        Ok(Self {
            name,
            document,
            compiled,
        })
    }

    /// Registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw schema document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Structural violations of `body` (see [`validate`]).
    pub fn violations(&self, body: &Value) -> Vec<Violation> {
        validate(body, &self.document)
    }

    /// Full-draft violations reported by the `jsonschema` engine.
    ///
    /// Unlike [`Schema::violations`], this also type-checks optional properties
    /// and applies every keyword the draft defines. `required` and `type`
    /// failures are reported in the same shape as [`validate`], so the two
    /// lists can be merged by equality.
    pub fn strict_violations(&self, body: &Value) -> Vec<Violation> {
        match self.compiled.validate(body) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| {
                    let instance_path = error.instance_path.to_string();
                    let schema_path = error.schema_path.to_string();
                    match &error.kind {
                        ValidationErrorKind::Required { property } => {
                            let property = property
                                .as_str()
                                .map(str::to_string)
                                .unwrap_or_else(|| property.to_string());
                            Violation::new(
                                join_pointer(&instance_path, &property),
                                "present",
                                "absent",
                            )
                        }
                        ValidationErrorKind::Type { .. } => {
                            let declared = self
                                .document
                                .pointer(&schema_path)
                                .map(describe_type)
                                .unwrap_or_else(|| "declared type".to_string());
                            Violation::new(instance_path, declared, json_type_name(&error.instance))
                        }
                        _ => Violation::new(
                            instance_path,
                            format!("conformance at {schema_path}"),
                            error.to_string(),
                        ),
                    }
                })
                .collect(),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

/// Write-once store of named schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and stores a schema under `name`.
    ///
    /// # Errors
    /// Returns [`SchemaError::Duplicate`] when `name` is already registered;
    /// the existing schema is left untouched. Returns
    /// [`SchemaError::InvalidSchema`] when the document does not compile.
    pub fn register(&mut self, name: impl Into<String>, document: Value) -> Result<(), SchemaError> {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            return Err(SchemaError::Duplicate(name));
        }

        let schema = Schema::compile(name.clone(), document)?;
        self.schemas.insert(name, schema);
        Ok(())
    }

    /// Looks up a schema by name.
    ///
    /// # Errors
    /// Returns [`SchemaError::NotFound`] for unknown names.
    pub fn get(&self, name: &str) -> Result<&Schema, SchemaError> {
        self.schemas
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Builds a registry preloaded with [`BUNDLED_SCHEMAS`].
///
/// # Errors
/// Returns [`SchemaError::Decode`] or [`SchemaError::InvalidSchema`] if a
/// bundled document is corrupt.
pub fn bundled_registry() -> Result<SchemaRegistry, SchemaError> {
    let mut registry = SchemaRegistry::new();
    for (name, raw) in BUNDLED_SCHEMAS {
        let document: Value = serde_json::from_str(raw).map_err(|source| SchemaError::Decode {
            name: (*name).to_string(),
            source,
        })?;
        registry.register(*name, document)?;
    }
    Ok(registry)
}

/// Checks `body` against the structural subset of `schema`.
///
/// Returns every violation found; an empty list means the body conforms.
pub fn validate(body: &Value, schema: &Value) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_node(body, schema, "", &mut violations);
    violations
}

fn check_node(value: &Value, schema: &Value, pointer: &str, out: &mut Vec<Violation>) {
    if let Some(declared) = schema.get("type")
        && !type_matches(declared, value)
    {
        out.push(Violation::new(
            pointer,
            describe_type(declared),
            json_type_name(value),
        ));
        return;
    }

    match value {
        Value::Object(map) => {
            let properties = schema.get("properties").and_then(Value::as_object);

            let required = schema
                .get("required")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for name in required.iter().filter_map(Value::as_str) {
                let child_pointer = join_pointer(pointer, name);
                match map.get(name) {
                    None => out.push(Violation::new(child_pointer, "present", "absent")),
                    Some(child) => {
                        if let Some(child_schema) = properties.and_then(|props| props.get(name)) {
                            check_node(child, child_schema, &child_pointer, out);
                        }
                    }
                }
            }

            if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
                for key in map.keys() {
                    let declared = properties.is_some_and(|props| props.contains_key(key));
                    if !declared {
                        out.push(Violation::new(
                            join_pointer(pointer, key),
                            "no additional properties",
                            "undeclared property",
                        ));
                    }
                }
            }
        }
        Value::Array(items) => match schema.get("items") {
            Some(Value::Array(positional)) => {
                for (index, (item, item_schema)) in items.iter().zip(positional).enumerate() {
                    check_node(item, item_schema, &join_pointer(pointer, &index.to_string()), out);
                }
            }
            Some(item_schema @ Value::Object(_)) => {
                for (index, item) in items.iter().enumerate() {
                    check_node(item, item_schema, &join_pointer(pointer, &index.to_string()), out);
                }
            }
            _ => {}
        },
        _ => {}
    }
}

fn type_matches(declared: &Value, value: &Value) -> bool {
    match declared {
        Value::String(name) => coarse_type_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| coarse_type_matches(name, value)),
        // Unrecognised `type` shapes impose nothing.
        _ => true,
    }
}

fn coarse_type_matches(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "integer" => is_integer(value),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(number) => {
            number.is_i64()
                || number.is_u64()
                || number.as_f64().is_some_and(|float| float.fract() == 0.0)
        }
        _ => false,
    }
}

fn describe_type(declared: &Value) -> String {
    match declared {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("|"),
        other => other.to_string(),
    }
}

/// Coarse JSON type name of a value, as used in violation reports.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) if is_integer(value) => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Schema registry and decoding errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No schema is registered under the name.
    #[error("schema not found: {0}")]
    NotFound(String),
    /// A schema is already registered under the name.
    #[error("schema already registered: {0}")]
    Duplicate(String),
    /// Document failed to compile.
    #[error("invalid schema `{name}`: {reason}")]
    InvalidSchema {
        /// Registry key.
        name: String,
        /// Compiler error text.
        reason: String,
    },
    /// Bundled document is not valid JSON.
    #[error("schema `{name}` is not valid json: {source}")]
    Decode {
        /// Registry key.
        name: String,
        /// Decoder error.
        source: serde_json::Error,
    },
}
