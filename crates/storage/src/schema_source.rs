//! Schema retrieval
//!
//! A mirror needs the database schema before it can hold rows. Where the
//! schema comes from is pluggable through [`SchemaSource`].

use ovsdb_core::{DatabaseSchema, Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Connection string methods a client may use
pub const CONNECTION_METHODS: &[&str] = &["tcp:", "ssl:", "unix:", "punix:", "ptcp:", "pssl:"];

/// Reject connection strings that name no known method
pub fn validate_connection(connection: &str) -> Result<()> {
    let known = CONNECTION_METHODS
        .iter()
        .find(|m| connection.starts_with(**m))
        .map(|m| connection.len() > m.len());
    match known {
        Some(true) => Ok(()),
        _ => Err(Error::Connection(format!(
            "Could not connect to {}: unsupported connection method",
            connection
        ))),
    }
}

/// Supplier of database schemas
pub trait SchemaSource: Send + Sync {
    /// Fetch `schema_name` as served at `connection`
    fn get_schema(&self, connection: &str, schema_name: &str) -> Result<DatabaseSchema>;
}

/// Schemas registered in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaSource {
    schemas: BTreeMap<(String, String), DatabaseSchema>,
}

impl StaticSchemaSource {
    /// An empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `schema` at `connection` under its own name
    pub fn with(mut self, connection: impl Into<String>, schema: DatabaseSchema) -> Self {
        self.schemas
            .insert((connection.into(), schema.name.clone()), schema);
        self
    }
}

impl SchemaSource for StaticSchemaSource {
    fn get_schema(&self, connection: &str, schema_name: &str) -> Result<DatabaseSchema> {
        self.schemas
            .get(&(connection.to_string(), schema_name.to_string()))
            .cloned()
            .ok_or_else(|| {
                Error::SchemaRetrieval(format!(
                    "Could not retrieve schema {} from {}",
                    schema_name, connection
                ))
            })
    }
}

/// Schemas read from `<dir>/<schema_name>.ovsschema`
///
/// The connection string is ignored.
#[derive(Debug, Clone)]
pub struct FileSchemaSource {
    dir: PathBuf,
}

impl FileSchemaSource {
    /// Read schemas from `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path the schema would be read from
    pub fn path_for(&self, schema_name: &str) -> PathBuf {
        self.dir.join(format!("{}.ovsschema", schema_name))
    }
}

impl SchemaSource for FileSchemaSource {
    fn get_schema(&self, connection: &str, schema_name: &str) -> Result<DatabaseSchema> {
        let path = self.path_for(schema_name);
        debug!(connection, path = %path.display(), "Reading schema");
        let text = std::fs::read_to_string(&path).map_err(|e| {
            Error::SchemaRetrieval(format!("Could not read {}: {}", path.display(), e))
        })?;
        let schema = DatabaseSchema::from_json(&text)?;
        if schema.name != schema_name {
            return Err(Error::SchemaRetrieval(format!(
                "{} holds schema {}, expected {}",
                path.display(),
                schema.name,
                schema_name
            )));
        }
        Ok(schema)
    }
}
