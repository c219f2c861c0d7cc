//! Schema descriptors
//!
//! A [`DatabaseSchema`] describes every table the mirror holds: its columns,
//! their types, and the indexes the server enforces. Schemas are parsed from
//! the JSON schema document defined by RFC 7047 section 3.2, which is what a
//! server returns for `get_schema`.
//!
//! ```text
//! {"name": "Open_vSwitch", "version": "8.3.0",
//!  "tables": {"Bridge": {"columns": {"name": {"type": "string"},
//!                                    "ports": {"type": {"key": {"type": "uuid", "refTable": "Port"},
//!                                                       "min": 0, "max": "unlimited"}}},
//!                        "indexes": [["name"]]}}}
//! ```

use crate::error::{Error, Result};
use crate::value::{Atom, AtomicType, Datum};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the pseudo-column holding a row's own identity
pub const UUID_COLUMN: &str = "_uuid";

// ============================================================================
// Column types
// ============================================================================

/// Type of a set member, map key or map value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseType {
    /// Atomic type
    pub atomic: AtomicType,
    /// Referenced table for uuid atoms
    pub ref_table: Option<String>,
}

impl BaseType {
    /// A plain atomic type
    pub fn new(atomic: AtomicType) -> Self {
        Self {
            atomic,
            ref_table: None,
        }
    }

    /// A uuid referencing rows of `table`
    pub fn reference(table: impl Into<String>) -> Self {
        Self {
            atomic: AtomicType::Uuid,
            ref_table: Some(table.into()),
        }
    }
}

/// Type of a column: key type, optional value type, and cardinality
///
/// `max == None` means unlimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// Key (or member) type
    pub key: BaseType,
    /// Value type, present only for maps
    pub value: Option<BaseType>,
    /// Minimum number of elements
    pub min: u64,
    /// Maximum number of elements
    pub max: Option<u64>,
}

impl ColumnType {
    /// Exactly one atom
    pub fn scalar(atomic: AtomicType) -> Self {
        Self {
            key: BaseType::new(atomic),
            value: None,
            min: 1,
            max: Some(1),
        }
    }

    /// Zero or one atom
    pub fn optional(atomic: AtomicType) -> Self {
        Self {
            min: 0,
            ..Self::scalar(atomic)
        }
    }

    /// Any number of atoms
    pub fn set(atomic: AtomicType) -> Self {
        Self {
            min: 0,
            max: None,
            ..Self::scalar(atomic)
        }
    }

    /// Any number of references into `table`
    pub fn reference_set(table: impl Into<String>) -> Self {
        Self {
            key: BaseType::reference(table),
            value: None,
            min: 0,
            max: None,
        }
    }

    /// Zero or one reference into `table`
    pub fn optional_reference(table: impl Into<String>) -> Self {
        Self {
            max: Some(1),
            ..Self::reference_set(table)
        }
    }

    /// Any number of key/value pairs
    pub fn map(key: AtomicType, value: AtomicType) -> Self {
        Self {
            key: BaseType::new(key),
            value: Some(BaseType::new(value)),
            min: 0,
            max: None,
        }
    }

    /// True for map columns
    pub fn is_map(&self) -> bool {
        self.value.is_some()
    }

    /// True when the column holds zero or one element
    pub fn is_optional(&self) -> bool {
        self.min == 0 && self.max == Some(1)
    }

    /// True when the column holds exactly one atom
    pub fn is_scalar(&self) -> bool {
        self.min == 1 && self.max == Some(1) && !self.is_map()
    }

    /// Value a freshly inserted row carries in this column
    pub fn default_datum(&self) -> Datum {
        if self.min == 0 {
            return Datum::empty();
        }
        match &self.value {
            Some(value) => Datum::Map(
                std::iter::once((self.key.atomic.default_atom(), value.atomic.default_atom()))
                    .collect(),
            ),
            None => Datum::scalar(self.key.atomic.default_atom()),
        }
    }

    /// Verify that `datum` fits this type (form, atom types, cardinality)
    pub fn check(&self, datum: &Datum) -> Result<()> {
        let n = datum.len() as u64;
        if n < self.min || self.max.map_or(false, |max| n > max) {
            return Err(Error::InvalidDatum(format!(
                "{} elements outside [{}, {}]",
                n,
                self.min,
                self.max
                    .map_or_else(|| "unlimited".to_string(), |m| m.to_string())
            )));
        }
        let check_atom = |atom: &Atom, base: &BaseType| {
            if atom.atomic_type() == base.atomic {
                Ok(())
            } else {
                Err(Error::InvalidDatum(format!(
                    "expected {} atom, got {} ({})",
                    base.atomic,
                    atom.atomic_type(),
                    atom
                )))
            }
        };
        match (datum, &self.value) {
            (Datum::Set(atoms), None) => atoms.iter().try_for_each(|a| check_atom(a, &self.key)),
            (Datum::Map(pairs), Some(value)) => pairs.iter().try_for_each(|(k, v)| {
                check_atom(k, &self.key)?;
                check_atom(v, value)
            }),
            // Empty maps are stored as the empty set
            (Datum::Set(atoms), Some(_)) if atoms.is_empty() => Ok(()),
            (Datum::Set(_), Some(_)) => Err(Error::InvalidDatum(
                "expected a map, got a set".to_string(),
            )),
            (Datum::Map(_), None) => Err(Error::InvalidDatum(
                "expected a set, got a map".to_string(),
            )),
        }
    }
}

// ============================================================================
// Tables and databases
// ============================================================================

/// A column of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// Column name
    pub name: String,
    /// Column type
    pub ty: ColumnType,
}

/// A table: columns plus the indexes the server enforces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name
    pub name: String,
    /// Columns by name
    pub columns: BTreeMap<String, ColumnSchema>,
    /// Each index is a list of column names
    pub indexes: Vec<Vec<String>>,
    /// Root tables keep rows alive without incoming references
    pub is_root: bool,
    /// Maximum row count, if bounded
    pub max_rows: Option<u64>,
}

impl TableSchema {
    /// Start building a table with no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
            indexes: Vec::new(),
            is_root: false,
            max_rows: None,
        }
    }

    /// Add a column
    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        let name = name.into();
        self.columns.insert(name.clone(), ColumnSchema { name, ty });
        self
    }

    /// Add an index over `columns`
    pub fn index(mut self, columns: &[&str]) -> Self {
        self.indexes
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Mark the table as a root table
    pub fn root(mut self) -> Self {
        self.is_root = true;
        self
    }

    /// Look up a column's schema
    pub fn get_column(&self, name: &str) -> Result<&ColumnSchema> {
        self.columns.get(name).ok_or_else(|| Error::NoSuchColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// The column of the table's sole single-column index, if it has one
    pub fn index_column(&self) -> Option<&str> {
        match self.indexes.as_slice() {
            [only] if only.len() == 1 => Some(only[0].as_str()),
            _ => None,
        }
    }
}

/// Descriptor of a whole database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSchema {
    /// Database name (e.g. `Open_vSwitch`)
    pub name: String,
    /// Schema version string
    pub version: String,
    /// Tables by name
    pub tables: BTreeMap<String, Arc<TableSchema>>,
}

impl DatabaseSchema {
    /// An empty schema
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tables: BTreeMap::new(),
        }
    }

    /// Add a table
    pub fn table(mut self, table: TableSchema) -> Self {
        self.tables.insert(table.name.clone(), Arc::new(table));
        self
    }

    /// Look up a table's schema
    pub fn get_table(&self, name: &str) -> Result<&Arc<TableSchema>> {
        self.tables
            .get(name)
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))
    }

    /// Parse a JSON schema document
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawSchema = serde_json::from_str(text)
            .map_err(|e| Error::SchemaRetrieval(format!("invalid schema document: {}", e)))?;
        raw.into_schema()
    }

    /// Convert an already-decoded JSON schema document
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let raw: RawSchema = serde_json::from_value(value)
            .map_err(|e| Error::SchemaRetrieval(format!("invalid schema document: {}", e)))?;
        raw.into_schema()
    }
}

// ============================================================================
// JSON document form
// ============================================================================

#[derive(Deserialize)]
struct RawSchema {
    name: String,
    #[serde(default)]
    version: String,
    tables: BTreeMap<String, RawTable>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: BTreeMap<String, RawColumn>,
    #[serde(default)]
    indexes: Vec<Vec<String>>,
    #[serde(default, rename = "isRoot")]
    is_root: bool,
    #[serde(default, rename = "maxRows")]
    max_rows: Option<u64>,
}

#[derive(Deserialize)]
struct RawColumn {
    #[serde(rename = "type")]
    ty: RawType,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawType {
    Atomic(String),
    Complex {
        key: RawBase,
        #[serde(default)]
        value: Option<RawBase>,
        #[serde(default = "default_min")]
        min: u64,
        #[serde(default)]
        max: Option<RawMax>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBase {
    Atomic(String),
    Full {
        #[serde(rename = "type")]
        ty: String,
        #[serde(default, rename = "refTable")]
        ref_table: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMax {
    Count(u64),
    Word(String),
}

fn default_min() -> u64 {
    1
}

impl RawBase {
    fn into_base(self) -> Result<BaseType> {
        match self {
            RawBase::Atomic(name) => Ok(BaseType::new(AtomicType::parse(&name)?)),
            RawBase::Full { ty, ref_table } => Ok(BaseType {
                atomic: AtomicType::parse(&ty)?,
                ref_table,
            }),
        }
    }
}

impl RawType {
    fn into_type(self) -> Result<ColumnType> {
        match self {
            RawType::Atomic(name) => Ok(ColumnType::scalar(AtomicType::parse(&name)?)),
            RawType::Complex {
                key,
                value,
                min,
                max,
            } => {
                let max = match max {
                    None => Some(1),
                    Some(RawMax::Count(n)) => Some(n),
                    Some(RawMax::Word(w)) if w == "unlimited" => None,
                    Some(RawMax::Word(w)) => {
                        return Err(Error::SchemaRetrieval(format!("invalid max '{}'", w)))
                    }
                };
                if min > 1 || max.map_or(false, |m| m < min.max(1)) {
                    return Err(Error::SchemaRetrieval(format!(
                        "invalid cardinality min={} max={:?}",
                        min, max
                    )));
                }
                Ok(ColumnType {
                    key: key.into_base()?,
                    value: value.map(RawBase::into_base).transpose()?,
                    min,
                    max,
                })
            }
        }
    }
}

impl RawSchema {
    fn into_schema(self) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new(self.name, self.version);
        for (name, raw) in self.tables {
            let mut table = TableSchema::new(name.clone());
            table.is_root = raw.is_root;
            table.max_rows = raw.max_rows;
            for (column, raw_column) in raw.columns {
                if column.starts_with('_') {
                    return Err(Error::SchemaRetrieval(format!(
                        "column name '{}' in table {} is reserved",
                        column, name
                    )));
                }
                table = table.column(column, raw_column.ty.into_type()?);
            }
            for index in &raw.indexes {
                if let Some(missing) = index.iter().find(|c| !table.columns.contains_key(*c)) {
                    return Err(Error::SchemaRetrieval(format!(
                        "index on table {} names unknown column {}",
                        name, missing
                    )));
                }
            }
            table.indexes = raw.indexes;
            schema = schema.table(table);
        }
        Ok(schema)
    }
}
