//! Value types for the mirrored database
//!
//! This module defines three layers of values:
//! - [`Atom`]: a single scalar (integer, real, boolean, string, uuid)
//! - [`Datum`]: the stored form of every column, either a set of atoms or a
//!   map of atom to atom
//! - [`Value`]: the materialized form handed to API consumers and used as
//!   condition operands
//!
//! ## Storage vs. Presentation
//!
//! Columns are stored uniformly as sets. A scalar column is a one-element
//! set, an optional column is a zero-or-one element set. Collapsing to a bare
//! scalar happens only when a column is read through the public boundary
//! (see `ovsdb_lookup::get_column_value`), so internal comparisons never see
//! the collapsing rule.
//!
//! ## Atom Ordering
//!
//! Atoms have a total order so sets and maps can be kept sorted:
//! atoms of the same type compare by value (reals by `total_cmp`), atoms of
//! different types compare by type rank.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ============================================================================
// AtomicType
// ============================================================================

/// The five OVSDB atomic types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomicType {
    /// 64-bit signed integer
    Integer,
    /// IEEE-754 double
    Real,
    /// Boolean
    Boolean,
    /// UTF-8 string
    String,
    /// Row identifier
    Uuid,
}

impl AtomicType {
    /// Name as written in a schema document
    pub fn name(&self) -> &'static str {
        match self {
            AtomicType::Integer => "integer",
            AtomicType::Real => "real",
            AtomicType::Boolean => "boolean",
            AtomicType::String => "string",
            AtomicType::Uuid => "uuid",
        }
    }

    /// Parse a schema type name
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "integer" => Ok(AtomicType::Integer),
            "real" => Ok(AtomicType::Real),
            "boolean" => Ok(AtomicType::Boolean),
            "string" => Ok(AtomicType::String),
            "uuid" => Ok(AtomicType::Uuid),
            other => Err(Error::SchemaRetrieval(format!(
                "unknown atomic type '{}'",
                other
            ))),
        }
    }

    /// Default atom used to fill a mandatory column of this type
    pub fn default_atom(&self) -> Atom {
        match self {
            AtomicType::Integer => Atom::Integer(0),
            AtomicType::Real => Atom::Real(0.0),
            AtomicType::Boolean => Atom::Boolean(false),
            AtomicType::String => Atom::String(String::new()),
            AtomicType::Uuid => Atom::Uuid(Uuid::nil()),
        }
    }
}

impl fmt::Display for AtomicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Atom
// ============================================================================

/// A single scalar value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Atom {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Real(f64),
    /// Boolean
    Boolean(bool),
    /// UTF-8 string
    String(String),
    /// Row identifier
    Uuid(Uuid),
}

impl Atom {
    /// Atomic type of this atom
    pub fn atomic_type(&self) -> AtomicType {
        match self {
            Atom::Integer(_) => AtomicType::Integer,
            Atom::Real(_) => AtomicType::Real,
            Atom::Boolean(_) => AtomicType::Boolean,
            Atom::String(_) => AtomicType::String,
            Atom::Uuid(_) => AtomicType::Uuid,
        }
    }

    /// Get as uuid if this is a Uuid atom
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Atom::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Get as &str if this is a String atom
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Atom::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if this is an Integer atom
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Atom::Integer(i) => Some(*i),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Atom::Integer(_) => 0,
            Atom::Real(_) => 1,
            Atom::Boolean(_) => 2,
            Atom::String(_) => 3,
            Atom::Uuid(_) => 4,
        }
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Atom {}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Atom::Integer(a), Atom::Integer(b)) => a.cmp(b),
            (Atom::Real(a), Atom::Real(b)) => a.total_cmp(b),
            (Atom::Boolean(a), Atom::Boolean(b)) => a.cmp(b),
            (Atom::String(a), Atom::String(b)) => a.cmp(b),
            (Atom::Uuid(a), Atom::Uuid(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Integer(i) => write!(f, "{}", i),
            Atom::Real(r) => write!(f, "{}", r),
            Atom::Boolean(b) => write!(f, "{}", b),
            Atom::String(s) => f.write_str(s),
            Atom::Uuid(u) => write!(f, "{}", u),
        }
    }
}

impl From<i64> for Atom {
    fn from(i: i64) -> Self {
        Atom::Integer(i)
    }
}

impl From<f64> for Atom {
    fn from(r: f64) -> Self {
        Atom::Real(r)
    }
}

impl From<bool> for Atom {
    fn from(b: bool) -> Self {
        Atom::Boolean(b)
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::String(s.to_string())
    }
}

impl From<String> for Atom {
    fn from(s: String) -> Self {
        Atom::String(s)
    }
}

impl From<Uuid> for Atom {
    fn from(u: Uuid) -> Self {
        Atom::Uuid(u)
    }
}

// ============================================================================
// Datum
// ============================================================================

/// Stored value of a column
///
/// Sets are kept sorted and free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Datum {
    /// Zero or more atoms
    Set(Vec<Atom>),
    /// Key/value pairs
    Map(BTreeMap<Atom, Atom>),
}

impl Default for Datum {
    fn default() -> Self {
        Datum::empty()
    }
}

impl Datum {
    /// The empty set
    pub fn empty() -> Self {
        Datum::Set(Vec::new())
    }

    /// A one-element set
    pub fn scalar(atom: impl Into<Atom>) -> Self {
        Datum::Set(vec![atom.into()])
    }

    /// A set built from any atoms, sorted and deduplicated
    pub fn set<I, A>(atoms: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Atom>,
    {
        let mut atoms: Vec<Atom> = atoms.into_iter().map(Into::into).collect();
        atoms.sort();
        atoms.dedup();
        Datum::Set(atoms)
    }

    /// A map built from key/value pairs; later duplicates win
    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Atom>,
        V: Into<Atom>,
    {
        Datum::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Number of atoms (set) or pairs (map)
    pub fn len(&self) -> usize {
        match self {
            Datum::Set(atoms) => atoms.len(),
            Datum::Map(pairs) => pairs.len(),
        }
    }

    /// True when there are no atoms or pairs
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True for the map form
    pub fn is_map(&self) -> bool {
        matches!(self, Datum::Map(_))
    }

    /// Atoms of a set; empty for maps
    pub fn atoms(&self) -> &[Atom] {
        match self {
            Datum::Set(atoms) => atoms,
            Datum::Map(_) => &[],
        }
    }

    /// Every uuid held in a set (the members of a reference set)
    pub fn uuids(&self) -> Vec<Uuid> {
        self.atoms().iter().filter_map(Atom::as_uuid).collect()
    }

    /// Replace every occurrence of `from` (keys, values and members) with `to`
    pub fn replace_uuid(&mut self, from: &Uuid, to: &Uuid) {
        let swap = |atom: &Atom| match atom {
            Atom::Uuid(u) if u == from => Atom::Uuid(*to),
            other => other.clone(),
        };
        *self = match self {
            Datum::Set(atoms) => Datum::set(atoms.iter().map(swap)),
            Datum::Map(pairs) => Datum::Map(pairs.iter().map(|(k, v)| (swap(k), swap(v))).collect()),
        };
    }

    /// Union of two datums of the same form
    ///
    /// For maps, keys already present keep their current value, matching the
    /// OVSDB `insert` mutator.
    pub fn union(&self, other: &Datum) -> Result<Datum> {
        match (self, other) {
            (Datum::Set(a), Datum::Set(b)) => Ok(Datum::set(a.iter().chain(b.iter()).cloned())),
            (Datum::Map(a), Datum::Map(b)) => {
                let mut merged = a.clone();
                for (k, v) in b {
                    merged.entry(k.clone()).or_insert_with(|| v.clone());
                }
                Ok(Datum::Map(merged))
            }
            // An empty map column is stored as the empty set
            (Datum::Set(a), Datum::Map(b)) if a.is_empty() => Ok(Datum::Map(b.clone())),
            (Datum::Map(a), Datum::Set(b)) if b.is_empty() => Ok(Datum::Map(a.clone())),
            _ => Err(Error::InvalidDatum(
                "cannot combine a set with a map".to_string(),
            )),
        }
    }
}

// ============================================================================
// Value
// ============================================================================

/// Materialized column value as seen by API consumers
///
/// ## Type Equality
///
/// Two values have the same type when they are the same variant and, for
/// `Atom`, carry the same [`AtomicType`]. Lists and maps are one type each
/// regardless of their contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value of an optional column after normalization
    None,
    /// A bare scalar
    Atom(Atom),
    /// Ordered sequence of atoms
    List(Vec<Atom>),
    /// Key/value pairs
    Map(BTreeMap<Atom, Atom>),
}

impl Value {
    /// A list value from any atoms
    pub fn list<I, A>(atoms: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Atom>,
    {
        Value::List(atoms.into_iter().map(Into::into).collect())
    }

    /// A map value from key/value pairs
    pub fn map<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Atom>,
        V: Into<Atom>,
    {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// The empty list
    pub fn empty_list() -> Self {
        Value::List(Vec::new())
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Atom(a) => a.atomic_type().name(),
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// True when both values have the same type
    pub fn same_type(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Atom(a), Value::Atom(b)) => a.atomic_type() == b.atomic_type(),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }

    /// True for the empty list
    pub fn is_empty_list(&self) -> bool {
        matches!(self, Value::List(items) if items.is_empty())
    }

    /// Get the atom if this is a scalar
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Value::Atom(a) => Some(a),
            _ => None,
        }
    }

    /// Stored form of this value
    pub fn to_datum(&self) -> Datum {
        match self {
            Value::None => Datum::empty(),
            Value::Atom(a) => Datum::scalar(a.clone()),
            Value::List(items) => Datum::set(items.iter().cloned()),
            Value::Map(pairs) => Datum::Map(pairs.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("[]"),
            Value::Atom(a) => write!(f, "{}", a),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Map(pairs) => {
                let parts: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

impl From<Atom> for Value {
    fn from(v: Atom) -> Self {
        Value::Atom(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Atom(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Atom(v.into())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Atom(v.into())
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Atom(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Atom(v.into())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Atom(v.into())
    }
}
