//! Column reads and condition matching
//!
//! [`get_column_value`] is the public read boundary: it turns a stored
//! [`Datum`](ovsdb_core::Datum) into the [`Value`] callers see, collapsing
//! scalar and optional columns to bare atoms.
//!
//! [`condition_match`] evaluates a `(column, operator, operand)` triple
//! against that value. Only `=` and `!=` are implemented; every other
//! operator fails with [`Error::UnsupportedOperator`].
//!
//! ## Operand rules
//!
//! | Operand | `=` | `!=` |
//! |---------|-----|------|
//! | map | every operand key present with an equal value | any operand key missing or different |
//! | list | every operand element present (direct equality if either side is empty) | no operand element present (direct inequality if either side is empty) |
//! | scalar | equal | not equal |
//!
//! Operand and value must have the same type. The single exception is an
//! optional column where exactly one side is the empty list: that side is
//! normalized to [`Value::None`] and compared as a scalar.

use ovsdb_core::{Atom, Error, Result, Row, Value, UUID_COLUMN};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Condition operators from RFC 7047 section 5.1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=` (also accepted as `==`)
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `includes`
    Includes,
    /// `excludes`
    Excludes,
}

impl Operator {
    /// Operator as written in a condition
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Includes => "includes",
            Operator::Excludes => "excludes",
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" | "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "includes" => Ok(Operator::Includes),
            "excludes" => Ok(Operator::Excludes),
            other => Err(Error::UnsupportedOperator {
                op: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(column, operator, operand)` triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Column to read (may be `_uuid`)
    pub column: String,
    /// Comparison operator
    pub op: Operator,
    /// Operand compared against the column's materialized value
    pub value: Value,
}

impl Condition {
    /// Build a condition
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Eq, value)
    }

    /// `column != value`
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, Operator::Ne, value)
    }

    /// Build a condition from an operator string
    pub fn parse(column: impl Into<String>, op: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(Self::new(column, op.parse()?, value))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.column, self.op, self.value)
    }
}

/// Read a column's materialized value
///
/// `_uuid` yields the row's identity. Scalar columns yield their atom.
/// Optional columns yield their atom when set and the empty list when not.
/// Sets yield a list and maps a map. Reference columns hold uuids, so
/// callers only ever see identifiers.
pub fn get_column_value(row: &Row, column: &str) -> Result<Value> {
    if column == UUID_COLUMN {
        return Ok(Value::Atom(Atom::Uuid(row.uuid())));
    }
    let ty = &row.schema().get_column(column)?.ty;
    let datum = row.datum(column)?;
    Ok(match datum {
        ovsdb_core::Datum::Map(pairs) => Value::Map(pairs.clone()),
        ovsdb_core::Datum::Set(_) if ty.is_map() => Value::Map(Default::default()),
        ovsdb_core::Datum::Set(atoms) => match atoms.as_slice() {
            [only] if ty.is_scalar() || ty.is_optional() => Value::Atom(only.clone()),
            _ => Value::List(atoms.clone()),
        },
    })
}

fn is_optional(row: &Row, column: &str) -> bool {
    column != UUID_COLUMN
        && row
            .schema()
            .get_column(column)
            .map(|c| c.ty.is_optional())
            .unwrap_or(false)
}

/// Return whether a condition matches a row
///
/// # Errors
///
/// - [`Error::UnsupportedOperator`] for operators other than `=` and `!=`
/// - [`Error::TypeMismatch`] when the operand type cannot be compared with
///   the column value
/// - [`Error::NoSuchColumn`] when the column does not exist
pub fn condition_match(row: &Row, condition: &Condition) -> Result<bool> {
    let equal = match condition.op {
        Operator::Eq => true,
        Operator::Ne => false,
        other => {
            return Err(Error::UnsupportedOperator {
                op: other.to_string(),
            })
        }
    };

    let mut value = get_column_value(row, &condition.column)?;
    let mut operand = condition.value.clone();

    if !operand.same_type(&value) {
        let optional = is_optional(row, &condition.column);
        if optional && operand.is_empty_list() {
            operand = Value::None;
        } else if optional && value.is_empty_list() {
            value = Value::None;
        } else {
            return Err(Error::TypeMismatch {
                column: condition.column.clone(),
                expected: value.type_name().to_string(),
                actual: operand.type_name().to_string(),
            });
        }
    }

    Ok(match (&operand, &value) {
        (Value::Map(want), Value::Map(have)) => {
            let all_equal = want.iter().all(|(k, v)| have.get(k) == Some(v));
            all_equal == equal
        }
        (Value::List(want), Value::List(have)) => {
            if want.is_empty() || have.is_empty() {
                return Ok((want.is_empty() && have.is_empty()) == equal);
            }
            let have: BTreeSet<&Atom> = have.iter().collect();
            let want: BTreeSet<&Atom> = want.iter().collect();
            if equal {
                want.iter().all(|a| have.contains(a))
            } else {
                want.iter().all(|a| !have.contains(a))
            }
        }
        _ => (operand == value) == equal,
    })
}

/// Return whether the row matches every condition, in order
pub fn row_match(row: &Row, conditions: &[Condition]) -> Result<bool> {
    for condition in conditions {
        if !condition_match(row, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}
