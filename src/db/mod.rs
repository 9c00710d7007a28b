//! Database Types and Access Trait
//!
//! This module defines the core database abstractions: the variant scalar
//! type rows are made of, the ordered result-set shape, column metadata, and
//! the [`Database`] trait the rest of the system talks to.
//!
//! # Driver Independence
//! Rows are represented as an ordered pairing of column names and
//! [`SqlValue`]s rather than driver row handles, so serialization and
//! value-counting logic never depend on a specific driver's row type.
//!
//! # Shared Connection
//! Unlike stateless per-call engines, implementations hold one live
//! connection for the whole session: opened at startup, used by
//! introspection and every statement, closed exactly once at exit.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod postgres;

/// A single scalar value from a result set
///
/// `Raw` is the fallback for types the driver mapping does not model;
/// it carries the value's textual representation.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Integer (covers smallint, integer, bigint)
    Int(i64),
    /// Floating point (covers real, double precision)
    Float(f64),
    /// Text (also the rendering for dates, timestamps, uuids, bytea)
    Text(String),
    /// Raw textual fallback for unmapped types
    Raw(String),
}

impl SqlValue {
    /// Convert to a JSON value for pretty-printed result rows
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Text(s) | Self::Raw(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) | Self::Raw(s) => write!(f, "{s}"),
        }
    }
}

/// Query result set
///
/// Column order is the statement's projection order; every row has exactly
/// `columns.len()` values in that order.
#[derive(Debug, Clone, Default)]
pub struct QueryRows {
    /// Column names in result order
    pub columns: Vec<String>,

    /// Result rows, one `SqlValue` per column
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryRows {
    /// Number of scalar values per row
    #[must_use]
    pub fn row_width(&self) -> usize {
        self.columns.len()
    }
}

/// Pair a row's values with their column names as a JSON object
///
/// Key order follows column order (`serde_json` is built with
/// `preserve_order` for exactly this).
#[must_use]
pub fn row_to_object(
    columns: &[String],
    row: &[SqlValue],
) -> serde_json::Map<String, serde_json::Value> {
    columns
        .iter()
        .zip(row.iter())
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

/// Column metadata from schema introspection
///
/// Produced once at session start; `example` is filled only in annotated
/// mode, from one sampled row per table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Owning table name
    pub table: String,

    /// Column name
    pub name: String,

    /// Column data type (engine-specific spelling)
    pub data_type: String,

    /// Whether the column allows NULL values
    pub nullable: bool,

    /// String rendering of one sampled value, if annotation ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// Database access trait
///
/// The session holds one implementation for its whole lifetime. Both
/// methods run against the same live connection.
#[async_trait]
pub trait Database: Send + Sync {
    /// Execute one statement with a per-statement timeout
    ///
    /// Timeout expiry is an ordinary error result, never a panic or a
    /// connection teardown.
    async fn query(&self, sql: &str, timeout: Duration) -> Result<QueryRows>;

    /// Fetch all columns of the default schema
    ///
    /// Ordering is a hard requirement: table name first, then declaration
    /// (ordinal) position, because the result determines prompt content.
    async fn list_columns(&self) -> Result<Vec<ColumnDescriptor>>;
}
