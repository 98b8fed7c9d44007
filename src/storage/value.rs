//! Typed values, fields and result cursors of the storage contract.
//!
//! Every backend speaks the same small vocabulary:
//!
//! - [`Field`]: a `(column, value)` pair used both for inserted columns and
//!   for equality predicates. The type tag travels with the [`Value`].
//! - [`Projection`]: the columns a select returns ([`Projection::All`] is `*`).
//! - [`ResultSet`]: a cursor over matching rows with typed getters.

use crate::models::{ItemId, VersionId};
use crate::{Error, Result};
use std::fmt;

/// Column type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// UTF-8 text.
    String,
    /// 64-bit signed integer.
    Long,
    /// Boolean flag.
    Boolean,
}

impl DataType {
    /// Returns the type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Long => "long",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Absent value.
    Null,
    /// 64-bit signed integer.
    Long(i64),
    /// UTF-8 text.
    String(String),
    /// Boolean flag.
    Boolean(bool),
}

impl Value {
    /// Returns the type tag, `None` for [`Value::Null`].
    #[must_use]
    pub const fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Long(_) => Some(DataType::Long),
            Self::String(_) => Some(DataType::String),
            Self::Boolean(_) => Some(DataType::Boolean),
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Long(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<ItemId> for Value {
    fn from(v: ItemId) -> Self {
        Self::Long(v.get())
    }
}

impl From<VersionId> for Value {
    fn from(v: VersionId) -> Self {
        Self::Long(v.get())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A `(column, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name.
    pub column: String,
    /// Typed value.
    pub value: Value,
}

impl Field {
    /// Creates a field.
    #[must_use]
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// Columns returned by a select.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// Every column, in schema order.
    #[default]
    All,
    /// The listed columns, in the listed order.
    Columns(Vec<String>),
}

impl Projection {
    /// Projection of the given columns.
    #[must_use]
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Columns(columns.into_iter().map(Into::into).collect())
    }
}

/// The `*` projection.
pub const SELECT_STAR: Projection = Projection::All;

/// One result row: column names paired with values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    /// Creates a row from `(column, value)` pairs.
    #[must_use]
    pub const fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    /// Returns the raw value of a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Returns `true` if every predicate holds on this row.
    #[must_use]
    pub fn matches(&self, predicates: &[Field]) -> bool {
        predicates
            .iter()
            .all(|p| self.get(&p.column) == Some(&p.value))
    }

    /// Sets a column, appending it if absent.
    pub fn set(&mut self, column: &str, value: Value) {
        match self.values.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((column.to_string(), value)),
        }
    }

    /// Keeps only the projected columns, in projection order.
    #[must_use]
    pub fn project(&self, projection: &Projection) -> Self {
        match projection {
            Projection::All => self.clone(),
            Projection::Columns(columns) => Self {
                values: columns
                    .iter()
                    .map(|c| (c.clone(), self.get(c).cloned().unwrap_or(Value::Null)))
                    .collect(),
            },
        }
    }

    /// Column names in row order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    fn require(&self, column: &str) -> Result<&Value> {
        self.get(column).ok_or_else(|| Error::StorageFailure {
            operation: "read_column".to_string(),
            cause: format!("column '{column}' not present in row"),
        })
    }

    /// Reads a long column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] if the column is absent or not a long.
    pub fn get_long(&self, column: &str) -> Result<i64> {
        match self.require(column)? {
            Value::Long(v) => Ok(*v),
            other => Err(type_mismatch(column, DataType::Long, other)),
        }
    }

    /// Reads a string column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] if the column is absent or not a string.
    pub fn get_string(&self, column: &str) -> Result<String> {
        match self.require(column)? {
            Value::String(v) => Ok(v.clone()),
            other => Err(type_mismatch(column, DataType::String, other)),
        }
    }

    /// Reads a nullable string column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] if the column is absent or neither null nor a string.
    pub fn get_optional_string(&self, column: &str) -> Result<Option<String>> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::String(v) => Ok(Some(v.clone())),
            other => Err(type_mismatch(column, DataType::String, other)),
        }
    }

    /// Reads a boolean column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] if the column is absent or not a boolean.
    pub fn get_bool(&self, column: &str) -> Result<bool> {
        match self.require(column)? {
            Value::Boolean(v) => Ok(*v),
            other => Err(type_mismatch(column, DataType::Boolean, other)),
        }
    }
}

fn type_mismatch(column: &str, expected: DataType, found: &Value) -> Error {
    Error::StorageFailure {
        operation: "read_column".to_string(),
        cause: format!(
            "column '{column}' expected {expected}, found {}",
            found.data_type().map_or("null", |t| t.as_str())
        ),
    }
}

/// Cursor over the rows of a select.
///
/// The cursor starts on the first row; typed getters read the current row
/// and [`ResultSet::advance`] moves to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet {
    rows: Vec<Row>,
    position: usize,
}

impl ResultSet {
    /// Creates a cursor positioned on the first row.
    #[must_use]
    pub const fn new(rows: Vec<Row>) -> Self {
        Self { rows, position: 0 }
    }

    /// Returns `true` if the select matched no row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of matched rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Moves to the next row. Returns `false` once past the last row.
    pub fn advance(&mut self) -> bool {
        if self.position < self.rows.len() {
            self.position += 1;
        }
        self.position < self.rows.len()
    }

    /// The current row, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Row> {
        self.rows.get(self.position)
    }

    fn current_or_err(&self) -> Result<&Row> {
        self.current().ok_or_else(|| Error::StorageFailure {
            operation: "read_result".to_string(),
            cause: "no current row".to_string(),
        })
    }

    /// Reads a long column of the current row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] without a current row or on type mismatch.
    pub fn get_long(&self, column: &str) -> Result<i64> {
        self.current_or_err()?.get_long(column)
    }

    /// Reads a string column of the current row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] without a current row or on type mismatch.
    pub fn get_string(&self, column: &str) -> Result<String> {
        self.current_or_err()?.get_string(column)
    }

    /// Reads a nullable string column of the current row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] without a current row or on type mismatch.
    pub fn get_optional_string(&self, column: &str) -> Result<Option<String>> {
        self.current_or_err()?.get_optional_string(column)
    }

    /// Reads a boolean column of the current row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageFailure`] without a current row or on type mismatch.
    pub fn get_bool(&self, column: &str) -> Result<bool> {
        self.current_or_err()?.get_bool(column)
    }

    /// All rows, regardless of cursor position.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consumes the cursor, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(vec![
            ("name".to_string(), Value::from("e1")),
            ("item_id".to_string(), Value::from(7_i64)),
            ("reference".to_string(), Value::Null),
        ])
    }

    #[test]
    fn test_typed_getters() {
        let row = row();
        assert_eq!(row.get_string("name").unwrap(), "e1");
        assert_eq!(row.get_long("item_id").unwrap(), 7);
        assert_eq!(row.get_optional_string("reference").unwrap(), None);
    }

    #[test]
    fn test_type_mismatch_is_storage_failure() {
        let err = row().get_long("name").unwrap_err();
        assert!(matches!(err, Error::StorageFailure { ref cause, .. } if cause.contains("expected long")));
        assert!(row().get_string("missing").is_err());
    }

    #[test]
    fn test_matches_and_project() {
        let row = row();
        assert!(row.matches(&[Field::new("item_id", 7_i64)]));
        assert!(!row.matches(&[Field::new("item_id", "7")]));
        assert!(row.matches(&[]));

        let projected = row.project(&Projection::columns(["item_id"]));
        assert_eq!(projected.columns().collect::<Vec<_>>(), vec!["item_id"]);
    }

    #[test]
    fn test_cursor() {
        let mut rs = ResultSet::new(vec![row(), row()]);
        assert!(!rs.is_empty());
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.get_long("item_id").unwrap(), 7);
        assert!(rs.advance());
        assert!(!rs.advance());
        assert!(rs.get_long("item_id").is_err());

        let empty = ResultSet::default();
        assert!(empty.is_empty());
        assert!(empty.get_string("name").is_err());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(ItemId::new(3)), Value::Long(3));
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".to_string()));
        assert_eq!(Value::Long(1).data_type(), Some(DataType::Long));
    }
}
