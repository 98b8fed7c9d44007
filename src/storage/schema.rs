//! Static catalog schema.
//!
//! Every table a backend may be asked about is declared here. Backends
//! validate table and column names against this schema before touching
//! storage, so identifiers interpolated into SQL always come from this file.
//!
//! | Table | Purpose |
//! |-------|---------|
//! | `item` | One row per item, any kind |
//! | `tag` | Tags of items and versions, keyed by owner id |
//! | `node` / `edge` | Kind-specific item attributes |
//! | `node_version` / `edge_version` | Kind-specific version rows |
//! | `version_history_node` | Versions registered in an item's DAG |
//! | `version_history_edge` | `parent → child` lineage edges of an item's DAG |

use crate::storage::value::{DataType, Field, Projection};
use crate::{Error, Result};

/// Shared item table.
pub const ITEM_TABLE: &str = "item";
/// Tag table.
pub const TAG_TABLE: &str = "tag";
/// Node attributes.
pub const NODE_TABLE: &str = "node";
/// Node versions.
pub const NODE_VERSION_TABLE: &str = "node_version";
/// Edge attributes.
pub const EDGE_TABLE: &str = "edge";
/// Edge versions.
pub const EDGE_VERSION_TABLE: &str = "edge_version";
/// DAG nodes.
pub const DAG_NODE_TABLE: &str = "version_history_node";
/// DAG edges.
pub const DAG_EDGE_TABLE: &str = "version_history_edge";

/// A column declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: &'static str,
    /// Column type.
    pub data_type: DataType,
    /// Whether `NULL` is allowed.
    pub nullable: bool,
}

const fn col(name: &'static str, data_type: DataType) -> ColumnDef {
    ColumnDef {
        name,
        data_type,
        nullable: false,
    }
}

const fn nullable(name: &'static str, data_type: DataType) -> ColumnDef {
    ColumnDef {
        name,
        data_type,
        nullable: true,
    }
}

/// A table declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    /// Table name.
    pub name: &'static str,
    /// Columns in storage order.
    pub columns: &'static [ColumnDef],
    /// Columns that get a secondary index.
    pub indexes: &'static [&'static str],
}

/// Every table of the catalog.
pub const TABLES: &[TableDef] = &[
    TableDef {
        name: ITEM_TABLE,
        columns: &[col("item_id", DataType::Long), col("kind", DataType::String)],
        indexes: &["item_id"],
    },
    TableDef {
        name: TAG_TABLE,
        columns: &[
            col("owner_id", DataType::Long),
            col("key", DataType::String),
            nullable("value", DataType::String),
        ],
        indexes: &["owner_id"],
    },
    TableDef {
        name: NODE_TABLE,
        columns: &[
            col("name", DataType::String),
            col("item_id", DataType::Long),
            col("source_key", DataType::String),
        ],
        indexes: &["item_id", "source_key"],
    },
    TableDef {
        name: NODE_VERSION_TABLE,
        columns: &[
            col("id", DataType::Long),
            col("node_id", DataType::Long),
            nullable("reference", DataType::String),
        ],
        indexes: &["id", "node_id"],
    },
    TableDef {
        name: EDGE_TABLE,
        columns: &[
            col("name", DataType::String),
            col("item_id", DataType::Long),
            col("from_node_id", DataType::Long),
            col("to_node_id", DataType::Long),
            col("source_key", DataType::String),
        ],
        indexes: &["item_id", "source_key"],
    },
    TableDef {
        name: EDGE_VERSION_TABLE,
        columns: &[
            col("id", DataType::Long),
            col("edge_id", DataType::Long),
            col("from_node_version_start_id", DataType::Long),
            col("from_node_version_end_id", DataType::Long),
            col("to_node_version_start_id", DataType::Long),
            col("to_node_version_end_id", DataType::Long),
        ],
        indexes: &["id", "edge_id"],
    },
    TableDef {
        name: DAG_NODE_TABLE,
        columns: &[col("item_id", DataType::Long), col("version_id", DataType::Long)],
        indexes: &["item_id"],
    },
    TableDef {
        name: DAG_EDGE_TABLE,
        columns: &[
            col("item_id", DataType::Long),
            col("parent_id", DataType::Long),
            col("child_id", DataType::Long),
        ],
        indexes: &["item_id"],
    },
];

/// Looks up a table declaration.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for a table outside the schema.
pub fn table(name: &str) -> Result<&'static TableDef> {
    TABLES
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| Error::InvalidInput(format!("unknown table '{name}'")))
}

impl TableDef {
    /// Looks up a column declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a column outside the table.
    pub fn column(&self, name: &str) -> Result<&'static ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| {
                Error::InvalidInput(format!("unknown column '{name}' in table '{}'", self.name))
            })
    }

    /// Checks that each field names a column of this table with a matching type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on an unknown column, a type mismatch
    /// or a `NULL` in a non-nullable column.
    pub fn validate_fields(&self, fields: &[Field]) -> Result<()> {
        for field in fields {
            let column = self.column(&field.column)?;
            match field.value.data_type() {
                None if !column.nullable => {
                    return Err(Error::InvalidInput(format!(
                        "column '{}.{}' is not nullable",
                        self.name, column.name
                    )));
                },
                Some(data_type) if data_type != column.data_type => {
                    return Err(Error::InvalidInput(format!(
                        "column '{}.{}' expects {}, got {data_type}",
                        self.name, column.name, column.data_type
                    )));
                },
                _ => {},
            }
        }
        Ok(())
    }

    /// Checks an insert: valid fields covering every non-nullable column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a field is invalid or a required column is missing.
    pub fn validate_insert(&self, fields: &[Field]) -> Result<()> {
        self.validate_fields(fields)?;
        for column in self.columns.iter().filter(|c| !c.nullable) {
            if !fields.iter().any(|f| f.column == column.name) {
                return Err(Error::InvalidInput(format!(
                    "missing value for column '{}.{}'",
                    self.name, column.name
                )));
            }
        }
        Ok(())
    }

    /// Resolves a projection to concrete column declarations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a column outside the table.
    pub fn resolve_projection(&self, projection: &Projection) -> Result<Vec<&'static ColumnDef>> {
        match projection {
            Projection::All => Ok(self.columns.iter().collect()),
            Projection::Columns(columns) => columns.iter().map(|c| self.column(c)).collect(),
        }
    }
}
