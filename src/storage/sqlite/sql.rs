//! SQL statement construction for the `SQLite` backend.
//!
//! Table and column names come from [`crate::storage::schema`] declarations
//! that callers have already validated; values are always bound as
//! numbered parameters, never interpolated.

use crate::storage::schema::{ColumnDef, TableDef};
use crate::storage::value::{DataType, Field};

/// Name of the table holding durable sequences.
pub const SEQUENCE_TABLE: &str = "vercat_sequence";

const fn sql_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::String => "TEXT",
        DataType::Long | DataType::Boolean => "INTEGER",
    }
}

/// `CREATE TABLE IF NOT EXISTS` for a declared table.
#[must_use]
pub fn create_table(table: &TableDef) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            let null = if c.nullable { "" } else { " NOT NULL" };
            format!("{} {}{null}", c.name, sql_type(c.data_type))
        })
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table.name,
        columns.join(", ")
    )
}

/// `CREATE INDEX IF NOT EXISTS` statements for a declared table.
#[must_use]
pub fn create_indexes(table: &TableDef) -> Vec<String> {
    table
        .indexes
        .iter()
        .map(|column| {
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column})",
                table = table.name
            )
        })
        .collect()
}

/// `CREATE TABLE` for the sequence table.
#[must_use]
pub fn create_sequence_table() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {SEQUENCE_TABLE} (name TEXT PRIMARY KEY, value INTEGER NOT NULL)"
    )
}

/// Atomic increment-and-return of a named sequence.
#[must_use]
pub fn next_sequence_value() -> String {
    format!(
        "INSERT INTO {SEQUENCE_TABLE} (name, value) VALUES (?1, 1) \
         ON CONFLICT(name) DO UPDATE SET value = value + 1 RETURNING value"
    )
}

/// Builds `a IS ?n AND b IS ?n+1 ...` starting at parameter `first`.
///
/// `IS` keeps a `NULL` predicate matching `NULL` columns, as the in-memory
/// backend does.
fn where_clause(predicates: &[Field], first: usize) -> String {
    if predicates.is_empty() {
        return String::new();
    }
    let conditions: Vec<String> = predicates
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{} IS ?{}", p.column, first + i))
        .collect();
    format!(" WHERE {}", conditions.join(" AND "))
}

/// `INSERT` of the given fields.
#[must_use]
pub fn insert(table: &TableDef, fields: &[Field]) -> String {
    let columns: Vec<&str> = fields.iter().map(|f| f.column.as_str()).collect();
    let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// `SELECT` of the given columns, in insertion order.
#[must_use]
pub fn select(table: &TableDef, columns: &[&ColumnDef], predicates: &[Field]) -> String {
    let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
    format!(
        "SELECT {} FROM {}{} ORDER BY rowid",
        names.join(", "),
        table.name,
        where_clause(predicates, 1)
    )
}

/// `UPDATE` of `assignments` on rows matching `predicates`.
#[must_use]
pub fn update(table: &TableDef, assignments: &[Field], predicates: &[Field]) -> String {
    let sets: Vec<String> = assignments
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{} = ?{}", a.column, i + 1))
        .collect();
    format!(
        "UPDATE {} SET {}{}",
        table.name,
        sets.join(", "),
        where_clause(predicates, assignments.len() + 1)
    )
}

/// `DELETE` of rows matching `predicates`.
#[must_use]
pub fn delete(table: &TableDef, predicates: &[Field]) -> String {
    format!("DELETE FROM {}{}", table.name, where_clause(predicates, 1))
}
