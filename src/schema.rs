//! Schema Introspection
//!
//! Turns database metadata into the prompt-ready textual description that
//! seeds the conversation. Built once at session start and never
//! recomputed; schema drift during a session is not detected.
//!
//! Column fetch order (table name, then ordinal position) is load-bearing:
//! it fixes the prompt text, and therefore reproducible model behavior.

use tracing::debug;

use crate::db::{ColumnDescriptor, Database, SqlValue};
use crate::error::Result;
use crate::executor::STATEMENT_TIMEOUT;

/// One table and its columns, in declaration order
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Table name
    pub name: String,

    /// Columns in ordinal position order
    pub columns: Vec<ColumnDescriptor>,
}

/// The full schema description embedded in the first user message
#[derive(Debug, Clone)]
pub struct SchemaDescription {
    /// Tables in first-appearance order of the ordered column fetch
    pub tables: Vec<TableSchema>,
}

impl SchemaDescription {
    /// Render to the fixed textual format
    ///
    /// One `CREATE TABLE`-style block per table, blocks joined by a blank
    /// line:
    ///
    /// ```text
    /// CREATE TABLE users (
    ///   id int NOT NULL,
    ///   name text NULL; Example: Alice
    /// );
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        self.tables
            .iter()
            .map(render_table)
            .collect::<Vec<String>>()
            .join("\n\n")
    }
}

fn render_table(table: &TableSchema) -> String {
    let column_lines: Vec<String> = table
        .columns
        .iter()
        .map(|column| {
            let nullability = if column.nullable { "NULL" } else { "NOT NULL" };
            match &column.example {
                Some(example) => format!(
                    "  {} {} {}; Example: {}",
                    column.name, column.data_type, nullability, example
                ),
                None => format!("  {} {} {}", column.name, column.data_type, nullability),
            }
        })
        .collect();

    format!("CREATE TABLE {} (\n{}\n);", table.name, column_lines.join(",\n"))
}

/// Group an ordered column list by table, keeping first-appearance order
#[must_use]
pub fn group_columns(columns: Vec<ColumnDescriptor>) -> SchemaDescription {
    let mut tables: Vec<TableSchema> = Vec::new();

    for column in columns {
        match tables.iter_mut().find(|t| t.name == column.table) {
            Some(table) => table.columns.push(column),
            None => tables.push(TableSchema {
                name: column.table.clone(),
                columns: vec![column],
            }),
        }
    }

    SchemaDescription { tables }
}

/// Introspect the database into a prompt-ready description
///
/// With `annotate`, one representative row is sampled per table and each
/// column gets an inline example value. A column the sampled row cannot
/// answer for renders as the literal `undefined`; a table with zero rows
/// gets no examples at all.
///
/// Any error here is fatal to session start and propagates unchanged.
pub async fn describe(db: &dyn Database, annotate: bool) -> Result<SchemaDescription> {
    let columns = db.list_columns().await?;
    let mut description = group_columns(columns);

    if annotate {
        for table in &mut description.tables {
            annotate_table(db, table).await?;
        }
    }

    debug!(tables = description.tables.len(), "schema introspected");
    Ok(description)
}

/// Sample one row and attach example values to a table's columns
async fn annotate_table(db: &dyn Database, table: &mut TableSchema) -> Result<()> {
    let sample = db
        .query(
            &format!("SELECT * FROM {} LIMIT 1", table.name),
            STATEMENT_TIMEOUT,
        )
        .await?;

    let Some(row) = sample.rows.first() else {
        return Ok(());
    };

    for column in &mut table.columns {
        let value = sample
            .columns
            .iter()
            .position(|name| *name == column.name)
            .and_then(|idx| row.get(idx));

        column.example = Some(match value {
            None | Some(SqlValue::Null) => "undefined".to_string(),
            Some(value) => value.to_string(),
        });
    }

    Ok(())
}
