//! Output Contract Validation Tests
//!
//! The texts this system emits are part of its interface: the schema
//! description fixes prompt content, and the execution summaries are what
//! both the human and the model read. These tests pin the exact shapes
//! through the public API.

use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use tabletalk::db::{ColumnDescriptor, Database, QueryRows, SqlValue};
use tabletalk::error::{Result, TabletalkError};
use tabletalk::executor::{combined_summary, run_all};
use tabletalk::extract_statements;
use tabletalk::schema::describe;

/// Database scripted by exact statement text
struct ScriptedDb {
    columns: Vec<ColumnDescriptor>,
    results: Vec<(String, QueryRows)>,
}

#[async_trait]
impl Database for ScriptedDb {
    async fn query(&self, sql: &str, _timeout: Duration) -> Result<QueryRows> {
        self.results
            .iter()
            .find(|(scripted, _)| scripted == sql)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| TabletalkError::query_failed(format!("no such relation: {sql}")))
    }

    async fn list_columns(&self) -> Result<Vec<ColumnDescriptor>> {
        Ok(self.columns.clone())
    }
}

fn column(table: &str, name: &str, data_type: &str, nullable: bool) -> ColumnDescriptor {
    ColumnDescriptor {
        table: table.to_string(),
        name: name.to_string(),
        data_type: data_type.to_string(),
        nullable,
        example: None,
    }
}

#[tokio::test]
async fn test_success_summary_has_pretty_printed_rows_in_column_order() {
    let db = ScriptedDb {
        columns: vec![],
        results: vec![(
            "SELECT id, name FROM users".to_string(),
            QueryRows {
                columns: vec!["id".to_string(), "name".to_string()],
                rows: vec![vec![SqlValue::Int(1), SqlValue::Text("Alice".to_string())]],
            },
        )],
    };

    let outcomes = run_all(&db, &["SELECT id, name FROM users".to_string()]).await;
    let summary = combined_summary(&outcomes);

    assert_eq!(
        summary,
        "I ran `SELECT id, name FROM users` and it returned 1 rows. \
         Here are the first few rows:\n\n\
         [\n  {\n    \"id\": 1,\n    \"name\": \"Alice\"\n  }\n]"
    );
}

#[tokio::test]
async fn test_truncated_summary_reports_full_row_count() {
    // 40 rows of 5 columns crosses the 100-value budget on row 21.
    let rows: Vec<Vec<SqlValue>> = (0..40)
        .map(|r| (0..5).map(|c| SqlValue::Int(r * 5 + c)).collect())
        .collect();
    let db = ScriptedDb {
        columns: vec![],
        results: vec![(
            "SELECT * FROM wide".to_string(),
            QueryRows {
                columns: (0..5).map(|c| format!("c{c}")).collect(),
                rows,
            },
        )],
    };

    let outcomes = run_all(&db, &["SELECT * FROM wide".to_string()]).await;

    let tabletalk::Outcome::Rows {
        kept,
        total_rows,
        truncated,
    } = &outcomes[0].outcome
    else {
        panic!("expected rows");
    };
    assert_eq!(*total_rows, 40);
    assert_eq!(kept.len(), 21);
    assert!(*truncated);

    // The summary quotes the statement's actual total, not the kept count.
    assert!(outcomes[0].summary().contains("it returned 40 rows"));
}

#[tokio::test]
async fn test_annotated_schema_rendering_end_to_end() {
    let db = ScriptedDb {
        columns: vec![
            column("users", "id", "int", false),
            column("users", "name", "text", true),
        ],
        results: vec![(
            "SELECT * FROM users LIMIT 1".to_string(),
            QueryRows {
                columns: vec!["id".to_string(), "name".to_string()],
                rows: vec![vec![SqlValue::Int(1), SqlValue::Null]],
            },
        )],
    };

    let description = describe(&db, true).await.unwrap();
    assert_eq!(
        description.render(),
        "CREATE TABLE users (\n  id int NOT NULL; Example: 1,\n  name text NULL; Example: undefined\n);"
    );
}

#[tokio::test]
async fn test_plain_schema_rendering_end_to_end() {
    let db = ScriptedDb {
        columns: vec![
            column("users", "id", "int", false),
            column("users", "name", "text", true),
        ],
        results: vec![],
    };

    let description = describe(&db, false).await.unwrap();
    assert_eq!(
        description.render(),
        "CREATE TABLE users (\n  id int NOT NULL,\n  name text NULL\n);"
    );
}

#[tokio::test]
async fn test_extraction_to_execution_round() {
    // Extraction order carries through to summary order.
    let response = "First:\n```sql\nSELECT 1\n```\nthen:\n```sql\nSELECT 2\n```";
    let statements = extract_statements(response);
    assert_eq!(statements, vec!["SELECT 1", "SELECT 2"]);

    let db = ScriptedDb {
        columns: vec![],
        results: vec![
            (
                "SELECT 1".to_string(),
                QueryRows {
                    columns: vec!["?column?".to_string()],
                    rows: vec![vec![SqlValue::Int(1)]],
                },
            ),
            (
                "SELECT 2".to_string(),
                QueryRows {
                    columns: vec!["?column?".to_string()],
                    rows: vec![vec![SqlValue::Int(2)]],
                },
            ),
        ],
    };

    let outcomes = run_all(&db, &statements).await;
    let summary = combined_summary(&outcomes);
    let first = summary.find("`SELECT 1`").unwrap();
    let second = summary.find("`SELECT 2`").unwrap();
    assert!(first < second);
}
