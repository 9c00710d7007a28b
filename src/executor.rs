//! Query Execution and Summarization
//!
//! Runs extracted statements strictly sequentially, each with a fixed
//! timeout, and turns every result into conversation text. A statement's
//! failure is that statement's outcome and nothing more: later statements
//! still run, and the session never aborts over one bad query.
//!
//! Output is bounded by scalar-value count rather than row count, so a
//! wide result set truncates as aggressively as a long one.

use std::time::Duration;

use tracing::debug;

use crate::db::{row_to_object, Database, QueryRows};

/// Fixed per-statement execution timeout
pub const STATEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cumulative scalar-value budget for kept rows
pub const VALUE_BUDGET: usize = 100;

/// JSON object form of one kept row
pub type RowObject = serde_json::Map<String, serde_json::Value>;

/// Per-statement execution result: rows or an error, never both
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Statement produced rows (possibly truncated)
    Rows {
        /// Rows kept under the value budget, in result order
        kept: Vec<RowObject>,
        /// The statement's actual total row count
        total_rows: usize,
        /// True whenever fewer rows were kept than returned
        truncated: bool,
    },
    /// Statement failed (syntax error, timeout, constraint violation, ...)
    Error {
        /// Driver or timeout message
        message: String,
    },
}

/// One statement paired with its outcome
#[derive(Debug, Clone)]
pub struct StatementOutcome {
    /// The statement as extracted (already trimmed)
    pub statement: String,

    /// What executing it produced
    pub outcome: Outcome,
}

impl StatementOutcome {
    /// Render this outcome as conversation text for the next user turn
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.outcome {
            Outcome::Rows {
                kept, total_rows, ..
            } => {
                let rows_json = serde_json::to_string_pretty(kept)
                    .unwrap_or_else(|_| "[]".to_string());
                format!(
                    "I ran `{}` and it returned {} rows. Here are the first few rows:\n\n{}",
                    self.statement, total_rows, rows_json
                )
            }
            Outcome::Error { message } => {
                format!("Result for `{}` was an error: {}", self.statement, message)
            }
        }
    }
}

/// Keep rows until the cumulative value count crosses the budget
///
/// The crossing row is kept, then accumulation stops.
#[must_use]
pub fn truncate_rows(result: &QueryRows) -> (Vec<RowObject>, bool) {
    let mut kept = Vec::new();
    let mut value_count = 0;

    for row in &result.rows {
        kept.push(row_to_object(&result.columns, row));
        value_count += row.len();
        if value_count > VALUE_BUDGET {
            break;
        }
    }

    let truncated = kept.len() < result.rows.len();
    (kept, truncated)
}

/// Execute all statements sequentially, one outcome per statement
///
/// Outcomes come back in extraction order and are independent of each
/// other's success: no short-circuiting, no transaction wrapping.
pub async fn run_all(db: &dyn Database, statements: &[String]) -> Vec<StatementOutcome> {
    let mut outcomes = Vec::with_capacity(statements.len());

    for statement in statements {
        let outcome = match db.query(statement, STATEMENT_TIMEOUT).await {
            Ok(result) => {
                let total_rows = result.rows.len();
                let (kept, truncated) = truncate_rows(&result);
                debug!(total_rows, kept = kept.len(), truncated, "statement executed");
                Outcome::Rows {
                    kept,
                    total_rows,
                    truncated,
                }
            }
            Err(e) => {
                debug!(error = %e, "statement failed");
                Outcome::Error {
                    message: e.message(),
                }
            }
        };

        outcomes.push(StatementOutcome {
            statement: statement.clone(),
            outcome,
        });
    }

    outcomes
}

/// Concatenate all summaries into the result text for the next user turn
///
/// Empty when no statements ran.
#[must_use]
pub fn combined_summary(outcomes: &[StatementOutcome]) -> String {
    outcomes
        .iter()
        .map(StatementOutcome::summary)
        .collect::<Vec<String>>()
        .join("\n\n")
}
