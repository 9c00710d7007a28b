//! Statement Extraction
//!
//! Pulls candidate SQL statements out of free-form assistant text. A
//! statement is whatever sits between a matched pair of triple-backtick
//! fences; prose outside fences and a trailing unmatched fence are ignored.
//!
//! There is no semantic validation here. An empty fenced block still
//! yields an (empty) statement: it fails visibly at execution time instead
//! of silently disappearing from the conversation.

/// Fence delimiter for code blocks in assistant output
const FENCE: &str = "```";

/// Extract fenced statements from assistant text, in left-to-right order
///
/// Splitting on the fence delimiter puts fenced content at the odd indexes
/// of the chunk list. A chunk at the final index has no closing fence and
/// contributes nothing.
#[must_use]
pub fn extract_statements(response: &str) -> Vec<String> {
    let chunks: Vec<&str> = response.split(FENCE).collect();

    chunks
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 2 == 1 && i + 1 < chunks.len())
        .map(|(_, chunk)| clean_statement(chunk))
        .collect()
}

/// Strip a single leading `sql` language tag, then trim
fn clean_statement(chunk: &str) -> String {
    chunk.strip_prefix("sql").unwrap_or(chunk).trim().to_string()
}
