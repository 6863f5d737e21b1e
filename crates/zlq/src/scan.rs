//! Header scanner: extracts a file's declared schema from its Zeek TSV
//! header directives.

use crate::source::LineStream;

/// Number of leading lines searched for the three header directives.
/// Standard Zeek headers fit in eight; the margin covers extra
/// annotations without scanning data.
const HEADER_LINE_BUDGET: usize = 15;

/// A file's declared schema, read from its `#path`, `#fields`, and
/// `#types` header lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMetadata {
    /// Logical type name (`#path`), e.g. `conn`.
    pub log_path: String,
    /// Declared field names, in header order.
    pub fields: Vec<String>,
    /// Declared type tokens, aligned with `fields`.
    pub types: Vec<String>,
}

/// Scan the first lines of one file for the three header directives.
///
/// Returns `None` when the budget is exhausted, the stream ends, a read
/// fails, or the field and type lists disagree in length. Absent metadata
/// is never fatal; callers log and skip the file.
pub async fn scan_header(lines: &mut LineStream) -> Option<HeaderMetadata> {
    let mut log_path: Option<String> = None;
    let mut fields: Vec<String> = Vec::new();
    let mut types: Vec<String> = Vec::new();

    for _ in 0..HEADER_LINE_BUDGET {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) | Err(_) => break,
        };
        let mut tokens = line.trim_end().split('\t');
        match tokens.next() {
            Some("#path") => {
                log_path = tokens.next().map(|s| s.to_string());
            }
            Some("#fields") => {
                fields = tokens.map(|s| s.to_string()).collect();
            }
            Some("#types") => {
                types = tokens.map(|s| s.to_string()).collect();
            }
            _ => {}
        }
        if log_path.is_some() && !fields.is_empty() && !types.is_empty() {
            break;
        }
    }

    let log_path = log_path?;
    if fields.is_empty() || fields.len() != types.len() {
        return None;
    }
    Some(HeaderMetadata {
        log_path,
        fields,
        types,
    })
}
