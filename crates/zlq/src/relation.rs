//! Virtual relation builder: registers one union-by-name DuckDB view per
//! logical type.
//!
//! Only DDL runs here. Each schema variant becomes a `read_csv` SELECT
//! with its decode expressions and a provenance column; the engine scans
//! rows lazily when the caller's query executes against the view.

use diagnostics::{log_debug, log_info, log_warn};
use duckdb::Connection;

use crate::coerce::{plan_columns, quote_ident, quote_literal};
use crate::schema::{LogTypeGroup, SchemaVariant};
use crate::{PROVENANCE_COLUMN, Result};

/// Open an in-memory engine and probe for the inet extension.
///
/// INSTALL may fail offline and LOAD may fail when nothing is installed;
/// neither is fatal. Without inet, address columns stay sentinel-aware
/// text for the whole run.
pub fn open_engine() -> Result<(Connection, bool)> {
    let conn = Connection::open_in_memory()?;
    let _ = conn.execute_batch("INSTALL inet;");
    let inet = conn.execute_batch("LOAD inet;").is_ok();
    if !inet {
        log_warn!("inet extension unavailable, address columns degrade to text");
    }
    Ok((conn, inet))
}

/// Register one view per logical type, named after the type, combining
/// every schema variant with union-by-name semantics. Rows sourced from a
/// variant lacking a column report NULL for it.
pub fn build_views(conn: &Connection, groups: &LogTypeGroup, inet: bool) -> Result<()> {
    for (log_type, variants) in groups {
        let selects: Vec<String> = variants.iter().map(|v| variant_select(v, inet)).collect();
        let sql = format!(
            "CREATE OR REPLACE VIEW {} AS {}",
            quote_ident(log_type),
            selects.join(" UNION ALL BY NAME ")
        );
        log_debug!("View DDL: {sql}", sql: sql.clone());
        conn.execute_batch(&sql)?;
        log_info!(
            "View {view} created ({variants} schema variant(s))",
            view: log_type.clone(),
            variants: variants.len()
        );
    }
    Ok(())
}

/// One variant's SELECT: a `read_csv` scan over its source files with the
/// variant's decode expressions plus the reserved provenance column.
fn variant_select(variant: &SchemaVariant, inet: bool) -> String {
    let plans = plan_columns(&variant.fields, &variant.types);

    let col_defs: Vec<String> = plans
        .iter()
        .map(|p| format!("{}: '{}'", quote_literal(&p.field), p.read_type(inet)))
        .collect();
    let select_cols: Vec<String> = plans.iter().map(|p| p.select_expr(inet)).collect();
    let files: Vec<String> = variant
        .source_files
        .iter()
        .map(|f| quote_literal(&f.to_string_lossy()))
        .collect();

    format!(
        "SELECT {cols}, {tag} AS {prov} FROM read_csv([{files}], \
         delim='\\t', comment='#', header=false, nullstr='-', \
         columns={{{defs}}}, ignore_errors=true)",
        cols = select_cols.join(", "),
        tag = quote_literal(&variant.first_file.to_string_lossy()),
        prov = quote_ident(PROVENANCE_COLUMN),
        files = files.join(", "),
        defs = col_defs.join(", "),
    )
}
