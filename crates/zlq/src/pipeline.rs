//! Pipeline orchestration: discovery, grouping, view registration, query
//! execution, and result streaming, strictly in that order.

use std::io::Write;
use std::time::Instant;

use diagnostics::log_info;

use crate::{Result, relation, schema, source, stream};

/// Counters reported after a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    /// Candidate files matched by the patterns.
    pub files: usize,
    /// Logical types with at least one usable header.
    pub log_types: usize,
    /// Result rows streamed.
    pub rows: u64,
}

/// Run the whole pipeline: select files matching `patterns`, register one
/// view per logical type, execute `query`, and stream encoded results to
/// `out`. Diagnostics go to the side channel, never to `out`.
pub async fn run<W: Write>(patterns: &[String], query: &str, out: &mut W) -> Result<RunStats> {
    let t0 = Instant::now();
    let files = source::discover_files(patterns)?;
    let groups = schema::group_files(&files).await;
    log_info!(
        "Analyzed {files} files, identified {log_types} log types in {elapsed_ms} ms",
        files: files.len(),
        log_types: groups.len(),
        elapsed_ms: t0.elapsed().as_millis() as u64
    );

    let t1 = Instant::now();
    let (conn, inet) = relation::open_engine()?;
    relation::build_views(&conn, &groups, inet)?;
    log_info!(
        "All views initialized in {elapsed_ms} ms",
        elapsed_ms: t1.elapsed().as_millis() as u64
    );

    let t2 = Instant::now();
    let rows = stream::stream_query(&conn, query, out)?;
    log_info!(
        "Total rows: {rows}, query time {elapsed_ms} ms",
        rows: rows,
        elapsed_ms: t2.elapsed().as_millis() as u64
    );

    Ok(RunStats {
        files: files.len(),
        log_types: groups.len(),
        rows,
    })
}
