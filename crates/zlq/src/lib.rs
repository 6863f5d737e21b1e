//! zlq: ad hoc SQL over heterogeneous Zeek-style TSV logs.
//!
//! Log files sharing a logical type (`#path`) may carry different field
//! sets across their history. This crate discovers each file's declared
//! schema, groups files into schema variants per logical type, registers
//! one union-by-name DuckDB view per logical type, runs the caller's SQL
//! against those views, and re-encodes the results in the source format's
//! textual conventions (null sentinel `-`, `T`/`F` booleans, canonical
//! address text, bracketed containers).

mod error;

pub mod coerce;
pub mod pipeline;
pub mod relation;
pub mod scan;
pub mod schema;
pub mod source;
pub mod stream;

pub use error::{Error, Result};

/// Textual token for an absent value in Zeek TSV logs.
pub const NULL_SENTINEL: &str = "-";

/// Textual token for a present-but-empty value.
pub const EMPTY_MARKER: &str = "(empty)";

/// Reserved-prefix provenance column added to every registered view.
/// Declared Zeek field names never start with `__`, so it cannot collide.
pub const PROVENANCE_COLUMN: &str = "__schema_source";
