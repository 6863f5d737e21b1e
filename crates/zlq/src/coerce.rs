//! Type and container coercion planning.
//!
//! Maps each declared Zeek type token to an engine column category and a
//! decode expression. The engine does the physical work: a plan is
//! rendered as the column's entry in `read_csv(columns = {...})` plus one
//! SQL select expression that substitutes NULL for the source format's
//! sentinel conventions and leniently casts the raw text.

use crate::{EMPTY_MARKER, NULL_SENTINEL};

/// Target scalar category for one declared type token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    /// `count`, `int`, `port`
    Integer,
    /// `time`, `interval` (seconds, possibly fractional), `double`
    Float,
    /// `bool` (`T`/`F` literals)
    Boolean,
    /// `addr`, `subnet`
    Addr,
    /// Everything else: strings, enums, patterns, nested records
    Text,
}

/// Delimiter pair of a container type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    /// `vector[...]`, serialized `[v1,v2,...]`
    Square,
    /// `set[...]`, serialized `{v1,v2,...}`
    Brace,
}

impl Bracket {
    pub fn open(self) -> char {
        match self {
            Bracket::Square => '[',
            Bracket::Brace => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Bracket::Square => ']',
            Bracket::Brace => '}',
        }
    }
}

/// Target category for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Scalar(Scalar),
    Container { elem: Scalar, bracket: Bracket },
}

/// Decode plan for one declared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub field: String,
    pub category: Category,
}

/// Map a scalar type token to its target category. Unknown tokens fall
/// back to text; that is the default, not an error.
fn scalar_of(token: &str) -> Scalar {
    match token {
        "count" | "int" | "port" => Scalar::Integer,
        "time" | "interval" | "double" => Scalar::Float,
        "bool" => Scalar::Boolean,
        "addr" | "subnet" => Scalar::Addr,
        _ => Scalar::Text,
    }
}

/// Parse one declared type token into a category.
///
/// `vector[elem]` and `set[elem]` denote containers; a nested container
/// element is not supported and drops the whole token to plain text.
pub fn parse_type(token: &str) -> Category {
    let container = token
        .strip_prefix("vector[")
        .map(|rest| (Bracket::Square, rest))
        .or_else(|| token.strip_prefix("set[").map(|rest| (Bracket::Brace, rest)));

    match container {
        Some((bracket, rest)) if rest.ends_with(']') => {
            let elem = &rest[..rest.len() - 1];
            if elem.starts_with("vector[") || elem.starts_with("set[") {
                Category::Scalar(Scalar::Text)
            } else {
                Category::Container {
                    elem: scalar_of(elem),
                    bracket,
                }
            }
        }
        _ => Category::Scalar(scalar_of(token)),
    }
}

/// One plan per declared field, aligned with the variant's type list.
pub fn plan_columns(fields: &[String], types: &[String]) -> Vec<ColumnPlan> {
    fields
        .iter()
        .zip(types)
        .map(|(field, token)| ColumnPlan {
            field: field.clone(),
            category: parse_type(token),
        })
        .collect()
}

/// Quote a SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a SQL string literal.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

impl Scalar {
    /// Engine type this scalar decodes to. Address columns need the inet
    /// extension; without it they stay sentinel-aware text.
    fn sql_type(self, inet: bool) -> &'static str {
        match self {
            Scalar::Integer => "BIGINT",
            Scalar::Float => "DOUBLE",
            Scalar::Boolean => "BOOLEAN",
            Scalar::Addr => {
                if inet {
                    "INET"
                } else {
                    "VARCHAR"
                }
            }
            Scalar::Text => "VARCHAR",
        }
    }
}

impl ColumnPlan {
    /// Column type handed to `read_csv`. Addresses and containers are
    /// read as raw text and decoded in the select expression.
    pub fn read_type(&self, inet: bool) -> &'static str {
        match self.category {
            Category::Scalar(Scalar::Addr) => "VARCHAR",
            Category::Scalar(scalar) => scalar.sql_type(inet),
            Category::Container { .. } => "VARCHAR",
        }
    }

    /// Select expression decoding the raw column into its target
    /// category. All failure modes are lenient: the sentinel, the empty
    /// marker, empty text, the literal empty container, and any cast
    /// failure all yield NULL for the value, never an error.
    pub fn select_expr(&self, inet: bool) -> String {
        let ident = quote_ident(&self.field);
        match self.category {
            Category::Scalar(Scalar::Addr) => {
                let guarded = null_guard(&ident);
                if inet {
                    format!("TRY_CAST({guarded} AS INET) AS {ident}")
                } else {
                    format!("{guarded} AS {ident}")
                }
            }
            Category::Scalar(_) => ident,
            Category::Container { elem, bracket } => {
                let empty_token = format!("{}{}", bracket.open(), bracket.close());
                let interior = format!(
                    "string_split(trim(trim({ident}), '{}{}'), ',')",
                    bracket.open(),
                    bracket.close()
                );
                let decoded = match elem {
                    Scalar::Text => format!("list_transform({interior}, x -> trim(x))"),
                    Scalar::Addr if !inet => {
                        format!("list_transform({interior}, x -> trim(x))")
                    }
                    _ => format!(
                        "list_transform({interior}, x -> TRY_CAST(trim(x) AS {}))",
                        elem.sql_type(inet)
                    ),
                };
                format!(
                    "CASE WHEN {ident} = '{NULL_SENTINEL}' OR {ident} = '{EMPTY_MARKER}' OR {ident} = '' \
                     THEN NULL WHEN trim({ident}) = '{empty_token}' THEN NULL \
                     ELSE {decoded} END AS {ident}"
                )
            }
        }
    }
}

/// NULL out the sentinel, the empty marker, and empty text before a cast.
fn null_guard(ident: &str) -> String {
    format!(
        "CASE WHEN {ident} = '{NULL_SENTINEL}' OR {ident} = '{EMPTY_MARKER}' OR {ident} = '' \
         THEN NULL ELSE {ident} END"
    )
}
