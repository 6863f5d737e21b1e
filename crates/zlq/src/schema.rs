//! Schema grouping: partitions candidate files by logical type, then by
//! field-name signature.

use std::collections::BTreeMap;
use std::path::PathBuf;

use diagnostics::{log_debug, log_warn};

use crate::scan::scan_header;
use crate::source::open_lines;

/// One observed field-name/type-list combination for a logical type.
///
/// Two files with identical field names but different type tokens share a
/// variant; the first file to define the signature supplies the
/// authoritative types. `first_file` is fixed at creation and tags rows as
/// provenance in the registered view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVariant {
    pub signature: String,
    pub fields: Vec<String>,
    pub types: Vec<String>,
    pub source_files: Vec<PathBuf>,
    pub first_file: PathBuf,
}

/// Logical type name mapped to its schema variants in first-seen order.
pub type LogTypeGroup = BTreeMap<String, Vec<SchemaVariant>>;

/// Signature key for a field-name sequence.
pub fn signature_of(fields: &[String]) -> String {
    fields.join("|")
}

/// Scan every candidate file's header and group the files by logical type
/// and schema signature.
///
/// Files are processed in lexicographic path order regardless of input
/// order, so variant discovery order and `first_file` provenance are
/// reproducible. Unreadable files and files without complete metadata are
/// skipped, never fatal.
pub async fn group_files(files: &[PathBuf]) -> LogTypeGroup {
    let mut sorted: Vec<PathBuf> = files.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut groups: LogTypeGroup = BTreeMap::new();
    for path in sorted {
        let mut lines = match open_lines(&path).await {
            Ok(lines) => lines,
            Err(e) => {
                log_warn!("Could not read {file}: {error}", file: path.display().to_string(), error: e.to_string());
                continue;
            }
        };
        let Some(meta) = scan_header(&mut lines).await else {
            log_debug!("No usable header in {file}", file: path.display().to_string());
            continue;
        };

        let variants = groups.entry(meta.log_path.clone()).or_default();
        let signature = signature_of(&meta.fields);
        match variants.iter_mut().find(|v| v.signature == signature) {
            Some(variant) => variant.source_files.push(path),
            None => variants.push(SchemaVariant {
                signature,
                fields: meta.fields,
                types: meta.types,
                source_files: vec![path.clone()],
                first_file: path,
            }),
        }
    }
    groups
}
