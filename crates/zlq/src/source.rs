//! File discovery and line streams.
//!
//! External collaborators to the schema layer: recursive traversal with
//! regex selection supplies the ordered candidate set, and gzip-aware
//! readers supply a line stream per file. Nothing here understands the
//! log format itself.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_compression::tokio::bufread::GzipDecoder;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use walkdir::WalkDir;

use crate::Result;

/// A line stream over one candidate file, decompressed if needed.
pub type LineStream = Lines<BufReader<Pin<Box<dyn AsyncRead + Send>>>>;

/// Find every file under the derived search roots whose normalized path
/// matches at least one pattern. The result is deduplicated and sorted
/// lexicographically so downstream grouping is reproducible.
pub fn discover_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let regexes = patterns
        .iter()
        .map(|p| Regex::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut roots = BTreeSet::new();
    for pattern in patterns {
        roots.insert(search_root(pattern));
    }

    let mut matched = BTreeSet::new();
    for root in roots {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let text = path.to_string_lossy();
            if regexes.iter().any(|re| re.is_match(&text)) {
                matched.insert(path.to_path_buf());
            }
        }
    }
    Ok(matched.into_iter().collect())
}

/// Derive the walk root for one pattern: the longest existing directory
/// prefix of an absolute pattern, otherwise the current directory.
fn search_root(pattern: &str) -> PathBuf {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    if !pattern.starts_with('/') {
        return PathBuf::from(".");
    }
    let parts: Vec<&str> = pattern.split('/').collect();
    for i in (1..parts.len()).rev() {
        let candidate = if i == 1 {
            PathBuf::from("/")
        } else {
            PathBuf::from(parts[..i].join("/"))
        };
        if candidate.is_dir() {
            return candidate;
        }
    }
    PathBuf::from("/")
}

/// Open a candidate file as a line stream, decompressing `.gz` files.
pub async fn open_lines(path: &Path) -> std::io::Result<LineStream> {
    let file = tokio::fs::File::open(path).await?;
    let reader: Pin<Box<dyn AsyncRead + Send>> =
        if path.extension().is_some_and(|ext| ext == "gz") {
            Box::pin(GzipDecoder::new(BufReader::new(file)))
        } else {
            Box::pin(file)
        };
    Ok(BufReader::new(reader).lines())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_discover_matches_and_sorts() -> Result<()> {
        let tmp = tempdir().unwrap();
        let sub = tmp.path().join("2024-01-02");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(tmp.path().join("conn.log"), "x").unwrap();
        std::fs::write(sub.join("conn.log"), "x").unwrap();
        std::fs::write(sub.join("notes.txt"), "x").unwrap();

        let pattern = format!("{}/.*conn.*\\.log$", regex::escape(&tmp.path().to_string_lossy()));
        let files = discover_files(&[pattern])?;

        assert_eq!(files.len(), 2);
        assert!(files.windows(2).all(|w| w[0] < w[1]));
        assert!(files.iter().all(|f| f.to_string_lossy().contains("conn")));
        Ok(())
    }

    #[test]
    fn test_discover_rejects_bad_pattern() {
        assert!(discover_files(&["(".to_string()]).is_err());
    }

    #[test]
    fn test_search_root_for_relative_pattern() {
        assert_eq!(search_root(".*\\.log\\.gz$"), PathBuf::from("."));
    }

    #[test]
    fn test_search_root_for_absolute_pattern() {
        let tmp = tempdir().unwrap();
        let pattern = format!("{}/logs/conn.*\\.gz$", tmp.path().display());
        assert_eq!(search_root(&pattern), tmp.path().to_path_buf());
    }

    #[test]
    fn test_search_root_ignores_anchor() {
        let tmp = tempdir().unwrap();
        let pattern = format!("^{}/x.*$", tmp.path().display());
        assert_eq!(search_root(&pattern), tmp.path().to_path_buf());
    }

    #[tokio::test]
    async fn test_open_lines_plain() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("a.log");
        std::fs::write(&path, "one\ntwo\n").unwrap();

        let mut lines = open_lines(&path).await.unwrap();
        assert_eq!(lines.next_line().await.unwrap(), Some("one".to_string()));
        assert_eq!(lines.next_line().await.unwrap(), Some("two".to_string()));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_lines_gzip() {
        use async_compression::tokio::write::GzipEncoder;

        let tmp = tempdir().unwrap();
        let path = tmp.path().join("a.log.gz");
        let file = tokio::fs::File::create(&path).await.unwrap();
        let mut encoder = GzipEncoder::new(file);
        encoder.write_all(b"#path\tconn\nrow\n").await.unwrap();
        encoder.shutdown().await.unwrap();

        let mut lines = open_lines(&path).await.unwrap();
        assert_eq!(
            lines.next_line().await.unwrap(),
            Some("#path\tconn".to_string())
        );
        assert_eq!(lines.next_line().await.unwrap(), Some("row".to_string()));
    }
}
