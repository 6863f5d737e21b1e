use anyhow::Result;
use clap::Parser;

/// Run ad hoc SQL over Zeek-style TSV logs.
///
/// Every argument except the last is a regular expression selecting
/// candidate files; the last argument is the SQL query. Each logical log
/// type found in the selected files is available as a table named after
/// its `#path`.
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Ad hoc SQL over Zeek-style TSV logs",
    after_help = "Examples:\n  \
        zlq '.*\\.log\\.gz$' 'SELECT * FROM conn LIMIT 10'\n  \
        zlq 'conn.*\\.gz$' 'http.*\\.gz$' 'SELECT * FROM conn'"
)]
struct Cli {
    /// File-selection regexes followed by one SQL query
    #[arg(required = true, num_args = 2.., value_name = "PATTERN... QUERY")]
    args: Vec<String>,
}

/// Split the positional arguments: the last one is the query, the rest
/// are file patterns.
fn split_args(mut args: Vec<String>) -> (Vec<String>, String) {
    let query = args.pop().unwrap_or_default();
    (args, query)
}

#[tokio::main]
async fn main() -> Result<()> {
    diagnostics::init();

    let cli = Cli::parse();
    let (patterns, query) = split_args(cli.args);

    let mut stdout = std::io::stdout().lock();
    zlq::pipeline::run(&patterns, &query, &mut stdout).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_args() {
        let (patterns, query) = split_args(vec![
            "conn.*".to_string(),
            "http.*".to_string(),
            "SELECT 1".to_string(),
        ]);
        assert_eq!(patterns, vec!["conn.*", "http.*"]);
        assert_eq!(query, "SELECT 1");
    }

    #[test]
    fn test_cli_requires_two_args() {
        assert!(Cli::try_parse_from(["zlq", "only-one"]).is_err());
        assert!(Cli::try_parse_from(["zlq", "pattern", "SELECT 1"]).is_ok());
    }
}
