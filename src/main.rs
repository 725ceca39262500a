use std::io::{self, Read};

use sql3parse::{parse_with_options, ParseError, ParseOptions, Table};
use tracing_subscriber::EnvFilter;

/// Output format for a parsed table.
#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputMode {
    Sql,
    Json,
}

/// Command-line configuration.
struct CliArgs {
    path: Option<String>,
    mode: OutputMode,
    options: ParseOptions,
}

const USAGE: &str = "usage: sql3parse [--json] [--max-columns N] [--max-sql-length N] [FILE]

Parses one SQLite CREATE TABLE statement from FILE (or stdin) and prints the
normalized statement, or the parsed model as JSON with --json.";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return;
        }
        Err(msg) => {
            eprintln!("Error: {msg}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let sql = match read_input(args.path.as_deref()) {
        Ok(sql) => sql,
        Err(e) => {
            let source = args.path.as_deref().unwrap_or("<stdin>");
            eprintln!("Error: unable to read {source}: {e}");
            std::process::exit(1);
        }
    };

    match parse_with_options(&sql, &args.options) {
        Ok(table) => {
            if let Err(e) = print_table(&table, args.mode) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{}", locate(&sql, &e));
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(None)` when help was requested.
fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Option<CliArgs>, String> {
    let mut cli = CliArgs {
        path: None,
        mode: OutputMode::Sql,
        options: ParseOptions::default(),
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--json" => cli.mode = OutputMode::Json,
            "--max-columns" => {
                cli.options.max_columns = numeric_value(&arg, args.next())?;
            }
            "--max-sql-length" => {
                cli.options.max_sql_length = numeric_value(&arg, args.next())?;
            }
            flag if flag.starts_with('-') && flag != "-" => {
                return Err(format!("unknown option {flag}"));
            }
            path => {
                if cli.path.is_some() {
                    return Err("only one input file may be given".into());
                }
                if path != "-" {
                    cli.path = Some(path.to_owned());
                }
            }
        }
    }
    Ok(Some(cli))
}

fn numeric_value(flag: &str, value: Option<String>) -> Result<usize, String> {
    let value = value.ok_or_else(|| format!("{flag} requires a value"))?;
    value
        .parse()
        .map_err(|_| format!("{flag} expects a number, got {value:?}"))
}

fn read_input(path: Option<&str>) -> io::Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().lock().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn print_table(table: &Table, mode: OutputMode) -> serde_json::Result<()> {
    match mode {
        OutputMode::Sql => println!("{table}"),
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(table)?),
    }
    Ok(())
}

/// The offending source line with a caret under the error offset.
fn locate(sql: &str, err: &ParseError) -> String {
    let mut offset = err.offset.min(sql.len());
    while !sql.is_char_boundary(offset) {
        offset -= 1;
    }
    let line_start = sql[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = sql[offset..].find('\n').map_or(sql.len(), |i| offset + i);
    let line_no = sql[..offset].matches('\n').count() + 1;
    let column = sql[line_start..offset].chars().count();
    format!(
        "{line_no:>4} | {}\n     | {}^",
        &sql[line_start..line_end],
        " ".repeat(column)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Option<CliArgs>, String> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_sql_on_stdin() {
        let cli = args(&[]).unwrap().unwrap();
        assert_eq!(cli.mode, OutputMode::Sql);
        assert!(cli.path.is_none());
        assert_eq!(cli.options, ParseOptions::default());
    }

    #[test]
    fn json_file_and_limits() {
        let cli = args(&["--json", "--max-columns", "5", "schema.sql"]).unwrap().unwrap();
        assert_eq!(cli.mode, OutputMode::Json);
        assert_eq!(cli.path.as_deref(), Some("schema.sql"));
        assert_eq!(cli.options.max_columns, 5);
    }

    #[test]
    fn help_and_bad_flags() {
        assert!(args(&["--help"]).unwrap().is_none());
        assert!(args(&["--bogus"]).is_err());
        assert!(args(&["--max-columns"]).is_err());
        assert!(args(&["--max-columns", "many"]).is_err());
        assert!(args(&["a.sql", "b.sql"]).is_err());
    }

    #[test]
    fn locate_points_at_offset() {
        let sql = "CREATE TABLE t\n  (a INT CHECK)";
        let err = sql3parse::parse(sql).unwrap_err();
        let shown = locate(sql, &err);
        assert_eq!(shown, "   2 |   (a INT CHECK)\n     |               ^");
    }

    #[test]
    fn locate_handles_offset_inside_multibyte_char() {
        let sql = "CREATE TABLE größe (a)";
        let err = ParseError::out_of_memory(16, "statement too long");
        let shown = locate(sql, &err);
        assert_eq!(shown, format!("   1 | {sql}\n     | {}^", " ".repeat(15)));

        let opts = ParseOptions::default().with_max_sql_length(16);
        let err = parse_with_options(sql, &opts).unwrap_err();
        assert_eq!(locate(sql, &err), shown);
    }
}
