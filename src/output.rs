//! Output formatting and persistence for analysis results.
//!
//! Tables and averages go to stdout one line per entry; any serializable
//! result can also be written as CSV rows or as pretty JSON.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::dataset::Row;
use crate::stats::{GroupAverage, TableEntry};

/// `<value> : <percentage>` for each entry.
pub fn format_table(entries: &[TableEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| format!("{} : {}", e.value, e.percentage))
        .collect()
}

/// `<key> <average>` for each group.
pub fn format_averages(averages: &[GroupAverage]) -> Vec<String> {
    averages
        .iter()
        .map(|a| format!("{} {}", a.key, a.average))
        .collect()
}

/// Writes lines to stdout, preceded by a title line when given.
pub fn print_lines(title: Option<&str>, lines: &[String]) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Some(title) = title {
        writeln!(out, "\n{title}")?;
    }
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// Prints rows the way they are stored, one per line, blank line between.
pub fn print_rows(rows: &[Row]) -> Result<()> {
    let lines: Vec<String> = rows.iter().map(|row| format!("{row:?}\n")).collect();
    print_lines(None, &lines)
}

/// Writes records as CSV with a header row, replacing the file.
pub fn write_csv<T: Serialize>(path: &str, records: &[T]) -> Result<()> {
    debug!(path, records = records.len(), "Writing CSV");
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("creating {path}"))?;

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!(path, records = records.len(), "CSV written");
    Ok(())
}

/// Writes a value as pretty-printed JSON, creating parent directories.
pub fn write_json(path: &str, value: &impl Serialize) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("writing {path}"))?;
    info!(path, "JSON written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn entries() -> Vec<TableEntry> {
        vec![
            TableEntry {
                value: "Games".to_string(),
                percentage: 58.5,
            },
            TableEntry {
                value: "Music".to_string(),
                percentage: 41.5,
            },
        ]
    }

    #[test]
    fn test_format_table() {
        assert_eq!(format_table(&entries()), vec!["Games : 58.5", "Music : 41.5"]);
    }

    #[test]
    fn test_format_averages() {
        let averages = vec![GroupAverage {
            key: "Navigation".to_string(),
            average: 86090.33333333333,
            count: 6,
        }];
        assert_eq!(format_averages(&averages), vec!["Navigation 86090.33333333333"]);
    }

    #[test]
    fn test_write_csv_writes_header_and_rows() {
        let path = temp_path("app_profiles_test_table.csv");
        let _ = fs::remove_file(&path);

        write_csv(&path, &entries()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["value,percentage", "Games,58.5", "Music,41.5"]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_json() {
        let path = temp_path("app_profiles_test_table.json");
        write_json(&path, &entries()).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["value"], "Games");
        assert_eq!(parsed[1]["percentage"], 41.5);

        fs::remove_file(&path).unwrap();
    }
}
