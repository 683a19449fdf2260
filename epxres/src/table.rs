//! Tabular records loaded from simulator CSV output.
//!
//! Simulator CSVs are plain comma-separated text with a single header row
//! and no quoting, so a small loader is all the format needs. Column schemas
//! are opaque to this crate; callers select columns by name.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use regex::Regex;

/// Matcher for per-run column and directory names (`RUN1`, `RUN2`, ...).
pub(crate) fn run_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^RUN([0-9]+)$").expect("valid run pattern"))
}

/// A loaded CSV table: header names plus equal-width string rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Load a table from a CSV file.
    pub fn read(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read table {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parse table {}", path.display()))
    }

    /// Parse CSV text: header row, then rows of the same width.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut lines = contents.lines();
        let header = match lines.next() {
            Some(line) if !line.trim().is_empty() => line,
            _ => bail!("missing header row"),
        };
        let columns: Vec<String> = header.split(',').map(|name| name.trim().to_string()).collect();

        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: Vec<String> = line.split(',').map(|cell| cell.trim().to_string()).collect();
            if row.len() != columns.len() {
                bail!(
                    "row {} has {} cells, expected {}",
                    index + 2,
                    row.len(),
                    columns.len()
                );
            }
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Cells of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let index = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// The named column parsed as floating-point values.
    pub fn column_as_f64(&self, name: &str) -> Result<Vec<f64>> {
        let cells = self
            .column(name)
            .with_context(|| format!("no column named '{name}'"))?;
        cells
            .iter()
            .map(|cell| {
                cell.parse::<f64>()
                    .with_context(|| format!("non-numeric cell '{cell}' in column '{name}'"))
            })
            .collect()
    }

    /// A new table containing only the `RUN<i>` columns.
    pub fn run_columns(&self) -> Table {
        self.select(|name| run_name_pattern().is_match(name))
    }

    /// A new table containing the columns for which `keep` returns true.
    pub fn select(&self, keep: impl Fn(&str) -> bool) -> Table {
        let indices: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, name)| keep(name.as_str()))
            .map(|(index, _)| index)
            .collect();
        Table {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Render the table back to CSV text.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.columns.join(","));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }
}
