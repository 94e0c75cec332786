use std::{fs, path::PathBuf};

use anyhow::Result;
use serde::Serialize;

mod table;

pub use table::{CardRow, SeriesRow, SuggestionRow, TableRow, render_table, render_table_dynamic};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Pretty,
    Table,
    Quiet,
}

/// Where and how command results are written
#[derive(Clone, Debug)]
pub struct Output {
    format: OutputFormat,
    path: Option<PathBuf>,
}

impl Output {
    pub fn new(format: OutputFormat, path: Option<PathBuf>) -> Self {
        Self { format, path }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if self.format == OutputFormat::Quiet {
            return Ok(());
        }

        let data = match self.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
            _ => serde_json::to_string(value)?,
        };

        self.write(&data)
    }

    /// Table rows in table mode; otherwise `json` is emitted as json.
    pub fn emit_rows<T: TableRow, J: Serialize + ?Sized>(
        &self,
        rows: &[T],
        footer: Option<&str>,
        json: &J,
    ) -> Result<()> {
        match self.format {
            OutputFormat::Table => {
                let mut data = render_table(rows);
                if let Some(footer) = footer {
                    data.push_str("\n\n");
                    data.push_str(footer);
                }
                self.write(&data)
            }
            OutputFormat::Quiet => Ok(()),
            _ => self.emit_json(json),
        }
    }

    pub fn emit_text(&self, text: &str) -> Result<()> {
        if self.format == OutputFormat::Quiet {
            return Ok(());
        }
        self.write(text)
    }

    fn write(&self, data: &str) -> Result<()> {
        let mut output = data.to_string();
        if !output.ends_with('\n') {
            output.push('\n');
        }

        if let Some(path) = &self.path {
            fs::write(path, output)?;
        } else {
            print!("{output}");
        }
        Ok(())
    }
}
