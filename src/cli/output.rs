//! Terminal output for the CLI commands.
//!
//! Status lines go to stdout, failures to stderr. Colors are optional so the
//! output stays readable when piped.

use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Marker printed in front of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Note,
    Skip,
    Warn,
    Fail,
}

impl Status {
    fn tag(self) -> &'static str {
        match self {
            Status::Done => "[ok]",
            Status::Note => "[..]",
            Status::Skip => "[skip]",
            Status::Warn => "[warn]",
            Status::Fail => "[fail]",
        }
    }
}

pub struct Output {
    colored: bool,
}

impl Output {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn status(&self, status: Status, message: &str) {
        let line = self.status_line(status, message);
        if status == Status::Fail {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }

    fn status_line(&self, status: Status, message: &str) -> String {
        let tag = status.tag();
        if !self.colored {
            return format!("  {:<6} {}", tag, message);
        }
        let tag = match status {
            Status::Done => tag.green().bold().to_string(),
            Status::Note => tag.blue().to_string(),
            Status::Skip => tag.dimmed().to_string(),
            Status::Warn => tag.yellow().bold().to_string(),
            Status::Fail => tag.red().bold().to_string(),
        };
        // pad on the visible width; escape codes would skew `{:<6}`
        let padding = " ".repeat(6usize.saturating_sub(status.tag().len()));
        format!("  {}{} {}", tag, padding, message)
    }

    /// Heading for a block of output
    pub fn section(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bold().underline());
        } else {
            println!("\n  {}", title);
        }
    }

    pub fn field(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {:<18} {}", key.dimmed(), value);
        } else {
            println!("    {:<18} {}", key, value);
        }
    }

    /// A shell command the user is expected to run next
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("      {}", format!("$ {}", cmd).cyan());
        } else {
            println!("      $ {}", cmd);
        }
    }

    pub fn table(&self, columns: &[&str], rows: &[Vec<String>]) {
        let mut lines = format_table(columns, rows).into_iter();
        if let Some(header) = lines.next() {
            if self.colored {
                println!("    {}", header.bold());
            } else {
                println!("    {}", header);
            }
        }
        for line in lines {
            println!("    {}", line);
        }
    }

    /// Write report text as it arrives, without a trailing newline
    pub fn stream_text(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    pub fn newline(&self) {
        println!();
    }
}

/// Lay out a table with each column as wide as its widest cell.
///
/// Returns the header, a rule, then one line per row. Missing cells are
/// blank; surplus cells are dropped.
fn format_table(columns: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(column.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render(columns.to_vec()));
    lines.push(
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        let cells = (0..columns.len())
            .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
            .collect();
        lines.push(render(cells));
    }
    lines
}
