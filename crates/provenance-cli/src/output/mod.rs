//! Output formatting.

use std::fmt;

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a bold `label: value` line.
pub fn field(label: &str, value: impl fmt::Display) {
    println!("{}: {}", label.bold(), value);
}

/// Print an underlined section heading followed by a blank line.
pub fn heading(title: &str) {
    println!("{}", title.bold().underline());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_value_enum() {
        for format in OutputFormat::value_variants() {
            let parsed = OutputFormat::from_str(&format.to_string(), false).unwrap();
            assert_eq!(&parsed, format);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&OutputFormat::Json).unwrap(), "\"json\"");
    }
}
