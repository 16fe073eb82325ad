use crate::error::ConfigError;
use crate::output_format::OutputFormat;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Marker put in front of emitted records when `prefix` is on
pub const PROCESSED_MARKER: &str = "[ PROCESSED ] ";
/// Marker put in front of emitted unmatched lines when `prefix` is on
pub const UNMATCHED_MARKER: &str = "[ UNMATCHED ] ";
/// Name of the synthetic line-number field
pub const LINE_NUMBER_FIELD: &str = "no";

/// Options for one parser.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// Fields to keep, in output order; empty keeps everything
    pub labels: Vec<String>,
    /// Filter expressions, all of which must pass
    pub filters: Vec<String>,
    /// 1-based line numbers to skip
    pub skip_lines: BTreeSet<usize>,
    /// Mark emitted lines with PROCESSED / UNMATCHED
    pub prefix: bool,
    /// Also write lines that did not match
    pub emit_unmatched: bool,
    /// Add a leading `no` field with the line number
    pub line_number: bool,
    pub output: OutputFormat,
}

impl ParserConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|e| ConfigError::InvalidConfig(e.to_string()))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidConfig(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_yaml_str(&text)
    }
}
