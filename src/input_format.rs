// src/input_format.rs - Decoders turning raw log lines into named fields

use crate::patterns::{self, PatternSet};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Field names and values decoded from one line, kept in parallel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    names: Vec<String>,
    values: Vec<String>,
}

impl Record {
    /// Callers pass lists of equal length.
    pub(crate) fn new(names: Vec<String>, values: Vec<String>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Record { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i].as_str())
    }

    /// Keep only the requested fields, in the requested order.
    /// Names the record does not have are dropped.
    pub fn select(&self, labels: &[String]) -> Record {
        let mut names = Vec::with_capacity(labels.len());
        let mut values = Vec::with_capacity(labels.len());
        for label in labels {
            if let Some(value) = self.get(label) {
                names.push(label.clone());
                values.push(value.to_string());
            }
        }
        Record { names, values }
    }

    /// Put a field in front of all others. A field already carrying
    /// `name` is replaced, so names stay unique.
    pub fn prepend(&mut self, name: &str, value: String) {
        if let Some(i) = self.names.iter().position(|n| n == name) {
            self.names.remove(i);
            self.values.remove(i);
        }
        self.names.insert(0, name.to_string());
        self.values.insert(0, value);
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.names, self.values)
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let (names, values) = iter.into_iter().unzip();
        Record { names, values }
    }
}

/// Turns one raw line into a record, or `None` when the line does not
/// fit the format.
pub trait Decoder: Send + Sync {
    fn decode(&self, line: &str) -> Option<Record>;

    /// Every field name this decoder can produce, when that is known
    /// up front. Filters are checked against it before parsing starts.
    fn declared_fields(&self) -> Option<Vec<String>>;

    fn name(&self) -> &str;
}

/// Decoder backed by an ordered set of named-capture patterns.
pub struct RegexDecoder {
    name: String,
    patterns: Arc<PatternSet>,
}

impl RegexDecoder {
    pub fn new(name: &str, patterns: Arc<PatternSet>) -> Self {
        RegexDecoder {
            name: name.to_string(),
            patterns,
        }
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }
}

impl Decoder for RegexDecoder {
    fn decode(&self, line: &str) -> Option<Record> {
        self.patterns.decode(line)
    }

    fn declared_fields(&self) -> Option<Vec<String>> {
        Some(self.patterns.field_names())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Labeled Tab-separated Values: `name:value<TAB>name:value...`
///
/// A line with a token lacking `:`, an empty name or a repeated name is
/// rejected as a whole.
pub struct LtsvDecoder {
    field_separator: char,
    label_separator: char,
}

impl Default for LtsvDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LtsvDecoder {
    pub fn new() -> Self {
        LtsvDecoder {
            field_separator: '\t',
            label_separator: ':',
        }
    }
}

impl Decoder for LtsvDecoder {
    fn decode(&self, line: &str) -> Option<Record> {
        let mut seen: IndexSet<&str> = IndexSet::new();
        let mut values = Vec::new();

        for token in line.split(self.field_separator) {
            let (name, value) = token.split_once(self.label_separator)?;
            if name.is_empty() || !seen.insert(name) {
                return None;
            }
            values.push(value.to_string());
        }

        let names = seen.into_iter().map(|name| name.to_string()).collect();
        Some(Record::new(names, values))
    }

    fn declared_fields(&self) -> Option<Vec<String>> {
        None
    }

    fn name(&self) -> &str {
        "ltsv"
    }
}

/// Built-in log formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputFormat {
    #[value(name = "s3", help = "Amazon S3 server access logs")]
    S3,
    #[value(name = "cloudfront", alias = "cf", help = "Amazon CloudFront standard logs")]
    Cloudfront,
    #[value(name = "alb", help = "Application Load Balancer access logs")]
    Alb,
    #[value(name = "nlb", help = "Network Load Balancer access logs")]
    Nlb,
    #[value(name = "clb", help = "Classic Load Balancer access logs")]
    Clb,
    #[value(name = "apache", alias = "clf", help = "Apache Common Log Format")]
    Apache,
    #[value(name = "apache-combined", help = "Apache Combined Log Format")]
    ApacheCombined,
    #[value(name = "ltsv", help = "Labeled Tab-separated Values")]
    Ltsv,
}

impl std::str::FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(InputFormat::S3),
            "cloudfront" | "cf" => Ok(InputFormat::Cloudfront),
            "alb" => Ok(InputFormat::Alb),
            "nlb" => Ok(InputFormat::Nlb),
            "clb" => Ok(InputFormat::Clb),
            "apache" | "clf" => Ok(InputFormat::Apache),
            "apache-combined" => Ok(InputFormat::ApacheCombined),
            "ltsv" => Ok(InputFormat::Ltsv),
            _ => Err(format!("Unknown input format: {}", s)),
        }
    }
}

impl InputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            InputFormat::S3 => "s3",
            InputFormat::Cloudfront => "cloudfront",
            InputFormat::Alb => "alb",
            InputFormat::Nlb => "nlb",
            InputFormat::Clb => "clb",
            InputFormat::Apache => "apache",
            InputFormat::ApacheCombined => "apache-combined",
            InputFormat::Ltsv => "ltsv",
        }
    }

    pub fn patterns(&self) -> Option<&'static PatternSet> {
        match self {
            InputFormat::S3 => Some(patterns::s3()),
            InputFormat::Cloudfront => Some(patterns::cloudfront()),
            InputFormat::Alb => Some(patterns::alb()),
            InputFormat::Nlb => Some(patterns::nlb()),
            InputFormat::Clb => Some(patterns::clb()),
            InputFormat::Apache => Some(patterns::apache()),
            InputFormat::ApacheCombined => Some(patterns::apache_combined()),
            InputFormat::Ltsv => None,
        }
    }

    pub fn decoder(&self) -> Arc<dyn Decoder> {
        match self.patterns() {
            Some(set) => Arc::new(RegexDecoder::new(self.name(), Arc::new(set.clone()))),
            None => Arc::new(LtsvDecoder::new()),
        }
    }
}
