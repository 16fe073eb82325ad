use crate::formatters::{
    JsonHandler, KeyValueHandler, LineHandler, LtsvHandler, PrettyJsonHandler, TsvHandler,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    #[value(name = "json", help = "One compact JSON object per line")]
    Json,
    #[value(name = "pretty-json", help = "Indented JSON objects")]
    PrettyJson,
    #[value(name = "tsv", help = "Tab-separated values with a header row")]
    Tsv,
    #[value(name = "ltsv", help = "Labeled Tab-separated Values")]
    Ltsv,
    #[value(name = "kv", help = "key=\"value\" pairs")]
    #[serde(rename = "kv", alias = "key-value")]
    KeyValue,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "pretty-json" => Ok(OutputFormat::PrettyJson),
            "tsv" => Ok(OutputFormat::Tsv),
            "ltsv" => Ok(OutputFormat::Ltsv),
            "kv" | "key-value" => Ok(OutputFormat::KeyValue),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl OutputFormat {
    pub fn handler(&self) -> Arc<dyn LineHandler> {
        match self {
            OutputFormat::Json => Arc::new(JsonHandler),
            OutputFormat::PrettyJson => Arc::new(PrettyJsonHandler),
            OutputFormat::Tsv => Arc::new(TsvHandler),
            OutputFormat::Ltsv => Arc::new(LtsvHandler),
            OutputFormat::KeyValue => Arc::new(KeyValueHandler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("TSV".parse::<OutputFormat>().unwrap(), OutputFormat::Tsv);
        assert_eq!("kv".parse::<OutputFormat>().unwrap(), OutputFormat::KeyValue);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_default_is_json() {
        let handler = OutputFormat::default().handler();
        let out = handler
            .handle(&["a".to_string()], &["1".to_string()], 1, false, true)
            .unwrap();
        assert_eq!(out, r#"{"a":"1"}"#);
    }
}
