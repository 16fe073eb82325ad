/// Configuration problems, raised before any input line is read.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Pattern has no named capture group: {0}")]
    NoCaptureGroup(String),

    #[error("Pattern contains an unnamed capture group: {0}")]
    UnnamedGroup(String),

    #[error("Malformed filter expression '{0}': expected '<field> <operator> <value>'")]
    MalformedExpression(String),

    #[error("Unknown field '{field}' in filter expression '{expression}'")]
    UnknownField { field: String, expression: String },

    #[error("Unknown operator '{operator}' in filter expression '{expression}'")]
    UnknownOperator { operator: String, expression: String },

    #[error("Invalid regex in filter expression '{expression}': {message}")]
    InvalidRegex { expression: String, message: String },

    #[error("Invalid number in filter expression '{expression}': '{value}'")]
    InvalidNumber { expression: String, value: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that abort a parse call once processing has started.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Read error at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line handler failed at line {line}: {source}")]
    Handler {
        line: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Field '{field}' referenced by a filter is missing at line {line}")]
    FieldMissing { field: String, line: usize },

    #[error("Field '{field}' has non-numeric value '{value}' at line {line}")]
    NotNumeric {
        field: String,
        value: String,
        line: usize,
    },

    #[error("Processing cancelled after {lines} lines")]
    Cancelled { lines: usize },
}
