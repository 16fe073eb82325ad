// src/lib.rs
pub mod cancel;
pub mod error;
pub mod filter;
pub mod formatters;
pub mod input_format;
pub mod output_format;
pub mod patterns;
pub mod pipeline;
pub mod source;

pub use error::*;
pub use pipeline::*;

pub use cancel::CancellationToken;
pub use filter::{CompiledFilters, Filter, Operator};
pub use formatters::LineHandler;
pub use input_format::{Decoder, InputFormat, LtsvDecoder, Record, RegexDecoder};
pub use output_format::OutputFormat;
pub use patterns::{Pattern, PatternSet};
pub use pipeline::config::ParserConfig;
pub use pipeline::context::{ErrorRecord, LineOutcome, ParseResult, ResultAggregator};
pub use pipeline::stream::Parser;
