// src/pipeline/stream.rs
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cancel::CancellationToken;
use crate::error::{ConfigError, ProcessingError};
use crate::filter::CompiledFilters;
use crate::formatters::LineHandler;
use crate::input_format::{Decoder, InputFormat, RegexDecoder};
use crate::patterns::PatternSet;
use crate::pipeline::config::{
    ParserConfig, LINE_NUMBER_FIELD, PROCESSED_MARKER, UNMATCHED_MARKER,
};
use crate::pipeline::context::{ErrorRecord, LineOutcome, ParseResult, ResultAggregator};
use crate::source::{self, GlobMatcher};

/// Source name reported for in-memory input
pub const STRING_SOURCE: &str = "<string>";

/// Decodes, filters and formats log lines.
///
/// A parser holds only immutable state, so one instance can serve several
/// parse calls at once as long as each has its own input and output.
pub struct Parser {
    decoder: Arc<dyn Decoder>,
    filters: CompiledFilters,
    handler: Arc<dyn LineHandler>,
    config: ParserConfig,
}

/// Per-call state carried from line to line and across archive entries
#[derive(Debug)]
struct CallState {
    first_line: bool,
}

impl Parser {
    /// Filters are compiled here against the decoder's declared fields, so
    /// a bad expression fails before any input is touched.
    pub fn new(decoder: Arc<dyn Decoder>, config: ParserConfig) -> Result<Self, ConfigError> {
        let known_fields = decoder.declared_fields();
        let filters = CompiledFilters::compile(&config.filters, known_fields.as_deref())?;
        let handler = config.output.handler();
        Ok(Parser {
            decoder,
            filters,
            handler,
            config,
        })
    }

    pub fn from_format(format: InputFormat, config: ParserConfig) -> Result<Self, ConfigError> {
        Self::new(format.decoder(), config)
    }

    pub fn from_patterns(patterns: PatternSet, config: ParserConfig) -> Result<Self, ConfigError> {
        if patterns.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "at least one pattern is required".to_string(),
            ));
        }
        let decoder = RegexDecoder::new("custom", Arc::new(patterns));
        Self::new(Arc::new(decoder), config)
    }

    /// Replace the handler chosen by `config.output`.
    pub fn with_handler(mut self, handler: Arc<dyn LineHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }

    /// Run one line through skip, decode, filter, select, decorate and
    /// format. `index` is the 1-based line number within its source.
    pub fn process_line(
        &self,
        line: &str,
        index: usize,
        entry: Option<&str>,
        is_first_line: bool,
    ) -> Result<LineOutcome, ProcessingError> {
        if self.config.skip_lines.contains(&index) {
            return Ok(LineOutcome::Skipped);
        }

        let Some(mut record) = self.decoder.decode(line) else {
            trace!(line = index, "no pattern matched");
            let output = self.config.emit_unmatched.then(|| {
                if self.config.prefix {
                    format!("{}{}", UNMATCHED_MARKER, line)
                } else {
                    line.to_string()
                }
            });
            return Ok(LineOutcome::Unmatched {
                error: ErrorRecord {
                    entry: entry.map(|name| name.to_string()),
                    line_number: index,
                    line: line.to_string(),
                },
                output,
            });
        };

        if !self.filters.is_empty() && !self.filters.evaluate(&record, index)? {
            return Ok(LineOutcome::Excluded);
        }

        if !self.config.labels.is_empty() {
            record = record.select(&self.config.labels);
        }

        if self.config.line_number {
            record.prepend(LINE_NUMBER_FIELD, index.to_string());
        }

        let text = self
            .handler
            .handle(
                record.names(),
                record.values(),
                index,
                self.config.line_number,
                is_first_line,
            )
            .map_err(|source| ProcessingError::Handler {
                line: index,
                source,
            })?;

        if self.config.prefix {
            Ok(LineOutcome::Matched(format!("{}{}", PROCESSED_MARKER, text)))
        } else {
            Ok(LineOutcome::Matched(text))
        }
    }

    /// Parse a whole stream. Any fatal error discards the counters.
    pub fn parse<R: BufRead, W: Write>(
        &self,
        input: R,
        output: &mut W,
        source: &str,
    ) -> Result<ParseResult, ProcessingError> {
        self.parse_source(input, output, source, None)
    }

    /// Like [`Parser::parse`], but checks `token` before each line.
    /// Lines already written stay written when the call is cancelled.
    pub fn parse_cancelable<R: BufRead, W: Write>(
        &self,
        input: R,
        output: &mut W,
        source: &str,
        token: &CancellationToken,
    ) -> Result<ParseResult, ProcessingError> {
        self.parse_source(input, output, source, Some(token))
    }

    pub fn parse_str<W: Write>(
        &self,
        text: &str,
        output: &mut W,
    ) -> Result<ParseResult, ProcessingError> {
        self.parse(text.as_bytes(), output, STRING_SOURCE)
    }

    /// Parse a file, decompressing it first when the name ends in `.gz`.
    /// `token`, when given, is checked before each line.
    pub fn parse_file<W: Write>(
        &self,
        path: &Path,
        output: &mut W,
        token: Option<&CancellationToken>,
    ) -> Result<ParseResult, ProcessingError> {
        if source::is_gzip_path(path) {
            return self.parse_gzip_file(path, output, token);
        }
        let input = source::open_plain(path)?;
        self.parse_source(input, output, &path.display().to_string(), token)
    }

    /// Parse a gzip-compressed file whatever its name.
    pub fn parse_gzip_file<W: Write>(
        &self,
        path: &Path,
        output: &mut W,
        token: Option<&CancellationToken>,
    ) -> Result<ParseResult, ProcessingError> {
        let input = source::open_gzip(path)?;
        self.parse_source(input, output, &path.display().to_string(), token)
    }

    /// Parse every regular file in a tar archive whose name matches `glob`
    /// (all files when `None`), in archive order.
    pub fn parse_archive<W: Write>(
        &self,
        path: &Path,
        glob: Option<&str>,
        output: &mut W,
    ) -> Result<ParseResult, ProcessingError> {
        self.parse_archive_entries(path, glob, output, None)
    }

    /// Like [`Parser::parse_archive`]; `token` is checked before each entry
    /// is opened, the entry being read when it fires is finished.
    pub fn parse_archive_cancelable<W: Write>(
        &self,
        path: &Path,
        glob: Option<&str>,
        output: &mut W,
        token: &CancellationToken,
    ) -> Result<ParseResult, ProcessingError> {
        self.parse_archive_entries(path, glob, output, Some(token))
    }

    fn parse_source<R: BufRead, W: Write>(
        &self,
        input: R,
        output: &mut W,
        source: &str,
        token: Option<&CancellationToken>,
    ) -> Result<ParseResult, ProcessingError> {
        debug!(source, decoder = self.decoder.name(), "parse started");
        let mut state = CallState { first_line: true };
        let aggregator = self.drive(input, output, None, &mut state, token)?;
        output.flush()?;
        let result = aggregator.finalize(source);
        debug!(
            source,
            total = result.total,
            matched = result.matched,
            unmatched = result.unmatched,
            excluded = result.excluded,
            skipped = result.skipped,
            "parse finished"
        );
        Ok(result)
    }

    fn parse_archive_entries<W: Write>(
        &self,
        path: &Path,
        glob: Option<&str>,
        output: &mut W,
        token: Option<&CancellationToken>,
    ) -> Result<ParseResult, ProcessingError> {
        let matcher = glob.map(GlobMatcher::new).transpose()?;
        let source_name = path.display().to_string();
        debug!(source = %source_name, glob, "archive parse started");

        let mut archive = source::open_archive(path)?;
        let mut state = CallState { first_line: true };
        let mut total = ResultAggregator::new();

        for entry in archive.entries()? {
            if let Some(token) = token {
                if token.is_cancelled() {
                    debug!(source = %source_name, "archive parse cancelled");
                    return Err(ProcessingError::Cancelled {
                        lines: total.total(),
                    });
                }
            }

            let entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = entry.path()?.to_string_lossy().into_owned();
            if let Some(matcher) = &matcher {
                if !matcher.is_match(&name) {
                    trace!(entry = %name, "entry does not match glob");
                    continue;
                }
            }

            debug!(entry = %name, "reading archive entry");
            let reader = BufReader::with_capacity(source::BUFFER_SIZE, entry);
            let aggregator = self.drive(reader, output, Some(&name), &mut state, None)?;
            total.merge(aggregator, &name);
        }

        output.flush()?;
        let result = total.finalize(&source_name);
        debug!(
            source = %source_name,
            entries = result.archive_entries.len(),
            total = result.total,
            matched = result.matched,
            "archive parse finished"
        );
        Ok(result)
    }

    /// The line loop shared by every driver.
    fn drive<R: BufRead, W: Write>(
        &self,
        mut input: R,
        output: &mut W,
        entry: Option<&str>,
        state: &mut CallState,
        token: Option<&CancellationToken>,
    ) -> Result<ResultAggregator, ProcessingError> {
        let mut aggregator = ResultAggregator::new();
        let mut buffer = Vec::new();
        let mut index = 0;

        loop {
            buffer.clear();
            let read = input
                .read_until(b'\n', &mut buffer)
                .map_err(|source| ProcessingError::Read {
                    line: index + 1,
                    source,
                })?;
            if read == 0 {
                break;
            }
            index += 1;

            if let Some(token) = token {
                if token.is_cancelled() {
                    debug!(line = index, "parse cancelled");
                    return Err(ProcessingError::Cancelled { lines: index - 1 });
                }
            }

            let line = String::from_utf8_lossy(trim_line_ending(&buffer));
            let outcome = self.process_line(&line, index, entry, state.first_line)?;

            if let Some(text) = outcome.output() {
                writeln!(output, "{}", text)?;
            }
            if matches!(outcome, LineOutcome::Matched(_)) {
                state.first_line = false;
            }
            aggregator.record(outcome);
        }

        Ok(aggregator)
    }
}

fn trim_line_ending(buffer: &[u8]) -> &[u8] {
    let buffer = buffer.strip_suffix(b"\n").unwrap_or(buffer);
    buffer.strip_suffix(b"\r").unwrap_or(buffer)
}
