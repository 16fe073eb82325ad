use anyhow::{bail, Context};
use clap::Parser as ClapParser;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use accesslog::source;
use accesslog::{
    CancellationToken, InputFormat, OutputFormat, ParseResult, Parser, ParserConfig, PatternSet,
    ProcessingError,
};

#[derive(ClapParser)]
#[command(name = "accesslog")]
#[command(about = "Convert access logs (S3, ELB, CloudFront, Apache, LTSV) into structured output")]
#[command(version)]
#[command(
    after_help = "Ctrl-C stops reading after the line in progress; press it again to exit immediately."
)]
struct Args {
    /// Input files (default: stdin)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Log format of the input
    #[arg(short = 'f', long = "format", value_enum)]
    format: Option<InputFormat>,

    /// Custom named-capture pattern, tried in the given order (replaces --format)
    #[arg(short = 'p', long = "pattern", action = clap::ArgAction::Append)]
    patterns: Vec<String>,

    /// Output format
    #[arg(short = 'F', long = "output", value_enum)]
    output: Option<OutputFormat>,

    /// Fields to output, in order (comma separated)
    #[arg(short = 'k', long = "keys", value_delimiter = ',')]
    keys: Vec<String>,

    /// Filter expression '<field> <operator> <value>' (repeatable, all must pass)
    #[arg(short = 'e', long = "filter", action = clap::ArgAction::Append)]
    filters: Vec<String>,

    /// Line numbers to skip (comma separated, 1-based)
    #[arg(long = "skip", value_delimiter = ',')]
    skip: Vec<usize>,

    /// Mark output lines with [ PROCESSED ] / [ UNMATCHED ]
    #[arg(long)]
    prefix: bool,

    /// Also write lines that did not match
    #[arg(short = 'u', long)]
    unmatched: bool,

    /// Add a leading "no" field with the line number
    #[arg(short = 'n', long = "line-number")]
    line_number: bool,

    /// Treat inputs as gzip even without a .gz extension
    #[arg(long, conflicts_with = "tar")]
    gzip: bool,

    /// Treat inputs as tar archives (.tar, .tar.gz, .tgz); zip is not supported
    #[arg(long)]
    tar: bool,

    /// Only read archive entries whose name matches this glob
    #[arg(long, requires = "tar")]
    glob: Option<String>,

    /// YAML file with parser options; flags given here take precedence
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Print the parse result of each input as JSON on stderr
    #[arg(long)]
    summary: bool,

    /// Debug mode - log processing details on stderr
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn validate(&self) -> Result<(), String> {
        match (self.format.is_some(), !self.patterns.is_empty()) {
            (true, true) => Err("Cannot use both --format and --pattern".to_string()),
            (false, false) => Err("Must provide either --format or --pattern".to_string()),
            _ => Ok(()),
        }
    }

    fn parser_config(&self) -> anyhow::Result<ParserConfig> {
        let mut config = match &self.config {
            Some(path) => ParserConfig::from_yaml_file(path)?,
            None => ParserConfig::default(),
        };

        if !self.keys.is_empty() {
            config.labels = self.keys.clone();
        }
        config.filters.extend(self.filters.iter().cloned());
        config.skip_lines.extend(self.skip.iter().copied());
        config.prefix |= self.prefix;
        config.emit_unmatched |= self.unmatched;
        config.line_number |= self.line_number;
        if let Some(output) = self.output {
            config.output = output;
        }
        Ok(config)
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("accesslog: error: {}", e);
        std::process::exit(1);
    }

    init_logging(args.debug);

    if let Err(e) = run(args) {
        if is_broken_pipe(&e) {
            return;
        }
        eprintln!("accesslog: error: {:#}", e);
        std::process::exit(1);
    }
}

fn is_broken_pipe(error: &anyhow::Error) -> bool {
    match error.downcast_ref::<ProcessingError>() {
        Some(ProcessingError::Io(e)) => e.kind() == io::ErrorKind::BrokenPipe,
        _ => false,
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = args.parser_config()?;

    let parser = match args.format {
        Some(format) => Parser::from_format(format, config)?,
        None => {
            let patterns = PatternSet::from_patterns(&args.patterns)?;
            Parser::from_patterns(patterns, config)?
        }
    };

    let token = CancellationToken::new();
    let handle = token.clone();
    // First Ctrl-C stops after the current line, a second one exits at once
    if let Err(e) = ctrlc::set_handler(move || {
        if handle.is_cancelled() {
            std::process::exit(130);
        }
        handle.cancel();
    }) {
        warn!("cannot install Ctrl-C handler: {}", e);
    }

    let mut output = BufWriter::with_capacity(source::BUFFER_SIZE, io::stdout().lock());
    let mut results: Vec<ParseResult> = Vec::new();

    if args.files.is_empty() {
        if args.tar || args.gzip {
            bail!("--tar and --gzip need file arguments");
        }
        let stdin = io::stdin().lock();
        results.push(parser.parse_cancelable(stdin, &mut output, "<stdin>", &token)?);
    }

    for path in &args.files {
        let result = if args.tar {
            parser.parse_archive_cancelable(path, args.glob.as_deref(), &mut output, &token)
        } else if args.gzip {
            parser.parse_gzip_file(path, &mut output, Some(&token))
        } else {
            parser.parse_file(path, &mut output, Some(&token))
        }
        .with_context(|| format!("Failed to process '{}'", path.display()))?;
        results.push(result);
    }

    output.flush().map_err(ProcessingError::Io)?;

    if args.summary {
        eprintln!("{}", serde_json::to_string(&results)?);
    }

    Ok(())
}
