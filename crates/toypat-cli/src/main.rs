use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use toypat_core::{
    DecodeError, DecodeOptions, DecodeReport, FormatError, Pattern, PatternSource, StrideOverrun,
    decode_pattern_with, make_report,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "TOYPAT_LOG";

#[derive(Parser, Debug)]
#[command(name = "toypat")]
#[command(version)]
#[command(
    about = "Decoder for toy vibration pattern files (Legacy and V:1 formats).",
    long_about = None,
    after_help = "Examples:\n  toypat pattern decode edge.pat -o report.json\n  toypat pattern decode edge.pat --stdout --pretty --scaled\n  cat edge.pat | toypat pattern info -"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); overridden by TOYPAT_LOG
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on pattern files.
    Pattern {
        #[command(subcommand)]
        command: PatternCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PatternCommands {
    /// Decode a pattern file and write a versioned JSON report.
    #[command(alias = "parse")]
    #[command(
        after_help = "Examples:\n  toypat pattern decode edge.pat -o report.json\n  toypat pattern parse edge.pat --stdout"
    )]
    Decode {
        /// Path to a pattern file, or - for stdin
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Include points normalized to 0.0..=1.0
        #[arg(long)]
        scaled: bool,

        /// Ignore values beyond the channel count instead of failing
        #[arg(long)]
        lenient_stride: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
    /// Print a short summary of a pattern file.
    Info {
        /// Path to a pattern file, or - for stdin
        input: PathBuf,

        /// Ignore values beyond the channel count instead of failing
        #[arg(long)]
        lenient_stride: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Pattern { command } => match command {
            PatternCommands::Decode {
                input,
                report,
                stdout,
                pretty,
                compact,
                scaled,
                lenient_stride,
                quiet,
            } => cmd_pattern_decode(DecodeArgs {
                input,
                report,
                stdout,
                pretty,
                compact,
                scaled,
                lenient_stride,
                quiet,
            }),
            PatternCommands::Info {
                input,
                lenient_stride,
            } => cmd_pattern_info(input, lenient_stride),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "toypat_core=debug,toypat=debug,warn",
        _ => "toypat_core=trace,toypat=trace,warn",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{:#}", err), None)
    }
}

struct DecodeArgs {
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    scaled: bool,
    lenient_stride: bool,
    quiet: bool,
}

fn cmd_pattern_decode(args: DecodeArgs) -> Result<(), CliError> {
    if args.pretty && args.compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }

    let input = resolve_input_path(&args.input)?;
    let report = if args.stdout {
        None
    } else {
        Some(args.report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };
    if let Some(report_path) = report.as_ref() {
        ensure_distinct_paths(&input, report_path)?;
    }

    let (pattern, bytes) = decode_input(&input, args.lenient_stride)?;
    let rep = make_report(
        &input.display().to_string(),
        bytes,
        pattern,
        args.scaled,
    );
    let json = serialize_report(&rep, args.pretty)?;

    let Some(report) = report else {
        println!("{}", json);
        return Ok(());
    };

    if let Some(parent) = report.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(&report, json)
        .with_context(|| format!("Failed to write report: {}", report.display()))?;

    if !args.quiet {
        eprintln!(
            "OK: {} points ({}) -> {}",
            rep.pattern.points.len(),
            rep.pattern.header.version,
            report.display()
        );
    }
    Ok(())
}

fn cmd_pattern_info(input: PathBuf, lenient_stride: bool) -> Result<(), CliError> {
    let input = resolve_input_path(&input)?;
    let (pattern, bytes) = decode_input(&input, lenient_stride)?;
    print!("{}", format_summary(&pattern, bytes));
    Ok(())
}

fn decode_input(input: &Path, lenient_stride: bool) -> Result<(Pattern, u64), CliError> {
    let mut source = PatternSource::open(input).map_err(|err| {
        CliError::new(
            format!("cannot open {}: {}", input.display(), err),
            Some("pass a pattern file, or - to read stdin".to_string()),
        )
    })?;
    let options = DecodeOptions {
        stride_overrun: if lenient_stride {
            StrideOverrun::Truncate
        } else {
            StrideOverrun::Reject
        },
        ..DecodeOptions::default()
    };

    let pattern = decode_pattern_with(&mut source, &options).map_err(|err| {
        let hint = decode_hint(&err, lenient_stride);
        CliError::new(
            format!("pattern decoding failed: {}: {}", input.display(), err),
            hint,
        )
    })?;

    let bytes = if source.is_stdin() {
        source.bytes_read()
    } else {
        fs::metadata(input)
            .with_context(|| format!("Failed to read input file: {}", input.display()))?
            .len()
    };
    debug!(bytes, points = pattern.points.len(), "decoded input");
    Ok((pattern, bytes))
}

fn decode_hint(err: &DecodeError, lenient_stride: bool) -> Option<String> {
    match err.format_error() {
        Some(FormatError::StrideViolation {
            expected, actual, ..
        }) if actual > expected && !lenient_stride => {
            Some("use --lenient-stride to ignore extra values".to_string())
        }
        Some(FormatError::UnexpectedEof { .. }) => {
            Some("the header must end with '#'; the file may be truncated".to_string())
        }
        _ => None,
    }
}

fn serialize_report(rep: &DecodeReport, pretty: bool) -> Result<String, CliError> {
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn format_summary(pattern: &Pattern, bytes: u64) -> String {
    let header = &pattern.header;
    let features = header
        .features
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let mut out = String::new();
    out.push_str(&format!("version:      {}\n", header.version));
    if let Some(device_type) = &header.device_type {
        out.push_str(&format!("device type:  {}\n", device_type));
    }
    out.push_str(&format!("features:     {}\n", features));
    out.push_str(&format!("interval:     {} ms\n", header.interval.as_millis()));
    if let Some(hash) = &header.content_hash {
        out.push_str(&format!("content hash: {}\n", hash));
    }
    out.push_str(&format!("points:       {}\n", pattern.points.len()));
    out.push_str(&format!("duration:     {} ms\n", pattern.duration().as_millis()));
    out.push_str(&format!("bytes:        {}\n", bytes));
    out
}

fn ensure_distinct_paths(input: &Path, report_path: &Path) -> Result<(), CliError> {
    if is_stdin(input) {
        return Ok(());
    }
    let Ok(input_abs) = fs::canonicalize(input) else {
        return Ok(());
    };
    let report_dir = match report_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::canonicalize(parent).ok(),
        _ => fs::canonicalize(".").ok(),
    };
    let (Some(report_dir), Some(file_name)) = (report_dir, report_path.file_name()) else {
        return Ok(());
    };
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn is_stdin(input: &Path) -> bool {
    input.as_os_str() == "-"
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if is_stdin(input) || !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single pattern file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
