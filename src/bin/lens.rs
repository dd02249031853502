//! Lens CLI - Command-line interface for Session Lens
//!
//! Commands:
//! - analyze: Replay a recorded session and emit the report
//! - narrate: Print the timestamped narrative only
//! - dom: Print the reconstructed DOM at a point in time
//! - validate: Check which events the engine can classify
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use session_lens::config::AnalyzerConfig;
use session_lens::encoder::{ReportEncoder, SessionReport};
use session_lens::pipeline::{analyze_events_with_config, replay_until, SessionAnalysis};
use session_lens::schema::{EventLogAdapter, RecordedEvent, SCHEMA_VERSION};
use session_lens::telemetry::init_default_tracing;
use session_lens::{LensError, LENS_VERSION, PRODUCER_NAME};

/// Lens - Replay recorded browser sessions into semantic interactions
#[derive(Parser)]
#[command(name = "lens")]
#[command(version = LENS_VERSION)]
#[command(about = "Classify recorded browser sessions into labelled interactions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a session and write the analysis report
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        /// Analyzer configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the timestamped narrative of a session
    Narrate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Analyzer configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the reconstructed DOM as HTML
    Dom {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Replay events up to this timestamp (ms); defaults to the whole log
        #[arg(long)]
        at: Option<i64>,

        /// Print only the subtree rooted at this node id
        #[arg(long)]
        node: Option<i64>,
    },

    /// Validate recorded events against the known event shapes
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check an analyzer configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Detect from the first character (JSON array or NDJSON)
    Auto,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one interaction per line)
    Ndjson,
    /// Compact report JSON
    Json,
    /// Pretty-printed report JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let _tracing = init_default_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), LensCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            input_format,
            output_format,
            config,
        } => cmd_analyze(&input, &output, input_format, output_format, config.as_deref()),
        Commands::Narrate {
            input,
            input_format,
            config,
        } => cmd_narrate(&input, input_format, config.as_deref()),
        Commands::Dom {
            input,
            input_format,
            at,
            node,
        } => cmd_dom(&input, input_format, at, node),
        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),
        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, LensCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

/// Read, parse and chronologically sort an event log. An empty log is an
/// empty session.
fn load_events(input: &Path, input_format: InputFormat) -> Result<Vec<RecordedEvent>, LensCliError> {
    let input_data = read_input(input)?;

    let mut events = match input_format {
        InputFormat::Auto => EventLogAdapter::parse_any(&input_data)?,
        InputFormat::Ndjson => EventLogAdapter::parse_ndjson(&input_data)?,
        InputFormat::Json => EventLogAdapter::parse_array(&input_data)?,
    };

    EventLogAdapter::sort_chronologically(&mut events);
    Ok(events)
}

/// `load_events` for commands with nothing to report on an empty log
fn load_nonempty_events(
    input: &Path,
    input_format: InputFormat,
) -> Result<Vec<RecordedEvent>, LensCliError> {
    let events = load_events(input, input_format)?;
    if events.is_empty() {
        return Err(LensCliError::NoEvents);
    }
    Ok(events)
}

fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig, LensCliError> {
    match path {
        Some(path) => Ok(AnalyzerConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(AnalyzerConfig::default()),
    }
}

fn analyze(
    input: &Path,
    input_format: InputFormat,
    config: Option<&Path>,
) -> Result<SessionAnalysis, LensCliError> {
    let config = load_config(config)?;
    let events = load_events(input, input_format)?;
    Ok(analyze_events_with_config(&events, &config))
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
) -> Result<(), LensCliError> {
    let analysis = analyze(input, input_format, config)?;
    let report = ReportEncoder::new().encode(&analysis)?;

    let output_data = format_output(&report, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_narrate(
    input: &Path,
    input_format: InputFormat,
    config: Option<&Path>,
) -> Result<(), LensCliError> {
    let analysis = analyze(input, input_format, config)?;
    println!("{}", analysis.narrative);
    Ok(())
}

fn cmd_dom(
    input: &Path,
    input_format: InputFormat,
    at: Option<i64>,
    node: Option<i64>,
) -> Result<(), LensCliError> {
    let events = load_nonempty_events(input, input_format)?;
    let at = at.unwrap_or(i64::MAX);
    let dom = replay_until(&events, at);

    let html = match node {
        Some(id) => dom
            .serialize_html(id)
            .ok_or(LensCliError::NodeNotFound(id))?,
        None => dom.to_html(),
    };

    println!("{}", html);
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), LensCliError> {
    let events = load_nonempty_events(input, input_format)?;
    let results = EventLogAdapter::validate_events(&events);

    let report = ValidationReport {
        total_events: events.len(),
        valid_events: events.len() - results.len(),
        invalid_events: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                timestamp: r.timestamp,
                error: r.issue.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Event at {}ms (index {}): {}",
                    err.timestamp, err.index, err.error
                );
            }
        }
    }

    if report.invalid_events > 0 {
        Err(LensCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), LensCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "lens_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Session Lens version {}", LENS_VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}", SCHEMA_VERSION),
        },
    ];

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match AnalyzerConfig::from_json(&content) {
                    Ok(parsed) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (rage clicks: {} within {}ms, idle after {}ms)",
                            parsed.rage_click_threshold,
                            parsed.rage_click_window_ms,
                            parsed.idle_threshold_ms
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    // stdin is only usable as input when piped
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: LENS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Lens Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(LensCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_output(report: &SessionReport, format: &OutputFormat) -> Result<String, LensCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut output = String::new();
            for interaction in &report.interactions {
                output.push_str(&serde_json::to_string(interaction)?);
                output.push('\n');
            }
            Ok(output)
        }
        OutputFormat::Json => Ok(serde_json::to_string(report)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)? + "\n"),
    }
}

// Error types

#[derive(Debug)]
enum LensCliError {
    Io(io::Error),
    Lens(LensError),
    Json(serde_json::Error),
    NoEvents,
    NodeNotFound(i64),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for LensCliError {
    fn from(e: io::Error) -> Self {
        LensCliError::Io(e)
    }
}

impl From<LensError> for LensCliError {
    fn from(e: LensError) -> Self {
        LensCliError::Lens(e)
    }
}

impl From<serde_json::Error> for LensCliError {
    fn from(e: serde_json::Error) -> Self {
        LensCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<LensCliError> for CliError {
    fn from(e: LensCliError) -> Self {
        match e {
            LensCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            LensCliError::Lens(LensError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'lens doctor --config <file>' for details".to_string()),
            },
            LensCliError::Lens(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} event format", SCHEMA_VERSION)),
            },
            LensCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            LensCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            LensCliError::NodeNotFound(id) => CliError {
                code: "NODE_NOT_FOUND".to_string(),
                message: format!("Node {} is not in the reconstructed DOM", id),
                hint: Some("Check --at; the node may not exist yet or was removed".to_string()),
            },
            LensCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Unrecognized events are skipped during analysis".to_string()),
            },
            LensCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    timestamp: i64,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("lens-{}-{}.ndjson", name, std::process::id()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_empty_log_narrates_empty_session() {
        let path = temp_log("empty", "");

        let analysis = analyze(&path, InputFormat::Auto, None).unwrap();
        assert_eq!(analysis.narrative, "No interactions recorded.");
        assert_eq!(analysis.summary.total_interactions, 0);

        assert!(matches!(
            load_nonempty_events(&path, InputFormat::Auto),
            Err(LensCliError::NoEvents)
        ));
        fs::remove_file(&path).unwrap();
    }
}
