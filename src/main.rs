//! Runway CLI Entry Point
//!
//! Provides the command-line interface for running workflows and scripts.
//!
//! # Usage
//!
//! ```bash
//! # Run workflows/deploy.yml under the current directory
//! runway deploy
//!
//! # Pass inputs and pick a workspace
//! runway deploy --base-path /srv/automation -i target=prod -i retries=3
//!
//! # Run a single script and print human-readable output
//! runway --script install_packages --output-format text
//!
//! # Write the result to a file
//! runway deploy --output-file result.json
//! ```

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, ValueEnum};
use log::{debug, info};
use serde_json::{Map, Value as JsonValue};

use runway::execution::Runner;
use runway::output::{render, OutputFormat};
use runway::{APP_NAME, VERSION};

/// Log levels accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Command-line configuration parsed from arguments.
#[derive(Debug, Parser)]
#[command(name = "runway", version)]
#[command(about = "Runway - run declarative YAML workflows and scripts", long_about = None)]
#[command(group(ArgGroup::new("target").required(true).args(["workflow", "script"])))]
struct Cli {
    /// Workflow to run, looked up in `workflows/` under the base path
    workflow: Option<String>,

    /// Run a single script from `scripts/` instead of a workflow
    #[arg(short = 's', long = "script", value_name = "NAME")]
    script: Option<String>,

    /// Workspace containing `workflows/` and `scripts/`
    #[arg(short = 'b', long = "base-path", env = "RUNWAY_BASE_PATH")]
    base_path: Option<PathBuf>,

    /// Input value, may be repeated
    #[arg(short = 'i', long = "input", value_name = "KEY=VALUE", value_parser = parse_input)]
    inputs: Vec<(String, String)>,

    /// Output format for the result
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Json)]
    output_format: OutputFormat,

    /// Logging level
    #[arg(long = "log-level", value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// File to write the result to; `-` prints to stdout
    #[arg(short = 'o', long = "output-file", value_name = "FILE", default_value = "-")]
    output_file: String,
}

/// Parses a `key=value` input argument.
fn parse_input(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(level: LogLevel) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_filter()))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Main application entry point.
fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let base_path = match cli.base_path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    debug!("{} v{} using base path {}", APP_NAME, VERSION, base_path.display());

    let inputs: Map<String, JsonValue> = cli
        .inputs
        .into_iter()
        .map(|(key, value)| (key, JsonValue::String(value)))
        .collect();

    let runner = Runner::new(base_path);
    let result = match (&cli.script, &cli.workflow) {
        (Some(script), _) => {
            info!("Running script: {}", script);
            runner.execute_script(script, &inputs)?.to_json()
        }
        (None, Some(workflow)) => runner.execute_workflow(workflow, &inputs)?.to_json(),
        (None, None) => return Err("a workflow or --script is required".into()),
    };

    let rendered = render(&result, cli.output_format)?;
    write_result(&rendered, &cli.output_file)?;
    Ok(())
}

/// Prints the rendered result, or writes it to `output_file` unless that is `-`.
fn write_result(rendered: &str, output_file: &str) -> std::io::Result<()> {
    if output_file == "-" {
        println!("{}", rendered);
    } else {
        fs::write(output_file, format!("{}\n", rendered))?;
        info!("Result written to {}", output_file);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
