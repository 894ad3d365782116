//! rwgate CLI: run reader/writer workloads against either lock policy.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rwgate::config::{ConfigLoader, DemoProfile, WorkloadConfig};
use rwgate::rwlock::Policy;
use rwgate::workload::{WorkloadReport, run_workload};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Semantic exit codes.
struct ExitCode;

impl ExitCode {
    /// Bad arguments, unreadable or invalid configuration.
    const USER_ERROR: i32 = 1;
    /// Workload failed to run (spawn failure, participant panic).
    const RUNTIME_ERROR: i32 = 2;
    /// The lock admitted overlapping writers or a writer alongside readers.
    const EXCLUSION_VIOLATION: i32 = 11;
}

#[derive(Parser, Debug)]
#[command(name = "rwgate", version, about = "Reader/writer lock workload driver")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a bounded workload and print the report
    Run(RunArgs),
    /// Print the effective configuration without running it
    ShowConfig(WorkloadArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    workload: WorkloadArgs,

    /// Report format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,
}

#[derive(Args, Debug)]
struct WorkloadArgs {
    /// Configuration file path
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Lock policy: classical or fair (also selects the demo profile)
    #[arg(short = 'p', long = "policy")]
    policy: Option<Policy>,

    /// Number of reader participants
    #[arg(long = "readers")]
    readers: Option<usize>,

    /// Number of writer participants
    #[arg(long = "writers")]
    writers: Option<usize>,

    /// Cycles per participant
    #[arg(short = 'n', long = "iterations")]
    iterations: Option<usize>,

    /// Milliseconds a reader stays in the critical section
    #[arg(long = "read-hold-ms")]
    read_hold_ms: Option<u64>,

    /// Milliseconds a writer stays in the critical section
    #[arg(long = "write-hold-ms")]
    write_hold_ms: Option<u64>,

    /// Milliseconds between exit and next entry
    #[arg(long = "remainder-ms")]
    remainder_ms: Option<u64>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    JsonPretty,
}

impl WorkloadArgs {
    fn load(&self) -> Result<WorkloadConfig, rwgate::ConfigError> {
        let mut loader =
            ConfigLoader::new().profile(self.policy.map(DemoProfile::from).unwrap_or_default());
        if let Some(path) = &self.config {
            loader = loader.file(path);
        }
        let overrides = [
            ("policy", self.policy.map(|p| p.to_string())),
            ("readers", self.readers.map(|n| n.to_string())),
            ("writers", self.writers.map(|n| n.to_string())),
            ("iterations", self.iterations.map(|n| n.to_string())),
            ("read_hold_ms", self.read_hold_ms.map(|n| n.to_string())),
            ("write_hold_ms", self.write_hold_ms.map(|n| n.to_string())),
            ("remainder_ms", self.remainder_ms.map(|n| n.to_string())),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                loader = loader.override_value(key, value);
            }
        }
        loader.load()
    }
}

fn init_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "rwgate=warn",
        1 => "rwgate=info",
        2 => "rwgate=debug",
        _ => "rwgate=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .try_init();
}

fn write_report(report: &WorkloadReport, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Human => println!("{report}"),
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
        OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);
    if let Err(code) = run(cli.command) {
        std::process::exit(code);
    }
}

fn run(command: Command) -> Result<(), i32> {
    match command {
        Command::ShowConfig(args) => {
            let config = args.load().map_err(|err| {
                eprintln!("error: {err}");
                ExitCode::USER_ERROR
            })?;
            let json = serde_json::to_string_pretty(&config).map_err(|err| {
                eprintln!("error: {err}");
                ExitCode::RUNTIME_ERROR
            })?;
            println!("{json}");
            Ok(())
        }
        Command::Run(args) => {
            let config = args.workload.load().map_err(|err| {
                eprintln!("error: {err}");
                ExitCode::USER_ERROR
            })?;
            let report = run_workload(&config).map_err(|err| {
                eprintln!("error: {err}");
                ExitCode::RUNTIME_ERROR
            })?;
            write_report(&report, args.format).map_err(|err| {
                eprintln!("error: {err}");
                ExitCode::RUNTIME_ERROR
            })?;
            if report.is_clean() {
                Ok(())
            } else {
                Err(ExitCode::EXCLUSION_VIOLATION)
            }
        }
    }
}
