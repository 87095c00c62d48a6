use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::info;

use crate::config::{ConfigError, RawAssumptions};
use crate::core::{ValidationError, evaluate};
use crate::report::{render_text, write_evaluation_csv};

#[derive(Parser, Debug)]
#[command(
    name = "ev-solar-feasibility",
    version,
    about = "Feasibility model for EV charging hubs with on-site solar (NPV, IRR, payback, CO2)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate one assumption set and print the result
    Run(RunArgs),
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// TOML file with assumption values
    #[arg(long)]
    pub assumptions: Option<PathBuf>,
    /// Built-in preset used as the base; defaults to "default" when no file is given
    #[arg(long)]
    pub preset: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
    #[command(flatten)]
    pub overrides: RawAssumptions,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Preset (explicit, or implied when no file is given), then the file, then
/// individual flags.
pub fn resolve_assumptions(args: &RunArgs) -> Result<RawAssumptions, ConfigError> {
    let mut raw = match (&args.preset, &args.assumptions) {
        (Some(name), _) => RawAssumptions::preset(name)?,
        (None, None) => RawAssumptions::dashboard_defaults(),
        (None, Some(_)) => RawAssumptions::default(),
    };
    if let Some(path) = &args.assumptions {
        raw = raw.overlay(RawAssumptions::from_toml_file(path)?);
    }
    Ok(raw.overlay(args.overrides.clone()))
}

pub fn run_command(args: &RunArgs, mut out: impl Write) -> Result<(), CliError> {
    let assumptions = resolve_assumptions(args)?.into_assumptions()?;
    let evaluation = evaluate(&assumptions)?;
    info!(
        target: "feasibility.cli",
        project = %assumptions.project_name,
        output = ?args.output,
        "Evaluation complete"
    );

    match args.output {
        OutputFormat::Table => write!(out, "{}", render_text(&evaluation))?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &evaluation)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_evaluation_csv(&evaluation, &mut out)?,
    }
    out.flush()?;
    Ok(())
}
