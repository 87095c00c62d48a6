use std::io;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ev_solar_feasibility::cli::{Cli, Command, run_command};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            if let Err(e) = run_command(&args, io::stdout().lock()) {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Command::Serve { port } => {
            if let Err(e) = ev_solar_feasibility::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
    }
}
