//! fleetctl - Controller for a fleet of remote work agents

use clap::Parser;
use fleet_controller::cli::Cli;
use fleet_controller::output::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let as_json = cli.json;
    if let Err(e) = cli.run().await {
        if as_json {
            match json::format_error(&format!("{e:#}"), json::error_code(&e)) {
                Ok(out) => println!("{out}"),
                Err(_) => eprintln!("Error: {e}"),
            }
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}
