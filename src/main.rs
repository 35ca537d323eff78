//! mpris2-client - control MPRIS2 media players from the command line

use std::process;

use clap::Parser;
use mpris2_client::{
    cli::{self, Cli, formatting::format_error},
    tracing_config,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string()));
            process::exit(2);
        }
    };

    let logging = if cli.command.is_long_running() {
        tracing_config::init_with_file(config.log_level)
    } else {
        tracing_config::init(config.log_level)
    };
    if let Err(e) = logging {
        eprintln!("{}", format_error(&format!("Failed to initialize logging: {e}")));
    }

    match cli::run(cli.command, config, cli.player).await {
        Ok(output) => {
            if !output.trim().is_empty() {
                println!("{output}");
            }
        }
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string()));
            process::exit(1);
        }
    }
}
