//! amibake - Bake unikernels into bootable EC2 machine images

use std::process::ExitCode;

use amibake_cli::cli::Cli;
use amibake_cli::commands::error_code;
use amibake_cli::output::json::format_error;
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    amibake_cli::init_tracing(cli.verbose);
    let json = cli.json;

    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            match format_error(&format!("{e:#}"), error_code(&e)) {
                Ok(body) if json => println!("{body}"),
                _ => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
