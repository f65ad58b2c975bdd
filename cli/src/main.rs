//! amibake - bake machine images from a base image and a provisioning script

use amibake_cli::cli::Cli;
use amibake_cli::output::json;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let as_json = cli.json;
    if let Err(e) = cli.run().await {
        let message = format!("{e:#}");
        match json::format_error(&message, json::error_code(&e)) {
            Ok(obj) if as_json => println!("{obj}"),
            _ => eprintln!("Error: {message}"),
        }
        std::process::exit(1);
    }
}
