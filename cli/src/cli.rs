//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::app::{AppContext, AppFlags, OutputFlags};
use crate::commands;

/// Bake an AMI: boot a base image, provision it over ssh, snapshot it, and
/// terminate the build instance.
#[derive(Parser)]
#[command(name = "amibake", version, arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub bake: commands::bake::BakeArgs,

    /// Config file [default: ~/.amibake/config.yaml]
    #[arg(long, env = "AMIBAKE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,
}

impl Cli {
    /// Execute the bake.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be loaded or the bake fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            bake,
            config,
            json,
            quiet,
            no_color,
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            config,
        })?;
        commands::bake::run(&app, &bake).await
    }
}
