use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use qc_vision::logging::{LogLevel, init_logging};
use qc_vision::{DEFAULT_QC_PROMPT, ImageDetail, QcClient, QcOptions};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qc-vision", version, about = "Compare a product image against a reference with a vision model")]
struct Cli {
    /// Log debug output, including raw API payloads
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one check and print the result
    Check {
        /// Reference image
        #[arg(short, long)]
        reference: PathBuf,

        /// Image to be checked against the reference
        #[arg(short, long)]
        check: PathBuf,

        /// Instructions for the model
        #[arg(short, long, default_value = DEFAULT_QC_PROMPT, hide_default_value = true)]
        prompt: String,

        /// Image detail level: low, high or auto (defaults to QC_DETAIL or low)
        #[arg(short, long)]
        detail: Option<String>,

        /// Print the raw completion JSON instead of the rendered markdown
        #[arg(long)]
        raw: bool,
    },
    /// Serve the check endpoint over HTTP
    Serve {
        #[arg(short, long, default_value = "127.0.0.1:7860")]
        addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    let options = QcOptions::from_env().context("failed to load configuration")?;

    match cli.command {
        Command::Check {
            reference,
            check,
            prompt,
            detail,
            raw,
        } => {
            let mut options = options;
            if let Some(detail) = detail {
                options.detail = detail.parse::<ImageDetail>()?;
            }
            let client = QcClient::new(options)?;

            let output = if raw {
                client.perform_qc_check(&prompt, &reference, &check).await?
            } else {
                client
                    .check_quality(Some(reference.as_path()), Some(check.as_path()), &prompt)
                    .await?
            };
            println!("{}", output);
        }
        Command::Serve { addr } => {
            let client = QcClient::new(options)?;
            qc_vision::server::serve(addr, client).await?;
        }
    }

    Ok(())
}
