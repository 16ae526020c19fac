use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{health, policy, serve};

/// Storage console - session and permission service for the object storage console
#[derive(Parser)]
#[command(name = "console")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write daily rolling log files to this directory
    #[arg(long, global = true, env = "CONSOLE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the console API server
    Serve {
        /// Address to bind (overrides CONSOLE_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides CONSOLE_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check the health of a running console and its storage server
    Health {
        /// Base URL of the console API
        #[arg(long, default_value = "http://localhost:9090")]
        url: String,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Policy inspection commands
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },
}

#[derive(Subcommand)]
enum PolicyAction {
    /// Resolve the console permissions a policy file grants
    Resolve {
        /// Path to an IAM policy JSON document
        file: PathBuf,

        /// Account name used for `${aws:username}` and the username condition
        #[arg(short, long, default_value = "")]
        username: String,

        /// Region reported as the location constraint
        #[arg(short, long, default_value = "")]
        region: String,

        /// Extra string claim as `name=value`, may be repeated
        #[arg(short, long = "claim")]
        claims: Vec<String>,

        /// Output format (json, text)
        #[arg(short, long, default_value = "json")]
        format: String,
    },
}

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Buffered file logs are flushed when the guard drops
    let guard = match logging::init_logging(cli.verbose, cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        drop(guard);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Serve { host, port } => {
            serve::execute(host, port).await?;
        }
        Commands::Health { url, format } => {
            health::execute(url, format).await?;
        }
        Commands::Policy { action } => match action {
            PolicyAction::Resolve {
                file,
                username,
                region,
                claims,
                format,
            } => {
                policy::resolve(policy::ResolveOptions {
                    file,
                    username,
                    region,
                    claims,
                    format,
                })?;
            }
        },
    }

    Ok(())
}
