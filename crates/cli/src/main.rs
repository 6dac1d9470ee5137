//! WeChat Pay merchant transfer CLI.
//!
//! This tool provides commands for:
//! - Creating, querying, and cancelling transfer bills
//! - Signing requests and encrypting sensitive fields offline
//! - Decrypting transfer callback notifications
//! - Validating configuration and key files

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;

use commands::CreateArgs;
use error::CliError;
use wechatpay_transfer_common::logging::{init_logging, level_for_verbosity};

#[derive(Parser)]
#[command(name = "wxtransfer")]
#[command(about = "Create and manage WeChat Pay merchant transfers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the TOML configuration file
    #[arg(
        long,
        short,
        global = true,
        env = "WECHATPAY_CONFIG",
        default_value = "wechatpay.toml"
    )]
    config: PathBuf,

    /// Enable verbose output (-vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a transfer bill
    Create(CreateArgs),

    /// Query a transfer bill by merchant bill number
    Query {
        #[arg(long)]
        out_bill_no: String,
    },

    /// Cancel a transfer bill that is waiting for user confirmation
    Cancel {
        #[arg(long)]
        out_bill_no: String,
    },

    /// Print the signing string and Authorization header for a request
    Sign {
        #[arg(long, default_value = "POST")]
        method: String,

        #[arg(long, default_value = "/v3/fund-app/mch-transfer/transfer-bills")]
        path: String,

        /// Request body; empty for GET requests
        #[arg(long, default_value = "")]
        body: String,

        /// Unix timestamp in seconds; defaults to now
        #[arg(long)]
        timestamp: Option<i64>,

        /// Nonce; a random 32-character string when omitted
        #[arg(long)]
        nonce: Option<String>,
    },

    /// Encrypt a sensitive value with the platform public key
    Encrypt {
        value: String,
    },

    /// Decrypt a transfer callback notification body
    DecryptNotification {
        /// File holding the raw notification JSON
        #[arg(long, short)]
        file: PathBuf,
    },

    /// Validate the configuration file and load both keys
    Validate,
}

#[allow(clippy::print_stderr)]
fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(level_for_verbosity(cli.verbose)) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    if let Err(e) = run(&cli) {
        if cli.verbose > 0 {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("Error: {}", e.summary());
        }
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
fn run(cli: &Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_path();
    match &cli.command {
        Commands::Create(args) => commands::create(config_path, args.clone()),
        Commands::Query { out_bill_no } => commands::query(config_path, out_bill_no),
        Commands::Cancel { out_bill_no } => commands::cancel(config_path, out_bill_no),
        Commands::Sign {
            method,
            path,
            body,
            timestamp,
            nonce,
        } => {
            let output =
                commands::sign(config_path, method, path, body, *timestamp, nonce.clone())?;
            println!("Signing string:\n{}", output.message.escape_debug());
            println!("Authorization: {}", output.authorization);
            Ok(())
        }
        Commands::Encrypt { value } => {
            println!("{}", commands::encrypt(config_path, value)?);
            Ok(())
        }
        Commands::DecryptNotification { file } => {
            commands::decrypt_notification(config_path, file)
        }
        Commands::Validate => config::validate(config_path),
    }
}
