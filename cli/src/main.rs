//! Veil CLI - proof lifecycle and stealth payments from the command line

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod announcements;
mod commands;
mod config;
mod keystore;

use commands::*;
use keystore::KeyStore;

#[derive(Parser, Debug)]
#[command(name = "veil")]
#[command(version = "0.1.0")]
#[command(about = "Zero-knowledge claim proofs and stealth payments")]
#[command(long_about = r#"
Veil proves claims (ownership, balance, transaction, identity) without
revealing the private data behind them, and sends payments to one-time
stealth addresses that only the recipient can link.

Quick Start:
  1. veil keygen                              Generate your stealth keys
  2. veil address                             Share your meta-address
  3. veil prove --request req.json --out p.json
  4. veil verify --proof p.json
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file (default: ~/.veil/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the encrypted key file (default: ~/.veil/keys.enc)
    #[arg(long, global = true)]
    keys: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate new stealth key pairs (viewing + spending keys)
    Keygen {
        /// Force overwrite existing keys
        #[arg(short, long)]
        force: bool,

        /// Skip the recovery phrase
        #[arg(long)]
        no_mnemonic: bool,

        /// Import from existing recovery phrase
        #[arg(long)]
        import_mnemonic: Option<String>,

        /// Passphrase for mnemonic (optional extra security)
        #[arg(long)]
        passphrase: Option<String>,
    },

    /// Show your stealth meta-address
    Address,

    /// Export view key (scan-only, no spending capability)
    ExportViewKey,

    /// Generate a proof for a claim
    Prove {
        /// Proof request JSON file
        #[arg(short, long)]
        request: PathBuf,

        /// Proof system: groth16, plonk or stark
        #[arg(short, long)]
        system: Option<String>,

        /// Write the proof here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Verify an exported proof
    Verify {
        #[arg(short, long)]
        proof: PathBuf,
    },

    /// Export a proof as json or calldata
    Export {
        #[arg(short, long)]
        proof: PathBuf,

        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Estimate on-chain verification gas
    Gas {
        #[arg(short, long)]
        system: String,

        /// Proof size in bytes
        #[arg(long)]
        size: usize,
    },

    /// Prepare a payment to a stealth meta-address
    Send {
        /// Recipient's meta-address (stealth:...)
        #[arg(short, long)]
        to: String,

        /// Amount to hide in the announcement
        #[arg(short, long)]
        amount: Option<u64>,

        /// Balance proof request backing the payment
        #[arg(long)]
        funding: Option<PathBuf>,

        /// Append the announcement to this feed file
        #[arg(long)]
        publish: Option<PathBuf>,
    },

    /// Scan an announcement feed for incoming payments
    Scan {
        /// Announcement feed file
        #[arg(long)]
        announcements: PathBuf,

        /// Scan with an exported view key instead of your own keys
        #[arg(long)]
        view_key: Option<String>,

        /// Keep watching the feed until Ctrl+C
        #[arg(short, long)]
        watch: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write the default configuration
    Init {
        #[arg(short, long)]
        force: bool,
    },
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let store = || -> Result<KeyStore> {
        Ok(KeyStore::new(match &cli.keys {
            Some(path) => path.clone(),
            None => config::default_keys_path()?,
        }))
    };

    match cli.command {
        Commands::Keygen {
            force,
            no_mnemonic,
            import_mnemonic,
            passphrase,
        } => keygen::run(
            &store()?,
            keygen::KeygenOptions {
                force,
                no_mnemonic,
                import_mnemonic,
                passphrase,
            },
        ),
        Commands::Address => address::run(&store()?),
        Commands::ExportViewKey => export_view_key::run(&store()?),
        Commands::Prove {
            ref request,
            ref system,
            ref out,
        } => {
            let engine_config = config::load_config(config_path)?;
            prove::run(engine_config, request, system.as_deref(), out.as_deref()).await
        }
        Commands::Verify { ref proof } => verify::run(proof),
        Commands::Export {
            ref proof,
            ref format,
        } => export::run(proof, format),
        Commands::Gas { ref system, size } => gas::run(system, size),
        Commands::Send {
            ref to,
            amount,
            ref funding,
            ref publish,
        } => {
            let engine_config = config::load_config(config_path)?;
            send::run(
                engine_config,
                send::SendOptions {
                    to,
                    amount,
                    funding: funding.as_deref(),
                    publish: publish.as_deref(),
                },
            )
            .await
        }
        Commands::Scan {
            ref announcements,
            ref view_key,
            watch,
        } => {
            let engine_config = config::load_config(config_path)?;
            scan::run(
                engine_config,
                &store()?,
                scan::ScanOptions {
                    announcements,
                    view_key: view_key.as_deref(),
                    watch,
                },
            )
            .await
        }
        Commands::Config { ref action } => match action {
            ConfigAction::Init { force } => commands::config::init(config_path, *force),
            ConfigAction::Show => commands::config::show(config_path),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_prove() {
        let cli = Cli::try_parse_from([
            "veil", "-vv", "prove", "--request", "req.json", "--system", "plonk",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Prove { request, system, out } => {
                assert_eq!(request, PathBuf::from("req.json"));
                assert_eq!(system.as_deref(), Some("plonk"));
                assert!(out.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parse_global_paths() {
        let cli = Cli::try_parse_from([
            "veil", "address", "--keys", "/tmp/k.enc", "--config", "/tmp/c.json",
        ])
        .unwrap();
        assert_eq!(cli.keys, Some(PathBuf::from("/tmp/k.enc")));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        assert!(matches!(cli.command, Commands::Address));
    }

    #[test]
    fn cli_parse_config_init() {
        let cli = Cli::try_parse_from(["veil", "config", "init", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));
    }

    #[test]
    fn cli_parse_send_requires_recipient() {
        assert!(Cli::try_parse_from(["veil", "send", "--amount", "5"]).is_err());
        let cli = Cli::try_parse_from(["veil", "send", "--to", "stealth:abc"]).unwrap();
        assert!(matches!(cli.command, Commands::Send { amount: None, .. }));
    }

    #[test]
    fn cli_parse_export_default_format() {
        let cli = Cli::try_parse_from(["veil", "export", "--proof", "p.json"]).unwrap();
        match cli.command {
            Commands::Export { format, .. } => assert_eq!(format, "json"),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
