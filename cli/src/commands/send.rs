//! Prepare a stealth payment

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use veil_core::{Engine, EngineConfig, MetaAddress, ProofRequest};

use crate::announcements;

pub struct SendOptions<'a> {
    pub to: &'a str,
    pub amount: Option<u64>,
    /// Balance request backing the payment
    pub funding: Option<&'a Path>,
    /// Announcements file to append to
    pub publish: Option<&'a Path>,
}

pub async fn run(config: EngineConfig, options: SendOptions<'_>) -> Result<()> {
    let recipient: MetaAddress = options.to.parse().context("Invalid meta-address format")?;

    let funding = match options.funding {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read funding request {}", path.display()))?;
            let request: ProofRequest = serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse funding request {}", path.display()))?;
            Some(request)
        }
        None => None,
    };

    let engine = Engine::with_reference_prover(config);
    let mut transfer = engine
        .private_transfer(&recipient, options.amount, funding)
        .await
        .context("Failed to prepare payment")?;

    eprintln!("{}", "Stealth payment prepared".green().bold());
    eprintln!("  One-time address: {}", transfer.announcement.stealth_address);
    eprintln!(
        "  Ephemeral key:    {}",
        bs58::encode(transfer.announcement.ephemeral_pubkey).into_string()
    );

    if let Some(path) = options.publish {
        let sequence = announcements::publish(path, transfer.announcement.clone())?;
        transfer.announcement.sequence = sequence;
        eprintln!(
            "{}",
            format!("Published as #{} to {}", sequence, path.display()).dimmed()
        );
    }

    println!("{}", serde_json::to_string_pretty(&transfer)?);
    Ok(())
}

