//! Export view key (scan-only capability)

use anyhow::{Context, Result};
use colored::Colorize;

use crate::keystore::{prompt_password, KeyStore};

pub fn run(store: &KeyStore) -> Result<()> {
    let password = prompt_password("Enter password to decrypt keys: ")?;
    let recipient = store
        .load(&password)
        .context("Failed to decrypt keys. Wrong password?")?;

    println!();
    println!("{}", "View Key Export".yellow().bold());
    println!();
    println!(
        "{}",
        "The view key detects payments and opens amounts WITHOUT spending capability.".dimmed()
    );
    println!();
    println!("  {}", recipient.view_key().to_export_string().as_str());
    println!();
    println!(
        "{}",
        "WARNING: Anyone with this key can see all your incoming payments!".red()
    );
    println!("{}", "         They CANNOT spend your funds.".green());

    Ok(())
}
