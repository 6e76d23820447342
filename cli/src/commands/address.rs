//! Display the stealth meta-address

use anyhow::Result;
use colored::Colorize;

use crate::keystore::KeyStore;

pub fn run(store: &KeyStore) -> Result<()> {
    let meta = store.meta_address()?;

    println!();
    println!("{}", "Your Stealth Meta-Address".yellow().bold());
    println!();
    println!("{}", meta);
    println!();
    println!("{}:", "Components".dimmed());
    println!("  Viewing pubkey:  {}", hex::encode(meta.viewing_pubkey));
    println!("  Spending pubkey: {}", hex::encode(meta.spending_pubkey));
    println!();
    println!(
        "{}",
        "Share the meta-address above to receive private payments.".dimmed()
    );

    Ok(())
}
