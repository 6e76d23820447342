//! Key generation command with encrypted storage and mnemonic support

use anyhow::{bail, Result};
use colored::Colorize;
use veil_core::StealthAddress;
use zeroize::Zeroizing;

use crate::keystore::{generate_with_mnemonic, prompt_new_password, recipient_from_mnemonic, KeyStore};

/// Options for key generation
pub struct KeygenOptions {
    /// Force overwrite existing keys
    pub force: bool,
    /// Skip the recovery phrase
    pub no_mnemonic: bool,
    /// Import from existing mnemonic
    pub import_mnemonic: Option<String>,
    /// Passphrase for mnemonic (optional extra security)
    pub passphrase: Option<String>,
}

pub fn run(store: &KeyStore, options: KeygenOptions) -> Result<()> {
    if store.exists() && !options.force {
        bail!(
            "Keys already exist at {}. Use --force to overwrite.\n\
             Warning: Overwriting keys makes payments to the old meta-address undetectable!",
            store.path().display()
        );
    }

    println!("{}", "=== Veil Key Generation ===".cyan().bold());
    println!();

    let (recipient, mnemonic): (StealthAddress, Option<Zeroizing<String>>) =
        if let Some(ref phrase) = options.import_mnemonic {
            println!("{}", "Importing keys from mnemonic phrase...".cyan());
            let passphrase = options.passphrase.as_deref().unwrap_or("");
            (recipient_from_mnemonic(phrase, passphrase)?, None)
        } else if options.no_mnemonic {
            println!("{}", "Generating random keys (no recovery phrase)...".cyan());
            (StealthAddress::generate(), None)
        } else {
            println!("{}", "Generating keys with recovery phrase...".cyan());
            let (recipient, phrase) = generate_with_mnemonic()?;
            (recipient, Some(phrase))
        };

    println!();
    println!("{}", "Choose a strong password to encrypt your keys.".cyan());
    println!("{}", "Requirements: 8+ chars, uppercase, lowercase, and numbers".dimmed());
    println!();

    let password = prompt_new_password("Enter password: ")?;
    store.save(&recipient, &password)?;
    tracing::info!(path = %store.path().display(), "saved encrypted keys");

    println!();
    println!("{}", "Keys generated and encrypted successfully!".green().bold());
    println!();

    if let Some(ref phrase) = mnemonic {
        println!("{}", "=== RECOVERY PHRASE - WRITE THIS DOWN! ===".red().bold());
        println!();
        let words: Vec<&str> = phrase.split_whitespace().collect();
        for (i, chunk) in words.chunks(4).enumerate() {
            let line: String = chunk
                .iter()
                .enumerate()
                .map(|(j, word)| format!("{:2}. {:<12}", i * 4 + j + 1, word))
                .collect::<Vec<_>>()
                .join(" ");
            println!("  {}", line.yellow());
        }
        println!();
        println!("{}", "Anyone with this phrase can recover your keys.".red());
        println!("{}", "You will NOT be shown this phrase again.".red());
        println!();
    }

    println!("{}:", "Meta-Address (share this to receive payments)".yellow());
    println!("  {}", recipient.address);
    println!();
    println!(
        "{}",
        format!("Encrypted keys saved to: {}", store.path().display()).dimmed()
    );

    if mnemonic.is_none() && options.import_mnemonic.is_none() {
        println!();
        println!(
            "{}",
            "IMPORTANT: No recovery phrase. If you lose your password, the keys are gone.".red().bold()
        );
    }

    Ok(())
}
