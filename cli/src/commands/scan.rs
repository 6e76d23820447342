//! Scan an announcement feed for incoming stealth payments

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use veil_core::{DetectedPayment, EngineConfig, ScanMonitor, ViewKey};

use crate::announcements::{read_announcements, FileAnnouncementSource};
use crate::keystore::{prompt_password, KeyStore};

pub struct ScanOptions<'a> {
    pub announcements: &'a Path,
    /// Exported view key; the keystore is used when absent
    pub view_key: Option<&'a str>,
    /// Keep polling the file until interrupted
    pub watch: bool,
}

fn load_view_key(store: &KeyStore, exported: Option<&str>) -> Result<ViewKey> {
    match exported {
        Some(exported) => ViewKey::from_export_string(exported).context("Invalid view key"),
        None => {
            let password = prompt_password("Enter password to decrypt keys: ")?;
            let recipient = store
                .load(&password)
                .context("Failed to decrypt keys. Wrong password?")?;
            Ok(recipient.view_key())
        }
    }
}

fn print_payment(payment: &DetectedPayment) {
    println!("{} #{}", "Payment".green().bold(), payment.sequence);
    println!("  Address: {}", payment.address);
    match payment.amount {
        Some(amount) => println!("  Amount:  {}", amount),
        None if payment.amount_rejected => {
            println!("  Amount:  {}", "(does not open with this key)".red())
        }
        None => println!("  Amount:  {}", "(not disclosed)".dimmed()),
    }
}

pub async fn run(config: EngineConfig, store: &KeyStore, options: ScanOptions<'_>) -> Result<()> {
    let view_key = load_view_key(store, options.view_key)?;

    if !options.watch {
        println!("{}", "Scanning for incoming stealth payments...".cyan());
        let announcements = read_announcements(options.announcements)?;
        let found = view_key.scan(&announcements)?;
        for payment in &found {
            print_payment(payment);
        }
        println!();
        println!(
            "Found {} of {} announcements addressed to you.",
            found.len(),
            announcements.len()
        );
        return Ok(());
    }

    let source = Arc::new(FileAnnouncementSource::new(options.announcements.to_path_buf()));
    let (monitor, mut events) = ScanMonitor::new(source, config.scan_interval());
    let meta = monitor.start_monitoring(view_key);

    println!(
        "{}",
        format!(
            "Watching {} every {}ms. Press Ctrl+C to stop.",
            options.announcements.display(),
            config.scan_interval_ms
        )
        .cyan()
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_payment(&event.payment),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                break;
            }
        }
    }

    monitor.stop_monitoring(&meta).await;
    println!("{}", "Stopped.".dimmed());
    Ok(())
}
