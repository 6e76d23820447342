//! On-chain verification gas estimate

use anyhow::Result;
use colored::Colorize;
use veil_core::export::{estimate_gas, GAS_PER_CALLDATA_BYTE};
use veil_core::ProofSystem;

pub fn run(system: &str, size: usize) -> Result<()> {
    let system: ProofSystem = system.parse()?;
    let gas = estimate_gas(system, size);

    println!("{}: {}", "Estimated gas".yellow(), gas);
    println!(
        "{}",
        format!(
            "{} base + {} bytes x {} gas",
            estimate_gas(system, 0),
            size,
            GAS_PER_CALLDATA_BYTE
        )
        .dimmed()
    );
    Ok(())
}
