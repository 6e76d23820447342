//! Re-export a proof as JSON or calldata

use std::path::Path;

use anyhow::Result;
use veil_core::export::export_proof;
use veil_core::ExportFormat;

use super::read_proof;

pub fn run(proof_path: &Path, format: &str) -> Result<()> {
    let format: ExportFormat = format.parse()?;
    let proof = read_proof(proof_path)?;
    println!("{}", export_proof(&proof, format)?);
    Ok(())
}
