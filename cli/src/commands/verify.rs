//! Verify an exported proof

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use veil_core::verifier::ProofVerifier;

use super::read_proof;

pub fn run(proof_path: &Path) -> Result<()> {
    let proof = read_proof(proof_path)?;
    let valid = ProofVerifier::verify_proof(&proof)
        .with_context(|| format!("Could not verify proof {}", proof.id))?;

    if !valid {
        bail!("Proof {} is INVALID", proof.id);
    }

    println!("{} {}", "Proof is valid:".green().bold(), proof.id);
    println!("  {} {} over [{}]", proof.proof_system, proof.claim_type, proof.public_inputs.join(", "));
    Ok(())
}
