//! Generate a proof from a request file

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use veil_core::{Engine, EngineConfig, ProofRequest};

pub async fn run(
    config: EngineConfig,
    request_path: &Path,
    system: Option<&str>,
    out: Option<&Path>,
) -> Result<()> {
    let json = fs::read_to_string(request_path)
        .with_context(|| format!("Failed to read request file {}", request_path.display()))?;
    let mut request: ProofRequest = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse request file {}", request_path.display()))?;
    if let Some(system) = system {
        request.proof_system = Some(system.to_string());
    }

    let engine = Engine::with_reference_prover(config);
    let proof = engine
        .generate_proof(request)
        .await
        .context("Proof generation failed")?;
    let exported = veil_core::export::export_json(&proof)?;

    match out {
        Some(out) => {
            fs::write(out, &exported)
                .with_context(|| format!("Failed to write proof to {}", out.display()))?;
            println!("{}", "Proof generated".green().bold());
            println!("  Id:           {}", proof.id);
            println!("  Claim:        {}", proof.claim_type);
            println!("  System:       {}", proof.proof_system);
            println!("  Public input: {}", proof.public_inputs.join(", "));
            if let Some(expires_at) = proof.expires_at {
                println!("  Expires:      {}", expires_at.to_rfc3339());
            }
            println!("  Gas estimate: {}", engine.estimate_gas(&proof));
            println!("{}", format!("Saved to {}", out.display()).dimmed());
        }
        None => println!("{exported}"),
    }

    Ok(())
}
