use anyhow::{bail, Context, Result};
use framecheck_core::{compute_expected, model::hexify, EthConfig};
use tracing::info;

/// Expected frame for a hex-encoded payload, rendered as spaced hex
pub fn render(payload_hex: &str, config: &EthConfig) -> Result<String> {
    let compact: String = payload_hex.split_whitespace().collect();
    let payload = hex::decode(&compact)
        .with_context(|| format!("Payload is not valid hex: {}", payload_hex))?;

    if payload.is_empty() {
        bail!("Payload must contain at least one byte");
    }

    let frame = compute_expected(&payload, config);
    info!("{}B payload frames to {}B", payload.len(), frame.len());

    Ok(hexify(&frame).trim_end().to_string())
}

pub fn execute(payload_hex: &str, config: &EthConfig) -> Result<()> {
    println!("{}", render(payload_hex, config)?);
    Ok(())
}
