//! Hash command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cardprint_core::{
    encoder_for, source_digest, Fingerprint, FingerprintSet, FingerprintSetBuilder, HashAlgorithm,
    HashEncoder,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::utils::{engine_config, read_image};
use crate::{AlgorithmArg, FingerprintFormat};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashOutput {
    algorithm: HashAlgorithm,
    grid: String,
    bits: usize,
    source_digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<Fingerprint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprints: Option<FingerprintSet>,
}

fn render(fingerprint: &Fingerprint, format: FingerprintFormat) -> String {
    match format {
        FingerprintFormat::Bits => fingerprint.to_bit_string(),
        FingerprintFormat::Hex | FingerprintFormat::Json => fingerprint.to_hex(),
    }
}

/// Execute the hash command.
pub fn execute(
    image: PathBuf,
    all_orientations: bool,
    algorithm: AlgorithmArg,
    width: Option<u32>,
    format: FingerprintFormat,
) -> Result<()> {
    let config = engine_config(width)?;
    let algorithm: HashAlgorithm = algorithm.into();
    let encoder = encoder_for(algorithm, config.grid)?;

    let data = read_image(&image)?;
    info!(path = %image.display(), bytes = data.len(), %algorithm, grid = %config.grid, "Read image");

    let mut output = HashOutput {
        algorithm,
        grid: config.grid.to_string(),
        bits: encoder.bit_len(),
        source_digest: source_digest(&data),
        fingerprint: None,
        fingerprints: None,
    };

    if all_orientations {
        let builder = FingerprintSetBuilder::new(encoder);
        let outcome = builder
            .build(&data)
            .with_context(|| format!("Failed to fingerprint {}", image.display()))?;
        for (orientation, err) in &outcome.failed {
            warn!(%orientation, error = %err, "Orientation failed");
        }
        output.fingerprints = Some(outcome.fingerprints);
    } else {
        let fingerprint = encoder
            .encode(&data)
            .with_context(|| format!("Failed to fingerprint {}", image.display()))?;
        output.fingerprint = Some(fingerprint);
    }

    if format == FingerprintFormat::Json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
        println!("{json}");
        return Ok(());
    }

    if let Some(fingerprint) = &output.fingerprint {
        println!("{}", render(fingerprint, format));
    }
    if let Some(set) = &output.fingerprints {
        for (orientation, fingerprint) in set.iter() {
            println!("{:<20} {}", orientation.as_str(), render(fingerprint, format));
        }
    }

    Ok(())
}
