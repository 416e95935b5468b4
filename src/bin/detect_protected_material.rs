//! Scans the code read from stdin for protected material.
//!
//! Connection settings come from `CONTENT_SAFETY_*` variables (or `.env`).

use std::io::{self, Read};

use anyhow::{Context, Result};
use content_safety_restapi::{
    ContentSafetyClient, ContentSafetyConfig, ProtectedMaterialResult, decode, logging,
};

fn main() -> Result<()> {
    logging::init_logging("info");

    let config = ContentSafetyConfig::from_env().context("failed to load Content Safety config")?;
    let client = ContentSafetyClient::new(config);

    let mut code = String::new();
    io::stdin()
        .read_to_string(&mut code)
        .context("failed to read code from stdin")?;

    let text = client
        .detect_protected_material_for_code_blocking(&code, &mut io::stdout().lock())
        .context("protected material detection failed")?;

    let result: ProtectedMaterialResult =
        decode(&text).context("response did not decode as a detection result")?;
    print!("{result}");
    Ok(())
}
