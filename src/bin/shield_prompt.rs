//! Runs Shield Prompt over a request read from stdin as JSON, e.g.
//! `{"userPrompt": "...", "documents": ["..."]}`.
//!
//! Connection settings come from `CONTENT_SAFETY_*` variables (or `.env`).

use std::io::{self, Read};

use anyhow::{Context, Result};
use content_safety_restapi::{
    ContentSafetyClient, ContentSafetyConfig, ShieldPromptRequest, ShieldPromptResult, decode,
    logging,
};

fn main() -> Result<()> {
    logging::init_logging("info");

    let config = ContentSafetyConfig::from_env().context("failed to load Content Safety config")?;
    let client = ContentSafetyClient::new(config);

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read request from stdin")?;
    let request: ShieldPromptRequest =
        decode(&input).context("stdin is not a shield prompt request")?;

    let text = client
        .shield_prompt_blocking(&request, &mut io::stdout().lock())
        .context("shield prompt failed")?;

    let result: ShieldPromptResult =
        decode(&text).context("response did not decode as a shield prompt result")?;
    print!("{result}");
    Ok(())
}
