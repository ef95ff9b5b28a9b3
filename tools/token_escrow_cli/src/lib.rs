//! Shared helpers for the token escrow CLI: option parsing, configuration
//! and instruction builders.

pub mod builders;
pub mod config;

use anyhow::{anyhow, bail, Context, Result};
use solana_sdk::pubkey::Pubkey;
use std::{collections::HashMap, str::FromStr};

/// Parse `--key value` pairs into a map keyed without the leading dashes.
pub fn parse_options(args: &[String]) -> Result<HashMap<String, String>> {
    let mut options = HashMap::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let key = arg
            .strip_prefix("--")
            .ok_or_else(|| anyhow!("Unexpected argument '{arg}', expected --option"))?;
        if key.is_empty() {
            bail!("Empty option name");
        }
        let value = iter
            .next()
            .ok_or_else(|| anyhow!("Missing value for --{key}"))?;
        options.insert(key.to_string(), value.clone());
    }
    Ok(options)
}

pub fn required_option<'a>(options: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    options
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing required option --{key}"))
}

pub fn parse_u64(value: &str) -> Result<u64> {
    value
        .replace('_', "")
        .parse::<u64>()
        .with_context(|| format!("Invalid u64 value '{value}'"))
}

pub fn parse_pubkey(value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).with_context(|| format!("Invalid pubkey '{value}'"))
}
