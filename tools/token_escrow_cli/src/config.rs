//! Configuration Management Module
//!
//! Loads the CLI configuration (RPC endpoint, program id, payer keypair, commitment)
//! from a TOML file. Command-line options override file values.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::{collections::HashMap, path::Path, str::FromStr};
use tracing::debug;

/// Environment variable naming a config file to load.
pub const CONFIG_PATH_ENV: &str = "TOKEN_ESCROW_CONFIG_PATH";

/// Config file used when neither `--config` nor the environment variable is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/token_escrow.toml";

pub const DEFAULT_RPC_URL: &str = "http://localhost:8899";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// CLI settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// JSON-RPC endpoint of the cluster
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Deployed token escrow program id (base58)
    #[serde(default)]
    pub program_id: Option<String>,
    /// Path of the fee payer keypair file
    #[serde(default)]
    pub payer_keypair: Option<String>,
    /// One of `processed`, `confirmed`, `finalized`
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            program_id: None,
            payer_keypair: None,
            commitment: default_commitment(),
        }
    }
}

// ============================================================================
// CONFIGURATION LOADING AND MANAGEMENT
// ============================================================================

impl CliConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: CliConfig = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration.
    ///
    /// Resolution order: `explicit_path`, then `TOKEN_ESCROW_CONFIG_PATH`, then
    /// `config/token_escrow.toml`. An explicitly named file must exist; a missing
    /// default file yields `CliConfig::default()`.
    pub fn load(explicit_path: Option<&str>) -> Result<Self> {
        let named_path = explicit_path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());

        match named_path {
            Some(path) => Self::load_file(&path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load_file(DEFAULT_CONFIG_PATH),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn load_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path}"))?;
        debug!("Loaded config from {}", path);
        Self::from_toml(&content).with_context(|| format!("Invalid config file {path}"))
    }

    /// Checks that the RPC URL is set, the program id parses and the commitment is known.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.trim().is_empty() {
            return Err(anyhow!("Configuration error: rpc_url must not be empty"));
        }
        self.program_id()?;
        self.commitment_config()?;
        Ok(())
    }

    /// Applies `--rpc`, `--program-id` and `--payer` command-line overrides.
    pub fn apply_overrides(&mut self, options: &HashMap<String, String>) -> Result<()> {
        if let Some(rpc) = options.get("rpc") {
            self.rpc_url = rpc.clone();
        }
        if let Some(program_id) = options.get("program-id") {
            self.program_id = Some(program_id.clone());
        }
        if let Some(payer) = options.get("payer") {
            self.payer_keypair = Some(payer.clone());
        }
        self.validate()
    }

    pub fn program_id(&self) -> Result<Option<Pubkey>> {
        self.program_id
            .as_deref()
            .map(|value| {
                Pubkey::from_str(value)
                    .with_context(|| format!("Configuration error: invalid program_id '{value}'"))
            })
            .transpose()
    }

    /// Program id, failing when neither the config nor the command line set one.
    pub fn require_program_id(&self) -> Result<Pubkey> {
        self.program_id()?
            .ok_or_else(|| anyhow!("Program id is required (--program-id or program_id in config)"))
    }

    pub fn commitment_config(&self) -> Result<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(anyhow!("Configuration error: unknown commitment '{other}'")),
        }
    }
}
