use anyhow::{anyhow, bail, Context, Result};
use borsh::BorshDeserialize;
use solana_client::rpc_client::RpcClient;
use solana_program::program_pack::Pack;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signature, Signer},
    transaction::Transaction,
};
use spl_token::state::Account as TokenAccount;
use std::{collections::HashMap, env};
use token_escrow::state::{find_state_address, find_vault_address, Escrow, EscrowState};
use token_escrow_cli::{
    builders::{build_cancel_escrow_ix, build_exchange_ix, build_initialize_ix, build_start_escrow_ix},
    config::CliConfig,
    parse_options, parse_pubkey, parse_u64, required_option,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI ENTRYPOINT
// ============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("[token_escrow_cli] Error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }

    let command = args[0].as_str();
    let options = parse_options(&args[1..])?;

    let mut config = CliConfig::load(options.get("config").map(String::as_str))?;
    config.apply_overrides(&options)?;
    info!(rpc_url = %config.rpc_url, command, "Connecting");
    let client = RpcClient::new_with_commitment(config.rpc_url.clone(), config.commitment_config()?);

    // Commands that don't require program-id
    if command == "get-token-balance" {
        return handle_get_token_balance(&client, &options);
    }

    let program_id = config.require_program_id()?;
    debug!(%program_id, "Using program");

    match command {
        "initialize" => handle_initialize(&client, &config, program_id),
        "start-escrow" => handle_start_escrow(&client, &config, &options, program_id),
        "cancel-escrow" => handle_cancel_escrow(&client, &config, &options, program_id),
        "exchange" => handle_exchange(&client, &config, &options, program_id),
        "get-escrow" => handle_get_escrow(&client, &options, program_id),
        "get-state" => handle_get_state(&client, program_id),
        _ => {
            print_usage();
            bail!("Unknown command '{command}'")
        }
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_initialize(client: &RpcClient, config: &CliConfig, program_id: Pubkey) -> Result<()> {
    let payer = read_payer(config)?;
    let (state_pda, _) = find_state_address(&program_id);

    let ix = build_initialize_ix(program_id, payer.pubkey())?;
    let signature = send_tx(client, &[ix], &payer, &[])?;

    println!("Your transaction signature {signature}");
    println!("State PDA: {state_pda}");
    Ok(())
}

fn handle_start_escrow(
    client: &RpcClient,
    config: &CliConfig,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let payer = read_payer(config)?;
    let initializer = read_optional_keypair(options, "initializer")?;
    let initializer = initializer.as_ref().unwrap_or(&payer);

    let token1_mint = parse_pubkey(required_option(options, "token1-mint")?)?;
    let token2_mint = parse_pubkey(required_option(options, "token2-mint")?)?;
    let initializer_token1 = parse_pubkey(required_option(options, "initializer-token1")?)?;
    let initializer_token2 = parse_pubkey(required_option(options, "initializer-token2")?)?;
    let token1_amount = parse_u64(required_option(options, "token1-amount")?)?;
    let token2_amount = parse_u64(required_option(options, "token2-amount")?)?;

    let escrow = Keypair::new();
    let ix = build_start_escrow_ix(
        program_id,
        initializer.pubkey(),
        escrow.pubkey(),
        token1_mint,
        token2_mint,
        initializer_token1,
        initializer_token2,
        token1_amount,
        token2_amount,
    )?;

    let signature = send_tx(client, &[ix], &payer, &[initializer, &escrow])?;
    let (vault_pda, _) = find_vault_address(&initializer.pubkey(), &token1_mint, &program_id);

    println!("Your transaction signature {signature}");
    println!("Escrow: {}", escrow.pubkey());
    println!("Vault PDA: {vault_pda}");
    Ok(())
}

fn handle_cancel_escrow(
    client: &RpcClient,
    config: &CliConfig,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let payer = read_payer(config)?;
    let initializer = read_optional_keypair(options, "initializer")?;
    let initializer = initializer.as_ref().unwrap_or(&payer);
    let escrow_pubkey = parse_pubkey(required_option(options, "escrow")?)?;

    let escrow = fetch_escrow(client, &escrow_pubkey)?;
    if escrow.initializer != initializer.pubkey() {
        bail!(
            "Escrow {escrow_pubkey} belongs to {}, not {}",
            escrow.initializer,
            initializer.pubkey()
        );
    }

    let ix = build_cancel_escrow_ix(program_id, escrow_pubkey, &escrow)?;
    let signature = send_tx(client, &[ix], &payer, &[initializer])?;
    println!("Your transaction signature {signature}");
    Ok(())
}

fn handle_exchange(
    client: &RpcClient,
    config: &CliConfig,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let payer = read_payer(config)?;
    let taker = read_optional_keypair(options, "taker")?;
    let taker = taker.as_ref().unwrap_or(&payer);
    let escrow_pubkey = parse_pubkey(required_option(options, "escrow")?)?;
    let taker_token1 = parse_pubkey(required_option(options, "taker-token1")?)?;
    let taker_token2 = parse_pubkey(required_option(options, "taker-token2")?)?;

    let escrow = fetch_escrow(client, &escrow_pubkey)?;
    let ix = build_exchange_ix(
        program_id,
        taker.pubkey(),
        escrow_pubkey,
        &escrow,
        taker_token1,
        taker_token2,
    )?;

    let signature = send_tx(client, &[ix], &payer, &[taker])?;
    println!("Your transaction signature {signature}");
    Ok(())
}

fn handle_get_escrow(
    client: &RpcClient,
    options: &HashMap<String, String>,
    program_id: Pubkey,
) -> Result<()> {
    let escrow_pubkey = parse_pubkey(required_option(options, "escrow")?)?;
    let escrow = fetch_escrow(client, &escrow_pubkey)?;
    let (vault_pda, _) = find_vault_address(&escrow.initializer, &escrow.token1_mint, &program_id);

    println!("Escrow: {escrow_pubkey}");
    println!("Initializer: {}", escrow.initializer);
    println!("Token 1 mint: {}", escrow.token1_mint);
    println!("Token 2 mint: {}", escrow.token2_mint);
    println!("Initializer token 1: {}", escrow.initializer_token1);
    println!("Initializer token 2: {}", escrow.initializer_token2);
    println!("Token 1 amount: {}", escrow.token1_amount);
    println!("Token 2 amount: {}", escrow.token2_amount);
    println!("Vault PDA: {vault_pda}");
    Ok(())
}

fn handle_get_state(client: &RpcClient, program_id: Pubkey) -> Result<()> {
    let (state_pda, _) = find_state_address(&program_id);
    let account = client
        .get_account(&state_pda)
        .with_context(|| format!("Program state {state_pda} not found; run initialize first"))?;
    let state = EscrowState::try_from_slice(&account.data)?;
    if state.discriminator != EscrowState::DISCRIMINATOR {
        bail!("Account {state_pda} is not escrow program state");
    }

    println!("State PDA: {state_pda}");
    println!("Authority: {}", state.authority);
    println!("Escrows opened: {}", state.escrows_opened);
    println!("Escrows closed: {}", state.escrows_closed);
    println!("Open escrows: {}", state.open_escrows());
    Ok(())
}

fn handle_get_token_balance(client: &RpcClient, options: &HashMap<String, String>) -> Result<()> {
    let token_account = parse_pubkey(required_option(options, "token-account")?)?;
    let account = client.get_account(&token_account)?;
    let token_state = TokenAccount::unpack(&account.data)?;
    println!("Token account: {token_account}");
    println!("Balance: {}", token_state.amount);
    Ok(())
}

// ============================================================================
// TRANSACTION HELPERS
// ============================================================================

fn send_tx(
    client: &RpcClient,
    instructions: &[Instruction],
    payer: &Keypair,
    signers: &[&Keypair],
) -> Result<Signature> {
    let blockhash = client.get_latest_blockhash()?;
    let mut all_signers = Vec::with_capacity(signers.len() + 1);
    all_signers.push(payer);
    for signer in signers {
        if signer.pubkey() != payer.pubkey() {
            all_signers.push(*signer);
        }
    }

    let tx = Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &all_signers,
        blockhash,
    );
    debug!(signers = all_signers.len(), "Sending transaction");
    let signature = client.send_and_confirm_transaction(&tx)?;
    info!(%signature, "Transaction confirmed");
    Ok(signature)
}

fn fetch_escrow(client: &RpcClient, escrow_pubkey: &Pubkey) -> Result<Escrow> {
    let account = client
        .get_account(escrow_pubkey)
        .with_context(|| format!("Escrow account {escrow_pubkey} not found"))?;
    let escrow = Escrow::try_from_slice(&account.data)?;
    if escrow.discriminator != Escrow::DISCRIMINATOR {
        bail!("Account {escrow_pubkey} is not an escrow");
    }
    Ok(escrow)
}

// ============================================================================
// LOCAL HELPERS
// ============================================================================

fn read_keypair(path: &str) -> Result<Keypair> {
    read_keypair_file(path).map_err(|e| anyhow!("Failed to read keypair {path}: {e}"))
}

fn read_payer(config: &CliConfig) -> Result<Keypair> {
    let path = config
        .payer_keypair
        .as_deref()
        .ok_or_else(|| anyhow!("Payer keypair is required (--payer or payer_keypair in config)"))?;
    read_keypair(path)
}

fn read_optional_keypair(options: &HashMap<String, String>, key: &str) -> Result<Option<Keypair>> {
    options.get(key).map(|path| read_keypair(path)).transpose()
}

// ============================================================================
// USAGE
// ============================================================================

fn print_usage() {
    eprintln!(
        r#"Token Escrow CLI

Usage:
  token_escrow_cli <command> [--option value]...

Global options:
  --config <path>      Config file (default: $TOKEN_ESCROW_CONFIG_PATH or config/token_escrow.toml)
  --rpc <url>          RPC endpoint (default: http://localhost:8899)
  --program-id <pubkey>
  --payer <keypair>    Fee payer; also the initializer/taker when those are omitted

Commands:
  initialize
  start-escrow       [--initializer <keypair>] --token1-mint <pubkey> --token2-mint <pubkey>
                     --initializer-token1 <pubkey> --initializer-token2 <pubkey>
                     --token1-amount <u64> --token2-amount <u64>
  cancel-escrow      [--initializer <keypair>] --escrow <pubkey>
  exchange           [--taker <keypair>] --escrow <pubkey> --taker-token1 <pubkey> --taker-token2 <pubkey>
  get-escrow         --escrow <pubkey>
  get-state
  get-token-balance  --token-account <pubkey>

Logging is controlled with RUST_LOG (e.g. RUST_LOG=info).
        "#
    );
}
