#![allow(dead_code)]
#![allow(deprecated)]

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::program_pack::Pack;
use solana_program_test::{processor, BanksClientError, ProgramTest, ProgramTestContext};
use solana_sdk::system_instruction;
use solana_sdk::{
    instruction::{AccountMeta, Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::{Transaction, TransactionError},
};

use token_escrow::{
    error::EscrowError,
    instruction::EscrowInstruction,
    state::{find_state_address, find_vault_address, find_vault_owner_address, Escrow, EscrowState},
};

// ============================================================================
// TEST PROGRAM ID
// ============================================================================

/// Fixed program ID for testing. Actual deployed program ID is determined by
/// the deployment keypair, not this value.
pub fn test_program_id() -> Pubkey {
    solana_sdk::pubkey!("Escrow11111111111111111111111111111111111111")
}

// ============================================================================
// TEST HARNESS HELPERS
// ============================================================================

/// Helper: Build a ProgramTest instance with token_escrow + spl_token
pub fn program_test() -> ProgramTest {
    let program_id = test_program_id();
    let mut program_test = ProgramTest::new(
        "token_escrow",
        program_id,
        processor!(token_escrow::processor::Processor::process),
    );
    program_test.add_program(
        "spl_token",
        spl_token::id(),
        processor!(spl_token::processor::Processor::process),
    );
    program_test
}

/// Helper: Send a transaction with a specific payer and signers, returning the result
pub async fn try_send_tx(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    instructions: &[Instruction],
    signers: &[&Keypair],
) -> Result<(), BanksClientError> {
    let blockhash = context.banks_client.get_latest_blockhash().await.unwrap();
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
    context.banks_client.process_transaction(tx).await
}

/// Helper: Send a transaction that is expected to succeed
pub async fn send_tx(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    instructions: &[Instruction],
    signers: &[&Keypair],
) {
    try_send_tx(context, payer, instructions, signers)
        .await
        .unwrap();
}

/// Helper: Assert that a single-instruction transaction failed with the given escrow error
pub fn assert_escrow_error(result: Result<(), BanksClientError>, expected: EscrowError) {
    let err = result.expect_err("transaction should have failed").unwrap();
    assert_eq!(
        err,
        TransactionError::InstructionError(0, InstructionError::Custom(expected as u32))
    );
}

/// Helper: Assert that a transaction against a closed escrow account failed.
/// A purged account is system-owned; a zeroed one still fails the discriminator check.
pub fn assert_closed_escrow_error(result: Result<(), BanksClientError>) {
    let err = result.expect_err("transaction should have failed").unwrap();
    let owner = TransactionError::InstructionError(
        0,
        InstructionError::Custom(EscrowError::InvalidAccountOwner as u32),
    );
    let data = TransactionError::InstructionError(
        0,
        InstructionError::Custom(EscrowError::InvalidAccountData as u32),
    );
    assert!(err == owner || err == data, "unexpected error: {err:?}");
}

/// Helper: Assert that a single-instruction transaction failed with the given program error
pub fn assert_instruction_error(result: Result<(), BanksClientError>, expected: InstructionError) {
    let err = result.expect_err("transaction should have failed").unwrap();
    assert_eq!(err, TransactionError::InstructionError(0, expected));
}

// ============================================================================
// SPL TOKEN HELPERS
// ============================================================================

/// Helper: Create a new SPL token mint
pub async fn create_mint(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint_authority: &Keypair,
    decimals: u8,
) -> Pubkey {
    let mint = Keypair::new();
    let rent = context.banks_client.get_rent().await.unwrap();
    let mint_rent = rent.minimum_balance(spl_token::state::Mint::LEN);

    let create_mint_ix = system_instruction::create_account(
        &payer.pubkey(),
        &mint.pubkey(),
        mint_rent,
        spl_token::state::Mint::LEN as u64,
        &spl_token::id(),
    );
    let init_mint_ix = spl_token::instruction::initialize_mint2(
        &spl_token::id(),
        &mint.pubkey(),
        &mint_authority.pubkey(),
        None,
        decimals,
    )
    .unwrap();

    send_tx(context, payer, &[create_mint_ix, init_mint_ix], &[&mint]).await;
    mint.pubkey()
}

/// Helper: Create an SPL token account for a given mint and owner
pub async fn create_token_account(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint: Pubkey,
    owner: Pubkey,
) -> Pubkey {
    let token_account = Keypair::new();
    let rent = context.banks_client.get_rent().await.unwrap();
    let token_rent = rent.minimum_balance(spl_token::state::Account::LEN);

    let create_ix = system_instruction::create_account(
        &payer.pubkey(),
        &token_account.pubkey(),
        token_rent,
        spl_token::state::Account::LEN as u64,
        &spl_token::id(),
    );
    let init_ix = spl_token::instruction::initialize_account3(
        &spl_token::id(),
        &token_account.pubkey(),
        &mint,
        &owner,
    )
    .unwrap();

    send_tx(context, payer, &[create_ix, init_ix], &[&token_account]).await;
    token_account.pubkey()
}

/// Helper: Mint tokens to a token account
pub async fn mint_to(
    context: &mut ProgramTestContext,
    payer: &Keypair,
    mint: Pubkey,
    mint_authority: &Keypair,
    destination: Pubkey,
    amount: u64,
) {
    let ix = spl_token::instruction::mint_to(
        &spl_token::id(),
        &mint,
        &destination,
        &mint_authority.pubkey(),
        &[],
        amount,
    )
    .unwrap();

    send_tx(context, payer, &[ix], &[mint_authority]).await;
}

/// Helper: Plain SPL transfer signed by the source owner
pub async fn transfer_tokens(
    context: &mut ProgramTestContext,
    owner: &Keypair,
    source: Pubkey,
    destination: Pubkey,
    amount: u64,
) {
    let ix = spl_token::instruction::transfer(
        &spl_token::id(),
        &source,
        &destination,
        &owner.pubkey(),
        &[],
        amount,
    )
    .unwrap();

    send_tx(context, owner, &[ix], &[]).await;
}

/// Helper: Send lamports to an address that has no account yet
pub async fn prefund(context: &mut ProgramTestContext, address: Pubkey, lamports: u64) {
    let payer = context.payer.insecure_clone();
    let ix = system_instruction::transfer(&payer.pubkey(), &address, lamports);
    send_tx(context, &payer, &[ix], &[]).await;
}

/// Helper: Read SPL token account balance
pub async fn get_token_balance(
    context: &mut ProgramTestContext,
    token_account: Pubkey,
) -> u64 {
    let account = context
        .banks_client
        .get_account(token_account)
        .await
        .unwrap()
        .unwrap();
    let token_state = spl_token::state::Account::unpack(&account.data).unwrap();
    token_state.amount
}

/// Helper: Whether an account is live (present with non-zero lamports) on the test bank
pub async fn account_exists(context: &mut ProgramTestContext, address: Pubkey) -> bool {
    context
        .banks_client
        .get_account(address)
        .await
        .unwrap()
        .map(|account| account.lamports > 0)
        .unwrap_or(false)
}

// ============================================================================
// INSTRUCTION BUILDERS
// ============================================================================

/// Helper: Build an Initialize instruction
pub fn initialize_ix(program_id: Pubkey, payer: Pubkey) -> Instruction {
    let (state_pda, _) = find_state_address(&program_id);

    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(state_pda, false),
            AccountMeta::new(payer, true),
            AccountMeta::new_readonly(solana_sdk::system_program::id(), false),
        ],
        data: EscrowInstruction::Initialize.try_to_vec().unwrap(),
    }
}

/// Helper: Build a StartEscrow instruction
#[allow(clippy::too_many_arguments)]
pub fn start_escrow_ix(
    program_id: Pubkey,
    initializer: Pubkey,
    escrow: Pubkey,
    token1_mint: Pubkey,
    token2_mint: Pubkey,
    initializer_token1: Pubkey,
    initializer_token2: Pubkey,
    token1_amount: u64,
    token2_amount: u64,
) -> Instruction {
    let (vault_pda, _) = find_vault_address(&initializer, &token1_mint, &program_id);
    let (vault_owner, _) = find_vault_owner_address(&program_id);
    let (state_pda, _) = find_state_address(&program_id);

    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(initializer, true),
            AccountMeta::new(escrow, true),
            AccountMeta::new_readonly(token1_mint, false),
            AccountMeta::new_readonly(token2_mint, false),
            AccountMeta::new(initializer_token1, false),
            AccountMeta::new_readonly(initializer_token2, false),
            AccountMeta::new(vault_pda, false),
            AccountMeta::new_readonly(vault_owner, false),
            AccountMeta::new(state_pda, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(solana_sdk::system_program::id(), false),
        ],
        data: EscrowInstruction::StartEscrow {
            token1_amount,
            token2_amount,
        }
        .try_to_vec()
        .unwrap(),
    }
}

/// Helper: Build a CancelEscrow instruction
pub fn cancel_escrow_ix(
    program_id: Pubkey,
    initializer: Pubkey,
    escrow: Pubkey,
    initializer_token1: Pubkey,
    vault: Pubkey,
    bump: u8,
) -> Instruction {
    let (vault_owner, _) = find_vault_owner_address(&program_id);
    let (state_pda, _) = find_state_address(&program_id);

    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(initializer, true),
            AccountMeta::new(escrow, false),
            AccountMeta::new(initializer_token1, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(vault_owner, false),
            AccountMeta::new(state_pda, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: EscrowInstruction::CancelEscrow { bump }.try_to_vec().unwrap(),
    }
}

/// Helper: Build an Exchange instruction
#[allow(clippy::too_many_arguments)]
pub fn exchange_ix(
    program_id: Pubkey,
    taker: Pubkey,
    initializer: Pubkey,
    escrow: Pubkey,
    initializer_token2: Pubkey,
    taker_token1: Pubkey,
    taker_token2: Pubkey,
    vault: Pubkey,
    bump: u8,
) -> Instruction {
    let (vault_owner, _) = find_vault_owner_address(&program_id);
    let (state_pda, _) = find_state_address(&program_id);

    Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new_readonly(taker, true),
            AccountMeta::new(initializer, false),
            AccountMeta::new(escrow, false),
            AccountMeta::new(initializer_token2, false),
            AccountMeta::new(taker_token1, false),
            AccountMeta::new(taker_token2, false),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(vault_owner, false),
            AccountMeta::new(state_pda, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: EscrowInstruction::Exchange { bump }.try_to_vec().unwrap(),
    }
}

// ============================================================================
// STATE READERS
// ============================================================================

/// Helper: Read escrow state from account data
pub fn read_escrow(account: &solana_sdk::account::Account) -> Escrow {
    Escrow::try_from_slice(&account.data).unwrap()
}

/// Helper: Read global state from account data
pub fn read_state(account: &solana_sdk::account::Account) -> EscrowState {
    EscrowState::try_from_slice(&account.data).unwrap()
}

/// Helper: Fetch and decode the global state
pub async fn fetch_state(context: &mut ProgramTestContext, state_pda: Pubkey) -> EscrowState {
    let account = context
        .banks_client
        .get_account(state_pda)
        .await
        .unwrap()
        .unwrap();
    read_state(&account)
}

// ============================================================================
// TEST ENVIRONMENT
// ============================================================================

pub const INITIAL_TOKEN1: u64 = 1_000_000;
pub const INITIAL_TOKEN2: u64 = 1_000_000;

/// Test environment with two mints, an initializer holding token 1 and a taker holding token 2
pub struct TestEnv {
    pub program_id: Pubkey,
    pub initializer: Keypair,
    pub taker: Keypair,
    pub mint_authority: Keypair,
    pub token1_mint: Pubkey,
    pub token2_mint: Pubkey,
    pub initializer_token1: Pubkey,
    pub initializer_token2: Pubkey,
    pub taker_token1: Pubkey,
    pub taker_token2: Pubkey,
    pub state_pda: Pubkey,
    pub vault_owner: Pubkey,
    pub vault_owner_bump: u8,
}

impl TestEnv {
    /// Vault PDA for the initializer's token 1
    pub fn vault(&self) -> Pubkey {
        find_vault_address(&self.initializer.pubkey(), &self.token1_mint, &self.program_id).0
    }
}

/// Helper: Create funded parties, mints and token accounts without initializing the program
pub async fn setup_accounts(context: &mut ProgramTestContext) -> TestEnv {
    let payer = context.payer.insecure_clone();
    let payer_pubkey = payer.pubkey();
    let program_id = test_program_id();
    let initializer = Keypair::new();
    let taker = Keypair::new();
    let mint_authority = Keypair::new();

    // Fund initializer and taker
    let fund_ix =
        system_instruction::transfer(&payer_pubkey, &initializer.pubkey(), 2_000_000_000);
    let fund_ix2 = system_instruction::transfer(&payer_pubkey, &taker.pubkey(), 2_000_000_000);
    send_tx(context, &payer, &[fund_ix, fund_ix2], &[]).await;

    // Create mints and token accounts
    let token1_mint = create_mint(context, &payer, &mint_authority, 6).await;
    let token2_mint = create_mint(context, &payer, &mint_authority, 9).await;
    let initializer_token1 =
        create_token_account(context, &payer, token1_mint, initializer.pubkey()).await;
    let initializer_token2 =
        create_token_account(context, &payer, token2_mint, initializer.pubkey()).await;
    let taker_token1 = create_token_account(context, &payer, token1_mint, taker.pubkey()).await;
    let taker_token2 = create_token_account(context, &payer, token2_mint, taker.pubkey()).await;

    mint_to(
        context,
        &payer,
        token1_mint,
        &mint_authority,
        initializer_token1,
        INITIAL_TOKEN1,
    )
    .await;
    mint_to(
        context,
        &payer,
        token2_mint,
        &mint_authority,
        taker_token2,
        INITIAL_TOKEN2,
    )
    .await;

    let (state_pda, _) = find_state_address(&program_id);
    let (vault_owner, vault_owner_bump) = find_vault_owner_address(&program_id);

    TestEnv {
        program_id,
        initializer,
        taker,
        mint_authority,
        token1_mint,
        token2_mint,
        initializer_token1,
        initializer_token2,
        taker_token1,
        taker_token2,
        state_pda,
        vault_owner,
        vault_owner_bump,
    }
}

/// Helper: Create a baseline environment with the program initialized
pub async fn setup_basic_env(context: &mut ProgramTestContext) -> TestEnv {
    let env = setup_accounts(context).await;
    let payer = context.payer.insecure_clone();
    send_tx(
        context,
        &payer,
        &[initialize_ix(env.program_id, payer.pubkey())],
        &[],
    )
    .await;
    env
}

/// Helper: Start an escrow from the environment's initializer, returning (escrow, vault)
pub async fn start_escrow(
    context: &mut ProgramTestContext,
    env: &TestEnv,
    token1_amount: u64,
    token2_amount: u64,
) -> (Pubkey, Pubkey) {
    let escrow = Keypair::new();
    let ix = start_escrow_ix(
        env.program_id,
        env.initializer.pubkey(),
        escrow.pubkey(),
        env.token1_mint,
        env.token2_mint,
        env.initializer_token1,
        env.initializer_token2,
        token1_amount,
        token2_amount,
    );
    send_tx(context, &env.initializer, &[ix], &[&escrow]).await;
    (escrow.pubkey(), env.vault())
}
