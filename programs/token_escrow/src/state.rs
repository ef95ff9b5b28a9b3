//! Account state definitions

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

/// Global program state created once by `Initialize`
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct EscrowState {
    /// Discriminator for account type
    pub discriminator: [u8; 8],
    /// Account that paid for initialization
    pub authority: Pubkey,
    /// Bump of the vault owner PDA
    pub vault_owner_bump: u8,
    /// Number of escrows ever started
    pub escrows_opened: u64,
    /// Number of escrows cancelled or exchanged
    pub escrows_closed: u64,
}

impl EscrowState {
    pub const DISCRIMINATOR: [u8; 8] = [0x45, 0x53, 0x43, 0x52, 0x53, 0x54, 0x41, 0x54]; // "ESCRSTAT"
    pub const LEN: usize = 8 + 32 + 1 + 8 + 8; // 57 bytes

    pub fn new(authority: Pubkey, vault_owner_bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            authority,
            vault_owner_bump,
            escrows_opened: 0,
            escrows_closed: 0,
        }
    }

    /// Number of escrows currently holding tokens
    pub fn open_escrows(&self) -> u64 {
        self.escrows_opened.saturating_sub(self.escrows_closed)
    }
}

/// A single open swap offer
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Escrow {
    /// Discriminator for account type
    pub discriminator: [u8; 8],
    /// Party that locked token 1
    pub initializer: Pubkey,
    /// Mint of the locked token
    pub token1_mint: Pubkey,
    /// Mint of the requested token
    pub token2_mint: Pubkey,
    /// Initializer account that token 1 came from (refund target)
    pub initializer_token1: Pubkey,
    /// Initializer account that receives token 2
    pub initializer_token2: Pubkey,
    /// Amount locked in the vault
    pub token1_amount: u64,
    /// Amount the taker must pay
    pub token2_amount: u64,
    /// Vault PDA bump seed
    pub vault_bump: u8,
}

impl Escrow {
    pub const DISCRIMINATOR: [u8; 8] = [0x45, 0x53, 0x43, 0x52, 0x49, 0x4e, 0x46, 0x4f]; // "ESCRINFO"
    pub const LEN: usize = 8 + 32 * 5 + 8 + 8 + 1; // 185 bytes

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        initializer: Pubkey,
        token1_mint: Pubkey,
        token2_mint: Pubkey,
        initializer_token1: Pubkey,
        initializer_token2: Pubkey,
        token1_amount: u64,
        token2_amount: u64,
        vault_bump: u8,
    ) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            initializer,
            token1_mint,
            token2_mint,
            initializer_token1,
            initializer_token2,
            token1_amount,
            token2_amount,
            vault_bump,
        }
    }
}

/// Seeds for PDA derivation
pub mod seeds {
    pub const STATE_SEED: &[u8] = b"state";
    pub const VAULT_OWNER_SEED: &[u8] = b"vault_owner";
    pub const VAULT_SEED: &[u8] = b"token1_vault";
}

/// Derive the vault holding `token1_mint` for `initializer`
pub fn find_vault_address(
    initializer: &Pubkey,
    token1_mint: &Pubkey,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[seeds::VAULT_SEED, initializer.as_ref(), token1_mint.as_ref()],
        program_id,
    )
}

/// Derive the PDA that signs for every vault
pub fn find_vault_owner_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[seeds::VAULT_OWNER_SEED], program_id)
}

/// Derive the global state PDA
pub fn find_state_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[seeds::STATE_SEED], program_id)
}
