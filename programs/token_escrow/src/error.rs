//! Error types

use solana_program::program_error::ProgramError;
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error("Invalid instruction data")]
    InvalidInstructionData,

    #[error("Program state not initialized")]
    NotInitialized,

    #[error("Program state already initialized")]
    AlreadyInitialized,

    #[error("Invalid amount")]
    InvalidAmount,

    #[error("Invalid PDA")]
    InvalidPda,

    #[error("Invalid account owner")]
    InvalidAccountOwner,

    #[error("Invalid account data")]
    InvalidAccountData,

    #[error("Token account mint does not match escrow mint")]
    MintMismatch,

    #[error("Token account does not match escrow record")]
    TokenAccountMismatch,

    #[error("Signer is not the escrow initializer")]
    UnauthorizedInitializer,

    #[error("Taker does not hold enough token 2")]
    InsufficientTakerFunds,

    #[error("Vault already in use for this initializer and mint")]
    VaultInUse,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,
}

impl From<EscrowError> for ProgramError {
    fn from(e: EscrowError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
