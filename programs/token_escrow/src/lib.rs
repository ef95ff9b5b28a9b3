//! Token Escrow Program (Native Solana)
//!
//! An initializer locks token 1 in a PDA-owned vault and names the amount of token 2
//! they want back. Any taker holding enough token 2 can complete the swap atomically,
//! or the initializer can cancel and reclaim the locked tokens.

pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

pub use solana_program;

// Re-export for tests
pub use error::EscrowError;
pub use instruction::EscrowInstruction;
pub use state::{Escrow, EscrowState};
