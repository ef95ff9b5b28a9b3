//! Instruction definitions

use borsh::{BorshDeserialize, BorshSerialize};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum EscrowInstruction {
    /// Create the global program state
    ///
    /// Accounts expected:
    /// 0. `[writable]` State account (PDA)
    /// 1. `[writable, signer]` Payer
    /// 2. `[]` System program
    Initialize,

    /// Open an escrow and lock token 1 in the vault
    ///
    /// Accounts expected:
    /// 0. `[writable, signer]` Initializer
    /// 1. `[writable, signer]` Escrow account (fresh keypair)
    /// 2. `[]` Token 1 mint
    /// 3. `[]` Token 2 mint
    /// 4. `[writable]` Initializer token 1 account
    /// 5. `[]` Initializer token 2 account
    /// 6. `[writable]` Token 1 vault (PDA)
    /// 7. `[]` Vault owner (PDA)
    /// 8. `[writable]` State account (PDA)
    /// 9. `[]` Token program
    /// 10. `[]` System program
    StartEscrow {
        token1_amount: u64,
        token2_amount: u64,
    },

    /// Return locked token 1 to the initializer and close the escrow
    ///
    /// Accounts expected:
    /// 0. `[writable, signer]` Initializer
    /// 1. `[writable]` Escrow account
    /// 2. `[writable]` Initializer token 1 account
    /// 3. `[writable]` Token 1 vault (PDA)
    /// 4. `[]` Vault owner (PDA)
    /// 5. `[writable]` State account (PDA)
    /// 6. `[]` Token program
    CancelEscrow { bump: u8 },

    /// Swap taker token 2 for the locked token 1 and close the escrow
    ///
    /// Accounts expected:
    /// 0. `[signer]` Taker
    /// 1. `[writable]` Initializer (receives rent)
    /// 2. `[writable]` Escrow account
    /// 3. `[writable]` Initializer token 2 account
    /// 4. `[writable]` Taker token 1 account
    /// 5. `[writable]` Taker token 2 account
    /// 6. `[writable]` Token 1 vault (PDA)
    /// 7. `[]` Vault owner (PDA)
    /// 8. `[writable]` State account (PDA)
    /// 9. `[]` Token program
    Exchange { bump: u8 },
}
