//! Instruction builders for the token escrow program.

use anyhow::Result;
use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use token_escrow::{
    instruction::EscrowInstruction,
    state::{find_state_address, find_vault_address, find_vault_owner_address, Escrow},
};

pub fn build_initialize_ix(program_id: Pubkey, payer: Pubkey) -> Result<Instruction> {
    let (state_pda, _state_bump) = find_state_address(&program_id);

    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(state_pda, false),
            AccountMeta::new(payer, true),
            AccountMeta::new_readonly(solana_sdk::system_program::id(), false),
        ],
        data: EscrowInstruction::Initialize.try_to_vec()?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn build_start_escrow_ix(
    program_id: Pubkey,
    initializer: Pubkey,
    escrow: Pubkey,
    token1_mint: Pubkey,
    token2_mint: Pubkey,
    initializer_token1: Pubkey,
    initializer_token2: Pubkey,
    token1_amount: u64,
    token2_amount: u64,
) -> Result<Instruction> {
    let (vault_pda, _vault_bump) = find_vault_address(&initializer, &token1_mint, &program_id);
    let (vault_owner, _) = find_vault_owner_address(&program_id);
    let (state_pda, _) = find_state_address(&program_id);

    Ok(Instruction {
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
        .try_to_vec()?,
    })
}

/// Cancel accounts come from the on-chain escrow record.
pub fn build_cancel_escrow_ix(
    program_id: Pubkey,
    escrow_pubkey: Pubkey,
    escrow: &Escrow,
) -> Result<Instruction> {
    let (vault_pda, _) = find_vault_address(&escrow.initializer, &escrow.token1_mint, &program_id);
    let (vault_owner, bump) = find_vault_owner_address(&program_id);
    let (state_pda, _) = find_state_address(&program_id);

    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new(escrow.initializer, true),
            AccountMeta::new(escrow_pubkey, false),
            AccountMeta::new(escrow.initializer_token1, false),
            AccountMeta::new(vault_pda, false),
            AccountMeta::new_readonly(vault_owner, false),
            AccountMeta::new(state_pda, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: EscrowInstruction::CancelEscrow { bump }.try_to_vec()?,
    })
}

pub fn build_exchange_ix(
    program_id: Pubkey,
    taker: Pubkey,
    escrow_pubkey: Pubkey,
    escrow: &Escrow,
    taker_token1: Pubkey,
    taker_token2: Pubkey,
) -> Result<Instruction> {
    let (vault_pda, _) = find_vault_address(&escrow.initializer, &escrow.token1_mint, &program_id);
    let (vault_owner, bump) = find_vault_owner_address(&program_id);
    let (state_pda, _) = find_state_address(&program_id);

    Ok(Instruction {
        program_id,
        accounts: vec![
            AccountMeta::new_readonly(taker, true),
            AccountMeta::new(escrow.initializer, false),
            AccountMeta::new(escrow_pubkey, false),
            AccountMeta::new(escrow.initializer_token2, false),
            AccountMeta::new(taker_token1, false),
            AccountMeta::new(taker_token2, false),
            AccountMeta::new(vault_pda, false),
            AccountMeta::new_readonly(vault_owner, false),
            AccountMeta::new(state_pda, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        data: EscrowInstruction::Exchange { bump }.try_to_vec()?,
    })
}
