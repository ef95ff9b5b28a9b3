//! Instruction processing

#![allow(deprecated)] // system_instruction deprecation - will migrate when solana_system_interface is stable

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
    sysvar::Sysvar,
};
use spl_token::state::{Account as TokenAccount, Mint};

use crate::{
    error::EscrowError,
    instruction::EscrowInstruction,
    state::{find_state_address, find_vault_address, find_vault_owner_address, seeds, Escrow, EscrowState},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = EscrowInstruction::try_from_slice(instruction_data)
            .map_err(|_| EscrowError::InvalidInstructionData)?;

        match instruction {
            EscrowInstruction::Initialize => {
                msg!("Instruction: Initialize");
                Self::process_initialize(program_id, accounts)
            }
            EscrowInstruction::StartEscrow {
                token1_amount,
                token2_amount,
            } => {
                msg!("Instruction: StartEscrow");
                Self::process_start_escrow(program_id, accounts, token1_amount, token2_amount)
            }
            EscrowInstruction::CancelEscrow { bump } => {
                msg!("Instruction: CancelEscrow");
                Self::process_cancel_escrow(program_id, accounts, bump)
            }
            EscrowInstruction::Exchange { bump } => {
                msg!("Instruction: Exchange");
                Self::process_exchange(program_id, accounts, bump)
            }
        }
    }

    fn process_initialize(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let state_account = next_account_info(account_info_iter)?;
        let payer = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        if !payer.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (state_pda, state_bump) = find_state_address(program_id);
        if state_pda != *state_account.key {
            return Err(EscrowError::InvalidPda.into());
        }
        if is_allocated(state_account) {
            return Err(EscrowError::AlreadyInitialized.into());
        }

        let (_vault_owner, vault_owner_bump) = find_vault_owner_address(program_id);

        create_pda_account(
            payer,
            state_account,
            system_program,
            EscrowState::LEN,
            program_id,
            &[seeds::STATE_SEED, &[state_bump]],
        )?;

        let state = EscrowState::new(*payer.key, vault_owner_bump);
        state.serialize(&mut &mut state_account.data.borrow_mut()[..])?;

        msg!("Escrow program initialized by {}", payer.key);
        Ok(())
    }

    fn process_start_escrow(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        token1_amount: u64,
        token2_amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let initializer = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let token1_mint = next_account_info(account_info_iter)?;
        let token2_mint = next_account_info(account_info_iter)?;
        let initializer_token1 = next_account_info(account_info_iter)?;
        let initializer_token2 = next_account_info(account_info_iter)?;
        let token1_vault = next_account_info(account_info_iter)?;
        let vault_owner = next_account_info(account_info_iter)?;
        let state_account = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        // Validate inputs
        if token1_amount == 0 || token2_amount == 0 {
            return Err(EscrowError::InvalidAmount.into());
        }
        if !initializer.is_signer || !escrow_account.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        check_token_program(token_program)?;

        let mut state = load_state(program_id, state_account)?;
        verify_vault_owner(program_id, vault_owner, state.vault_owner_bump)?;

        let (vault_pda, vault_bump) =
            find_vault_address(initializer.key, token1_mint.key, program_id);
        if vault_pda != *token1_vault.key {
            return Err(EscrowError::InvalidPda.into());
        }
        if is_allocated(token1_vault) {
            return Err(EscrowError::VaultInUse.into());
        }

        // Both mints must be real SPL mints
        load_mint(token1_mint)?;
        load_mint(token2_mint)?;

        let token1_account = load_token_account(initializer_token1)?;
        if token1_account.mint != *token1_mint.key {
            return Err(EscrowError::MintMismatch.into());
        }
        if token1_account.owner != *initializer.key {
            return Err(EscrowError::TokenAccountMismatch.into());
        }
        let token2_account = load_token_account(initializer_token2)?;
        if token2_account.mint != *token2_mint.key {
            return Err(EscrowError::MintMismatch.into());
        }
        if token2_account.owner != *initializer.key {
            return Err(EscrowError::TokenAccountMismatch.into());
        }

        // Create escrow account
        let rent = Rent::get()?;
        let escrow_space = Escrow::LEN;
        let escrow_lamports = rent.minimum_balance(escrow_space);

        invoke(
            &system_instruction::create_account(
                initializer.key,
                escrow_account.key,
                escrow_lamports,
                escrow_space as u64,
                program_id,
            ),
            &[initializer.clone(), escrow_account.clone(), system_program.clone()],
        )?;

        // Create vault token account
        let vault_seeds: &[&[u8]] = &[
            seeds::VAULT_SEED,
            initializer.key.as_ref(),
            token1_mint.key.as_ref(),
            &[vault_bump],
        ];
        create_pda_account(
            initializer,
            token1_vault,
            system_program,
            TokenAccount::LEN,
            &spl_token::id(),
            vault_seeds,
        )?;

        // Vault owner PDA is the token authority
        invoke(
            &spl_token::instruction::initialize_account3(
                &spl_token::id(),
                token1_vault.key,
                token1_mint.key,
                vault_owner.key,
            )?,
            &[token1_vault.clone(), token1_mint.clone(), token_program.clone()],
        )?;

        // Lock token 1
        invoke(
            &spl_token::instruction::transfer(
                &spl_token::id(),
                initializer_token1.key,
                token1_vault.key,
                initializer.key,
                &[],
                token1_amount,
            )?,
            &[
                initializer_token1.clone(),
                token1_vault.clone(),
                initializer.clone(),
                token_program.clone(),
            ],
        )?;

        let escrow = Escrow::new(
            *initializer.key,
            *token1_mint.key,
            *token2_mint.key,
            *initializer_token1.key,
            *initializer_token2.key,
            token1_amount,
            token2_amount,
            vault_bump,
        );
        escrow.serialize(&mut &mut escrow_account.data.borrow_mut()[..])?;

        state.escrows_opened = state
            .escrows_opened
            .checked_add(1)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        state.serialize(&mut &mut state_account.data.borrow_mut()[..])?;

        msg!(
            "Escrow started: escrow={}, token1_amount={}, token2_amount={}",
            escrow_account.key,
            token1_amount,
            token2_amount
        );
        Ok(())
    }

    fn process_cancel_escrow(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        bump: u8,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let initializer = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let initializer_token1 = next_account_info(account_info_iter)?;
        let token1_vault = next_account_info(account_info_iter)?;
        let vault_owner = next_account_info(account_info_iter)?;
        let state_account = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        check_token_program(token_program)?;
        let escrow = load_escrow(program_id, escrow_account)?;
        let mut state = load_state(program_id, state_account)?;

        if escrow.initializer != *initializer.key {
            return Err(EscrowError::UnauthorizedInitializer.into());
        }
        if !initializer.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        if escrow.initializer_token1 != *initializer_token1.key {
            return Err(EscrowError::TokenAccountMismatch.into());
        }
        verify_vault_owner(program_id, vault_owner, bump)?;
        verify_vault(program_id, &escrow, token1_vault)?;

        // Whole vault balance, including tokens sent after the escrow started
        let refund = load_token_account(token1_vault)?.amount;
        let vault_owner_seeds: &[&[u8]] = &[seeds::VAULT_OWNER_SEED, &[bump]];

        // Refund token 1
        invoke_signed(
            &spl_token::instruction::transfer(
                &spl_token::id(),
                token1_vault.key,
                initializer_token1.key,
                vault_owner.key,
                &[],
                refund,
            )?,
            &[
                token1_vault.clone(),
                initializer_token1.clone(),
                vault_owner.clone(),
                token_program.clone(),
            ],
            &[vault_owner_seeds],
        )?;

        close_vault(token1_vault, initializer, vault_owner, token_program, vault_owner_seeds)?;
        close_program_account(escrow_account, initializer)?;

        state.escrows_closed = state
            .escrows_closed
            .checked_add(1)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        state.serialize(&mut &mut state_account.data.borrow_mut()[..])?;

        msg!(
            "Escrow cancelled: escrow={}, refunded={}",
            escrow_account.key,
            refund
        );
        Ok(())
    }

    fn process_exchange(program_id: &Pubkey, accounts: &[AccountInfo], bump: u8) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let taker = next_account_info(account_info_iter)?;
        let initializer = next_account_info(account_info_iter)?;
        let escrow_account = next_account_info(account_info_iter)?;
        let initializer_token2 = next_account_info(account_info_iter)?;
        let taker_token1 = next_account_info(account_info_iter)?;
        let taker_token2 = next_account_info(account_info_iter)?;
        let token1_vault = next_account_info(account_info_iter)?;
        let vault_owner = next_account_info(account_info_iter)?;
        let state_account = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        if !taker.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }
        check_token_program(token_program)?;
        let escrow = load_escrow(program_id, escrow_account)?;
        let mut state = load_state(program_id, state_account)?;

        if escrow.initializer != *initializer.key {
            return Err(EscrowError::UnauthorizedInitializer.into());
        }
        if escrow.initializer_token2 != *initializer_token2.key {
            return Err(EscrowError::TokenAccountMismatch.into());
        }
        verify_vault_owner(program_id, vault_owner, bump)?;
        verify_vault(program_id, &escrow, token1_vault)?;

        let taker_token1_account = load_token_account(taker_token1)?;
        if taker_token1_account.mint != escrow.token1_mint {
            return Err(EscrowError::MintMismatch.into());
        }
        let taker_token2_account = load_token_account(taker_token2)?;
        if taker_token2_account.mint != escrow.token2_mint {
            return Err(EscrowError::MintMismatch.into());
        }
        if taker_token2_account.amount < escrow.token2_amount {
            return Err(EscrowError::InsufficientTakerFunds.into());
        }

        // Taker pays token 2
        invoke(
            &spl_token::instruction::transfer(
                &spl_token::id(),
                taker_token2.key,
                initializer_token2.key,
                taker.key,
                &[],
                escrow.token2_amount,
            )?,
            &[
                taker_token2.clone(),
                initializer_token2.clone(),
                taker.clone(),
                token_program.clone(),
            ],
        )?;

        // Whole vault balance, at least token1_amount; close_account needs it empty
        let released = load_token_account(token1_vault)?.amount;
        let vault_owner_seeds: &[&[u8]] = &[seeds::VAULT_OWNER_SEED, &[bump]];

        // Vault releases token 1
        invoke_signed(
            &spl_token::instruction::transfer(
                &spl_token::id(),
                token1_vault.key,
                taker_token1.key,
                vault_owner.key,
                &[],
                released,
            )?,
            &[
                token1_vault.clone(),
                taker_token1.clone(),
                vault_owner.clone(),
                token_program.clone(),
            ],
            &[vault_owner_seeds],
        )?;

        close_vault(token1_vault, initializer, vault_owner, token_program, vault_owner_seeds)?;
        close_program_account(escrow_account, initializer)?;

        state.escrows_closed = state
            .escrows_closed
            .checked_add(1)
            .ok_or(EscrowError::ArithmeticOverflow)?;
        state.serialize(&mut &mut state_account.data.borrow_mut()[..])?;

        msg!(
            "Escrow exchanged: escrow={}, taker={}, token1_amount={}, token2_amount={}",
            escrow_account.key,
            taker.key,
            released,
            escrow.token2_amount
        );
        Ok(())
    }
}

// ============================================================================
// ACCOUNT HELPERS
// ============================================================================

fn check_token_program(token_program: &AccountInfo) -> ProgramResult {
    if *token_program.key != spl_token::id() {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

fn load_state(program_id: &Pubkey, state_account: &AccountInfo) -> Result<EscrowState, ProgramError> {
    let (state_pda, _) = find_state_address(program_id);
    if state_pda != *state_account.key {
        return Err(EscrowError::InvalidPda.into());
    }
    if state_account.data_len() == 0 {
        return Err(EscrowError::NotInitialized.into());
    }
    if state_account.owner != program_id {
        return Err(EscrowError::InvalidAccountOwner.into());
    }
    let state = EscrowState::try_from_slice(&state_account.data.borrow())
        .map_err(|_| EscrowError::InvalidAccountData)?;
    if state.discriminator != EscrowState::DISCRIMINATOR {
        return Err(EscrowError::InvalidAccountData.into());
    }
    Ok(state)
}

fn load_escrow(program_id: &Pubkey, escrow_account: &AccountInfo) -> Result<Escrow, ProgramError> {
    if escrow_account.owner != program_id {
        return Err(EscrowError::InvalidAccountOwner.into());
    }
    let escrow = Escrow::try_from_slice(&escrow_account.data.borrow())
        .map_err(|_| EscrowError::InvalidAccountData)?;
    if escrow.discriminator != Escrow::DISCRIMINATOR {
        return Err(EscrowError::InvalidAccountData.into());
    }
    Ok(escrow)
}

fn load_token_account(account: &AccountInfo) -> Result<TokenAccount, ProgramError> {
    if *account.owner != spl_token::id() {
        return Err(EscrowError::InvalidAccountOwner.into());
    }
    TokenAccount::unpack(&account.data.borrow())
}

fn load_mint(account: &AccountInfo) -> Result<Mint, ProgramError> {
    if *account.owner != spl_token::id() {
        return Err(EscrowError::InvalidAccountOwner.into());
    }
    Mint::unpack(&account.data.borrow())
}

fn verify_vault_owner(program_id: &Pubkey, vault_owner: &AccountInfo, bump: u8) -> ProgramResult {
    let expected = Pubkey::create_program_address(&[seeds::VAULT_OWNER_SEED, &[bump]], program_id)
        .map_err(|_| EscrowError::InvalidPda)?;
    if expected != *vault_owner.key {
        return Err(EscrowError::InvalidPda.into());
    }
    Ok(())
}

fn verify_vault(program_id: &Pubkey, escrow: &Escrow, token1_vault: &AccountInfo) -> ProgramResult {
    let expected = Pubkey::create_program_address(
        &[
            seeds::VAULT_SEED,
            escrow.initializer.as_ref(),
            escrow.token1_mint.as_ref(),
            &[escrow.vault_bump],
        ],
        program_id,
    )
    .map_err(|_| EscrowError::InvalidPda)?;
    if expected != *token1_vault.key {
        return Err(EscrowError::InvalidPda.into());
    }
    Ok(())
}

/// True once an account has been allocated or handed to a program. A system
/// account that only holds lamports still counts as free.
fn is_allocated(account: &AccountInfo) -> bool {
    account.data_len() > 0 || *account.owner != system_program::id()
}

/// Creates a PDA owned by `owner`. Lamports already sitting at the address are
/// kept and topped up to rent exemption, since `create_account` would refuse them.
fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    new_account: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    space: usize,
    owner: &Pubkey,
    signer_seeds: &[&[u8]],
) -> ProgramResult {
    let required = Rent::get()?.minimum_balance(space);
    let current = new_account.lamports();

    if current == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer.key,
                new_account.key,
                required,
                space as u64,
                owner,
            ),
            &[payer.clone(), new_account.clone(), system_program.clone()],
            &[signer_seeds],
        );
    }

    let top_up = required.saturating_sub(current);
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer.key, new_account.key, top_up),
            &[payer.clone(), new_account.clone(), system_program.clone()],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(new_account.key, space as u64),
        &[new_account.clone(), system_program.clone()],
        &[signer_seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(new_account.key, owner),
        &[new_account.clone(), system_program.clone()],
        &[signer_seeds],
    )
}

fn close_vault<'a>(
    token1_vault: &AccountInfo<'a>,
    destination: &AccountInfo<'a>,
    vault_owner: &AccountInfo<'a>,
    token_program: &AccountInfo<'a>,
    vault_owner_seeds: &[&[u8]],
) -> ProgramResult {
    invoke_signed(
        &spl_token::instruction::close_account(
            &spl_token::id(),
            token1_vault.key,
            destination.key,
            vault_owner.key,
            &[],
        )?,
        &[
            token1_vault.clone(),
            destination.clone(),
            vault_owner.clone(),
            token_program.clone(),
        ],
        &[vault_owner_seeds],
    )
}

/// Moves all lamports out of a program-owned account and wipes its data.
fn close_program_account(account: &AccountInfo, destination: &AccountInfo) -> ProgramResult {
    let balance = account.lamports();
    let new_destination_balance = destination
        .lamports()
        .checked_add(balance)
        .ok_or(EscrowError::ArithmeticOverflow)?;

    **destination.try_borrow_mut_lamports()? = new_destination_balance;
    **account.try_borrow_mut_lamports()? = 0;
    account.try_borrow_mut_data()?.fill(0);
    Ok(())
}
