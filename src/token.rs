use anyhow::Context;
use solana_sdk::{
    instruction::Instruction, program_pack::Pack, pubkey::Pubkey, signature::Keypair,
    signature::Signature, signer::Signer, system_instruction::create_account,
};
use spl_associated_token_account::{
    get_associated_token_address_with_program_id, instruction::create_associated_token_account,
};
use spl_token_2022::{
    extension::StateWithExtensions,
    instruction::{burn_checked, initialize_mint2, mint_to, mint_to_checked, transfer_checked},
    state::{Account, Mint},
};
use tracing::{debug, info};

use crate::{
    error::{LauncherError, TokenAccountError},
    ledger::Ledger,
    utils::{send_transaction, Explorer},
};

/// Size of a mint account without extensions.
pub const MINT_SIZE: usize = Mint::LEN;

/// Token program owning a mint, plus its decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintInfo {
    pub token_program: Pubkey,
    pub decimals: u8,
}

/// `amount * 10^decimals`, or an error if it does not fit in a u64.
pub fn to_base_units(amount: u64, decimals: u8) -> Result<u64, LauncherError> {
    10_u64
        .checked_pow(decimals as u32)
        .and_then(|scale| amount.checked_mul(scale))
        .ok_or(LauncherError::AmountOverflow { amount, decimals })
}

/// Instructions that allocate `mint` and initialize it with `authority` as
/// both mint and freeze authority.
pub fn create_mint_instructions(
    payer: &Pubkey,
    mint: &Pubkey,
    lamports: u64,
    decimals: u8,
    authority: &Pubkey,
    token_program: &Pubkey,
) -> anyhow::Result<Vec<Instruction>> {
    let create_mint_account_ix =
        create_account(payer, mint, lamports, MINT_SIZE as u64, token_program);

    let initialize_mint_ix =
        initialize_mint2(token_program, mint, authority, Some(authority), decimals)?;

    Ok(vec![create_mint_account_ix, initialize_mint_ix])
}

pub fn mint_to_instruction(
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    base_units: u64,
    token_program: &Pubkey,
) -> anyhow::Result<Instruction> {
    Ok(mint_to(
        token_program,
        mint,
        destination,
        authority,
        &[authority],
        base_units,
    )?)
}

pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program_id(owner, mint, token_program)
}

/// Loads the token account at `address`, telling a missing account apart
/// from one that exists but cannot be used.
pub async fn get_account(
    ledger: &dyn Ledger,
    address: &Pubkey,
    token_program: &Pubkey,
) -> Result<Account, TokenAccountError> {
    let account = ledger
        .account(address)
        .await
        .map_err(TokenAccountError::Rpc)?
        .ok_or(TokenAccountError::TokenAccountNotFound(*address))?;

    if account.owner != *token_program {
        return Err(TokenAccountError::TokenInvalidAccountOwner {
            address: *address,
            owner: account.owner,
        });
    }

    StateWithExtensions::<Account>::unpack(&account.data)
        .map(|state| state.base)
        .map_err(|_| TokenAccountError::TokenInvalidAccountSize(*address))
}

pub async fn get_mint(ledger: &dyn Ledger, mint_address: &Pubkey) -> anyhow::Result<MintInfo> {
    let account = ledger
        .account(mint_address)
        .await?
        .ok_or(LauncherError::InvalidMint(*mint_address))?;
    let mint = StateWithExtensions::<Mint>::unpack(&account.data)
        .map_err(|_| LauncherError::InvalidMint(*mint_address))?;
    debug!("{:?}", mint.base);

    Ok(MintInfo {
        token_program: account.owner,
        decimals: mint.base.decimals,
    })
}

/// Creates a mint in its own transaction and returns its address.
pub async fn create_new_mint(
    ledger: &dyn Ledger,
    explorer: &Explorer,
    payer: &Keypair,
    authority: &Pubkey,
    decimals: u8,
    token_program: &Pubkey,
) -> anyhow::Result<Pubkey> {
    info!("Start creating mint");

    let mint_account = Keypair::new();
    let mint_account_rent = ledger.minimum_balance_for_rent_exemption(MINT_SIZE).await?;

    let instructions = create_mint_instructions(
        &payer.pubkey(),
        &mint_account.pubkey(),
        mint_account_rent,
        decimals,
        authority,
        token_program,
    )?;
    send_transaction(ledger, &instructions, payer, &[&mint_account])
        .await
        .context("Error creating mint")?;

    println!("Token Mint: {}", explorer.address(&mint_account.pubkey()));

    Ok(mint_account.pubkey())
}

/// Returns the owner's associated token account, creating it first when it
/// does not exist yet.
pub async fn get_or_create_associated_token_account(
    ledger: &dyn Ledger,
    payer: &Keypair,
    mint: &Pubkey,
    owner: &Pubkey,
    token_program: &Pubkey,
) -> anyhow::Result<Pubkey> {
    let associated_token_address = associated_token_address(owner, mint, token_program);
    debug!("Associated token address: {}", associated_token_address);

    match get_account(ledger, &associated_token_address, token_program).await {
        Ok(_) => return Ok(associated_token_address),
        Err(err) if err.is_missing() => {}
        Err(err) => return Err(err.into()),
    }

    info!("Creating associated token account for {}", owner);
    let create_ata_ix =
        create_associated_token_account(&payer.pubkey(), owner, mint, token_program);
    send_transaction(ledger, &[create_ata_ix], payer, &[])
        .await
        .context("Error creating associated token account")?;

    Ok(associated_token_address)
}

pub async fn create_token_account(
    ledger: &dyn Ledger,
    explorer: &Explorer,
    payer: &Keypair,
    mint: &Pubkey,
    owner: &Pubkey,
) -> anyhow::Result<Pubkey> {
    let MintInfo { token_program, .. } = get_mint(ledger, mint).await?;
    let token_account =
        get_or_create_associated_token_account(ledger, payer, mint, owner, &token_program).await?;

    println!("Token Account: {}", explorer.address(&token_account));

    Ok(token_account)
}

/// Mints `amount` whole tokens into the owner's associated token account.
pub async fn mint_tokens(
    ledger: &dyn Ledger,
    explorer: &Explorer,
    payer: &Keypair,
    mint: &Pubkey,
    owner: &Pubkey,
    authority: &Keypair,
    amount: u64,
) -> anyhow::Result<Signature> {
    let MintInfo {
        token_program,
        decimals,
    } = get_mint(ledger, mint).await?;
    let destination =
        get_or_create_associated_token_account(ledger, payer, mint, owner, &token_program).await?;

    let amount_to_mint = to_base_units(amount, decimals)?;
    info!("Amount to mint: {}", amount_to_mint);

    let mint_to_ix = mint_to_checked(
        &token_program,
        mint,
        &destination,
        &authority.pubkey(),
        &[&authority.pubkey()],
        amount_to_mint,
        decimals,
    )?;

    let transaction_signature = send_transaction(ledger, &[mint_to_ix], payer, &[authority])
        .await
        .context("Error minting tokens")?;

    println!(
        "Mint Token Transaction: {}",
        explorer.tx(&transaction_signature)
    );

    Ok(transaction_signature)
}

/// Moves `amount` whole tokens from the owner's account to the recipient's,
/// creating the recipient's account if needed.
pub async fn transfer_tokens(
    ledger: &dyn Ledger,
    explorer: &Explorer,
    payer: &Keypair,
    mint: &Pubkey,
    owner: &Keypair,
    recipient: &Pubkey,
    amount: u64,
) -> anyhow::Result<Signature> {
    let MintInfo {
        token_program,
        decimals,
    } = get_mint(ledger, mint).await?;
    let source = associated_token_address(&owner.pubkey(), mint, &token_program);
    get_account(ledger, &source, &token_program).await?;
    let destination =
        get_or_create_associated_token_account(ledger, payer, mint, recipient, &token_program)
            .await?;

    let transfer_amount = to_base_units(amount, decimals)?;
    let transfer_ix = transfer_checked(
        &token_program,
        &source,
        mint,
        &destination,
        &owner.pubkey(),
        &[&owner.pubkey()],
        transfer_amount,
        decimals,
    )?;

    let transaction_signature = send_transaction(ledger, &[transfer_ix], payer, &[owner])
        .await
        .context("Error transferring tokens")?;

    println!(
        "Transfer Transaction: {}",
        explorer.tx(&transaction_signature)
    );

    Ok(transaction_signature)
}

pub async fn burn_tokens(
    ledger: &dyn Ledger,
    explorer: &Explorer,
    payer: &Keypair,
    mint: &Pubkey,
    owner: &Keypair,
    amount: u64,
) -> anyhow::Result<Signature> {
    let MintInfo {
        token_program,
        decimals,
    } = get_mint(ledger, mint).await?;
    let account = associated_token_address(&owner.pubkey(), mint, &token_program);
    get_account(ledger, &account, &token_program).await?;

    let burn_amount = to_base_units(amount, decimals)?;
    let burn_ix = burn_checked(
        &token_program,
        &account,
        mint,
        &owner.pubkey(),
        &[&owner.pubkey()],
        burn_amount,
        decimals,
    )?;

    let transaction_signature = send_transaction(ledger, &[burn_ix], payer, &[owner])
        .await
        .context("Error burning tokens")?;

    println!("Burn Transaction: {}", explorer.tx(&transaction_signature));

    Ok(transaction_signature)
}
