use std::path::Path;

use anyhow::Context;
use mpl_token_metadata::{
    accounts::Metadata,
    instructions::{
        CreateMetadataAccountV3, CreateMetadataAccountV3InstructionArgs,
        UpdateMetadataAccountV2, UpdateMetadataAccountV2InstructionArgs,
    },
    types::DataV2,
};
use solana_sdk::{
    instruction::Instruction, pubkey::Pubkey, signature::Keypair, signature::Signature,
    signer::Signer, system_program,
};
use tracing::info;

use crate::{
    ledger::Ledger,
    storage::{upload_assets, AssetStorage},
    utils::{send_transaction, Explorer},
};

/// Name, symbol and description of a token, as shown by wallets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDetails {
    pub name: String,
    pub symbol: String,
    pub description: String,
}

pub fn find_metadata_pda(mint: &Pubkey) -> Pubkey {
    Metadata::find_pda(mint).0
}

/// On-chain metadata: no royalties, creators, collection or uses.
pub fn token_data(name: &str, symbol: &str, uri: &str) -> DataV2 {
    DataV2 {
        name: name.to_string(),
        symbol: symbol.to_string(),
        uri: uri.to_string(),
        seller_fee_basis_points: 0,
        creators: None,
        collection: None,
        uses: None,
    }
}

/// `authority` is mint authority, payer and update authority at once.
pub fn create_metadata_instruction(mint: &Pubkey, authority: &Pubkey, data: DataV2) -> Instruction {
    CreateMetadataAccountV3 {
        metadata: find_metadata_pda(mint),
        mint: *mint,
        mint_authority: *authority,
        payer: *authority,
        update_authority: (*authority, true),
        system_program: system_program::ID,
        rent: None,
    }
    .instruction(CreateMetadataAccountV3InstructionArgs {
        data,
        is_mutable: true,
        collection_details: None,
    })
}

pub fn update_metadata_instruction(
    mint: &Pubkey,
    update_authority: &Pubkey,
    data: DataV2,
) -> Instruction {
    UpdateMetadataAccountV2 {
        metadata: find_metadata_pda(mint),
        update_authority: *update_authority,
    }
    .instruction(UpdateMetadataAccountV2InstructionArgs {
        data: Some(data),
        new_update_authority: Some(*update_authority),
        primary_sale_happened: Some(true),
        is_mutable: Some(true),
    })
}

/// Uploads fresh assets and attaches a metadata account to an existing mint.
pub async fn create_token_metadata(
    ledger: &dyn Ledger,
    storage: &dyn AssetStorage,
    explorer: &Explorer,
    mint: &Pubkey,
    user: &Keypair,
    details: &TokenDetails,
    image: &Path,
) -> anyhow::Result<Signature> {
    let (_, uri) = upload_assets(storage, image, &details.name, &details.description).await?;

    info!("Creating metadata account for {}", mint);
    let create_metadata_ix = create_metadata_instruction(
        mint,
        &user.pubkey(),
        token_data(&details.name, &details.symbol, &uri),
    );

    let transaction_signature = send_transaction(ledger, &[create_metadata_ix], user, &[])
        .await
        .context("Error creating metadata account")?;

    println!(
        "Create Metadata Account: {}",
        explorer.tx(&transaction_signature)
    );

    Ok(transaction_signature)
}

/// Uploads fresh assets and points the mint's metadata account at them.
pub async fn update_token_metadata(
    ledger: &dyn Ledger,
    storage: &dyn AssetStorage,
    explorer: &Explorer,
    mint: &Pubkey,
    user: &Keypair,
    details: &TokenDetails,
    image: &Path,
) -> anyhow::Result<Signature> {
    let (_, uri) = upload_assets(storage, image, &details.name, &details.description).await?;

    info!("Updating metadata account for {}", mint);
    let update_metadata_ix = update_metadata_instruction(
        mint,
        &user.pubkey(),
        token_data(&details.name, &details.symbol, &uri),
    );

    let transaction_signature = send_transaction(ledger, &[update_metadata_ix], user, &[])
        .await
        .context("Error updating metadata account")?;

    println!(
        "Update Metadata Account: {}",
        explorer.tx(&transaction_signature)
    );

    Ok(transaction_signature)
}
