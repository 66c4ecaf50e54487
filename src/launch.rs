//! The mint-and-publish flow: one transaction that creates the mint, its
//! metadata account and the creator's token account, then mints the
//! initial supply.

use std::path::PathBuf;

use anyhow::Context;
use solana_sdk::{
    instruction::Instruction, pubkey::Pubkey, signature::Keypair, signature::Signature,
    signer::Signer,
};
use spl_associated_token_account::instruction::create_associated_token_account;
use tracing::{debug, info};

use crate::{
    ledger::Ledger,
    storage::{upload_assets, AssetStorage},
    token::{
        associated_token_address, create_mint_instructions, get_account, mint_to_instruction,
        to_base_units, MINT_SIZE,
    },
    token_metadata::{create_metadata_instruction, find_metadata_pda, token_data, TokenDetails},
    utils::{send_transaction, Explorer},
};

#[derive(Debug, Clone)]
pub struct LaunchParams {
    pub details: TokenDetails,
    pub decimals: u8,
    /// Whole tokens minted to the creator
    pub amount: u64,
    pub image: PathBuf,
    pub token_program: Pubkey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReport {
    pub mint: Pubkey,
    pub token_account: Pubkey,
    pub metadata: Pubkey,
    pub image_uri: String,
    pub metadata_uri: String,
    pub signature: Signature,
    pub created_token_account: bool,
}

impl LaunchReport {
    pub fn lines(&self, explorer: &Explorer) -> Vec<String> {
        vec![
            format!("Token Mint: {}", explorer.address(&self.mint)),
            format!("Token Account: {}", explorer.address(&self.token_account)),
            format!("Metadata Account: {}", explorer.address(&self.metadata)),
            format!("Transaction: {}", explorer.tx(&self.signature)),
        ]
    }

    pub fn print(&self, explorer: &Explorer) {
        debug!(
            "image {} metadata {} (token account created: {})",
            self.image_uri, self.metadata_uri, self.created_token_account
        );
        for line in self.lines(explorer) {
            println!("{}", line);
        }
    }
}

/// Appends the token-account creation instruction when the creator has no
/// usable associated token account yet. Returns whether it was appended.
async fn add_token_account_if_missing(
    ledger: &dyn Ledger,
    instructions: &mut Vec<Instruction>,
    user: &Pubkey,
    mint: &Pubkey,
    token_account: &Pubkey,
    token_program: &Pubkey,
) -> anyhow::Result<bool> {
    match get_account(ledger, token_account, token_program).await {
        Ok(_) => Ok(false),
        Err(err) if err.is_missing() => {
            debug!("{}; adding create instruction", err);
            instructions.push(create_associated_token_account(
                user, // payer
                user, // token owner
                mint,
                token_program,
            ));
            Ok(true)
        }
        Err(err) => Err(err).context("Failed to check for an existing token account"),
    }
}

pub async fn launch_token(
    ledger: &dyn Ledger,
    storage: &dyn AssetStorage,
    user: &Keypair,
    mint_keypair: &Keypair,
    params: &LaunchParams,
) -> anyhow::Result<LaunchReport> {
    let user_pubkey = user.pubkey();
    let mint = mint_keypair.pubkey();
    let token_program = params.token_program;
    let amount = to_base_units(params.amount, params.decimals)?;

    // rent for token mint
    let lamports = ledger.minimum_balance_for_rent_exemption(MINT_SIZE).await?;
    println!("MintKeypair PublicKey: {}", mint);

    let metadata = find_metadata_pda(&mint);
    let token_account = associated_token_address(&user_pubkey, &mint, &token_program);

    let (image_uri, metadata_uri) = upload_assets(
        storage,
        &params.image,
        &params.details.name,
        &params.details.description,
    )
    .await?;

    let mut instructions = create_mint_instructions(
        &user_pubkey,
        &mint,
        lamports,
        params.decimals,
        &user_pubkey,
        &token_program,
    )?;
    instructions.push(create_metadata_instruction(
        &mint,
        &user_pubkey,
        token_data(&params.details.name, &params.details.symbol, &metadata_uri),
    ));

    let created_token_account = add_token_account_if_missing(
        ledger,
        &mut instructions,
        &user_pubkey,
        &mint,
        &token_account,
        &token_program,
    )
    .await?;

    instructions.push(mint_to_instruction(
        &mint,
        &token_account,
        &user_pubkey,
        amount,
        &token_program,
    )?);

    info!("Submitting launch transaction for {}", mint);
    let signature = send_transaction(ledger, &instructions, user, &[mint_keypair])
        .await
        .context("Error sending launch transaction")?;

    Ok(LaunchReport {
        mint,
        token_account,
        metadata,
        image_uri,
        metadata_uri,
        signature,
        created_token_account,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Cluster,
        testing::{token_account as token_account_fixture, MockLedger, MockStorage},
    };
    use assert_matches::assert_matches;
    use solana_sdk::{account::Account, transaction::Transaction};
    use spl_token_2022::instruction::TokenInstruction;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn image() -> NamedTempFile {
        let mut image = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        image.write_all(b"hidan").unwrap();
        image
    }

    fn params(image: &NamedTempFile) -> LaunchParams {
        LaunchParams {
            details: TokenDetails {
                name: "Hidan_WR".to_string(),
                symbol: "HW".to_string(),
                description: "Welcome to Hidan clubbb".to_string(),
            },
            decimals: 2,
            amount: 10_000,
            image: image.path().to_path_buf(),
            token_program: spl_token::ID,
        }
    }

    fn programs(transaction: &Transaction) -> Vec<Pubkey> {
        transaction
            .message
            .instructions
            .iter()
            .map(|ix| transaction.message.account_keys[ix.program_id_index as usize])
            .collect()
    }

    fn ata_for(user: &Keypair, mint: &Keypair) -> Pubkey {
        associated_token_address(&user.pubkey(), &mint.pubkey(), &spl_token::ID)
    }

    #[tokio::test]
    async fn missing_token_account_adds_one_create_instruction() {
        let image = image();
        let ledger = MockLedger::default();
        let storage = MockStorage::default();
        let user = Keypair::new();
        let mint = Keypair::new();

        let report = launch_token(&ledger, &storage, &user, &mint, &params(&image))
            .await
            .unwrap();

        assert!(report.created_token_account);
        let sent = ledger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            programs(&sent[0]),
            vec![
                solana_sdk::system_program::ID,
                spl_token::ID,
                mpl_token_metadata::ID,
                spl_associated_token_account::ID,
                spl_token::ID,
            ]
        );
    }

    #[tokio::test]
    async fn token_2022_launch_targets_the_2022_program() {
        let image = image();
        let ledger = MockLedger::default();
        let user = Keypair::new();
        let mint = Keypair::new();
        let mut params = params(&image);
        params.token_program = spl_token_2022::ID;

        let report = launch_token(&ledger, &MockStorage::default(), &user, &mint, &params)
            .await
            .unwrap();

        assert!(report.created_token_account);
        assert_eq!(
            report.token_account,
            associated_token_address(&user.pubkey(), &mint.pubkey(), &spl_token_2022::ID)
        );
        assert_eq!(
            programs(&ledger.sent()[0]),
            vec![
                solana_sdk::system_program::ID,
                spl_token_2022::ID,
                mpl_token_metadata::ID,
                spl_associated_token_account::ID,
                spl_token_2022::ID,
            ]
        );
    }

    #[tokio::test]
    async fn foreign_owned_token_account_is_treated_as_missing() {
        let image = image();
        let user = Keypair::new();
        let mint = Keypair::new();
        let ledger = MockLedger::default().with_account(
            ata_for(&user, &mint),
            Account::new(1, 0, &solana_sdk::system_program::ID),
        );

        let report = launch_token(&ledger, &MockStorage::default(), &user, &mint, &params(&image))
            .await
            .unwrap();

        assert!(report.created_token_account);
        assert_eq!(programs(&ledger.sent()[0]).len(), 5);
    }

    #[tokio::test]
    async fn existing_token_account_is_not_recreated() {
        let image = image();
        let user = Keypair::new();
        let mint = Keypair::new();
        let ledger = MockLedger::default().with_account(
            ata_for(&user, &mint),
            token_account_fixture(&mint.pubkey(), &user.pubkey(), 0, &spl_token::ID),
        );

        let report = launch_token(&ledger, &MockStorage::default(), &user, &mint, &params(&image))
            .await
            .unwrap();

        assert!(!report.created_token_account);
        let programs = programs(&ledger.sent()[0]);
        assert_eq!(programs.len(), 4);
        assert!(!programs.contains(&spl_associated_token_account::ID));
    }

    #[tokio::test]
    async fn other_probe_errors_abort_before_submitting() {
        let image = image();
        let user = Keypair::new();
        let mint = Keypair::new();
        let ledger = MockLedger::default().with_failing_lookup(ata_for(&user, &mint));

        let result =
            launch_token(&ledger, &MockStorage::default(), &user, &mint, &params(&image)).await;

        assert!(result.is_err());
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn malformed_token_account_aborts_before_submitting() {
        let image = image();
        let user = Keypair::new();
        let mint = Keypair::new();
        let ledger = MockLedger::default()
            .with_account(ata_for(&user, &mint), Account::new(1, 10, &spl_token::ID));

        let result =
            launch_token(&ledger, &MockStorage::default(), &user, &mint, &params(&image)).await;

        assert!(result.is_err());
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn metadata_instruction_carries_the_uploaded_uri() {
        let image = image();
        let ledger = MockLedger::default();
        let user = Keypair::new();
        let mint = Keypair::new();

        let report = launch_token(&ledger, &MockStorage::default(), &user, &mint, &params(&image))
            .await
            .unwrap();
        assert_eq!(report.metadata_uri, "https://arweave.net/mock-2");
        assert_eq!(report.metadata, find_metadata_pda(&mint.pubkey()));

        let expected = create_metadata_instruction(
            &mint.pubkey(),
            &user.pubkey(),
            mpl_token_metadata::types::DataV2 {
                name: "Hidan_WR".to_string(),
                symbol: "HW".to_string(),
                uri: "https://arweave.net/mock-2".to_string(),
                seller_fee_basis_points: 0,
                creators: None,
                collection: None,
                uses: None,
            },
        );
        assert_eq!(ledger.sent()[0].message.instructions[2].data, expected.data);
    }

    #[tokio::test]
    async fn mint_to_encodes_scaled_amount() {
        let image = image();
        let ledger = MockLedger::default();
        let user = Keypair::new();
        let mint = Keypair::new();

        launch_token(&ledger, &MockStorage::default(), &user, &mint, &params(&image))
            .await
            .unwrap();

        let sent = ledger.sent();
        let last = sent[0].message.instructions.last().unwrap();
        assert_matches!(
            TokenInstruction::unpack(&last.data).unwrap(),
            TokenInstruction::MintTo { amount: 1_000_000 }
        );
    }

    #[tokio::test]
    async fn overflowing_amount_fails_before_uploading() {
        let image = image();
        let ledger = MockLedger::default();
        let storage = MockStorage::default();
        let mut params = params(&image);
        params.amount = u64::MAX;

        let result = launch_token(&ledger, &storage, &Keypair::new(), &Keypair::new(), &params).await;

        assert!(result.is_err());
        assert!(storage.uploads().is_empty());
        assert!(ledger.sent().is_empty());
    }

    #[tokio::test]
    async fn successful_launch_reports_one_transaction() {
        let image = image();
        let ledger = MockLedger::default();
        let user = Keypair::new();
        let mint = Keypair::new();

        let report = launch_token(&ledger, &MockStorage::default(), &user, &mint, &params(&image))
            .await
            .unwrap();

        let sent = ledger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(report.signature, sent[0].signatures[0]);
        // user pays, mint signs for its own allocation
        assert_eq!(sent[0].signatures.len(), 2);

        let lines = report.lines(&Explorer::new(Cluster::Devnet));
        let transactions: Vec<_> = lines
            .iter()
            .filter(|line| line.starts_with("Transaction: "))
            .collect();
        assert_eq!(transactions.len(), 1);
        assert!(transactions[0].ends_with("?cluster=devnet"));
    }
}
