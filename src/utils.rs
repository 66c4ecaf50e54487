use anyhow::Result;
use std::time::Duration;

use solana_sdk::{
    instruction::Instruction, native_token::LAMPORTS_PER_SOL, pubkey::Pubkey,
    signature::Keypair, signature::Signature, signer::Signer, system_instruction,
    transaction::Transaction,
};
use tracing::{debug, info};

use crate::{config::Cluster, ledger::Ledger};

pub async fn airdrop(ledger: &dyn Ledger, account: &Pubkey, amount: u64) -> Result<()> {
    let transaction_signature = ledger
        .request_airdrop(account, amount * LAMPORTS_PER_SOL)
        .await?;
    loop {
        info!("Airdropping {} SOL to {}...", amount, account);
        tokio::time::sleep(Duration::from_secs(1)).await;
        if ledger.confirm(&transaction_signature).await? {
            return Ok(());
        }
    }
}

/// Signs `instructions` with the payer (fee payer) and any extra signers, then
/// submits and waits for confirmation.
pub async fn send_transaction(
    ledger: &dyn Ledger,
    instructions: &[Instruction],
    payer: &Keypair,
    extra_signers: &[&Keypair],
) -> Result<Signature> {
    let mut signers = vec![payer];
    signers.extend_from_slice(extra_signers);

    let transaction = Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &signers,
        ledger.latest_blockhash().await?,
    );
    debug!(
        "Sending transaction with {} instructions and {} signers",
        instructions.len(),
        signers.len()
    );
    ledger.send_and_confirm(&transaction).await
}

pub async fn transfer(
    ledger: &dyn Ledger,
    sender: &Keypair,
    recipient: &Pubkey,
    amount: u64,
) -> Result<Signature> {
    info!("Funding account {} with {} lamports...", recipient, amount);

    let fund_signature = send_transaction(
        ledger,
        &[system_instruction::transfer(
            &sender.pubkey(), // From
            recipient,        // To
            amount,           // Amount in lamports
        )],
        sender,
        &[],
    )
    .await?;

    info!("Fund Transaction Signature: {}", fund_signature);

    Ok(fund_signature)
}

/// Builds Solana explorer links for one cluster.
#[derive(Debug, Clone, Copy)]
pub struct Explorer {
    cluster: Cluster,
}

impl Explorer {
    pub fn new(cluster: Cluster) -> Self {
        Self { cluster }
    }

    pub fn address(&self, address: &Pubkey) -> String {
        format!(
            "https://explorer.solana.com/address/{}{}",
            address,
            self.cluster.explorer_query()
        )
    }

    pub fn tx(&self, signature: &Signature) -> String {
        format!(
            "https://explorer.solana.com/tx/{}{}",
            signature,
            self.cluster.explorer_query()
        )
    }
}
