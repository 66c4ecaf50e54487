use anyhow::Result;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};

/// The RPC surface the launcher needs from a cluster.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64>;

    /// `None` when nothing lives at `address`.
    async fn account(&self, address: &Pubkey) -> Result<Option<Account>>;

    async fn balance(&self, address: &Pubkey) -> Result<u64>;

    async fn latest_blockhash(&self) -> Result<Hash>;

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature>;

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature>;

    async fn confirm(&self, signature: &Signature) -> Result<bool>;
}

#[async_trait]
impl Ledger for RpcClient {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(self.get_minimum_balance_for_rent_exemption(data_len).await?)
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<Account>> {
        Ok(self
            .get_account_with_commitment(address, self.commitment())
            .await?
            .value)
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64> {
        Ok(self.get_balance(address).await?)
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.get_latest_blockhash().await?)
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature> {
        Ok(self.send_and_confirm_transaction(transaction).await?)
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        Ok(RpcClient::request_airdrop(self, address, lamports).await?)
    }

    async fn confirm(&self, signature: &Signature) -> Result<bool> {
        Ok(self.confirm_transaction(signature).await?)
    }
}
