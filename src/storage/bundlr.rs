use std::{collections::HashMap, str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use tracing::{debug, info};

use super::{
    data_item::{DataItem, Tag},
    AssetFile, AssetStorage,
};
use crate::{config::StorageConfig, error::LauncherError, ledger::Ledger, utils::transfer};

const CURRENCY: &str = "solana";

/// Uploads to a Bundlr/Irys node, paying for storage in SOL from the payer.
pub struct BundlrStorage {
    http: Client,
    config: StorageConfig,
    ledger: Arc<dyn Ledger>,
    payer: Arc<Keypair>,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    #[serde(default)]
    addresses: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

impl BundlrStorage {
    pub fn new(config: StorageConfig, ledger: Arc<dyn Ledger>, payer: Arc<Keypair>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build storage http client")?;
        Ok(Self {
            http,
            config,
            ledger,
            payer,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.address.trim_end_matches('/'), path)
    }

    fn uri(&self, id: &str) -> String {
        format!("{}/{}", self.config.gateway.trim_end_matches('/'), id)
    }

    /// Address the node watches for SOL deposits.
    pub async fn deposit_address(&self) -> Result<Pubkey> {
        let info: NodeInfo = checked(self.http.get(self.endpoint("info")).send().await?)
            .await?
            .json()
            .await?;
        let address = info
            .addresses
            .get(CURRENCY)
            .ok_or(LauncherError::MissingDepositAddress)?;
        Ok(Pubkey::from_str(address)?)
    }

    /// Lamports the node charges to store `bytes`.
    pub async fn price(&self, bytes: usize) -> Result<u64> {
        let body = checked(
            self.http
                .get(self.endpoint(&format!("price/{CURRENCY}/{bytes}")))
                .send()
                .await?,
        )
        .await?
        .text()
        .await?;
        parse_amount(&serde_json::from_str(&body).unwrap_or(Value::String(body.clone())))
            .with_context(|| format!("Unexpected price response: {body}"))
    }

    pub async fn balance(&self) -> Result<u64> {
        let body: Value = checked(
            self.http
                .get(self.endpoint(&format!("account/balance/{CURRENCY}")))
                .query(&[("address", self.payer.pubkey().to_string())])
                .send()
                .await?,
        )
        .await?
        .json()
        .await?;
        body.get("balance")
            .and_then(parse_amount)
            .with_context(|| format!("Unexpected balance response: {body}"))
    }

    /// Sends `lamports` to the node and registers the deposit.
    pub async fn fund(&self, lamports: u64) -> Result<()> {
        let deposit_address = self.deposit_address().await?;
        let signature = transfer(self.ledger.as_ref(), &self.payer, &deposit_address, lamports).await?;

        checked(
            self.http
                .post(self.endpoint(&format!("account/balance/{CURRENCY}")))
                .json(&json!({ "tx_id": signature.to_string() }))
                .send()
                .await?,
        )
        .await?;
        info!("Funded storage node with {} lamports", lamports);
        Ok(())
    }

    async fn ensure_balance(&self, bytes: usize) -> Result<()> {
        let price = self.price(bytes).await?;
        let balance = self.balance().await?;
        debug!("Storage price {} lamports, balance {}", price, balance);
        if let Some(lamports) = required_funding(price, balance, self.config.price_multiplier) {
            self.fund(lamports).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStorage for BundlrStorage {
    async fn upload(&self, file: &AssetFile) -> Result<String> {
        let item = DataItem::sign(
            &self.payer,
            file.bytes.clone(),
            vec![Tag::new("Content-Type", file.content_type.clone())],
            Some(rand::random()),
        );
        anyhow::ensure!(
            item.verify(),
            "Signed data item for {} does not verify",
            file.file_name
        );
        let bytes = item.to_bytes();
        self.ensure_balance(bytes.len()).await?;

        info!("Uploading {} ({} bytes)", file.file_name, bytes.len());
        let response: UploadResponse = checked(
            self.http
                .post(self.endpoint(&format!("tx/{CURRENCY}")))
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(bytes)
                .send()
                .await?,
        )
        .await?
        .json()
        .await
        .with_context(|| format!("Failed to upload {}", file.file_name))?;

        debug!("Data item {} accepted as {}", item.id(), response.id);
        Ok(self.uri(&response.id))
    }
}

async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LauncherError::StorageNode {
        status: status.as_u16(),
        body,
    }
    .into())
}

/// Nodes report amounts either as JSON numbers or as decimal strings.
fn parse_amount(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().trim_matches('"').parse().ok(),
        _ => None,
    }
}

/// Lamports to deposit so the balance covers `price` with headroom, if any.
fn required_funding(price: u64, balance: u64, multiplier: f64) -> Option<u64> {
    let target = (price as f64 * multiplier).ceil() as u64;
    (target > balance).then(|| target - balance)
}
