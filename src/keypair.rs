use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use solana_sdk::{
    native_token::LAMPORTS_PER_SOL,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
    signer::Signer,
};
use tracing::{info, warn};

use crate::{error::LauncherError, ledger::Ledger, utils::airdrop};

pub const PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";

/// Where the acting user's key comes from.
#[derive(Debug, Clone)]
pub enum KeypairSource {
    /// A Solana CLI keypair file
    File(PathBuf),
    /// `PRIVATE_KEY`, generated and appended to `env_file` when unset
    Env { env_file: PathBuf },
}

/// Parses a JSON byte array, the format `solana-keygen` writes.
pub fn parse_private_key(value: &str) -> Result<Keypair, LauncherError> {
    let bytes: Vec<u8> = serde_json::from_str(value.trim())
        .map_err(|err| LauncherError::InvalidKeypair(err.to_string()))?;
    Keypair::from_bytes(&bytes).map_err(|err| LauncherError::InvalidKeypair(err.to_string()))
}

fn persist_private_key(keypair: &Keypair, env_file: &Path) -> Result<()> {
    let encoded = serde_json::to_string(&keypair.to_bytes().to_vec())?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(env_file)
        .with_context(|| format!("Failed to open {}", env_file.display()))?;
    writeln!(file, "{}={}", PRIVATE_KEY_VAR, encoded)?;
    Ok(())
}

/// Uses `private_key` when present, otherwise generates a keypair and
/// records it in `env_file` so the next run reuses it.
pub fn load_or_generate(private_key: Option<&str>, env_file: &Path) -> Result<Keypair> {
    if let Some(value) = private_key {
        return Ok(parse_private_key(value)?);
    }

    let keypair = Keypair::new();
    persist_private_key(&keypair, env_file)?;
    warn!(
        "No {} set, generated {} and saved it to {}",
        PRIVATE_KEY_VAR,
        keypair.pubkey(),
        env_file.display()
    );
    Ok(keypair)
}

pub async fn airdrop_sol_if_needed(ledger: &dyn Ledger, pubkey: &Pubkey) -> Result<()> {
    let balance = ledger.balance(pubkey).await?;
    info!("Current balance is {} SOL", balance as f64 / LAMPORTS_PER_SOL as f64);

    if balance < LAMPORTS_PER_SOL {
        airdrop(ledger, pubkey, 1).await?;
        let new_balance = ledger.balance(pubkey).await?;
        info!("New balance is {} SOL", new_balance as f64 / LAMPORTS_PER_SOL as f64);
    }
    Ok(())
}

pub async fn initialize_keypair(
    ledger: &dyn Ledger,
    source: &KeypairSource,
    request_airdrop: bool,
) -> Result<Keypair> {
    let keypair = match source {
        KeypairSource::File(path) => read_keypair_file(path).map_err(|err| {
            LauncherError::InvalidKeypair(format!("{}: {}", path.display(), err))
        })?,
        KeypairSource::Env { env_file } => {
            let private_key = std::env::var(PRIVATE_KEY_VAR).ok();
            load_or_generate(private_key.as_deref(), env_file)?
        }
    };

    if request_airdrop {
        airdrop_sol_if_needed(ledger, &keypair.pubkey()).await?;
    }

    Ok(keypair)
}
