use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Why a token account could not be loaded.
#[derive(Error, Debug)]
pub enum TokenAccountError {
    #[error("token account {0} not found")]
    TokenAccountNotFound(Pubkey),

    #[error("account {address} is owned by {owner}, not the token program")]
    TokenInvalidAccountOwner { address: Pubkey, owner: Pubkey },

    #[error("account {0} is not a valid token account")]
    TokenInvalidAccountSize(Pubkey),

    #[error("failed to fetch account: {0}")]
    Rpc(#[source] anyhow::Error),
}

impl TokenAccountError {
    /// True for the two kinds that mean "create the account and carry on".
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            TokenAccountError::TokenAccountNotFound(_)
                | TokenAccountError::TokenInvalidAccountOwner { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum LauncherError {
    #[error("{amount} with {decimals} decimals does not fit in a u64")]
    AmountOverflow { amount: u64, decimals: u8 },

    #[error("mint {0} does not exist or is not a mint account")]
    InvalidMint(Pubkey),

    #[error("invalid keypair: {0}")]
    InvalidKeypair(String),

    #[error("failed to read asset {path}: {source}")]
    Asset {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage node returned {status}: {body}")]
    StorageNode { status: u16, body: String },

    #[error("storage node has no solana deposit address")]
    MissingDepositAddress,
}
