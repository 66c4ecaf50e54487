//! In-memory stand-ins for the cluster and the storage node.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use solana_sdk::{
    account::Account, hash::Hash, program_option::COption, program_pack::Pack, pubkey::Pubkey,
    rent::Rent, signature::Signature, transaction::Transaction,
};
use spl_token_2022::state::{Account as TokenAccount, AccountState, Mint};

use crate::{
    ledger::Ledger,
    storage::{AssetFile, AssetStorage},
};

#[derive(Default)]
pub struct MockLedger {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    failing: Mutex<HashSet<Pubkey>>,
    balances: Mutex<HashMap<Pubkey, u64>>,
    sent: Mutex<Vec<Transaction>>,
    airdrops: Mutex<Vec<(Pubkey, u64)>>,
}

impl MockLedger {
    pub fn with_account(self, address: Pubkey, account: Account) -> Self {
        self.accounts.lock().unwrap().insert(address, account);
        self
    }

    /// Lookups of `address` fail with a transport error.
    pub fn with_failing_lookup(self, address: Pubkey) -> Self {
        self.failing.lock().unwrap().insert(address);
        self
    }

    pub fn with_balance(self, address: Pubkey, lamports: u64) -> Self {
        self.balances.lock().unwrap().insert(address, lamports);
        self
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn airdrops(&self) -> Vec<(Pubkey, u64)> {
        self.airdrops.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64> {
        Ok(Rent::default().minimum_balance(data_len))
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<Account>> {
        if self.failing.lock().unwrap().contains(address) {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn balance(&self, address: &Pubkey) -> Result<u64> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or_default())
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::new_from_array([7; 32]))
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature> {
        transaction.verify()?;
        self.sent.lock().unwrap().push(transaction.clone());
        Ok(transaction.signatures[0])
    }

    async fn request_airdrop(&self, address: &Pubkey, lamports: u64) -> Result<Signature> {
        self.airdrops.lock().unwrap().push((*address, lamports));
        *self.balances.lock().unwrap().entry(*address).or_default() += lamports;
        Ok(Signature::from([9; 64]))
    }

    async fn confirm(&self, _signature: &Signature) -> Result<bool> {
        Ok(true)
    }
}

#[derive(Default)]
pub struct MockStorage {
    uploads: Mutex<Vec<AssetFile>>,
}

impl MockStorage {
    pub fn uploads(&self) -> Vec<AssetFile> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStorage for MockStorage {
    async fn upload(&self, file: &AssetFile) -> Result<String> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push(file.clone());
        Ok(format!("https://arweave.net/mock-{}", uploads.len()))
    }
}

pub fn token_account(mint: &Pubkey, owner: &Pubkey, amount: u64, token_program: &Pubkey) -> Account {
    let state = TokenAccount {
        mint: *mint,
        owner: *owner,
        amount,
        state: AccountState::Initialized,
        ..TokenAccount::default()
    };
    let mut data = vec![0; TokenAccount::LEN];
    TokenAccount::pack(state, &mut data).unwrap();
    Account {
        lamports: Rent::default().minimum_balance(TokenAccount::LEN),
        data,
        owner: *token_program,
        executable: false,
        rent_epoch: 0,
    }
}

pub fn mint_account(authority: &Pubkey, decimals: u8, token_program: &Pubkey) -> Account {
    let state = Mint {
        mint_authority: COption::Some(*authority),
        supply: 0,
        decimals,
        is_initialized: true,
        freeze_authority: COption::Some(*authority),
    };
    let mut data = vec![0; Mint::LEN];
    Mint::pack(state, &mut data).unwrap();
    Account {
        lamports: Rent::default().minimum_balance(Mint::LEN),
        data,
        owner: *token_program,
        executable: false,
        rent_epoch: 0,
    }
}
