//! Point-in-time state of tracked accounts

use std::time::Instant;

use ethers::types::{Address, Bytes, U256};
use serde::Serialize;

use crate::chain::{delegation_target, Account, ChainClient};
use crate::common::Result;

/// Code and balance of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountState {
    pub code: Bytes,
    pub balance: U256,
}

impl AccountState {
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// Contract this account delegates to through EIP-7702, if any
    pub fn delegation(&self) -> Option<Address> {
        delegation_target(&self.code)
    }
}

/// State of one tracked account inside a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    pub label: String,
    pub address: Address,
    #[serde(flatten)]
    pub state: AccountState,
}

/// State of all tracked accounts at one instant
///
/// Equality compares the recorded state only; `taken_at` is bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    #[serde(skip)]
    pub taken_at: Instant,
    pub accounts: Vec<SnapshotEntry>,
}

impl PartialEq for AccountSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.accounts == other.accounts
    }
}

impl Eq for AccountSnapshot {}

impl AccountSnapshot {
    /// Read code and balance of every account, in order
    pub async fn capture(client: &dyn ChainClient, accounts: &[Account]) -> Result<Self> {
        let mut entries = Vec::with_capacity(accounts.len());
        for account in accounts {
            let code = client.get_code(account.address).await?;
            let balance = client.get_balance(account.address).await?;
            entries.push(SnapshotEntry {
                label: account.label.clone(),
                address: account.address,
                state: AccountState { code, balance },
            });
        }

        Ok(Self {
            taken_at: Instant::now(),
            accounts: entries,
        })
    }

    pub fn get(&self, label: &str) -> Option<&AccountState> {
        self.accounts
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| &entry.state)
    }
}

/// Change of one account between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDiff {
    pub label: String,
    pub code_changed: bool,
    /// Balance after minus balance before, as (magnitude, is_increase)
    pub balance_delta: (U256, bool),
}

/// Compare two snapshots account by account (matched by label)
pub fn diff(before: &AccountSnapshot, after: &AccountSnapshot) -> Vec<AccountDiff> {
    before
        .accounts
        .iter()
        .filter_map(|old| {
            let new = after.get(&old.label)?;
            let balance_delta = if new.balance >= old.state.balance {
                (new.balance - old.state.balance, true)
            } else {
                (old.state.balance - new.balance, false)
            };
            Some(AccountDiff {
                label: old.label.clone(),
                code_changed: new.code != old.state.code,
                balance_delta,
            })
        })
        .collect()
}
