//! Creation of the accounts a scenario tracks

use crate::chain::{Account, ChainClient};
use crate::common::Result;

/// Create one fresh, unfunded account per label
///
/// Scenarios fund their accounts with `fund` steps so that the transfers
/// show up in the result and between the snapshots.
pub async fn create(client: &dyn ChainClient, labels: &[String]) -> Result<Vec<Account>> {
    let mut accounts = Vec::with_capacity(labels.len());
    for label in labels {
        let account = client.create_account(label).await?;
        tracing::debug!("Created {} at {:?}", account.label, account.address);
        accounts.push(account);
    }
    Ok(accounts)
}
