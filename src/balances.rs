use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::lunchmoney::LedgerClient;
use crate::models::{Amount, RemoteAccount, SyncOptions};
use crate::repository::Repository;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BalanceReport {
    pub pushed: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

/// Push every local balance that is newer than Lunch Money's copy.
pub fn sync_balances(repo: &dyn Repository, client: &dyn LedgerClient) -> Result<BalanceReport> {
    let local_accounts = repo.get_accounts()?;
    let remote: HashMap<i64, RemoteAccount> = client
        .list_accounts()?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let mut report = BalanceReport::default();
    for local in local_accounts {
        let Some(remote_account) = remote.get(&local.remote_id) else {
            warn!(remote_id = local.remote_id, "account not found in Lunch Money, not syncing balance");
            report.skipped += 1;
            continue;
        };

        if local.balance.value == remote_account.balance.value {
            report.unchanged += 1;
            continue;
        }

        let (Some(local_as_of), Some(remote_as_of)) =
            (local.balance_last_updated, remote_account.balance_last_updated)
        else {
            warn!(remote_id = local.remote_id, "balance out of sync but no last-updated date");
            report.skipped += 1;
            continue;
        };

        if !local.sync_options.contains(SyncOptions::BALANCE) {
            debug!(remote_id = local.remote_id, "balance sync disabled");
            report.skipped += 1;
            continue;
        }

        if local_as_of > remote_as_of {
            info!(
                remote_id = local.remote_id,
                balance = %local.balance.value,
                "updating Lunch Money balance to match local balance"
            );
            let balance = Amount::new(local.balance.value.clone(), local.balance.currency.to_lowercase());
            client.update_account_balance(local.remote_id, &balance, local_as_of)?;
            report.pushed += 1;
        } else {
            report.unchanged += 1;
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountMapping;
    use crate::repository::tests::test_repo;
    use crate::repository::SqliteRepository;
    use crate::testutil::{remote_account, FakeLedger};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn repo_with_balance(value: &str, at: DateTime<Utc>) -> (tempfile::TempDir, SqliteRepository) {
        let (dir, repo) = test_repo();
        repo.upsert_account_mapping(&AccountMapping {
            external_name: "chequing".into(),
            remote_id: 12,
            is_plaid: false,
        })
        .unwrap();
        repo.upsert_account_balance_at("chequing", &Amount::new(value, "CAD"), at).unwrap();
        (dir, repo)
    }

    fn ledger_with(value: &str, at: Option<DateTime<Utc>>) -> FakeLedger {
        let mut account = remote_account(12, "Chequing");
        account.balance = Amount::new(value, "cad");
        account.balance_last_updated = at;
        FakeLedger {
            accounts: vec![account],
            ..Default::default()
        }
    }

    #[test]
    fn test_newer_local_balance_is_pushed() {
        let now = Utc::now();
        let (_dir, repo) = repo_with_balance("200.50", now);
        let client = ledger_with("150.00", Some(now - Duration::days(1)));

        let report = sync_balances(&repo, &client).unwrap();
        assert_eq!(report.pushed, 1);
        let updates = client.balance_updates.borrow();
        assert_eq!(updates.len(), 1);
        let (id, amount, as_of) = &updates[0];
        assert_eq!(*id, 12);
        assert_eq!(amount, &Amount::new("200.50", "cad"));
        assert_eq!(as_of.timestamp(), now.timestamp());
    }

    #[test]
    fn test_older_local_balance_not_pushed() {
        let now = Utc::now();
        let (_dir, repo) = repo_with_balance("200.50", now - Duration::days(2));
        let client = ledger_with("150.00", Some(now));

        sync_balances(&repo, &client).unwrap();
        assert!(client.balance_updates.borrow().is_empty());
    }

    #[test]
    fn test_equal_timestamps_not_pushed() {
        let at = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let (_dir, repo) = repo_with_balance("200.50", at);
        let client = ledger_with("150.00", Some(at));

        let report = sync_balances(&repo, &client).unwrap();
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.pushed, 0);
        assert!(client.balance_updates.borrow().is_empty());
    }

    #[test]
    fn test_equal_value_skipped() {
        let now = Utc::now();
        let (_dir, repo) = repo_with_balance("150.00", now);
        let client = ledger_with("150.00", Some(now - Duration::days(1)));

        let report = sync_balances(&repo, &client).unwrap();
        assert_eq!(report.unchanged, 1);
        assert!(client.balance_updates.borrow().is_empty());
    }

    #[test]
    fn test_missing_remote_timestamp_skipped() {
        let (_dir, repo) = repo_with_balance("200.50", Utc::now());
        let client = ledger_with("150.00", None);

        let report = sync_balances(&repo, &client).unwrap();
        assert_eq!(report.skipped, 1);
        assert!(client.balance_updates.borrow().is_empty());
    }

    #[test]
    fn test_balance_permission_disabled_skipped() {
        let now = Utc::now();
        let (_dir, repo) = repo_with_balance("200.50", now);
        repo.disable_sync_options(12, SyncOptions::BALANCE).unwrap();
        let client = ledger_with("150.00", Some(now - Duration::days(1)));

        sync_balances(&repo, &client).unwrap();
        assert!(client.balance_updates.borrow().is_empty());
    }

    #[test]
    fn test_transactions_permission_does_not_block_balance() {
        let now = Utc::now();
        let (_dir, repo) = repo_with_balance("200.50", now);
        repo.disable_sync_options(12, SyncOptions::TRANSACTIONS).unwrap();
        let client = ledger_with("150.00", Some(now - Duration::days(1)));

        assert_eq!(sync_balances(&repo, &client).unwrap().pushed, 1);
    }

    #[test]
    fn test_account_missing_remotely_skipped() {
        let (_dir, repo) = repo_with_balance("200.50", Utc::now());
        let client = FakeLedger::default();

        let report = sync_balances(&repo, &client).unwrap();
        assert_eq!(report.skipped, 1);
    }
}
