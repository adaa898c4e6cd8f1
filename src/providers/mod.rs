pub mod csv;

use tracing::{error, info, warn};

use crate::error::{Result, SyncError};
use crate::mapper::AccountMapper;
use crate::models::{ExternalAccount, Transaction};
use crate::repository::Repository;

pub trait FetchTransactions {
    fn fetch_transactions(&self) -> Result<Vec<Transaction>>;
}

pub trait FetchAccountBalances {
    fn fetch_account_balances(&self) -> Result<Vec<ExternalAccount>>;
}

pub trait Authenticator {
    fn authenticate(&mut self) -> Result<()>;
}

pub trait Provider: Authenticator {
    fn name(&self) -> &str;

    fn transactions(&self) -> Option<&dyn FetchTransactions> {
        None
    }

    fn balances(&self) -> Option<&dyn FetchAccountBalances> {
        None
    }
}

pub const PROVIDERS: &[&str] = &["csv"];

pub struct ProviderOptions {
    pub file: std::path::PathBuf,
    pub account: String,
    pub currency: String,
    pub closing_balance: Option<String>,
}

pub fn open(name: &str, options: ProviderOptions) -> Result<Box<dyn Provider>> {
    match name.to_lowercase().as_str() {
        "csv" => Ok(Box::new(self::csv::CsvStatementProvider::new(
            options.file,
            &options.account,
            &options.currency,
            options.closing_balance,
        ))),
        other => Err(SyncError::UnknownProvider(format!(
            "{other} (supported: {})",
            PROVIDERS.join(", ")
        ))),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub inserted: usize,
    pub skipped: usize,
    pub balances_updated: usize,
}

pub fn run_fetch(
    provider: &mut dyn Provider,
    repo: &dyn Repository,
    mapper: &AccountMapper,
) -> Result<FetchReport> {
    provider.authenticate()?;
    let mut report = FetchReport::default();

    if let Some(fetcher) = provider.balances() {
        for account in fetcher.fetch_account_balances()? {
            match mapper.resolve_for_external(&account) {
                Ok(mapping) if mapping.is_ignored() => continue,
                Ok(_) => {}
                Err(e) => {
                    error!(account = %account.name, error = %e, "error finding account mapping");
                    continue;
                }
            }
            repo.upsert_account_balance(&account.name, &account.balance)?;
            info!(account = %account.name, "account balance updated");
            report.balances_updated += 1;
        }
    }

    if let Some(fetcher) = provider.transactions() {
        for tx in fetcher.fetch_transactions()? {
            let existing = if tx.reference_number.is_empty() {
                Ok(None)
            } else {
                repo.get_transaction_by_reference(&tx.reference_number)
            };
            match existing {
                Ok(Some(_)) => {
                    report.skipped += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(reference = %tx.reference_number, error = %e, "error checking transaction");
                    report.skipped += 1;
                    continue;
                }
            }
            if let Err(e) = repo.save_transaction(&tx) {
                warn!(reference = %tx.reference_number, error = %e, "error saving transaction");
                report.skipped += 1;
                continue;
            }
            report.inserted += 1;
        }
        info!(provider = provider.name(), inserted = report.inserted, skipped = report.skipped, "transactions processed");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Selection;
    use crate::models::{AccountMapping, Amount, Merchant};
    use crate::repository::tests::test_repo;
    use crate::testutil::{remote_account, FakeLedger, ScriptedSelector};

    struct StubProvider {
        authenticated: bool,
        fail_auth: bool,
        transactions: Option<Vec<Transaction>>,
        balances: Option<Vec<ExternalAccount>>,
    }

    impl Authenticator for StubProvider {
        fn authenticate(&mut self) -> Result<()> {
            if self.fail_auth {
                return Err(SyncError::Other("bad credentials".into()));
            }
            self.authenticated = true;
            Ok(())
        }
    }

    impl FetchTransactions for StubProvider {
        fn fetch_transactions(&self) -> Result<Vec<Transaction>> {
            Ok(self.transactions.clone().unwrap_or_default())
        }
    }

    impl FetchAccountBalances for StubProvider {
        fn fetch_account_balances(&self) -> Result<Vec<ExternalAccount>> {
            Ok(self.balances.clone().unwrap_or_default())
        }
    }

    impl Provider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn transactions(&self) -> Option<&dyn FetchTransactions> {
            self.transactions.as_ref().map(|_| self as &dyn FetchTransactions)
        }

        fn balances(&self) -> Option<&dyn FetchAccountBalances> {
            self.balances.as_ref().map(|_| self as &dyn FetchAccountBalances)
        }
    }

    fn tx(reference: &str) -> Transaction {
        Transaction {
            reference_number: reference.into(),
            amount: Amount::new("4.00", "USD"),
            merchant: Merchant::named("Bakery"),
            date: "2025-04-28".into(),
            source_account_name: "card".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_transactions_deduped_by_reference() {
        let (_dir, repo) = test_repo();
        repo.save_transaction(&tx("A")).unwrap();
        let client = FakeLedger::default();
        let selector = ScriptedSelector::new(vec![]);
        let mapper = AccountMapper::new(&repo, &client, &selector);
        let mut provider = StubProvider {
            authenticated: false,
            fail_auth: false,
            transactions: Some(vec![tx("A"), tx("B")]),
            balances: None,
        };

        let report = run_fetch(&mut provider, &repo, &mapper).unwrap();
        assert!(provider.authenticated);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(repo.get_transactions().unwrap().len(), 2);
        assert_eq!(selector.prompts.get(), 0);
    }

    #[test]
    fn test_unreferenced_transactions_all_kept() {
        let (_dir, repo) = test_repo();
        let client = FakeLedger::default();
        let selector = ScriptedSelector::new(vec![]);
        let mapper = AccountMapper::new(&repo, &client, &selector);
        let mut provider = StubProvider {
            authenticated: false,
            fail_auth: false,
            transactions: Some(vec![tx(""), tx("")]),
            balances: None,
        };

        let report = run_fetch(&mut provider, &repo, &mapper).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(repo.get_transactions().unwrap().len(), 2);
    }

    #[test]
    fn test_auth_failure_fails_fetch() {
        let (_dir, repo) = test_repo();
        let client = FakeLedger::default();
        let selector = ScriptedSelector::new(vec![]);
        let mapper = AccountMapper::new(&repo, &client, &selector);
        let mut provider = StubProvider {
            authenticated: false,
            fail_auth: true,
            transactions: Some(vec![tx("A")]),
            balances: None,
        };
        assert!(run_fetch(&mut provider, &repo, &mapper).is_err());
        assert!(repo.get_transactions().unwrap().is_empty());
    }

    #[test]
    fn test_balances_mapped_and_stored() {
        let (_dir, repo) = test_repo();
        let client = FakeLedger {
            accounts: vec![remote_account(12, "Chequing")],
            ..Default::default()
        };
        let selector = ScriptedSelector::new(vec![Selection::Account(0)]);
        let mapper = AccountMapper::new(&repo, &client, &selector);
        let mut provider = StubProvider {
            authenticated: false,
            fail_auth: false,
            transactions: None,
            balances: Some(vec![ExternalAccount {
                name: "test-external-name".into(),
                description: "Chequing".into(),
                balance: Amount::new("200.50", "CAD"),
            }]),
        };

        let report = run_fetch(&mut provider, &repo, &mapper).unwrap();
        assert_eq!(report.balances_updated, 1);
        let accounts = repo.get_accounts().unwrap();
        assert_eq!(accounts[0].remote_id, 12);
        assert_eq!(accounts[0].balance.value, "200.50");
    }

    #[test]
    fn test_unresolvable_balance_account_skipped() {
        let (_dir, repo) = test_repo();
        let client = FakeLedger {
            accounts: vec![remote_account(12, "Chequing")],
            ..Default::default()
        };
        let selector = ScriptedSelector::new(vec![Selection::Cancelled]);
        let mapper = AccountMapper::new(&repo, &client, &selector);
        let mut provider = StubProvider {
            authenticated: false,
            fail_auth: false,
            transactions: Some(vec![tx("A")]),
            balances: Some(vec![ExternalAccount {
                name: "x".into(),
                description: String::new(),
                balance: Amount::new("1.00", "CAD"),
            }]),
        };

        let report = run_fetch(&mut provider, &repo, &mapper).unwrap();
        assert_eq!(report.balances_updated, 0);
        assert_eq!(report.inserted, 1);
        assert!(repo.get_accounts().unwrap().is_empty());
    }

    #[test]
    fn test_ignored_balance_account_not_stored() {
        let (_dir, repo) = test_repo();
        repo.upsert_account_mapping(&AccountMapping::ignored("x")).unwrap();
        let client = FakeLedger::default();
        let selector = ScriptedSelector::new(vec![]);
        let mapper = AccountMapper::new(&repo, &client, &selector);
        let mut provider = StubProvider {
            authenticated: false,
            fail_auth: false,
            transactions: None,
            balances: Some(vec![ExternalAccount {
                name: "x".into(),
                description: String::new(),
                balance: Amount::new("1.00", "CAD"),
            }]),
        };
        let report = run_fetch(&mut provider, &repo, &mapper).unwrap();
        assert_eq!(report.balances_updated, 0);
        assert!(repo.get_accounts().unwrap().is_empty());
    }

    #[test]
    fn test_open_unknown_provider() {
        let options = ProviderOptions {
            file: "x.csv".into(),
            account: "a".into(),
            currency: "USD".into(),
            closing_balance: None,
        };
        assert!(matches!(open("scotia", options), Err(SyncError::UnknownProvider(_))));
    }
}
