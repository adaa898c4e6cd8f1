use colored::Colorize;
use comfy_table::{Cell, Table};
use dialoguer::Input;
use tracing::info;

use crate::error::{Result, SyncError};
use crate::lunchmoney::LedgerClient;
use crate::models::{AccountMapping, ExternalAccount, RemoteAccount, Transaction, IGNORE_ACCOUNT_ID};
use crate::repository::Repository;

/// Reserved name for the session-wide default; never persisted.
pub const DEFAULT_ACCOUNT_NAME: &str = "Default Account";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Account(usize),
    Ignore,
    Cancelled,
}

impl Selection {
    /// `-1` means ignore, any other negative number is invalid.
    pub fn from_index(index: i64) -> Result<Self> {
        match index {
            IGNORE_ACCOUNT_ID => Ok(Selection::Ignore),
            i if i >= 0 => Ok(Selection::Account(i as usize)),
            _ => Err(SyncError::InvalidSelection),
        }
    }
}

pub trait MappingSelector {
    fn choose_mapping(
        &self,
        context: &str,
        source_account_name: &str,
        candidates: &[RemoteAccount],
    ) -> Result<Selection>;
}

pub struct ConsoleSelector;

impl MappingSelector for ConsoleSelector {
    fn choose_mapping(
        &self,
        context: &str,
        source_account_name: &str,
        candidates: &[RemoteAccount],
    ) -> Result<Selection> {
        println!("{}", context.yellow());
        let mut table = Table::new();
        table.set_header(vec!["#", "Account", "Balance"]);
        for (i, account) in candidates.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i),
                Cell::new(account.label()),
                Cell::new(format!("{} {}", account.balance.value, account.balance.currency.to_uppercase())),
            ]);
        }
        println!("{table}");

        let choice: String = match Input::new()
            .with_prompt(format!("Account # to map {source_account_name:?} (-1 = always ignore, q = cancel)"))
            .interact_text()
        {
            Ok(c) => c,
            Err(_) => return Ok(Selection::Cancelled),
        };
        let choice = choice.trim();
        if choice.eq_ignore_ascii_case("q") {
            return Ok(Selection::Cancelled);
        }
        let index: i64 = choice.parse().map_err(|_| SyncError::InvalidSelection)?;
        Selection::from_index(index)
    }
}

pub struct AccountMapper<'a> {
    repo: &'a dyn Repository,
    client: &'a dyn LedgerClient,
    selector: &'a dyn MappingSelector,
    default_account: Option<AccountMapping>,
}

impl<'a> AccountMapper<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        client: &'a dyn LedgerClient,
        selector: &'a dyn MappingSelector,
    ) -> Self {
        Self {
            repo,
            client,
            selector,
            default_account: None,
        }
    }

    /// Ask once for an account to use for every unmapped transaction source this session.
    pub fn select_default(&mut self) -> Result<()> {
        let mapping = self.select_interactive(
            DEFAULT_ACCOUNT_NAME,
            "Select the default account for unmapped transactions:",
        )?;
        self.default_account = Some(mapping);
        Ok(())
    }

    pub fn default_account(&self) -> Option<&AccountMapping> {
        self.default_account.as_ref()
    }

    pub fn resolve_for_transaction(&self, tx: &Transaction) -> Result<AccountMapping> {
        let context = format!(
            "Could not find account for transaction [{}] {} ({} {}). Please select one:",
            tx.reference_number,
            tx.merchant.name,
            tx.amount.value,
            tx.amount.currency.to_uppercase()
        );
        self.resolve(&tx.source_account_name, &context, true)
    }

    pub fn resolve_for_external(&self, account: &ExternalAccount) -> Result<AccountMapping> {
        let context = format!(
            "Could not find account for external account [{}] {} ({} {}). Please select one:",
            account.name,
            account.description,
            account.balance.value,
            account.balance.currency.to_uppercase()
        );
        self.resolve(&account.name, &context, false)
    }

    pub fn resolve(&self, source_account_name: &str, context: &str, use_default: bool) -> Result<AccountMapping> {
        if let Some(mapping) = self.repo.get_account_mapping(source_account_name)? {
            return Ok(mapping);
        }
        if use_default {
            if let Some(default) = &self.default_account {
                return Ok(default.clone());
            }
        }
        self.select_interactive(source_account_name, context)
    }

    /// Prompt even when a mapping exists, replacing it.
    pub fn remap(&self, source_account_name: &str) -> Result<AccountMapping> {
        let context = format!("Select the Lunch Money account for {source_account_name:?}:");
        self.select_interactive(source_account_name, &context)
    }

    fn select_interactive(&self, source_account_name: &str, context: &str) -> Result<AccountMapping> {
        let accounts = self.client.list_accounts()?;
        let mapping = match self.selector.choose_mapping(context, source_account_name, &accounts)? {
            Selection::Cancelled => return Err(SyncError::SelectionCancelled),
            Selection::Ignore => AccountMapping::ignored(source_account_name),
            Selection::Account(i) => {
                let account = accounts.get(i).ok_or(SyncError::InvalidSelection)?;
                AccountMapping {
                    external_name: source_account_name.to_string(),
                    remote_id: account.id,
                    is_plaid: account.is_plaid,
                }
            }
        };

        if source_account_name != DEFAULT_ACCOUNT_NAME {
            self.repo.upsert_account_mapping(&mapping)?;
            info!(
                external_name = source_account_name,
                remote_id = mapping.remote_id,
                "saved account mapping"
            );
        }
        Ok(mapping)
    }
}
