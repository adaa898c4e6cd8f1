use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{Result, SyncError};
use crate::lunchmoney::LedgerClient;
use crate::mapper::{MappingSelector, Selection};
use crate::models::{Amount, RemoteAccount, Transaction, TransactionWithMapping};

#[derive(Default)]
pub struct FakeLedger {
    pub accounts: Vec<RemoteAccount>,
    pub remote_transactions: Vec<Transaction>,
    /// Ids returned by `insert_transactions`; generated when `None`.
    pub insert_ids: Option<Vec<i64>>,
    pub fail_list_accounts: bool,
    pub inserted: RefCell<Vec<TransactionWithMapping>>,
    pub insert_calls: Cell<usize>,
    pub list_transaction_calls: RefCell<Vec<(NaiveDate, NaiveDate)>>,
    pub list_account_calls: Cell<usize>,
    pub balance_updates: RefCell<Vec<(i64, Amount, DateTime<Utc>)>>,
}

impl LedgerClient for FakeLedger {
    fn list_accounts(&self) -> Result<Vec<RemoteAccount>> {
        self.list_account_calls.set(self.list_account_calls.get() + 1);
        if self.fail_list_accounts {
            return Err(SyncError::Remote {
                status: 500,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.accounts.clone())
    }

    fn list_transactions(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>> {
        self.list_transaction_calls.borrow_mut().push((start, end));
        Ok(self.remote_transactions.clone())
    }

    fn insert_transactions(&self, transactions: &[TransactionWithMapping]) -> Result<Vec<i64>> {
        self.insert_calls.set(self.insert_calls.get() + 1);
        let already = self.inserted.borrow().len() as i64;
        self.inserted.borrow_mut().extend(transactions.iter().cloned());
        match &self.insert_ids {
            Some(ids) => Ok(ids.clone()),
            None => Ok((0..transactions.len() as i64).map(|i| 1000 + already + i).collect()),
        }
    }

    fn update_account_balance(&self, id: i64, balance: &Amount, as_of: DateTime<Utc>) -> Result<()> {
        self.balance_updates.borrow_mut().push((id, balance.clone(), as_of));
        Ok(())
    }
}

pub fn remote_account(id: i64, name: &str) -> RemoteAccount {
    RemoteAccount {
        id,
        name: name.to_string(),
        display_name: String::new(),
        balance: Amount::new("0.00", "USD"),
        balance_last_updated: None,
        is_plaid: false,
    }
}

/// Answers prompts from a fixed script; an exhausted script cancels.
#[derive(Default)]
pub struct ScriptedSelector {
    answers: RefCell<VecDeque<Selection>>,
    pub prompts: Cell<usize>,
}

impl ScriptedSelector {
    pub fn new(answers: Vec<Selection>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            prompts: Cell::new(0),
        }
    }
}

impl MappingSelector for ScriptedSelector {
    fn choose_mapping(&self, _context: &str, _source: &str, _candidates: &[RemoteAccount]) -> Result<Selection> {
        self.prompts.set(self.prompts.get() + 1);
        Ok(self.answers.borrow_mut().pop_front().unwrap_or(Selection::Cancelled))
    }
}
