use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::lunchmoney::LedgerClient;
use crate::mapper::AccountMapper;
use crate::models::{SyncOptions, Transaction, TransactionWithMapping};
use crate::repository::Repository;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub considered: usize,
    /// Unsynced (or force-resynced) transactions with a reference.
    pub candidates: usize,
    pub inserted: usize,
    pub matched: usize,
    pub skipped: usize,
}

pub struct Reconciler<'a> {
    repo: &'a dyn Repository,
    client: &'a dyn LedgerClient,
    mapper: &'a AccountMapper<'a>,
    force: bool,
}

/// Id of the first remote transaction that is the same as `tx`, in remote-list order.
pub fn find_match(tx: &Transaction, remote: &[Transaction]) -> Result<Option<i64>> {
    let local_amount = tx.amount.to_money()?;
    for candidate in remote {
        let amount_eq = match candidate
            .amount
            .to_money()
            .and_then(|m| local_amount.equals(&m))
        {
            Ok(eq) => eq,
            Err(_) => continue,
        };
        let same_payment =
            tx.date == candidate.date && amount_eq && tx.merchant.name == candidate.merchant.name;
        if same_payment || tx.reference_number == candidate.reference_number {
            return Ok(Some(candidate.remote_id));
        }
    }
    Ok(None)
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(date, "%Y-%m-%d")?)
}

fn window_start(now: DateTime<Utc>, window_days: i64) -> Result<DateTime<Utc>> {
    if window_days < 0 {
        return Err(SyncError::InvalidWindow(window_days));
    }
    TimeDelta::try_days(window_days)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or(SyncError::InvalidWindow(window_days))
}

impl<'a> Reconciler<'a> {
    pub fn new(
        repo: &'a dyn Repository,
        client: &'a dyn LedgerClient,
        mapper: &'a AccountMapper<'a>,
    ) -> Self {
        Self {
            repo,
            client,
            mapper,
            force: false,
        }
    }

    /// Also reconsider transactions that already carry a remote id.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn sync_transactions(&self, window_days: i64) -> Result<SyncReport> {
        self.sync_transactions_at(Utc::now(), window_days)
    }

    pub fn sync_transactions_at(&self, now: DateTime<Utc>, window_days: i64) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let window_start = window_start(now, window_days)?;

        let all = self.repo.get_transactions()?;
        info!(count = all.len(), "fetched transactions from local database");

        let mut recent = Vec::new();
        for tx in all {
            let occurred = parse_date(&tx.date)?.and_hms_opt(0, 0, 0).map(|d| d.and_utc());
            if occurred.is_some_and(|d| d > window_start) {
                recent.push(tx);
            }
        }
        report.considered = recent.len();
        info!(count = recent.len(), window_days, "filtered recent transactions");

        let candidates: Vec<Transaction> = recent
            .into_iter()
            .filter(|tx| !tx.reference_number.is_empty() && !tx.is_excluded())
            .filter(|tx| self.force || tx.remote_id == 0)
            .collect();
        report.candidates = candidates.len();

        let remote = self
            .client
            .list_transactions(window_start.date_naive(), now.date_naive())?;
        debug!(count = remote.len(), "fetched remote transactions");

        let mut unsynced = Vec::new();
        let mut matched = Vec::new();
        for mut tx in candidates {
            match find_match(&tx, &remote)? {
                Some(remote_id) => {
                    info!(reference = %tx.reference_number, remote_id, "transaction already synced");
                    tx.remote_id = remote_id;
                    matched.push(tx);
                }
                None => unsynced.push(tx),
            }
        }

        if !unsynced.is_empty() {
            let batch = self.with_mappings(unsynced, &mut report)?;
            if !batch.is_empty() {
                info!(count = batch.len(), "inserting transactions into Lunch Money");
                let ids = self.client.insert_transactions(&batch)?;
                if ids.len() != batch.len() {
                    return Err(SyncError::InsertCountMismatch {
                        expected: batch.len(),
                        got: ids.len(),
                    });
                }
                for (item, id) in batch.into_iter().zip(ids) {
                    let mut tx = item.transaction;
                    tx.remote_id = id;
                    self.repo.update_transaction(&tx)?;
                    report.inserted += 1;
                }
            }
        }

        for tx in &matched {
            self.repo.update_transaction(tx)?;
        }
        report.matched = matched.len();

        Ok(report)
    }

    fn with_mappings(
        &self,
        unsynced: Vec<Transaction>,
        report: &mut SyncReport,
    ) -> Result<Vec<TransactionWithMapping>> {
        let mut batch = Vec::with_capacity(unsynced.len());
        for tx in unsynced {
            let mapping = self.mapper.resolve_for_transaction(&tx)?;
            if mapping.is_ignored() {
                info!(reference = %tx.reference_number, account = %tx.source_account_name, "no account for transaction");
                report.skipped += 1;
                continue;
            }
            if !self
                .repo
                .is_sync_option_enabled(mapping.remote_id, SyncOptions::TRANSACTIONS)?
            {
                debug!(reference = %tx.reference_number, remote_id = mapping.remote_id, "transaction sync disabled");
                report.skipped += 1;
                continue;
            }
            batch.push(TransactionWithMapping {
                transaction: tx,
                mapping,
            });
        }
        Ok(batch)
    }
}
