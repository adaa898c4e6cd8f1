use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

use crate::error::{Result, SyncError};
use crate::models::{
    AccountMapping, AccountSyncState, Amount, Merchant, SyncOptions, Transaction,
};

pub trait Repository {
    fn get_transactions(&self) -> Result<Vec<Transaction>>;
    fn get_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>>;
    /// Insert, or update the existing record with the same reference.
    fn save_transaction(&self, tx: &Transaction) -> Result<()>;
    fn add_manual_transaction(&self, tx: &Transaction) -> Result<()>;
    /// Update by reference. The remote id is only written when it is non-zero.
    fn update_transaction(&self, tx: &Transaction) -> Result<()>;
    fn remove_transaction(&self, reference: &str) -> Result<()>;

    fn get_account_mapping(&self, external_name: &str) -> Result<Option<AccountMapping>>;
    fn upsert_account_mapping(&self, mapping: &AccountMapping) -> Result<()>;
    fn list_account_mappings(&self) -> Result<Vec<AccountMapping>>;

    fn get_accounts(&self) -> Result<Vec<AccountSyncState>>;
    /// Record a provider balance for a mapped account. Unmapped names are skipped, not errors.
    fn upsert_account_balance(&self, external_name: &str, balance: &Amount) -> Result<()>;
    fn is_sync_option_enabled(&self, remote_id: i64, option: SyncOptions) -> Result<bool>;
    fn disable_sync_options(&self, remote_id: i64, options: SyncOptions) -> Result<()>;
    fn enable_sync_options(&self, remote_id: i64, options: SyncOptions) -> Result<()>;
}

pub struct SqliteRepository {
    conn: Connection,
}

const TRANSACTION_COLUMNS: &str = "reference_number, lunchmoney_id, amount_value, amount_currency, \
     merchant_name, merchant_category_code, merchant_city, merchant_state_province, \
     transaction_date, posted_date, source_account_name";

fn row_to_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        reference_number: row.get(0)?,
        remote_id: row.get(1)?,
        amount: Amount {
            value: row.get(2)?,
            currency: row.get(3)?,
        },
        merchant: Merchant {
            name: row.get(4)?,
            category_code: row.get(5)?,
            city: row.get(6)?,
            state_province: row.get(7)?,
        },
        date: row.get(8)?,
        posted_date: row.get(9)?,
        source_account_name: row.get(10)?,
    })
}

fn parse_timestamp(raw: Option<String>) -> Result<Option<DateTime<Utc>>> {
    match raw {
        Some(s) if !s.is_empty() => Ok(Some(DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc))),
        _ => Ok(None),
    }
}

impl SqliteRepository {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO transactions ({TRANSACTION_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            rusqlite::params![
                tx.reference_number,
                tx.remote_id,
                tx.amount.value,
                tx.amount.currency,
                tx.merchant.name,
                tx.merchant.category_code,
                tx.merchant.city,
                tx.merchant.state_province,
                tx.date,
                tx.posted_date,
                tx.source_account_name,
            ],
        )?;
        Ok(())
    }

    pub(crate) fn upsert_account_balance_at(
        &self,
        external_name: &str,
        balance: &Amount,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mapping = match self.get_account_mapping(external_name)? {
            Some(m) if !m.is_ignored() => m,
            _ => {
                info!(external_name, "account not mapped, skip balance update");
                return Ok(());
            }
        };

        self.conn.execute(
            "INSERT INTO account_info (lunchmoney_account_id, balance_value, balance_currency, balance_updated_at, is_plaid) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(lunchmoney_account_id) DO UPDATE SET \
                balance_value = excluded.balance_value, \
                balance_currency = excluded.balance_currency, \
                balance_updated_at = excluded.balance_updated_at, \
                is_plaid = excluded.is_plaid",
            rusqlite::params![
                mapping.remote_id,
                balance.value,
                balance.currency,
                at.to_rfc3339(),
                mapping.is_plaid,
            ],
        )?;
        Ok(())
    }
}

impl Repository for SqliteRepository {
    fn get_transactions(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY transaction_date DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([], row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_transaction_by_reference(&self, reference: &str) -> Result<Option<Transaction>> {
        let tx = self
            .conn
            .query_row(
                &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE reference_number = ?1 LIMIT 1"),
                [reference],
                row_to_transaction,
            )
            .optional()?;
        Ok(tx)
    }

    fn save_transaction(&self, tx: &Transaction) -> Result<()> {
        if !tx.reference_number.is_empty()
            && self.get_transaction_by_reference(&tx.reference_number)?.is_some()
        {
            return self.update_transaction(tx);
        }
        self.insert_transaction(tx)
    }

    fn add_manual_transaction(&self, tx: &Transaction) -> Result<()> {
        if self.get_transaction_by_reference(&tx.reference_number)?.is_some() {
            return Err(SyncError::DuplicateReference(tx.reference_number.clone()));
        }
        self.save_transaction(tx)
    }

    fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        let params = rusqlite::params![
            tx.amount.value,
            tx.amount.currency,
            tx.merchant.name,
            tx.merchant.category_code,
            tx.merchant.city,
            tx.merchant.state_province,
            tx.date,
            tx.posted_date,
            tx.source_account_name,
            tx.reference_number,
            tx.remote_id,
        ];
        let changed = self.conn.execute(
            "UPDATE transactions SET \
                amount_value = ?1, amount_currency = ?2, merchant_name = ?3, \
                merchant_category_code = ?4, merchant_city = ?5, merchant_state_province = ?6, \
                transaction_date = ?7, posted_date = ?8, source_account_name = ?9, \
                lunchmoney_id = CASE WHEN ?11 <> 0 THEN ?11 ELSE lunchmoney_id END \
             WHERE reference_number = ?10",
            params,
        )?;
        if changed == 0 {
            return Err(SyncError::TransactionNotFound(tx.reference_number.clone()));
        }
        Ok(())
    }

    fn remove_transaction(&self, reference: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM transactions WHERE reference_number = ?1", [reference])?;
        if changed == 0 {
            return Err(SyncError::TransactionNotFound(reference.to_string()));
        }
        Ok(())
    }

    fn get_account_mapping(&self, external_name: &str) -> Result<Option<AccountMapping>> {
        let mapped = self
            .conn
            .query_row(
                "SELECT external_name, lunchmoney_account_id, is_plaid FROM account_mappings \
                 WHERE external_name = ?1 LIMIT 1",
                [external_name],
                |row| {
                    Ok(AccountMapping {
                        external_name: row.get(0)?,
                        remote_id: row.get(1)?,
                        is_plaid: row.get(2)?,
                    })
                },
            )
            .optional()?;
        if mapped.is_some() {
            return Ok(mapped);
        }

        let ignored = self
            .conn
            .query_row(
                "SELECT external_name FROM ignored_external_accounts WHERE external_name = ?1",
                [external_name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(ignored.map(AccountMapping::ignored))
    }

    fn upsert_account_mapping(&self, mapping: &AccountMapping) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        if mapping.is_ignored() {
            tx.execute(
                "DELETE FROM account_mappings WHERE external_name = ?1",
                [&mapping.external_name],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO ignored_external_accounts (external_name) VALUES (?1)",
                [&mapping.external_name],
            )?;
        } else {
            tx.execute(
                "DELETE FROM ignored_external_accounts WHERE external_name = ?1",
                [&mapping.external_name],
            )?;
            tx.execute(
                "INSERT INTO account_mappings (external_name, lunchmoney_account_id, is_plaid) \
                 VALUES (?1, ?2, ?3) \
                 ON CONFLICT(external_name) DO UPDATE SET \
                    lunchmoney_account_id = excluded.lunchmoney_account_id, \
                    is_plaid = excluded.is_plaid",
                rusqlite::params![mapping.external_name, mapping.remote_id, mapping.is_plaid],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn list_account_mappings(&self) -> Result<Vec<AccountMapping>> {
        let mut stmt = self.conn.prepare(
            "SELECT external_name, lunchmoney_account_id, is_plaid FROM account_mappings \
             UNION ALL \
             SELECT external_name, -1, 0 FROM ignored_external_accounts \
             ORDER BY external_name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AccountMapping {
                    external_name: row.get(0)?,
                    remote_id: row.get(1)?,
                    is_plaid: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_accounts(&self) -> Result<Vec<AccountSyncState>> {
        let mut stmt = self.conn.prepare(
            "SELECT lunchmoney_account_id, balance_value, balance_currency, balance_updated_at, \
                    is_plaid, sync_strategy \
             FROM account_info WHERE lunchmoney_account_id >= 0 ORDER BY lunchmoney_account_id",
        )?;
        let raw: Vec<(i64, String, String, Option<String>, bool, i64)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(|(remote_id, value, currency, updated, is_plaid, strategy)| {
                Ok(AccountSyncState {
                    remote_id,
                    balance: Amount { value, currency },
                    balance_last_updated: parse_timestamp(updated)?,
                    is_plaid,
                    sync_options: SyncOptions::from_bits(strategy),
                })
            })
            .collect()
    }

    fn upsert_account_balance(&self, external_name: &str, balance: &Amount) -> Result<()> {
        self.upsert_account_balance_at(external_name, balance, Utc::now())
    }

    fn is_sync_option_enabled(&self, remote_id: i64, option: SyncOptions) -> Result<bool> {
        let bits: Option<i64> = self
            .conn
            .query_row(
                "SELECT sync_strategy FROM account_info WHERE lunchmoney_account_id = ?1",
                [remote_id],
                |row| row.get(0),
            )
            .optional()?;
        let options = bits.map(SyncOptions::from_bits).unwrap_or_default();
        Ok(options.contains(option))
    }

    fn disable_sync_options(&self, remote_id: i64, options: SyncOptions) -> Result<()> {
        self.conn.execute(
            "INSERT INTO account_info (lunchmoney_account_id, sync_strategy) VALUES (?1, ?2) \
             ON CONFLICT(lunchmoney_account_id) DO UPDATE SET sync_strategy = sync_strategy & ~?3",
            rusqlite::params![remote_id, SyncOptions::ALL.without(options).bits(), options.bits()],
        )?;
        Ok(())
    }

    fn enable_sync_options(&self, remote_id: i64, options: SyncOptions) -> Result<()> {
        self.conn.execute(
            "INSERT INTO account_info (lunchmoney_account_id, sync_strategy) VALUES (?1, ?2) \
             ON CONFLICT(lunchmoney_account_id) DO UPDATE SET sync_strategy = (sync_strategy | ?3) & ?2",
            rusqlite::params![remote_id, SyncOptions::ALL.bits(), options.bits()],
        )?;
        Ok(())
    }
}
