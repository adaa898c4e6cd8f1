use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::{Authenticator, FetchAccountBalances, FetchTransactions, Provider};
use crate::error::{Result, SyncError};
use crate::models::{Amount, ExternalAccount, Merchant, Transaction};
use crate::money::Money;

pub struct CsvStatementProvider {
    path: PathBuf,
    account_name: String,
    currency: String,
    closing_balance: Option<String>,
}

struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    reference: Option<usize>,
    posted_date: Option<usize>,
    currency: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &::csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| SyncError::Other(format!("statement is missing a `{name}` column")))
        };
        Ok(Self {
            date: required("date")?,
            description: required("description")?,
            amount: required("amount")?,
            reference: find("reference"),
            posted_date: find("posted_date"),
            currency: find("currency"),
        })
    }
}

/// `YYYY-MM-DD` or `MM/DD/YYYY`, normalized to `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// Strip currency symbols and grouping; `(12.50)` becomes `-12.50`.
pub fn normalize_amount(raw: &str) -> String {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    match s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => format!("-{}", inner.trim()),
        None => s.to_string(),
    }
}

fn content_reference(date: &str, amount: &str, description: &str, occurrence: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{date}|{amount}|{description}|{occurrence}"));
    let digest = hex::encode(hasher.finalize());
    format!("csv-{}", &digest[..16])
}

impl CsvStatementProvider {
    pub fn new(
        path: impl Into<PathBuf>,
        account_name: &str,
        currency: &str,
        closing_balance: Option<String>,
    ) -> Self {
        Self {
            path: path.into(),
            account_name: account_name.to_string(),
            currency: currency.to_uppercase(),
            closing_balance,
        }
    }

    fn reader(&self) -> Result<::csv::Reader<std::fs::File>> {
        Ok(::csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(::csv::Trim::All)
            .from_path(&self.path)?)
    }
}

impl Authenticator for CsvStatementProvider {
    /// A statement needs no credentials; make sure it is readable and shaped right.
    fn authenticate(&mut self) -> Result<()> {
        let mut rdr = self.reader()?;
        Columns::from_headers(rdr.headers()?)?;
        if let Some(balance) = &self.closing_balance {
            Money::parse(&normalize_amount(balance), &self.currency)?;
        }
        Ok(())
    }
}

impl FetchTransactions for CsvStatementProvider {
    fn fetch_transactions(&self) -> Result<Vec<Transaction>> {
        let mut rdr = self.reader()?;
        let cols = Columns::from_headers(rdr.headers()?)?;
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut rows = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!(line = line + 2, error = %e, "unreadable statement row");
                    continue;
                }
            };
            let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();
            let opt_field = |i: Option<usize>| i.map(field).filter(|v| !v.is_empty());

            let Some(date) = parse_date(&field(cols.date)) else {
                warn!(line = line + 2, "skipping row with unparseable date");
                continue;
            };
            let description = field(cols.description);
            let amount = normalize_amount(&field(cols.amount));
            let currency = opt_field(cols.currency)
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| self.currency.clone());
            if let Err(e) = Money::parse(&amount, &currency) {
                warn!(line = line + 2, error = %e, "skipping row with invalid amount");
                continue;
            }

            let reference = match opt_field(cols.reference) {
                Some(r) => r,
                None => {
                    let key = format!("{date}|{amount}|{description}");
                    let occurrence = seen.entry(key).or_insert(0);
                    *occurrence += 1;
                    content_reference(&date, &amount, &description, *occurrence)
                }
            };
            let posted_date = opt_field(cols.posted_date)
                .and_then(|p| parse_date(&p))
                .unwrap_or_else(|| date.clone());

            rows.push(Transaction {
                reference_number: reference,
                remote_id: 0,
                amount: Amount::new(amount, currency),
                merchant: Merchant::named(description),
                date,
                posted_date,
                source_account_name: self.account_name.clone(),
            });
        }
        Ok(rows)
    }
}

impl FetchAccountBalances for CsvStatementProvider {
    fn fetch_account_balances(&self) -> Result<Vec<ExternalAccount>> {
        let Some(balance) = &self.closing_balance else {
            return Ok(Vec::new());
        };
        let description = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(vec![ExternalAccount {
            name: self.account_name.clone(),
            description,
            balance: Amount::new(normalize_amount(balance), self.currency.clone()),
        }])
    }
}

impl Provider for CsvStatementProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn transactions(&self) -> Option<&dyn FetchTransactions> {
        Some(self)
    }

    fn balances(&self) -> Option<&dyn FetchAccountBalances> {
        self.closing_balance.as_ref().map(|_| self as &dyn FetchAccountBalances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_statement(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statement.csv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2025-04-29").as_deref(), Some("2025-04-29"));
        assert_eq!(parse_date("04/29/2025").as_deref(), Some("2025-04-29"));
        assert_eq!(parse_date("29.04.2025"), None);
    }

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount("$1,234.56"), "1234.56");
        assert_eq!(normalize_amount("(12.50)"), "-12.50");
        assert_eq!(normalize_amount(" -3 "), "-3");
    }

    #[test]
    fn test_reads_rows_with_and_without_reference() {
        let (_dir, path) = write_statement(
            "Date,Description,Amount,Reference,Currency\n\
             2025-04-29,Coffee,-4.50,REF1,cad\n\
             04/28/2025,Grocery,\"-1,020.00\",,\n",
        );
        let provider = CsvStatementProvider::new(&path, "Visa", "usd", None);
        let rows = provider.fetch_transactions().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reference_number, "REF1");
        assert_eq!(rows[0].amount, Amount::new("-4.50", "CAD"));
        assert_eq!(rows[0].source_account_name, "Visa");
        assert_eq!(rows[1].date, "2025-04-28");
        assert_eq!(rows[1].posted_date, "2025-04-28");
        assert_eq!(rows[1].amount, Amount::new("-1020.00", "USD"));
        assert!(rows[1].reference_number.starts_with("csv-"));
    }

    #[test]
    fn test_generated_references_are_stable_and_distinct() {
        let content = "date,description,amount\n\
                       2025-04-29,Coffee,-4.50\n\
                       2025-04-29,Coffee,-4.50\n";
        let (_dir, path) = write_statement(content);
        let provider = CsvStatementProvider::new(&path, "Visa", "USD", None);
        let first = provider.fetch_transactions().unwrap();
        let second = provider.fetch_transactions().unwrap();
        assert_ne!(first[0].reference_number, first[1].reference_number);
        assert_eq!(first[0].reference_number, second[0].reference_number);
        assert_eq!(first[1].reference_number, second[1].reference_number);
    }

    #[test]
    fn test_bad_rows_skipped() {
        let (_dir, path) = write_statement(
            "date,description,amount\n\
             not-a-date,Coffee,-4.50\n\
             2025-04-29,Coffee,abc\n\
             2025-04-29,Tea,-2.00\n",
        );
        let provider = CsvStatementProvider::new(&path, "Visa", "USD", None);
        let rows = provider.fetch_transactions().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].merchant.name, "Tea");
    }

    #[test]
    fn test_missing_column_fails_authentication() {
        let (_dir, path) = write_statement("date,amount\n2025-04-29,-4.50\n");
        let mut provider = CsvStatementProvider::new(&path, "Visa", "USD", None);
        assert!(provider.authenticate().is_err());
    }

    #[test]
    fn test_missing_file_fails_authentication() {
        let dir = tempfile::tempdir().unwrap();
        let mut provider = CsvStatementProvider::new(dir.path().join("nope.csv"), "Visa", "USD", None);
        assert!(provider.authenticate().is_err());
    }

    #[test]
    fn test_balance_capability_only_with_closing_balance() {
        let (_dir, path) = write_statement("date,description,amount\n");
        let without = CsvStatementProvider::new(&path, "Visa", "USD", None);
        assert!(without.balances().is_none());
        assert!(without.transactions().is_some());

        let with = CsvStatementProvider::new(&path, "Visa", "cad", Some("$1,200.50".into()));
        let accounts = with.balances().unwrap().fetch_account_balances().unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Visa");
        assert_eq!(accounts[0].description, "statement.csv");
        assert_eq!(accounts[0].balance, Amount::new("1200.50", "CAD"));
    }
}
