use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{Result, SyncError};
use crate::models::{Amount, Merchant, RemoteAccount, Transaction, TransactionWithMapping};
use crate::settings::Settings;

/// The remote ledger as seen by the reconcilers and the account mapper.
pub trait LedgerClient {
    fn list_accounts(&self) -> Result<Vec<RemoteAccount>>;
    fn list_transactions(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>>;
    /// Returns the created ids in submission order.
    fn insert_transactions(&self, transactions: &[TransactionWithMapping]) -> Result<Vec<i64>>;
    fn update_account_balance(&self, id: i64, balance: &Amount, as_of: DateTime<Utc>) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct AssetsResponse {
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    id: i64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    balance: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    balance_as_of: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionsResponse {
    transactions: Vec<RemoteTransaction>,
}

#[derive(Debug, Deserialize)]
struct RemoteTransaction {
    id: i64,
    date: String,
    #[serde(default)]
    payee: String,
    amount: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    external_id: Option<String>,
    #[serde(default)]
    category_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct InsertRequest<'a> {
    apply_rules: bool,
    transactions: Vec<InsertTransaction<'a>>,
}

#[derive(Debug, Serialize)]
struct InsertTransaction<'a> {
    date: &'a str,
    amount: &'a str,
    currency: String,
    external_id: &'a str,
    payee: &'a str,
    asset_id: i64,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    #[serde(default)]
    ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct UpdateAsset<'a> {
    balance: &'a str,
    currency: String,
    balance_as_of: String,
}

impl From<Asset> for RemoteAccount {
    fn from(a: Asset) -> Self {
        let balance_last_updated = a
            .balance_as_of
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));
        RemoteAccount {
            id: a.id,
            name: a.name,
            display_name: a.display_name.unwrap_or_default(),
            balance: Amount::new(a.balance, a.currency),
            balance_last_updated,
            is_plaid: false,
        }
    }
}

impl From<RemoteTransaction> for Transaction {
    fn from(t: RemoteTransaction) -> Self {
        Transaction {
            reference_number: t.external_id.unwrap_or_default(),
            remote_id: t.id,
            amount: Amount::new(t.amount, t.currency),
            merchant: Merchant {
                name: t.payee,
                category_code: t.category_id.map(|c| c.to_string()),
                ..Default::default()
            },
            date: t.date.clone(),
            posted_date: t.date,
            source_account_name: String::new(),
        }
    }
}

fn insert_request(transactions: &[TransactionWithMapping]) -> InsertRequest<'_> {
    InsertRequest {
        apply_rules: true,
        transactions: transactions
            .iter()
            .map(|t| InsertTransaction {
                date: &t.transaction.date,
                amount: &t.transaction.amount.value,
                currency: t.transaction.amount.currency.to_lowercase(),
                external_id: &t.transaction.reference_number,
                payee: &t.transaction.merchant.name,
                asset_id: t.mapping.remote_id,
            })
            .collect(),
    }
}

/// Lunch Money reports some failures as `200 {"error": ...}`.
fn parse_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if let Some(err) = value.get("error").or_else(|| value.get("errors")) {
        return Err(SyncError::Remote {
            status,
            body: err.to_string(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

pub struct LunchMoneyClient {
    http: Client,
    base_url: String,
    api_key: Zeroizing<String>,
}

impl LunchMoneyClient {
    pub fn new(api_key: Zeroizing<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.api_key()?,
            &settings.api_base_url,
            Duration::from_secs(settings.http_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request
            .bearer_auth(self.api_key.as_str())
            .header("Accept", "application/json")
            .send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(SyncError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        parse_body(status.as_u16(), &body)
    }
}

impl LedgerClient for LunchMoneyClient {
    fn list_accounts(&self) -> Result<Vec<RemoteAccount>> {
        let resp: AssetsResponse = self.send(self.http.get(self.url("assets")))?;
        debug!(count = resp.assets.len(), "fetched Lunch Money assets");
        Ok(resp.assets.into_iter().map(RemoteAccount::from).collect())
    }

    fn list_transactions(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Transaction>> {
        let start = start.format("%Y-%m-%d").to_string();
        let end = end.format("%Y-%m-%d").to_string();
        let request = self
            .http
            .get(self.url("transactions"))
            .query(&[("start_date", start.as_str()), ("end_date", end.as_str())]);
        let resp: TransactionsResponse = self.send(request)?;
        debug!(count = resp.transactions.len(), %start, %end, "fetched Lunch Money transactions");
        Ok(resp.transactions.into_iter().map(Transaction::from).collect())
    }

    fn insert_transactions(&self, transactions: &[TransactionWithMapping]) -> Result<Vec<i64>> {
        let body = insert_request(transactions);
        let resp: InsertResponse = self.send(self.http.post(self.url("transactions")).json(&body))?;
        Ok(resp.ids)
    }

    fn update_account_balance(&self, id: i64, balance: &Amount, as_of: DateTime<Utc>) -> Result<()> {
        let body = UpdateAsset {
            balance: &balance.value,
            currency: balance.currency.to_lowercase(),
            balance_as_of: as_of.to_rfc3339(),
        };
        let _: serde_json::Value = self.send(self.http.put(self.url(&format!("assets/{id}"))).json(&body))?;
        Ok(())
    }
}
