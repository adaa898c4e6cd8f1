use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Input error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    #[error("Invalid date: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Lunch Money API returned {status}: {body}")]
    Remote { status: u16, body: String },

    #[error("Lunch Money API key not set; run `lunchsync config set-key`")]
    MissingApiKey,

    #[error("Invalid selection")]
    InvalidSelection,

    #[error("Selection cancelled")]
    SelectionCancelled,

    #[error("Failed to insert all transactions, expected {expected}, got {got}")]
    InsertCountMismatch { expected: usize, got: usize },

    #[error("Cannot compare amounts in different currencies: {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid sync window: {0} days")]
    InvalidWindow(i64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("No transaction found with reference number: {0}")]
    TransactionNotFound(String),

    #[error("Transaction with reference number {0} already exists")]
    DuplicateReference(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
