pub mod accounts;
pub mod config;
pub mod fetch;
pub mod init;
pub mod map;
pub mod repl;
pub mod sync;
pub mod transactions;

use clap::{Parser, Subcommand};

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::repository::SqliteRepository;
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "lunchsync",
    version,
    about = "Reconcile bank and brokerage transactions with Lunch Money."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for lunchsync data (default: ~/.local/share/lunchsync)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Show or change configuration.
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// List all locally stored transactions.
    List,
    /// Add a transaction by hand.
    Add {
        /// Unique reference number
        reference: String,
        /// Amount, e.g. 25.99
        amount: String,
        /// ISO currency code, e.g. USD
        currency: String,
        /// Merchant name (quote it if it has spaces)
        merchant: String,
        /// Date: YYYY-MM-DD
        date: String,
        /// Category code
        #[arg(long, default_value = "PURCHASE")]
        category: String,
        /// Source account name
        #[arg(long, default_value = "Manual Entry")]
        account: String,
    },
    /// Remove a transaction by reference number.
    #[command(alias = "delete")]
    Remove {
        reference: String,
    },
    /// Push new transactions to Lunch Money, then reconcile balances.
    Sync {
        /// Re-match transactions that already have a Lunch Money id
        #[arg(long)]
        force: bool,
        /// How many days back to look (default from settings)
        #[arg(long = "window-days")]
        window_days: Option<i64>,
        /// Pick one account up front for every unmapped transaction source
        #[arg(long = "default-account")]
        default_account: bool,
    },
    /// Fetch transactions and balances from a provider.
    Fetch {
        /// Provider name (csv)
        provider: String,
        /// Statement file
        file: String,
        /// Source account name the rows belong to
        #[arg(long)]
        account: String,
        /// Closing balance of the statement
        #[arg(long, allow_hyphen_values = true)]
        balance: Option<String>,
        /// Currency for rows without one
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// Manage Lunch Money accounts and their sync permissions.
    #[command(alias = "account")]
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Choose (or change) the Lunch Money account for a source account name.
    Map {
        external_name: String,
    },
    /// Start an interactive session.
    Repl,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration.
    Show,
    /// Store the Lunch Money API key.
    SetKey,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List tracked accounts with balances and sync permissions.
    #[command(alias = "l")]
    List,
    /// Stop syncing transactions or balances for an account.
    #[command(alias = "d")]
    Disable {
        /// transaction, balance or all
        option: String,
        /// Lunch Money account id
        id: i64,
    },
    /// Resume syncing transactions or balances for an account.
    #[command(alias = "e")]
    Enable {
        /// transaction, balance or all
        option: String,
        /// Lunch Money account id
        id: i64,
    },
    /// List source account mappings.
    Mappings,
}

pub(crate) fn open_repository(settings: &Settings) -> Result<SqliteRepository> {
    let conn = get_connection(&settings.db_path())?;
    init_db(&conn)?;
    Ok(SqliteRepository::new(conn))
}

pub fn dispatch(command: Commands, settings: &mut Settings) -> Result<()> {
    match command {
        Commands::Init { data_dir } => init::run(settings, data_dir),
        Commands::Config { command } => match command.unwrap_or(ConfigCommands::Show) {
            ConfigCommands::Show => config::show(settings),
            ConfigCommands::SetKey => config::set_key(settings),
        },
        Commands::List => transactions::list(settings),
        Commands::Add {
            reference,
            amount,
            currency,
            merchant,
            date,
            category,
            account,
        } => transactions::add(
            settings,
            transactions::NewTransaction {
                reference,
                amount,
                currency,
                merchant,
                date,
                category,
                account,
            },
        ),
        Commands::Remove { reference } => transactions::remove(settings, &reference),
        Commands::Sync {
            force,
            window_days,
            default_account,
        } => sync::run(settings, force, window_days, default_account),
        Commands::Fetch {
            provider,
            file,
            account,
            balance,
            currency,
        } => fetch::run(settings, &provider, &file, &account, balance, &currency),
        Commands::Accounts { command } => match command {
            AccountsCommands::List => accounts::list(settings),
            AccountsCommands::Disable { option, id } => accounts::disable(settings, &option, id),
            AccountsCommands::Enable { option, id } => accounts::enable(settings, &option, id),
            AccountsCommands::Mappings => accounts::mappings(settings),
        },
        Commands::Map { external_name } => map::run(settings, &external_name),
        Commands::Repl => repl::run(settings),
    }
}
