//! Command-line front end for the foreign-currency ledger.

use std::io::{self, BufRead as _, Write as _};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, Table};
use forex_ledger::balance::Balances;
use forex_ledger::cache::{
    CacheConfig, CacheStorage, DEFAULT_ORIGIN, FetchOutcome, Fetcher, FileCacheStorage,
    HttpFetcher, Method, OfflineCache, Request,
};
use forex_ledger::error::ForexError;
use forex_ledger::format::format_amount;
use forex_ledger::ledger::{Confirm, DeleteOutcome, TransactionFilter};
use forex_ledger::models::{
    InputField, NaiveDate, Transaction, TransactionId, TransactionInput, TransactionKind,
    currency,
};
use forex_ledger::storage::{FileStore, KeyValueStore};
use forex_ledger::tracker::CurrencyTracker;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Sub-directory of the data directory holding the offline cache.
const CACHE_DIR: &str = "cache";

/// Track foreign banknote purchases and sales against the rupiah.
#[derive(Debug, Parser)]
#[command(name = "forex-ledger", version, about)]
struct Cli {
    /// Override the storage directory (default: XDG data dir).
    #[arg(long, global = true, value_name = "DIR", env = "FOREX_LEDGER_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Origin the app shell is served from.
    #[arg(long, global = true, env = "FOREX_LEDGER_ORIGIN", default_value = DEFAULT_ORIGIN)]
    origin: String,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Ledger subcommands.
    #[command(flatten)]
    Ledger(LedgerCommand),
    /// Manage the offline asset cache.
    #[command(subcommand)]
    Cache(CacheCommand),
}

/// Subcommands operating on the transaction ledger.
#[derive(Debug, Subcommand)]
enum LedgerCommand {
    /// Record a buy or sell transaction.
    Add(AddArgs),
    /// List transactions, newest first.
    History(HistoryArgs),
    /// Show foreign currency balances.
    Balances,
    /// Delete a transaction by id.
    Delete {
        /// Transaction id.
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
    /// List supported currencies.
    Currencies,
}

/// Offline cache subcommands.
#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Precache the app shell.
    Install,
    /// Purge old cache versions.
    Activate,
    /// Fetch a URL through the cache.
    Fetch {
        /// Absolute URL to fetch.
        url: String,
        /// HTTP method.
        #[arg(long, default_value = "GET")]
        method: Method,
    },
    /// List cached entries.
    List,
}

/// Arguments for the `add` subcommand.
///
/// Values are passed through as typed so the ledger validates them.
#[derive(Debug, Args)]
struct AddArgs {
    /// `buy` or `sell`.
    #[arg(long)]
    kind: String,
    /// Foreign currency code, e.g. USD.
    #[arg(long)]
    currency: String,
    /// Face value per note.
    #[arg(long)]
    denomination: String,
    /// Number of notes.
    #[arg(long)]
    count: String,
    /// Rupiah per foreign unit.
    #[arg(long)]
    rate: String,
    /// Transaction date, YYYY-MM-DD (default: today).
    #[arg(long)]
    date: Option<String>,
    /// Free-text notes.
    #[arg(long)]
    notes: Option<String>,
}

impl AddArgs {
    /// Converts the arguments into raw ledger input.
    fn into_input(self, today: NaiveDate) -> TransactionInput {
        TransactionInput {
            date: self
                .date
                .unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
            kind: self.kind,
            foreign_currency_code: self.currency,
            denomination: self.denomination,
            notes_count: self.count,
            exchange_rate_to_base: self.rate,
            notes: self.notes.unwrap_or_default(),
        }
    }
}

/// Arguments for the `history` subcommand.
#[derive(Debug, Args)]
struct HistoryArgs {
    /// Only this foreign currency.
    #[arg(long)]
    currency: Option<String>,
    /// Only buys or only sells.
    #[arg(long)]
    kind: Option<TransactionKind>,
    /// Start date (inclusive, YYYY-MM-DD). Requires --to.
    #[arg(long, requires = "to", value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// End date (inclusive, YYYY-MM-DD). Requires --from.
    #[arg(long, requires = "from", value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Notes substring (case-insensitive).
    #[arg(long)]
    search: Option<String>,
}

/// Parses a date string in `YYYY-MM-DD` format for clap.
fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|err| format!("{err}"))
}

/// Asks for confirmation on stdin.
#[derive(Debug)]
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, transaction: &Transaction) -> bool {
        let prompt = || -> io::Result<bool> {
            let mut out = io::stdout().lock();
            write!(
                out,
                "Delete {} {} {} from {}? [y/N] ",
                transaction.kind(),
                format_amount(transaction.total_foreign(), 2, 2),
                transaction.foreign_currency_code(),
                transaction.date()
            )?;
            out.flush()?;
            let mut answer = String::new();
            _ = io::stdin().lock().read_line(&mut answer)?;
            Ok(is_yes(&answer))
        };
        prompt().unwrap_or(false)
    }
}

/// Returns `true` for an affirmative answer.
fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Runs the CLI, returning an appropriate exit code.
fn run() -> io::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    let data_dir = match resolve_data_dir(cli.data_dir) {
        Ok(dir) => dir,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to locate data directory: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let command = match cli.command {
        Command::Ledger(command) => command,
        Command::Cache(command) => return run_cache(&data_dir, &cli.origin, command),
    };

    let store = match FileStore::new(data_dir) {
        Ok(store) => store,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to initialize storage: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };
    let mut tracker = CurrencyTracker::open(store);
    print_notice(&tracker)?;

    dispatch(&mut tracker, command)
}

/// Uses `data_dir` if provided or the default XDG data directory.
fn resolve_data_dir(data_dir: Option<PathBuf>) -> forex_ledger::error::Result<PathBuf> {
    data_dir.map_or_else(FileStore::default_dir, Ok)
}

/// Dispatches a ledger subcommand.
fn dispatch<S: KeyValueStore>(
    tracker: &mut CurrencyTracker<S>,
    command: LedgerCommand,
) -> io::Result<ExitCode> {
    match command {
        LedgerCommand::Add(args) => {
            let today = chrono::Local::now().date_naive();
            cmd_add(tracker, &args.into_input(today))
        }
        LedgerCommand::History(args) => cmd_history(tracker, &args),
        LedgerCommand::Balances => cmd_balances(tracker),
        LedgerCommand::Delete { id, yes } => {
            let id = TransactionId::from(id.as_str());
            if yes {
                cmd_delete(tracker, &id, &mut |_: &Transaction| true)
            } else {
                cmd_delete(tracker, &id, &mut StdinConfirm)
            }
        }
        LedgerCommand::Currencies => cmd_currencies(),
    }
}

/// Executes the `add` subcommand.
fn cmd_add<S: KeyValueStore>(
    tracker: &mut CurrencyTracker<S>,
    input: &TransactionInput,
) -> io::Result<ExitCode> {
    match tracker.submit(input) {
        Ok(tx) => {
            let mut out = io::stdout().lock();
            writeln!(
                out,
                "{} {} {} {} {}",
                "Recorded".green().bold(),
                tx.kind(),
                format_amount(tx.total_foreign(), 2, 2),
                tx.foreign_currency_code(),
                format_args!("({} IDR, id {})", format_amount(tx.total_base(), 2, 2), tx.id())
                    .dimmed()
            )?;
            print_notice(tracker)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let mut stderr = io::stderr().lock();
            writeln!(stderr, "{} {err}", "error:".red().bold())?;
            writeln!(
                stderr,
                "  {} check {}",
                "hint:".cyan(),
                field_label(err.field()).bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Command-line flag corresponding to an input field.
const fn field_label(field: InputField) -> &'static str {
    match field {
        InputField::Date => "--date",
        InputField::Kind => "--kind",
        InputField::Currency => "--currency",
        InputField::Denomination => "--denomination",
        InputField::NotesCount => "--count",
        InputField::ExchangeRate => "--rate",
    }
}

/// Builds a [`TransactionFilter`] from CLI arguments.
fn build_transaction_filter(args: &HistoryArgs) -> TransactionFilter {
    let mut filter = TransactionFilter::new();
    if let Some(code) = args.currency.as_deref() {
        filter = filter.currency(code);
    }
    if let Some(kind) = args.kind {
        filter = filter.kind(kind);
    }
    if let Some((from_date, to_date)) = args.from.zip(args.to) {
        filter = filter.date_range(from_date, to_date);
    }
    if let Some(text) = args.search.as_deref() {
        filter = filter.notes(text);
    }
    filter
}

/// Executes the `history` subcommand.
fn cmd_history<S: KeyValueStore>(
    tracker: &CurrencyTracker<S>,
    args: &HistoryArgs,
) -> io::Result<ExitCode> {
    let filter = build_transaction_filter(args);
    print_transactions_table(&tracker.filter(&filter))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `balances` subcommand.
fn cmd_balances<S: KeyValueStore>(tracker: &CurrencyTracker<S>) -> io::Result<ExitCode> {
    print_balances_table(&tracker.balances())?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `delete` subcommand.
fn cmd_delete<S, C>(
    tracker: &mut CurrencyTracker<S>,
    id: &TransactionId,
    confirm: &mut C,
) -> io::Result<ExitCode>
where
    S: KeyValueStore,
    C: Confirm + ?Sized,
{
    match tracker.delete(id, confirm) {
        DeleteOutcome::Removed(tx) => {
            writeln!(
                io::stdout().lock(),
                "{} transaction {}",
                "Deleted".green().bold(),
                tx.id()
            )?;
            print_notice(tracker)?;
            Ok(ExitCode::SUCCESS)
        }
        DeleteOutcome::Declined => {
            writeln!(io::stdout().lock(), "{}", "Nothing deleted.".dimmed())?;
            Ok(ExitCode::SUCCESS)
        }
        DeleteOutcome::NotFound => {
            writeln!(
                io::stderr().lock(),
                "{} transaction not found: {id}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes the `currencies` subcommand.
fn cmd_currencies() -> io::Result<ExitCode> {
    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Code").fg(Color::Cyan),
        Cell::new("Name").fg(Color::Cyan),
    ]);
    for entry in currency::CURRENCIES {
        let code_cell = if entry.is_base() {
            Cell::new(entry.code).fg(Color::Yellow)
        } else {
            Cell::new(entry.code)
        };
        _ = table.add_row(vec![code_cell, Cell::new(entry.name)]);
    }
    let mut out = io::stdout().lock();
    writeln!(out, "{}", "Supported Currencies".green().bold())?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(ExitCode::SUCCESS)
}

// ── Offline cache ────────────────────────────────────────────────────

/// Builds the offline cache and runs a cache subcommand to completion.
fn run_cache(data_dir: &Path, origin: &str, command: CacheCommand) -> io::Result<ExitCode> {
    let cache = match build_cache(data_dir, origin) {
        Ok(cache) => cache,
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to set up offline cache: {err}",
                "error:".red().bold()
            )?;
            return Ok(ExitCode::FAILURE);
        }
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch_cache(&cache, command))
}

/// Creates the file-backed offline cache under `<data_dir>/cache`.
fn build_cache(
    data_dir: &Path,
    origin: &str,
) -> forex_ledger::error::Result<OfflineCache<FileCacheStorage, HttpFetcher>> {
    let config = CacheConfig::parse(origin)?;
    let storage = FileCacheStorage::new(&data_dir.join(CACHE_DIR))?;
    let fetcher = HttpFetcher::new(config.origin().clone())?;
    Ok(OfflineCache::new(config, storage, fetcher))
}

/// Dispatches a cache subcommand.
async fn dispatch_cache<S: CacheStorage, F: Fetcher>(
    cache: &OfflineCache<S, F>,
    command: CacheCommand,
) -> io::Result<ExitCode> {
    match command {
        CacheCommand::Install => cmd_cache_install(cache).await,
        CacheCommand::Activate => cmd_cache_activate(cache).await,
        CacheCommand::Fetch { url, method } => cmd_cache_fetch(cache, method, &url).await,
        CacheCommand::List => cmd_cache_list(cache).await,
    }
}

/// Executes `cache install`.
async fn cmd_cache_install<S: CacheStorage, F: Fetcher>(
    cache: &OfflineCache<S, F>,
) -> io::Result<ExitCode> {
    let spinner = make_spinner("Caching app shell...");
    let result = cache.install().await;
    spinner.finish_and_clear();
    match result {
        Ok(count) => {
            writeln!(
                io::stdout().lock(),
                "{} {}",
                "Installed".green().bold(),
                format_args!("({count} resources in {})", cache.config().name()).dimmed()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} install failed: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes `cache activate`.
async fn cmd_cache_activate<S: CacheStorage, F: Fetcher>(
    cache: &OfflineCache<S, F>,
) -> io::Result<ExitCode> {
    match cache.activate().await {
        Ok(deleted) => {
            let mut out = io::stdout().lock();
            writeln!(out, "{} {}", "Activated".green().bold(), cache.config().name())?;
            for name in &deleted {
                writeln!(out, "  {} {name}", "deleted".dimmed())?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} activate failed: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes `cache fetch`.
async fn cmd_cache_fetch<S: CacheStorage, F: Fetcher>(
    cache: &OfflineCache<S, F>,
    method: Method,
    url: &str,
) -> io::Result<ExitCode> {
    let request = match Request::parse(method, url) {
        Ok(request) => request,
        Err(err) => {
            writeln!(io::stderr().lock(), "{} {err}", "error:".red().bold())?;
            return Ok(ExitCode::FAILURE);
        }
    };

    let outcome = match cache.handle_fetch(&request).await {
        Ok(FetchOutcome::PassThrough) => cache
            .fetcher()
            .fetch(&request)
            .await
            .map(|response| ("network", response)),
        Ok(FetchOutcome::Hit(response)) => Ok(("cache hit", response)),
        Ok(FetchOutcome::Miss {
            response,
            cached: true,
        }) => Ok(("network, cached", response)),
        Ok(FetchOutcome::Miss {
            response,
            cached: false,
        }) => Ok(("network, not cached", response)),
        Err(err) => Err(err),
    };

    match outcome {
        Ok((source, response)) => {
            writeln!(
                io::stdout().lock(),
                "{} {} {}",
                response.status.bold(),
                request.url(),
                format_args!("({source}, {} bytes)", response.body.len()).dimmed()
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} fetch failed: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Executes `cache list`.
async fn cmd_cache_list<S: CacheStorage, F: Fetcher>(
    cache: &OfflineCache<S, F>,
) -> io::Result<ExitCode> {
    let listing = async {
        let mut rows = Vec::new();
        for name in cache.storage().keys().await? {
            for key in cache.storage().requests(&name).await? {
                rows.push((name.clone(), key));
            }
        }
        Ok::<_, ForexError>(rows)
    };

    match listing.await {
        Ok(rows) => {
            let mut out = io::stdout().lock();
            if rows.is_empty() {
                writeln!(out, "{}", "Cache is empty.".dimmed())?;
                return Ok(ExitCode::SUCCESS);
            }
            let mut table = Table::new();
            _ = table.load_preset(UTF8_FULL);
            _ = table.set_header(vec![
                Cell::new("Cache").fg(Color::Cyan),
                Cell::new("Method").fg(Color::Cyan),
                Cell::new("URL").fg(Color::Cyan),
            ]);
            for (name, key) in &rows {
                let name_cell = if name == cache.config().name() {
                    Cell::new(name).fg(Color::Green)
                } else {
                    Cell::new(name).fg(Color::DarkGrey)
                };
                _ = table.add_row(vec![name_cell, Cell::new(key.method), Cell::new(&key.url)]);
            }
            writeln!(
                out,
                "{} {}",
                "Cached Entries".green().bold(),
                format_args!("({})", rows.len()).dimmed()
            )?;
            writeln!(out)?;
            writeln!(out, "{table}")?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            writeln!(
                io::stderr().lock(),
                "{} failed to read cache: {err}",
                "error:".red().bold()
            )?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ── Output formatting ────────────────────────────────────────────────

/// Prints a pending persistence notice, if any.
fn print_notice<S: KeyValueStore>(tracker: &CurrencyTracker<S>) -> io::Result<()> {
    if let Some(notice) = tracker.notice() {
        writeln!(io::stderr().lock(), "{} {notice}", "warning:".yellow().bold())?;
    }
    Ok(())
}

/// Right-aligned amount cell.
fn amount_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Prints transactions in a table.
fn print_transactions_table(txs: &[&Transaction]) -> io::Result<()> {
    let mut out = io::stdout().lock();
    if txs.is_empty() {
        writeln!(out, "{}", "No transactions found.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Date").fg(Color::Cyan),
        Cell::new("Type").fg(Color::Cyan),
        Cell::new("Currency").fg(Color::Cyan),
        Cell::new("Denomination").fg(Color::Cyan),
        Cell::new("Notes").fg(Color::Cyan),
        Cell::new("Rate (IDR)").fg(Color::Cyan),
        Cell::new("Total").fg(Color::Cyan),
        Cell::new("Total (IDR)").fg(Color::Cyan),
        Cell::new("Remarks").fg(Color::Cyan),
        Cell::new("ID").fg(Color::Cyan),
    ]);

    for tx in txs {
        let kind_cell = match tx.kind() {
            TransactionKind::Buy => Cell::new(tx.kind()).fg(Color::Green),
            TransactionKind::Sell => Cell::new(tx.kind()).fg(Color::Red),
        };
        let code = tx.foreign_currency_code();
        _ = table.add_row(vec![
            Cell::new(tx.date()),
            kind_cell,
            Cell::new(currency::display_name(code.as_inner())),
            amount_cell(format_amount(tx.denomination(), 2, 2)),
            amount_cell(format_amount(f64::from(tx.notes_count()), 0, 0)),
            amount_cell(format!(
                "1 {code} = {}",
                format_amount(tx.exchange_rate_to_base(), 2, 4)
            )),
            amount_cell(format!("{} {code}", format_amount(tx.total_foreign(), 2, 2))),
            amount_cell(format_amount(tx.total_base(), 2, 2)),
            Cell::new(tx.notes().unwrap_or("")),
            Cell::new(tx.id()).fg(Color::DarkGrey),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Transactions".green().bold(),
        format_args!("({})", txs.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Prints the available foreign balances in a table.
fn print_balances_table(balances: &Balances) -> io::Result<()> {
    let mut out = io::stdout().lock();
    let available = balances.available_foreign();
    if available.is_empty() {
        writeln!(out, "{}", "No foreign currency on hand.".dimmed())?;
        return Ok(());
    }

    let mut table = Table::new();
    _ = table.load_preset(UTF8_FULL);
    _ = table.set_header(vec![
        Cell::new("Currency").fg(Color::Cyan),
        Cell::new("Balance").fg(Color::Cyan),
    ]);
    for (code, balance) in &available {
        _ = table.add_row(vec![
            Cell::new(currency::display_name(code.as_inner())),
            amount_cell(format_amount(*balance, 2, 2)),
        ]);
    }

    writeln!(
        out,
        "{} {}",
        "Balances".green().bold(),
        format_args!("({})", available.len()).dimmed()
    )?;
    writeln!(out)?;
    writeln!(out, "{table}")?;
    Ok(())
}

/// Creates a spinner with the given message.
fn make_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_owned());
    spinner.enable_steady_tick(core::time::Duration::from_millis(80));
    spinner
}

/// Entry point.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let _ignored = writeln!(io::stderr(), "fatal I/O error: {err}");
            ExitCode::FAILURE
        }
    }
}
