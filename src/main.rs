use anyhow::{bail, Context, Result};
use cashfocus::{
    load_accounts_csv, logging, seed_accounts, seed_default_accounts, Account, Amount,
    LedgerConfig, LedgerStore, Tags, Transaction,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cashfocus", version, about = "Transactional ledger over SQLite")]
struct Cli {
    /// Database file (overrides LEDGER_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reset, seed the sample accounts and run one transfer
    Demo,
    /// Reset and seed accounts
    Seed {
        /// Seed from CSV instead of the sample accounts
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// List accounts and balances
    Accounts,
    /// List transaction records
    History {
        /// Only transfers in or out of this account
        #[arg(long)]
        account: Option<String>,
    },
    /// Move money between two accounts
    Transfer {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: Amount,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "transfer")]
        category: String,
        /// Tag as key=value, repeatable
        #[arg(long = "tag", value_parser = parse_tag)]
        tags: Vec<(String, String)>,
        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got {:?}", raw)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = LedgerConfig::from_env()?;
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    let ledger = LedgerStore::open(&config)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

    match cli.command.unwrap_or(Command::Demo) {
        Command::Demo => run_demo(&ledger)?,
        Command::Seed { csv } => run_seed(&ledger, csv)?,
        Command::Accounts => print_accounts(&ledger)?,
        Command::History { account } => print_history(&ledger, account.as_deref())?,
        Command::Transfer {
            from,
            to,
            amount,
            description,
            category,
            tags,
            timeout_ms,
        } => {
            let tags: Tags = tags.into_iter().collect();
            let timeout = timeout_ms.map(Duration::from_millis).or(config.transfer_timeout);
            run_transfer(&ledger, &from, &to, amount, &description, &category, tags, timeout)?
        }
    }

    ledger.close()?;
    Ok(())
}

fn run_demo(ledger: &LedgerStore) -> Result<()> {
    println!("🏦 Cashfocus - Ledger Demo");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n🔧 Resetting collections and seeding accounts...");
    seed_default_accounts(ledger)?;

    println!("\n📊 Initial balances:");
    print_balances(&ledger.accounts()?);

    println!("\n💸 Transferring 500.00 from 12345 to 67890...");
    let mut tags = Tags::new();
    tags.insert("purpose".to_string(), "emergency fund".to_string());
    tags.insert("method".to_string(), "online banking".to_string());
    let tx = ledger.transfer(
        "12345",
        "67890",
        Amount::from_minor_units(50_000),
        "Transfer to savings",
        "transfer",
        tags,
    )?;
    println!("✓ Transfer committed: {}", tx.transaction_id);

    println!("\n📊 Updated balances:");
    print_balances(&ledger.accounts()?);

    println!("\n📜 Transaction history:");
    print_transactions(&ledger.transactions()?);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Demo complete");
    Ok(())
}

fn run_seed(ledger: &LedgerStore, csv: Option<PathBuf>) -> Result<()> {
    let seeded = match csv {
        Some(path) => {
            println!("📂 Loading accounts from {}...", path.display());
            seed_accounts(ledger, load_accounts_csv(&path)?)?
        }
        None => seed_default_accounts(ledger)?,
    };
    println!("✓ Seeded {} accounts", seeded.len());
    print_balances(&seeded);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_transfer(
    ledger: &LedgerStore,
    from: &str,
    to: &str,
    amount: Amount,
    description: &str,
    category: &str,
    tags: Tags,
    timeout: Option<Duration>,
) -> Result<()> {
    let tx = match timeout {
        Some(timeout) => {
            ledger.transfer_with_timeout(from, to, amount, description, category, tags, timeout)?
        }
        None => ledger.transfer(from, to, amount, description, category, tags)?,
    };

    println!("✓ Transfer committed");
    print_transactions(std::slice::from_ref(&tx));
    println!();
    print_balances(&ledger.accounts()?);
    Ok(())
}

fn print_accounts(ledger: &LedgerStore) -> Result<()> {
    let accounts = ledger.accounts()?;
    if accounts.is_empty() {
        bail!("No accounts found. Run `cashfocus seed` first.");
    }
    print_balances(&accounts);
    println!("   {:<28} {:>12}", "Total", ledger.total_balance()?);
    Ok(())
}

fn print_history(ledger: &LedgerStore, account: Option<&str>) -> Result<()> {
    let transactions = match account {
        Some(account_id) => ledger.account_history(account_id)?,
        None => ledger.transactions()?,
    };
    if transactions.is_empty() {
        println!("No transactions recorded");
    } else {
        print_transactions(&transactions);
    }
    Ok(())
}

fn print_balances(accounts: &[Account]) {
    for account in accounts {
        println!(
            "   {:<8} {:<19} {:>12}  {} ({})",
            account.account_id, account.name, account.balance, account.account_type, account.status
        );
    }
}

fn print_transactions(transactions: &[Transaction]) {
    for tx in transactions {
        println!("   {}", tx.transaction_id);
        println!(
            "     {} → {}  {}  [{}]",
            tx.from_account, tx.to_account, tx.amount, tx.category
        );
        println!("     {}  {}", tx.transaction_date.format("%Y-%m-%d %H:%M:%S"), tx.description);
        for (key, value) in &tx.tags {
            println!("     #{}={}", key, value);
        }
    }
}
