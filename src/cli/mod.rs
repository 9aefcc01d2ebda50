use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::application::{AppError, BeneficiaryDirectory, LedgerStore};
use crate::domain::{
    AccountDetails, FieldState, IbanMode, evaluate_iban, format_cents, parse_cents,
};
use crate::io::transaction_time;
use crate::storage::SqliteStore;

/// Serdao - payments against a local balance, with a beneficiary book
#[derive(Parser)]
#[command(name = "serdao")]
#[command(about = "Record payments against a locally stored balance and manage beneficiaries")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, global = true, default_value = "serdao.db")]
    pub database: String,

    /// Accept any IBAN starting with two letters (for manual testing)
    #[arg(long, global = true)]
    pub simple_iban: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed the starting balance
    Init,

    /// Show the current balance
    Balance,

    /// List past transactions, newest first
    History {
        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Send money to a recipient
    Send {
        /// Amount to send (e.g., "250.50" or "100")
        amount: String,

        /// Recipient name
        #[arg(long, conflicts_with = "beneficiary", requires = "iban")]
        name: Option<String>,

        /// Recipient IBAN
        #[arg(long, conflicts_with = "beneficiary", requires = "name")]
        iban: Option<String>,

        /// Saved beneficiary id to send to
        #[arg(short, long)]
        beneficiary: Option<i64>,
    },

    /// Beneficiary management commands
    #[command(subcommand)]
    Beneficiary(BeneficiaryCommands),

    /// IBAN helpers
    #[command(subcommand)]
    Iban(IbanCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: transactions, beneficiaries, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (default: csv, json for full)
        #[arg(short, long)]
        format: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum BeneficiaryCommands {
    /// Save a new beneficiary
    Add {
        /// First name
        first_name: String,

        /// Last name
        last_name: String,

        /// IBAN (spaces allowed)
        iban: String,
    },

    /// List saved beneficiaries
    List,

    /// Search beneficiaries by name
    Search {
        /// Case-insensitive part of "first last"
        query: String,
    },

    /// Show one beneficiary
    Show {
        /// Beneficiary id
        id: i64,
    },

    /// Delete a beneficiary
    Remove {
        /// Beneficiary id
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum IbanCommands {
    /// Print an IBAN in groups of four
    Format {
        /// Raw IBAN
        iban: String,
    },

    /// Check an IBAN and print its grouped form
    Check {
        /// Raw IBAN
        iban: String,
    },
}

impl Cli {
    fn iban_mode(&self) -> IbanMode {
        if self.simple_iban {
            IbanMode::Simple
        } else {
            IbanMode::Strict
        }
    }

    /// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
    pub fn init_logging(&self) {
        let default_level = if self.verbose { "info" } else { "warn" };
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    pub async fn run(self) -> Result<()> {
        let mode = self.iban_mode();

        // IBAN helpers need no database
        if let Commands::Iban(cmd) = &self.command {
            return run_iban_command(mode, cmd);
        }

        let store = SqliteStore::open(&self.database)
            .await
            .with_context(|| format!("Failed to open database: {}", self.database))?;

        match self.command {
            Commands::Init => {
                let ledger = LedgerStore::initialize(store).await;
                println!("Database initialized: {}", self.database);
                println!("Balance: {}", format_cents(ledger.balance()));
            }

            Commands::Balance => {
                let ledger = LedgerStore::initialize(store).await;
                println!("{}", format_cents(ledger.balance()));
            }

            Commands::History { limit } => {
                let ledger = LedgerStore::initialize(store).await;
                run_history_command(&ledger, limit);
            }

            Commands::Send {
                amount,
                name,
                iban,
                beneficiary,
            } => {
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '250.50' or '250'")?;

                let account = match (beneficiary, name, iban) {
                    (Some(id), _, _) => {
                        let mut directory = BeneficiaryDirectory::new(store.clone(), mode);
                        directory.get(id).await?.to_account()
                    }
                    (None, Some(name), Some(iban)) => {
                        let input = evaluate_iban(mode, &iban);
                        if !input.is_valid() {
                            return Err(AppError::InvalidIban(input.formatted).into());
                        }
                        AccountDetails::new(name, input.formatted)
                    }
                    _ => anyhow::bail!("Provide either --beneficiary or both --name and --iban"),
                };

                let mut ledger = LedgerStore::initialize(store).await;
                let receipt = ledger.add_transaction(amount_cents, account).await?;

                println!(
                    "Sent {} to {} ({})",
                    format_cents(receipt.transaction.amount),
                    receipt.transaction.account.name,
                    receipt.transaction.account.iban
                );
                println!("New balance: {}", format_cents(receipt.balance));
                if !receipt.persisted {
                    eprintln!("Warning: the transaction could not be saved");
                }
            }

            Commands::Beneficiary(cmd) => {
                let mut directory = BeneficiaryDirectory::new(store, mode);
                run_beneficiary_command(&mut directory, cmd).await?;
            }

            Commands::Export {
                export_type,
                output,
                format,
            } => {
                let ledger = LedgerStore::initialize(store.clone()).await;
                let mut directory = BeneficiaryDirectory::new(store, mode);
                let beneficiaries = directory.list().await;
                run_export_command(
                    &ledger,
                    &beneficiaries,
                    &export_type,
                    output.as_deref(),
                    format.as_deref(),
                )?;
            }

            Commands::Iban(cmd) => run_iban_command(mode, &cmd)?,
        }

        Ok(())
    }
}

fn run_history_command(ledger: &LedgerStore<SqliteStore>, limit: Option<usize>) {
    if ledger.transactions().is_empty() {
        println!("No transactions available.");
        return;
    }

    println!(
        "{:<15} {:<20} {:>12} {:<20} IBAN",
        "ID", "DATE", "AMOUNT", "NAME"
    );
    println!("{}", "-".repeat(100));

    for tx in ledger.history().take(limit.unwrap_or(usize::MAX)) {
        let date = transaction_time(tx.id);
        println!(
            "{:<15} {:<20} {:>12} {:<20} {}",
            tx.id,
            date.get(..19).unwrap_or(date.as_str()),
            format!("-{}", format_cents(tx.amount)),
            truncate(&tx.account.name, 20),
            tx.account.iban
        );
    }
}

async fn run_beneficiary_command(
    directory: &mut BeneficiaryDirectory<SqliteStore>,
    cmd: BeneficiaryCommands,
) -> Result<()> {
    match cmd {
        BeneficiaryCommands::Add {
            first_name,
            last_name,
            iban,
        } => {
            let added = directory.add(&first_name, &last_name, &iban).await?;
            println!(
                "Added beneficiary {}: {} ({})",
                added.id,
                added.full_name(),
                added.iban
            );
        }

        BeneficiaryCommands::List => {
            let beneficiaries = directory.list().await;
            print_beneficiaries(&beneficiaries);
        }

        BeneficiaryCommands::Search { query } => {
            let beneficiaries = directory.search(&query).await;
            print_beneficiaries(&beneficiaries);
        }

        BeneficiaryCommands::Show { id } => {
            let b = directory.get(id).await?;
            println!("Beneficiary: {}", b.full_name());
            println!("  ID:   {}", b.id);
            println!("  IBAN: {}", b.iban);
        }

        BeneficiaryCommands::Remove { id, yes } => {
            let target = directory.get(id).await?;
            if !yes && !confirm(&format!("Are you sure you want to delete {}?", target.full_name()))? {
                println!("Cancelled.");
                return Ok(());
            }
            let removal = directory.remove(id).await?;
            println!("Removed beneficiary: {}", removal.beneficiary.full_name());
            if !removal.persisted {
                eprintln!("Warning: the removal could not be saved");
            }
        }
    }
    Ok(())
}

fn print_beneficiaries(beneficiaries: &[crate::domain::Beneficiary]) {
    if beneficiaries.is_empty() {
        println!("No data found");
        return;
    }
    println!("{:<6} {:<30} IBAN", "ID", "NAME");
    println!("{}", "-".repeat(72));
    for b in beneficiaries {
        println!("{:<6} {:<30} {}", b.id, truncate(&b.full_name(), 30), b.iban);
    }
}

fn run_iban_command(mode: IbanMode, cmd: &IbanCommands) -> Result<()> {
    match cmd {
        IbanCommands::Format { iban } => {
            println!("{}", crate::domain::format_iban(iban));
        }
        IbanCommands::Check { iban } => {
            let input = evaluate_iban(mode, iban);
            match input.state {
                FieldState::Valid => println!("{}: valid ({})", input.formatted, mode.as_str()),
                FieldState::Invalid => {
                    anyhow::bail!("{}: IBAN is invalid ({})", input.formatted, mode.as_str())
                }
                FieldState::Empty => anyhow::bail!("IBAN is empty"),
            }
        }
    }
    Ok(())
}

fn run_export_command(
    ledger: &LedgerStore<SqliteStore>,
    beneficiaries: &[crate::domain::Beneficiary],
    export_type: &str,
    output: Option<&str>,
    format: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(ledger, beneficiaries);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let json = match format {
        None | Some("csv") => false,
        Some("json") => true,
        Some(other) => anyhow::bail!("Invalid format '{}'. Valid formats: csv, json", other),
    };

    match export_type {
        "transactions" => {
            let count = if json {
                exporter.export_transactions_json(writer)?
            } else {
                exporter.export_transactions_csv(writer)?
            };
            if output.is_some() {
                eprintln!("Exported {} transactions", count);
            }
        }
        "beneficiaries" => {
            let count = if json {
                exporter.export_beneficiaries_json(writer)?
            } else {
                exporter.export_beneficiaries_csv(writer)?
            };
            if output.is_some() {
                eprintln!("Exported {} beneficiaries", count);
            }
        }
        "full" => {
            if format == Some("csv") {
                anyhow::bail!("Full export is only available as JSON");
            }
            let snapshot = exporter.export_full_json(writer)?;
            if output.is_some() {
                eprintln!(
                    "Exported full snapshot: {} transactions, {} beneficiaries",
                    snapshot.transactions.len(),
                    snapshot.beneficiaries.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: transactions, beneficiaries, full",
                export_type
            );
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::{BufRead, Write};

    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
