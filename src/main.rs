use clap::{Parser, Subcommand};
use eduledger::application::engine::ProgramEngine;
use eduledger::config::Config;
use eduledger::domain::ports::{
    NotificationSenderBox, PaymentGatewayBox, PaymentStoreBox, ProgramStore, ProgramStoreBox,
};
use eduledger::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryProgramStore};
use eduledger::infrastructure::notify::LogNotifier;
use eduledger::infrastructure::paystack::{DisabledGateway, PaystackGateway};
use eduledger::infrastructure::policy::StaticAdminPolicy;
use eduledger::interfaces::csv::statement_writer::StatementWriter;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Freeze approved programs that missed their payment deadline.
    SweepOverdue,
    /// Send payment reminders for programs whose due date has arrived.
    SweepReminders,
    /// Export a CSV summary of all program ledgers.
    Report {
        /// Output file (stdout if omitted).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print aggregate dashboard figures as JSON.
    Stats {
        /// Identity performing the query; must be a configured admin.
        #[arg(long)]
        actor: String,
    },
}

fn build_stores(
    db_path: Option<PathBuf>,
) -> Result<(ProgramStoreBox, PaymentStoreBox, ProgramStoreBox)> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = eduledger::infrastructure::rocksdb::RocksDbStore::open(path)
                .into_diagnostic()?;
            Ok((
                Box::new(store.clone()),
                Box::new(store.clone()),
                Box::new(store),
            ))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => Err(miette::miette!(
            "this build has no persistent storage; rebuild with --features storage-rocksdb"
        )),
        None => {
            let programs = InMemoryProgramStore::new();
            let payments = InMemoryPaymentStore::new();
            Ok((
                Box::new(programs.clone()),
                Box::new(payments),
                Box::new(programs),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::from_env().into_diagnostic()?;

    let gateway: PaymentGatewayBox = match &config.paystack_secret_key {
        Some(secret) => Box::new(
            PaystackGateway::new(secret, config.paystack_callback_url.as_deref())
                .into_diagnostic()?,
        ),
        None => Box::new(DisabledGateway),
    };
    let notifier: NotificationSenderBox = Box::new(LogNotifier);

    // The reporting commands read the store directly; the engine owns its
    // own handle to the same backend.
    let (program_store, payment_store, report_store) = build_stores(cli.db_path)?;
    let engine = ProgramEngine::new(
        program_store,
        payment_store,
        gateway,
        notifier,
        Box::new(StaticAdminPolicy::new(config.admin_emails.clone())),
    );

    match cli.command {
        Command::SweepOverdue => {
            let frozen = engine.sweep_overdue(chrono::Utc::now()).await.into_diagnostic()?;
            println!("{frozen} programs frozen");
        }
        Command::SweepReminders => {
            let sent = engine
                .sweep_reminders(chrono::Utc::now())
                .await
                .into_diagnostic()?;
            println!("{sent} reminders sent");
        }
        Command::Report { output } => {
            let mut programs = report_store.all().await.into_diagnostic()?;
            programs.sort_by_key(|p| p.created_at);
            match output {
                Some(path) => {
                    let file = File::create(path).into_diagnostic()?;
                    let mut writer = StatementWriter::new(file);
                    writer.write_programs(&programs).into_diagnostic()?;
                }
                None => {
                    let stdout = io::stdout();
                    let mut writer = StatementWriter::new(stdout.lock());
                    writer.write_programs(&programs).into_diagnostic()?;
                }
            }
        }
        Command::Stats { actor } => {
            let stats = engine.stats(&actor).await.into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).into_diagnostic()?
            );
        }
    }

    Ok(())
}
