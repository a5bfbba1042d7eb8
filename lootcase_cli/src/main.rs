use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lootcase_core::{
    session_rng, Case, Catalog, Money, OpenOutcome, Opened, OutcomeSelector, RarityTier, Session,
    SessionConfig, SessionError, SessionHandle, WINNING_INDEX,
};
use lootcase_shared::OpenLogEntry;

#[derive(Parser)]
#[command(name = "lootcase-cli", about = "Open simulated cases from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// JSON catalog file, built-in catalog when omitted
    #[arg(long, global = true, env = "LOOTCASE_CATALOG")]
    catalog: Option<PathBuf>,
    /// Seed phrase for a reproducible run
    #[arg(long, global = true, env = "SEED_PHRASE")]
    seed: Option<String>,
    /// Starting balance
    #[arg(long, global = true, default_value_t = 10_000.0)]
    balance: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// List cases with their odds and expected value
    Cases,
    /// Open a case with the reveal delay, like the browser would
    Open {
        case_id: String,
        #[arg(long, default_value_t = 1)]
        times: u32,
        /// Override the reveal delay
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Open a case many times without delay and report the totals
    Simulate {
        case_id: String,
        #[arg(long, default_value_t = 1_000)]
        opens: u32,
        /// Write every open to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn load_catalog(path: Option<&PathBuf>) -> anyhow::Result<Catalog> {
    match path {
        Some(path) => {
            Catalog::load(path).with_context(|| format!("loading catalog {}", path.display()))
        }
        None => Ok(Catalog::builtin()),
    }
}

fn find_case(catalog: &Catalog, id: &str) -> anyhow::Result<Arc<Case>> {
    catalog
        .case(id)
        .ok_or_else(|| SessionError::UnknownCase(id.to_string()).into())
}

fn list_cases(catalog: &Catalog) {
    let selector = OutcomeSelector::new(&catalog.rarity_weights);
    for case in &catalog.cases {
        let ev = selector.expected_value(&case.items);
        println!(
            "{:<12} {:<20} price={:>8} ev={:>10.2} items={}",
            case.id,
            case.name,
            case.price,
            ev,
            case.items.len()
        );
        for (item, p) in case.items.iter().zip(selector.probabilities(&case.items)) {
            println!(
                "    {:<36} {:<16} {:>10} {:>8.3}%",
                item.name,
                item.rarity,
                item.price,
                p * 100.0
            );
        }
    }
}

async fn open_live(
    catalog: Catalog,
    config: SessionConfig,
    seed: Option<&str>,
    case_id: &str,
    times: u32,
) -> anyhow::Result<()> {
    let handle = SessionHandle::new(Arc::new(catalog), config, session_rng(seed));
    let case = handle.select_case(case_id).await?;
    println!("{} selected, price {}", case.name, case.price);

    for n in 1..=times {
        let (ticket, reveal) = match handle.open_case().await {
            Ok(Opened::Started { ticket, reveal }) => (ticket, reveal),
            Ok(Opened::AlreadyOpening) => continue,
            Err(SessionError::InsufficientFunds { balance, price }) => {
                println!("insufficient balance: {balance} left, case costs {price}");
                break;
            }
            Err(e) => return Err(e.into()),
        };
        println!("#{n} paid {} balance={}", ticket.price, ticket.balance);
        let around = &ticket.reel.items[WINNING_INDEX - 2..=WINNING_INDEX + 2];
        let names: Vec<&str> = around.iter().map(|i| i.name.as_str()).collect();
        println!("    spinning... {}", names.join("  /  "));

        let revealed = reveal.revealed().await?;
        println!(
            "    won {} [{}] worth {} balance={}",
            revealed.item.name, revealed.item.rarity, revealed.item.price, revealed.balance
        );
        handle.open_again().await?;
    }
    Ok(())
}

#[derive(Default)]
struct Tally {
    opens: u32,
    spent: Money,
    returned: Money,
    hits: BTreeMap<RarityTier, u32>,
}

fn simulate(
    catalog: &Catalog,
    config: SessionConfig,
    seed: Option<&str>,
    case_id: &str,
    opens: u32,
    csv_path: Option<&PathBuf>,
) -> anyhow::Result<Tally> {
    let case = find_case(catalog, case_id)?;
    let mut session = Session::new(config, catalog.rarity_weights.clone());
    let mut rng = session_rng(seed);
    session.select_case(Arc::clone(&case))?;

    let mut wtr = match csv_path {
        Some(path) => Some(csv::Writer::from_path(path)?),
        None => None,
    };
    let mut tally = Tally::default();

    for n in 1..=opens {
        match session.open_case(&mut rng) {
            Ok(OpenOutcome::Started(_)) => {}
            Ok(OpenOutcome::AlreadyOpening) => continue,
            Err(SessionError::InsufficientFunds { balance, .. }) => {
                warn!(%balance, after = tally.opens, "balance exhausted, stopping early");
                break;
            }
            Err(e) => return Err(e.into()),
        }
        let revealed = session.reveal()?;
        session.open_again()?;

        tally.opens += 1;
        tally.spent += revealed.price;
        tally.returned += revealed.item.price;
        *tally.hits.entry(revealed.item.rarity).or_default() += 1;

        if let Some(wtr) = wtr.as_mut() {
            wtr.serialize(OpenLogEntry {
                sequence: u64::from(n),
                ts: Utc::now(),
                case_id: revealed.case_id.clone(),
                case_price: revealed.price.as_f64(),
                item_name: revealed.item.name.clone(),
                item_rarity: revealed.item.rarity.to_string(),
                item_price: revealed.item.price.as_f64(),
                balance: revealed.balance.as_f64(),
            })?;
        }
    }

    if let Some(mut wtr) = wtr {
        wtr.flush()?;
    }
    info!(opens = tally.opens, balance = %session.balance(), "simulation finished");
    Ok(tally)
}

fn starting_balance(amount: f64) -> anyhow::Result<Money> {
    Money::from_f64(amount)
        .filter(|m| !m.is_negative())
        .with_context(|| format!("--balance must be between 0 and {}, got {amount}", Money::MAX))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let catalog = load_catalog(cli.catalog.as_ref())?;
    let mut config = SessionConfig {
        starting_balance: starting_balance(cli.balance)?,
        ..SessionConfig::default()
    };

    match cli.command {
        Commands::Cases => list_cases(&catalog),
        Commands::Open {
            case_id,
            times,
            delay_ms,
        } => {
            if let Some(ms) = delay_ms {
                config.reveal_delay = Duration::from_millis(ms);
            }
            open_live(catalog, config, cli.seed.as_deref(), &case_id, times).await?;
        }
        Commands::Simulate {
            case_id,
            opens,
            csv,
        } => {
            let tally = simulate(
                &catalog,
                config,
                cli.seed.as_deref(),
                &case_id,
                opens,
                csv.as_ref(),
            )?;
            println!(
                "opens={} spent={} returned={} net={}",
                tally.opens,
                tally.spent,
                tally.returned,
                tally.returned - tally.spent
            );
            for (rarity, count) in &tally.hits {
                println!("    {:<16} {}", rarity, count);
            }
            if let Some(path) = csv {
                println!("Exported {} rows to {}", tally.opens, path.display());
            }
        }
    }

    Ok(())
}
