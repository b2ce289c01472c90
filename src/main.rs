use std::fs;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use stores_ledger::core::{
    Item, ItemCatalog, ItemCategory, OutwardKind, Query, ReconTarget, ReturnKind, StoreLedger,
};
use stores_ledger::import::SheetImporter;
use stores_ledger::import::csv::{ItemMasterImporter, StockCountImporter};
use stores_ledger::storage::CsvFileStore;

#[derive(Serialize, Deserialize, Default)]
struct Config {
    data_dir: String,
    admin_code: String,
    ledger_table: Option<String>,
}

#[derive(Parser)]
#[command(name = "stores", about = "Factory stores ledger")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "stores.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the ledger table and record it in the config
    Init,
    /// Book a goods receipt
    Inward {
        #[arg(long)]
        item: String,
        #[arg(long)]
        qty: f64,
        #[arg(long, default_value_t = Local::now().date_naive())]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        supplier: String,
        #[arg(long, default_value = "")]
        invoice: String,
        #[arg(long, default_value = "stores")]
        by: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Issue material to production
    Issue {
        #[arg(long)]
        item: String,
        #[arg(long)]
        qty: f64,
        #[arg(long, default_value_t = Local::now().date_naive())]
        date: NaiveDate,
        #[arg(long, default_value = "Issued to Production")]
        purpose: String,
        #[arg(long, default_value = "stores")]
        by: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Book a return to stores
    Return {
        #[arg(long)]
        item: String,
        #[arg(long)]
        qty: f64,
        #[arg(long)]
        kind: ReturnKind,
        #[arg(long, default_value_t = Local::now().date_naive())]
        date: NaiveDate,
        #[arg(long, default_value = "stores")]
        by: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Book a material outward
    Outward {
        #[arg(long)]
        item: String,
        #[arg(long)]
        qty: f64,
        #[arg(long)]
        kind: OutwardKind,
        #[arg(long, default_value_t = Local::now().date_naive())]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        party: String,
        #[arg(long, default_value = "stores")]
        by: String,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Reconcile one bucket against a physical count
    Reconcile {
        #[arg(long)]
        item: String,
        #[arg(long)]
        target: ReconTarget,
        #[arg(long)]
        qty: f64,
        #[arg(long, default_value_t = Local::now().date_naive())]
        date: NaiveDate,
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Apply a stock-count sheet as additive adjustments
    Adjust {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = Local::now().date_naive())]
        date: NaiveDate,
    },
    /// Show derived stock for one item
    Stock {
        item: String,
        /// Show the unclamped audit view
        #[arg(long)]
        raw: bool,
    },
    /// Show stock value for one item
    Value { item: String },
    /// Per-item stock and value summary
    Inventory,
    /// Stores dashboard KPIs
    Kpis,
    /// List movements, optionally filtered (item:/type:/start:/end:/date:a..b)
    List { query: Option<String> },
    /// List catalog items eligible for a screen
    Items {
        /// Restrict to issue-eligible (production) items
        #[arg(long)]
        issue: bool,
    },
    /// Remove one ledger row by its timestamp key (admin override)
    Remove {
        #[arg(long)]
        timestamp: String,
        #[arg(long)]
        code: String,
    },
    /// Report rows edited behind the engine's back
    Verify,
    /// Replace the item master from a CSV sheet
    ImportItems {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug)]
enum CliError {
    MissingConfig,
    InvalidConfig(String),
    NotInitialised,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::MissingConfig => write!(f, "stores.toml file not found"),
            CliError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            CliError::NotInitialised => {
                write!(f, "no ledger table configured; run `stores init` first")
            }
        }
    }
}

impl std::error::Error for CliError {}

fn load_config(path: &PathBuf) -> Result<Config, CliError> {
    let data = fs::read_to_string(path).map_err(|_| CliError::MissingConfig)?;
    let cfg: Config = toml::from_str(&data).map_err(|e| CliError::InvalidConfig(e.to_string()))?;
    if cfg.data_dir.is_empty() {
        return Err(CliError::InvalidConfig("data_dir is missing".to_string()));
    }
    if cfg.admin_code.is_empty() {
        return Err(CliError::InvalidConfig("admin_code is missing".to_string()));
    }
    Ok(cfg)
}

fn save_config(path: &PathBuf, cfg: &Config) {
    if let Ok(data) = toml::to_string(cfg) {
        let _ = fs::write(path, data);
    }
}

fn catalog_path(cfg: &Config) -> PathBuf {
    PathBuf::from(&cfg.data_dir).join("item_master.csv")
}

fn load_catalog(cfg: &Config) -> Result<ItemCatalog, Box<dyn std::error::Error>> {
    let path = catalog_path(cfg);
    if !path.exists() {
        return Ok(ItemCatalog::new());
    }
    let items = ItemMasterImporter::parse(&path)?;
    Ok(ItemCatalog::from_items(items))
}

fn save_catalog(cfg: &Config, items: &[Item]) -> Result<(), Box<dyn std::error::Error>> {
    let path = catalog_path(cfg);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(&path)?;
    wtr.write_record([
        "Item Code",
        "Category",
        "Unit",
        "RM Item Name",
        "FG Item Name",
        "Min Stock",
        "RM Rate",
        "FG Rate",
    ])?;
    for item in items {
        wtr.write_record([
            item.code.as_str(),
            item.category.as_str(),
            item.unit.as_str(),
            item.rm_name.as_str(),
            item.fg_name.as_str(),
            &item.min_stock.to_string(),
            &item.rm_rate.to_string(),
            &item.fg_rate.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn open_service(cfg: &Config) -> Result<StoreLedger<CsvFileStore>, Box<dyn std::error::Error>> {
    let table = cfg
        .ledger_table
        .clone()
        .ok_or(CliError::NotInitialised)?;
    let store = CsvFileStore::new(&cfg.data_dir);
    let catalog = load_catalog(cfg)?;
    Ok(StoreLedger::from_table(
        store,
        table,
        catalog,
        &cfg.admin_code,
    )?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    let mut cfg = load_config(&cli.config)?;

    if matches!(cli.command, Commands::Init) {
        let store = CsvFileStore::new(&cfg.data_dir);
        let catalog = load_catalog(&cfg)?;
        let ledger = StoreLedger::new(store, catalog, &cfg.admin_code)?;
        cfg.ledger_table = Some(ledger.table_id().to_string());
        save_config(&cli.config, &cfg);
        println!("Ledger table {} created", ledger.table_id());
        return Ok(());
    }

    let ledger = open_service(&cfg)?;

    match cli.command {
        Commands::Inward {
            item,
            qty,
            date,
            supplier,
            invoice,
            by,
            remarks,
        } => {
            let m = ledger.record_inward(date, &item, qty, &supplier, &invoice, &by, &remarks)?;
            println!("Inward booked at {}", m.timestamp_key());
        }
        Commands::Issue {
            item,
            qty,
            date,
            purpose,
            by,
            remarks,
        } => {
            let m = ledger.record_issue(date, &item, qty, &purpose, &by, &remarks)?;
            println!("Issue booked at {}", m.timestamp_key());
        }
        Commands::Return {
            item,
            qty,
            kind,
            date,
            by,
            remarks,
        } => {
            let m = ledger.record_return(date, &item, qty, kind, &by, &remarks)?;
            println!("{} booked at {}", kind.label(), m.timestamp_key());
        }
        Commands::Outward {
            item,
            qty,
            kind,
            date,
            party,
            by,
            remarks,
        } => {
            let m = ledger.record_outward(date, &item, qty, kind, &party, &by, &remarks)?;
            println!("{} booked as {}", kind.label(), m.ref_no);
        }
        Commands::Reconcile {
            item,
            target,
            qty,
            date,
            remarks,
        } => match ledger.reconcile(&item, target, qty, date, &remarks)? {
            Some(m) => println!(
                "Reconciled {item} {target}: {} {} appended",
                m.movement_type, m.qty
            ),
            None => println!("Reconciled {item} {target}: already in line"),
        },
        Commands::Adjust { file, date } => {
            let rows = StockCountImporter::parse(&file)?;
            let pb = ProgressBar::new(rows.len() as u64);
            let mut appended = 0;
            for row in &rows {
                appended += ledger.bulk_adjust(std::slice::from_ref(row), date)?.len();
                pb.inc(1);
            }
            pb.finish_and_clear();
            println!("{appended} adjustments applied from {} rows", rows.len());
        }
        Commands::Stock { item, raw } => {
            if raw {
                let stock = ledger.stock_raw(&item)?;
                println!(
                    "{item}: RM {} | WIP {} | FG {} | Reject {}",
                    stock.rm, stock.wip, stock.fg, stock.reject
                );
            } else {
                let stock = ledger.stock(&item)?;
                println!(
                    "{item}: RM {} | WIP {} | FG {} | Reject {} | Total {}",
                    stock.rm,
                    stock.wip,
                    stock.fg,
                    stock.reject,
                    stock.total()
                );
            }
        }
        Commands::Value { item } => {
            let value = ledger.value(&item)?;
            println!(
                "{item}: RM {:.2} | WIP {:.2} | FG {:.2} | Reject {:.2} | Total {:.2}",
                value.rm,
                value.wip,
                value.fg,
                value.reject,
                value.total()
            );
        }
        Commands::Inventory => {
            let today = Local::now().date_naive();
            for s in ledger.summary(today) {
                let flag = if s.low_stock { " LOW" } else { "" };
                println!(
                    "{} [{}] RM {} WIP {} FG {} Reject {} | value {:.2}{flag}",
                    s.item,
                    s.category,
                    s.stock.rm,
                    s.stock.wip,
                    s.stock.fg,
                    s.stock.reject,
                    s.value.total()
                );
            }
        }
        Commands::Kpis => {
            let kpis = ledger.kpis(Local::now().date_naive());
            println!("{}", serde_json::to_string_pretty(&kpis)?);
        }
        Commands::List { query } => {
            let movements = match query {
                Some(q) => ledger.query(&q.parse::<Query>()?),
                None => ledger.movements(),
            };
            for m in movements {
                println!("{}", m.to_row().join(" | "));
            }
        }
        Commands::Items { issue } => {
            for item in ledger.items() {
                if issue && item.category != ItemCategory::ProductionItem {
                    continue;
                }
                println!("{}", item.label());
            }
        }
        Commands::Remove { timestamp, code } => {
            let removed = ledger.remove(&timestamp, &code)?;
            println!(
                "Removed {} {} of {}",
                removed.movement_type, removed.qty, removed.item
            );
        }
        Commands::Verify => {
            let mismatched = ledger.verify()?;
            if mismatched.is_empty() {
                println!("All rows verified");
            } else {
                println!("Tampered rows at indices: {mismatched:?}");
            }
        }
        Commands::ImportItems { file } => {
            let items = ItemMasterImporter::parse(&file)?;
            save_catalog(&cfg, &items)?;
            let count = items.len();
            ledger.replace_catalog(ItemCatalog::from_items(items));
            println!("Item master replaced: {count} items");
        }
        Commands::Init => unreachable!(),
    }

    Ok(())
}
