use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sheetdesk::cache::{CacheStorage, NoopStorage, Payload, TtlCache};
use sheetdesk::config::Config;
use sheetdesk::orders::OrderRequest;
use sheetdesk::sheets::AppsScriptClient;
use sheetdesk::tasks::TaskQueue;
use sheetdesk::SheetService;

#[derive(Parser, Debug)]
#[command(name = "sheetdesk")]
#[command(about = "Cached order and reference-data backend over a spreadsheet web app")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/sheetdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List users
  Users,
  /// Print every row of a sheet
  Dataset { name: String },
  /// Print the order form reference data
  StaticData,
  /// Rebuild the FormulaReport sheet from AllOrders
  RefreshReport,
  /// Print revenue totals by team and page
  RevenueSummary,
  /// Submit an order read from a JSON file
  SubmitOrder { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = sheetdesk::logging::init(&config.log)?;

  let service = build_service(&config)?;
  let outcome = run(&service, args.command).await;
  service.shutdown().await;
  outcome
}

fn build_service(config: &Config) -> Result<SheetService> {
  let client = AppsScriptClient::new(config)?;
  let storage: Arc<dyn CacheStorage> = if config.cache.enabled {
    Arc::new(TtlCache::<Payload>::new())
  } else {
    Arc::new(NoopStorage)
  };
  let tasks = TaskQueue::new(config.tasks.workers, config.tasks.queue_capacity);

  Ok(SheetService::new(
    Arc::new(client),
    storage,
    config.ttl_policy(),
    config.utc_offset()?,
    tasks,
  ))
}

async fn run(service: &SheetService, command: Command) -> Result<()> {
  match command {
    Command::Users => print_json(&service.get_users().await?),
    Command::Dataset { name } => print_json(&service.get_dataset(&name).await?),
    Command::StaticData => print_json(&service.get_static_data().await?),
    Command::RefreshReport => print_json(&service.refresh_formula_report().await?),
    Command::RevenueSummary => print_json(&service.get_revenue_summary().await?),
    Command::SubmitOrder { file } => {
      let request = read_order(&file)?;
      print_json(&service.submit_order(request).await?)
    }
  }
}

fn read_order(path: &Path) -> Result<OrderRequest> {
  let contents =
    std::fs::read_to_string(path).map_err(|e| eyre!("Failed to read order file {}: {}", path.display(), e))?;
  serde_json::from_str(&contents).map_err(|e| eyre!("Invalid order data format in {}: {}", path.display(), e))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
