use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;

use shiftsync::config::Config;
use shiftsync::logging;
use shiftsync::workforce::{CompanyScope, EmployeeScope, WeekScope, WorkforceService};

#[derive(Parser, Debug)]
#[command(name = "shiftsync")]
#[command(about = "Sync and cache workforce scheduling data")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/shiftsync/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Company to sync (overrides company_id from the config)
  #[arg(long)]
  company: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List employees
  Employees {
    /// Re-sync even if the remote content looks unchanged
    #[arg(short, long)]
    force: bool,
  },
  /// List shifts for the week containing a date
  Shifts {
    /// Any day of the week (default: today)
    #[arg(short, long)]
    week: Option<NaiveDate>,
    #[arg(short, long)]
    force: bool,
  },
  /// List an employee's contracts
  Contracts {
    #[arg(short, long)]
    employee: String,
    #[arg(short, long)]
    force: bool,
  },
  /// List absences
  Absences {
    #[arg(short, long)]
    force: bool,
  },
  /// Evict cached shift weeks past the retention horizon
  Prune {
    /// Reference date (default: today)
    #[arg(short, long)]
    reference: Option<NaiveDate>,
  },
  /// Show recorded fingerprints per scope
  Status,
  /// Drop all cached data and fingerprints
  Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.log)?;

  let service = WorkforceService::new(&config)?;
  let company = args.company.or_else(|| config.company_id.clone());
  let company = || {
    company
      .clone()
      .ok_or_else(|| eyre!("No company given. Pass --company or set company_id in the config."))
  };
  let today = Local::now().date_naive();

  match args.command {
    Command::Employees { force } => {
      let scope = CompanyScope::new(company()?);
      print_json(&service.employees().get(&scope, force).await?)?;
    }
    Command::Shifts { week, force } => {
      let scope = WeekScope::containing(company()?, week.unwrap_or(today));
      print_json(&service.shifts().get(&scope, force).await?)?;
    }
    Command::Contracts { employee, force } => {
      let scope = EmployeeScope::new(company()?, employee);
      print_json(&service.contracts().get(&scope, force).await?)?;
    }
    Command::Absences { force } => {
      let scope = CompanyScope::new(company()?);
      print_json(&service.absences().get(&scope, force).await?)?;
    }
    Command::Prune { reference } => {
      let evicted = service.prune(reference.unwrap_or(today)).await?;
      println!("Evicted {} shift week(s)", evicted.len());
      for key in evicted {
        println!("  {}", key);
      }
    }
    Command::Status => {
      for status in service.status()? {
        let synced_at = status
          .synced_at
          .map(|t| t.to_rfc3339())
          .unwrap_or_else(|| "-".to_string());
        println!(
          "{:<10} {:<32} {} {}",
          status.entity_type,
          status.scope_key,
          &status.fingerprint[..12.min(status.fingerprint.len())],
          synced_at
        );
      }
    }
    Command::Reset => {
      service.reset()?;
      println!("Cache cleared");
    }
  }

  Ok(())
}

fn print_json<T: Serialize>(items: &[T]) -> Result<()> {
  let out =
    serde_json::to_string_pretty(items).map_err(|e| eyre!("Failed to render output: {}", e))?;
  println!("{}", out);
  Ok(())
}
