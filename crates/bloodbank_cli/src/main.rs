//! Operator CLI for the donor registry.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the store once.
//! - Run a single donor command and close the store before exiting.

use bloodbank_core::{
    close_db, init_logging, open_db, Donor, DonorService, RegistryConfig, SqliteDonorRepository,
};
use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "bloodbank")]
#[command(version, about = "Blood bank donor registry CLI", long_about = None)]
struct Cli {
    /// Registry database file (overrides BLOODBANK_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check core linkage
    Ping,
    /// List donors
    List {
        /// Keep donors whose full name contains this text
        #[arg(long)]
        name: Option<String>,
    },
    /// Show one donor
    Show {
        /// Donor id
        id: Uuid,
    },
    /// Register every donor from a donor JSON file
    Import {
        /// Donor file (defaults to BLOODBANK_DONOR_FILE)
        file: Option<PathBuf>,
    },
    /// Write all donors to a donor JSON file
    Export {
        /// Donor file (defaults to BLOODBANK_DONOR_FILE)
        file: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Commands::Ping = cli.command {
        println!("bloodbank_core ping={}", bloodbank_core::ping());
        println!("bloodbank_core version={}", bloodbank_core::core_version());
        return Ok(());
    }

    let mut config = RegistryConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    init_logging(&config.log_level, &config.log_dir)?;

    let conn = open_db(&config.db_path)?;
    let outcome = {
        let service = DonorService::new(SqliteDonorRepository::try_new(&conn)?);
        run(&service, cli.command, &config)
    };
    close_db(conn)?;
    outcome
}

fn run(
    service: &DonorService<SqliteDonorRepository<'_>>,
    command: Commands,
    config: &RegistryConfig,
) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Ping => {}
        Commands::List { name } => {
            let donors = service.list_donors(name.as_deref())?;
            if donors.is_empty() {
                println!("No donors found.");
            }
            for donor in &donors {
                print_donor(donor)?;
            }
        }
        Commands::Show { id } => print_donor(&service.get_donor(id)?)?,
        Commands::Import { file } => {
            let path = file.unwrap_or_else(|| config.donor_file.clone());
            let count = service.import_from_file(&path)?;
            info!("event=cli_import module=cli status=ok count={}", count);
            println!("Imported {count} donors from {}", path.display());
        }
        Commands::Export { file } => {
            let path = file.unwrap_or_else(|| config.donor_file.clone());
            let count = service.export_to_file(&path)?;
            info!("event=cli_export module=cli status=ok count={}", count);
            println!("Exported {count} donors to {}", path.display());
        }
    }
    Ok(())
}

fn print_donor(donor: &Donor) -> Result<(), Box<dyn Error>> {
    println!("{} {}", donor.id, serde_json::to_string(&donor.record())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn parses_list_with_name_filter() {
        let cli = Cli::parse_from(["bloodbank", "list", "--name", "mar"]);
        assert!(matches!(cli.command, Commands::List { name: Some(ref n) } if n == "mar"));
    }

    #[test]
    fn show_requires_a_uuid() {
        assert!(Cli::try_parse_from(["bloodbank", "show", "not-a-uuid"]).is_err());
        let cli = Cli::try_parse_from([
            "bloodbank",
            "show",
            "6f1c7a52-3c1e-4f57-9a34-0d8c5b1f2e10",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Show { .. }));
    }

    #[test]
    fn db_override_is_optional() {
        let cli = Cli::parse_from(["bloodbank", "--db", "/tmp/registry.db", "export"]);
        assert_eq!(cli.db.unwrap().to_str(), Some("/tmp/registry.db"));
        assert!(matches!(cli.command, Commands::Export { file: None }));
    }
}
