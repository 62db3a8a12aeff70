use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use api_shared::SignupReq;
use clap::{Parser, Subcommand};
use hms_core::config::{password_iterations_from_env_value, CoreConfig};
use hms_core::constants::DEFAULT_DATA_DIR;
use hms_core::models::Role;
use hms_core::presence::PresenceRegistry;
use hms_core::services::{AccountService, AdminService};
use hms_core::store::Database;

#[derive(Parser)]
#[command(name = "hms")]
#[command(about = "Hospital management operator CLI")]
#[command(
    long_about = "Hospital management operator CLI.\n\n\
Reads and writes the data directory directly. The server loads every record into memory \
at start-up and never re-reads the directory, so run write commands such as create-admin \
only while the server is stopped. Accounts created while it runs stay invisible to it \
until restart and can repeat display ids it hands out."
)]
struct Cli {
    /// Storage root shared with the server
    #[arg(long, env = "HMS_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an administrator account
    CreateAdmin {
        email: String,
        first_name: String,
        last_name: String,
        #[arg(long)]
        password: String,
    },
    /// List accounts, optionally of one role
    ListAccounts {
        /// patient, doctor, nurse, admin or receptionist
        #[arg(long)]
        role: Option<Role>,
    },
    /// Print dashboard statistics as JSON
    Stats,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Use 'hms --help' for commands");
        return Ok(());
    };

    let iterations = password_iterations_from_env_value(std::env::var("PASSWORD_HASH_ITERATIONS").ok())?;
    let cfg = Arc::new(CoreConfig::new(
        cli.data_dir.clone(),
        iterations,
        "http://localhost:3000".into(),
    )?);
    let db = Arc::new(
        Database::open(&cfg)
            .with_context(|| format!("opening data directory {}", cli.data_dir.display()))?,
    );

    match command {
        Commands::CreateAdmin {
            email,
            first_name,
            last_name,
            password,
        } => {
            let accounts = AccountService::new(db, cfg);
            let admin = accounts.create_account(SignupReq {
                email,
                password,
                first_name,
                last_name,
                role: Role::Admin.to_string(),
                ..Default::default()
            })?;
            println!("Created administrator {} ({})", admin.display_id, admin.id);
        }
        Commands::ListAccounts { role } => {
            let accounts = AccountService::new(db, cfg);
            let listed = accounts.list(role);
            if listed.is_empty() {
                println!("No accounts found.");
            }
            for account in listed {
                println!(
                    "{}  {:<13} {:<32} {}{}",
                    account.display_id,
                    account.role(),
                    account.email,
                    account.full_name(),
                    if account.is_active { "" } else { " (inactive)" }
                );
            }
        }
        Commands::Stats => {
            let admin = AdminService::new(db, Arc::new(PresenceRegistry::new()));
            println!("{}", serde_json::to_string_pretty(&admin.stats())?);
        }
    }

    Ok(())
}
