//! Operator probe for the TumbleBus store.
//!
//! Opens the store described by the `TUMBLEBUS_*` environment variables and
//! prints query results as JSON.

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::process::ExitCode;
use tumblebus_core::config::ENV_DATA_DIR;
use tumblebus_core::{
    default_log_level, init_logging, ClientRepository, DocumentClientRepository,
    DocumentSchoolRepository, EnrollmentService, SchoolRepository, StoreConfig, StoreConnection,
};

#[derive(Parser, Debug)]
#[command(name = "tumblebus", version, about = "Query the TumbleBus document store")]
struct Cli {
    /// Absolute directory for rolling log files; logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print core linkage information.
    Ping,
    /// List every school.
    Schools,
    /// List every client.
    Clients,
    /// List clients attached to a school.
    SchoolClients { name: String },
    /// List clients with a child born in the given month.
    Birthdays { year: i32, month: u32 },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("tumblebus: {err}");
            return ExitCode::FAILURE;
        }
    }

    match run(cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("tumblebus: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<String, Box<dyn Error>> {
    info!("event=cli_command module=cli status=start command={command:?}");
    if let Command::Ping = command {
        return Ok(ping_line());
    }

    let config = persistent_config(StoreConfig::from_env()?)?;
    let store = StoreConnection::open(&config)?;
    let output = query(&store, command);
    store.close();
    output
}

// Commands read a file-backed store only.
fn persistent_config(config: StoreConfig) -> Result<StoreConfig, Box<dyn Error>> {
    if config.data_dir.is_none() {
        return Err(format!("{ENV_DATA_DIR} must point at the store directory").into());
    }
    Ok(config)
}

fn query(store: &StoreConnection, command: Command) -> Result<String, Box<dyn Error>> {
    let clients = DocumentClientRepository::new(store);
    let output = match command {
        Command::Ping => ping_line(),
        Command::Schools => {
            serde_json::to_string_pretty(&DocumentSchoolRepository::new(store).list_schools()?)?
        }
        Command::Clients => serde_json::to_string_pretty(&clients.list_clients()?)?,
        Command::SchoolClients { name } => {
            serde_json::to_string_pretty(&clients.find_clients_by_school(&name)?)?
        }
        Command::Birthdays { year, month } => {
            let service = EnrollmentService::new(clients);
            serde_json::to_string_pretty(&service.birthday_clients(year, month)?)?
        }
    };
    Ok(output)
}

fn ping_line() -> String {
    format!(
        "tumblebus_core ping={} version={}",
        tumblebus_core::ping(),
        tumblebus_core::core_version()
    )
}
