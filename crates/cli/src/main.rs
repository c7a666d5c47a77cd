//! `lpt-admin`: connection checks, data listings and access grants for the
//! lpt-event database.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lpt_kernel::settings::Settings;

mod commands;
mod report;

#[derive(Debug, Parser)]
#[command(name = "lpt-admin", version, about = "Administrative commands for lpt-event")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the database connection, then apply migrations and seed data
    CheckConnection,
    /// Report which database backend the configuration selects
    Verify,
    /// Print every stored event
    ListRecords,
    /// Describe the tables of a schema
    ListSchema {
        #[arg(long, default_value = "public")]
        schema: String,
    },
    /// Allow a service principal to connect to a database instance
    GrantAccess {
        #[arg(long, env = "LPT_EVENT_DB__INSTANCE_NAME")]
        instance: String,
        #[arg(long)]
        principal: String,
    },
    /// Grant USAGE and CREATE on a database instance to a principal
    GrantPermissions {
        #[arg(long, env = "LPT_EVENT_DB__INSTANCE_NAME")]
        instance: String,
        #[arg(long)]
        principal: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::CheckConnection => commands::check_connection(settings).await,
        Command::Verify => commands::verify(settings).await,
        Command::ListRecords => commands::list_records(settings).await,
        Command::ListSchema { schema } => commands::list_schema(settings, &schema).await,
        Command::GrantAccess {
            instance,
            principal,
        } => commands::grant_access(&instance, &principal).await,
        Command::GrantPermissions {
            instance,
            principal,
        } => commands::grant_permissions(&instance, &principal).await,
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_settings() -> anyhow::Result<Settings> {
    let settings = Settings::load().context("failed to load lpt-event settings")?;
    lpt_telemetry::init(&settings)?;
    Ok(settings)
}
