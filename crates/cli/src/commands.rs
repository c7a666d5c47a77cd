use std::process::ExitCode;

use anyhow::Context;
use lpt_db::{inspect, DbError};
use lpt_event::modules::events::{seed, EventsModule};
use lpt_event::Runtime;
use lpt_kernel::settings::Settings;
use lpt_platform::{PermissionsChange, Privilege, WorkspaceClient};

use crate::report;

/// Securable type that database instance grants are applied to.
const DATABASE_SECURABLE: &str = "DATABASE";

/// Privilege sets tried in order until one is accepted.
const GRANT_ATTEMPTS: [&[Privilege]; 2] = [
    &[Privilege::Usage, Privilege::Create],
    &[Privilege::AllPrivileges],
];

pub async fn check_connection(settings: Settings) -> anyhow::Result<ExitCode> {
    println!("{}", report::rule('=', 60));
    println!("Checking the lpt-event database connection");
    println!("{}", report::rule('=', 60));
    println!("{}", report::configuration(&settings));

    let runtime = match Runtime::open(settings).await {
        Ok(runtime) => runtime,
        Err(err) => return Ok(connection_failed(&err)),
    };

    println!("\nValidating and initializing the database...");
    let prepared = runtime.prepare().await;
    runtime.shutdown().await?;

    match prepared {
        Ok(()) => {
            println!("{}", report::rule('=', 60));
            println!("Connection successful, database initialized");
            println!("{}", report::rule('=', 60));
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(connection_failed(&err)),
    }
}

fn connection_failed(err: &anyhow::Error) -> ExitCode {
    tracing::error!(error = %format!("{err:#}"), "database connection check failed");
    println!("{}", report::rule('=', 60));
    println!("Connection failed: {err:#}");
    println!("{}", report::rule('=', 60));
    ExitCode::FAILURE
}

pub async fn verify(settings: Settings) -> anyhow::Result<ExitCode> {
    println!("{}", report::rule('=', 80));
    println!("DATABASE CONFIGURATION VERIFICATION");
    println!("{}", report::rule('=', 80));
    println!("{}", report::configuration(&settings));

    let runtime = match Runtime::open(settings).await {
        Ok(runtime) => runtime,
        Err(err) => {
            println!("\nUnable to resolve the database: {err:#}");
            return Ok(ExitCode::from(2));
        }
    };

    let engine_url = runtime.database().engine_url();
    let verdict = report::verify(&engine_url, runtime.database().instance_name());
    println!("{}", verdict.text);
    runtime.database().close().await;

    Ok(ExitCode::from(verdict.exit_code))
}

pub async fn list_records(settings: Settings) -> anyhow::Result<ExitCode> {
    let instance = settings.db.instance_name.clone().unwrap_or_default();
    let runtime = Runtime::open(settings).await?;

    let events = EventsModule::new(runtime.database().clone());
    let store = events.store();
    if runtime.database().is_memory() {
        // Nothing outlives the process; show what a fresh server starts with.
        seed::seed_if_empty(store.as_ref()).await?;
    }

    let records = store.list().await.context("failed to list events")?;
    println!("{}", report::records(&instance, &records));
    runtime.database().close().await;
    Ok(ExitCode::SUCCESS)
}

pub async fn list_schema(settings: Settings, schema: &str) -> anyhow::Result<ExitCode> {
    let runtime = Runtime::open(settings).await?;
    let Some(pool) = runtime.database().pool() else {
        return Err(DbError::Unsupported("schema listing").into());
    };

    let schema_report = inspect::inspect_schema(pool, schema)
        .await
        .with_context(|| format!("failed to inspect schema {schema}"))?;
    println!("{}", report::schema(&schema_report));
    runtime.database().close().await;
    Ok(ExitCode::SUCCESS)
}

pub async fn grant_access(instance: &str, principal: &str) -> anyhow::Result<ExitCode> {
    let client = WorkspaceClient::from_env().context("failed to configure the workspace client")?;
    let details = client
        .get_database_instance(instance)
        .await
        .with_context(|| format!("failed to look up database instance {instance}"))?;
    let uid = details
        .uid
        .as_deref()
        .with_context(|| format!("database instance {instance} reported no UID"))?;
    println!("Database instance: {}", details.name);
    println!("UID: {uid}");

    println!("\nGranting access to service principal: {principal}");
    let code = match client.grant_instance_access(uid, principal).await {
        Ok(response) => {
            println!("Access granted");
            println!("{}", serde_json::to_string_pretty(&response)?);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::warn!(instance, principal, error = %err, "instance access grant failed");
            println!("Failed: {err}");
            ExitCode::FAILURE
        }
    };

    println!(
        "\n{}",
        report::manual_access_steps(client.host().as_str(), instance, principal)
    );
    Ok(code)
}

pub async fn grant_permissions(instance: &str, principal: &str) -> anyhow::Result<ExitCode> {
    let client = WorkspaceClient::from_env().context("failed to configure the workspace client")?;
    let details = client
        .get_database_instance(instance)
        .await
        .with_context(|| format!("failed to look up database instance {instance}"))?;
    println!(
        "Database instance: {} (UID: {})",
        details.name,
        details.uid.as_deref().unwrap_or("unknown")
    );

    if grant_with_fallback(&client, instance, principal).await.is_some() {
        return Ok(ExitCode::SUCCESS);
    }

    println!("\n{}", report::manual_permission_steps(instance, principal));
    Ok(ExitCode::FAILURE)
}

/// Apply the first privilege set the platform accepts; `None` when every
/// attempt failed.
async fn grant_with_fallback(
    client: &WorkspaceClient,
    instance: &str,
    principal: &str,
) -> Option<&'static [Privilege]> {
    for (attempt, privileges) in GRANT_ATTEMPTS.into_iter().enumerate() {
        if attempt > 0 {
            println!("\nTrying a broader grant...");
        }
        let changes = [PermissionsChange::grant(principal, privileges)];
        match client
            .update_grants(DATABASE_SECURABLE, instance, &changes)
            .await
        {
            Ok(_) => {
                println!(
                    "Granted {} to service principal {principal}",
                    report::privileges(privileges)
                );
                return Some(privileges);
            }
            Err(err) => {
                tracing::warn!(instance, principal, error = %err, "grant attempt failed");
                println!("Error granting {}: {err}", report::privileges(privileges));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, routing::patch, Json, Router};
    use lpt_platform::config::normalize_host;
    use lpt_platform::{AuthConfig, WorkspaceConfig};
    use serde_json::json;

    type Bodies = Arc<Mutex<Vec<String>>>;

    /// Grants endpoint that rejects `rejected` privilege names with a 400.
    async fn grants_server(rejected: &'static [&'static str]) -> (WorkspaceClient, Bodies) {
        let bodies: Bodies = Arc::default();
        let router = Router::new()
            .route(
                "/api/2.1/unity-catalog/permissions/DATABASE/{name}",
                patch(move |State(bodies): State<Bodies>, body: String| async move {
                    bodies.lock().unwrap().push(body.clone());
                    if rejected.iter().any(|name| body.contains(name)) {
                        (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "error_code": "INVALID_PARAMETER_VALUE", "message": "unsupported privilege" })),
                        )
                    } else {
                        (StatusCode::OK, Json(json!({})))
                    }
                }),
            )
            .with_state(bodies.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let client = WorkspaceClient::new(WorkspaceConfig {
            host: normalize_host(&format!("http://{addr}")).unwrap(),
            auth: AuthConfig::Pat {
                token: "admin-token".to_string(),
            },
        })
        .unwrap();
        (client, bodies)
    }

    #[tokio::test]
    async fn usage_and_create_are_granted_first() {
        let (client, bodies) = grants_server(&[]).await;

        let granted = grant_with_fallback(&client, "LPT-LKB-2", "sp-1").await;

        assert_eq!(granted, Some(&[Privilege::Usage, Privilege::Create][..]));
        assert_eq!(bodies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_grant_retries_with_all_privileges() {
        let (client, bodies) = grants_server(&["USAGE"]).await;

        let granted = grant_with_fallback(&client, "LPT-LKB-2", "sp-1").await;

        assert_eq!(granted, Some(&[Privilege::AllPrivileges][..]));
        let bodies = bodies.lock().unwrap().clone();
        assert_eq!(bodies.len(), 2);
        let second: serde_json::Value = serde_json::from_str(&bodies[1]).unwrap();
        assert_eq!(
            second,
            json!({ "changes": [{ "principal": "sp-1", "add": ["ALL_PRIVILEGES"] }] })
        );
    }

    #[tokio::test]
    async fn exhausted_attempts_grant_nothing() {
        let (client, bodies) = grants_server(&["USAGE", "ALL_PRIVILEGES"]).await;

        assert!(grant_with_fallback(&client, "LPT-LKB-2", "sp-1").await.is_none());
        assert_eq!(bodies.lock().unwrap().len(), 2);
    }
}
