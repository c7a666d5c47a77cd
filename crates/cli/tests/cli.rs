use assert_cmd::Command;

fn admin() -> Command {
    let mut cmd = Command::cargo_bin("lpt-admin").unwrap();
    cmd.env("LPT_EVENT_ENV", "local")
        .env("LPT_EVENT_CONFIG_DIR", concat!(env!("CARGO_MANIFEST_DIR"), "/../../config"))
        .env("LPT_EVENT_TELEMETRY__ANSI", "false")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_every_command() {
    let output = admin().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in [
        "check-connection",
        "verify",
        "list-records",
        "list-schema",
        "grant-access",
        "grant-permissions",
    ] {
        assert!(stdout.contains(command), "missing {command}");
    }
}

#[test]
fn verify_flags_the_in_memory_backend() {
    let output = admin()
        .env("LPT_EVENT_DB__INSTANCE_NAME", "sqlite-memory")
        .arg("verify")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("memory://local"));
    assert!(stdout.contains("IN-MEMORY"));
}

#[test]
fn verify_without_an_instance_name_is_unknown() {
    let output = admin()
        .env("LPT_EVENT_DB__INSTANCE_NAME", "")
        .arg("verify")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn list_records_shows_demo_events_in_memory() {
    let output = admin()
        .env("LPT_EVENT_DB__INSTANCE_NAME", "memory")
        .arg("list-records")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Total records: 3"));
}

#[test]
fn list_schema_requires_postgres() {
    let output = admin()
        .env("LPT_EVENT_DB__INSTANCE_NAME", "memory")
        .arg("list-schema")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("requires the Postgres backend"));
}

#[test]
fn check_connection_succeeds_in_memory() {
    let output = admin()
        .env("LPT_EVENT_DB__INSTANCE_NAME", "memory")
        .arg("check-connection")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Connection successful"));
}
