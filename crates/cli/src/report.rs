//! Plain-text renderings printed by the admin commands.

use std::fmt::Write;

use lpt_db::inspect::SchemaReport;
use lpt_event::modules::events::models::Event;
use lpt_kernel::settings::Settings;
use lpt_platform::Privilege;

pub fn rule(ch: char, width: usize) -> String {
    ch.to_string().repeat(width)
}

pub fn configuration(settings: &Settings) -> String {
    let db = &settings.db;
    format!(
        "\nConfiguration:\n  Instance Name:    {}\n  Database Name:    {}\n  Port:             {}",
        db.instance_name.as_deref().unwrap_or("<not set>"),
        db.database_name,
        db.port
    )
}

pub struct Verdict {
    pub text: String,
    pub exit_code: u8,
}

/// Classify the engine URL: 0 for Postgres, 1 for the in-memory backend,
/// 2 for anything unrecognised.
pub fn verify(engine_url: &str, instance: Option<&str>) -> Verdict {
    let mut text = format!("\nDatabase Engine URL:\n  {engine_url}\n\nDatabase Type:\n");

    let exit_code = if engine_url.starts_with("memory") {
        text.push_str("  IN-MEMORY development backend\n");
        text.push_str("  NOT using managed Postgres\n\n");
        text.push_str("Action required:\n");
        text.push_str("  1. Set LPT_EVENT_DB__INSTANCE_NAME to the managed instance name\n");
        text.push_str("  2. Restart the server so it picks up the change");
        1
    } else if engine_url.starts_with("postgresql") {
        text.push_str("  POSTGRESQL (managed instance)\n");
        let _ = write!(text, "  Using instance: {}", instance.unwrap_or("<unknown>"));
        0
    } else {
        text.push_str("  UNKNOWN database type");
        2
    };

    Verdict { text, exit_code }
}

pub fn event(index: usize, event: &Event) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule('-', 80));
    let _ = writeln!(out, "Record #{index}");
    let _ = writeln!(out, "{}", rule('-', 80));
    let _ = writeln!(out, "  ID:                   {}", event.id);
    let _ = writeln!(out, "  Title:                {}", event.title);
    let _ = writeln!(out, "  Short Description:    {}", event.short_description);
    let _ = writeln!(out, "  Detailed Description: {}", event.detailed_description);
    let _ = writeln!(out, "  City:                 {}", event.city);
    let _ = writeln!(out, "  Days of Week:         {}", event.days_of_week.join(", "));
    let _ = writeln!(out, "  Cost (USD):           ${:.2}", event.cost_usd);
    let _ = writeln!(out, "  Picture URL:          {}", event.picture_url);
    out
}

pub fn records(instance: &str, events: &[Event]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule('=', 80));
    let _ = writeln!(out, "Listing all records from database instance: {instance}");
    let _ = writeln!(out, "{}", rule('=', 80));

    if events.is_empty() {
        out.push_str("\nNo records found in the database.");
        return out;
    }

    let _ = writeln!(out, "\nFound {} record(s):\n", events.len());
    for (i, record) in events.iter().enumerate() {
        out.push_str(&event(i + 1, record));
        out.push('\n');
    }
    let _ = writeln!(out, "{}", rule('=', 80));
    let _ = writeln!(out, "Total records: {}", events.len());
    out.push_str(&rule('=', 80));
    out
}

pub fn schema(report: &SchemaReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Schemas: {}", report.schemas.join(", "));
    let _ = writeln!(out, "\nTables in schema '{}':", report.schema);

    if report.tables.is_empty() {
        out.push_str("  (none)");
        return out;
    }

    for table in &report.tables {
        let _ = writeln!(out, "\n{}", rule('=', 80));
        let _ = writeln!(out, "Table: {} ({} rows)", table.name, table.row_count);
        let _ = writeln!(out, "{}", rule('=', 80));

        out.push_str("Columns:\n");
        for column in &table.columns {
            let _ = write!(out, "  {:<24} {}", column.name, column.data_type);
            if !column.nullable {
                out.push_str(" NOT NULL");
            }
            if let Some(default) = &column.default {
                let _ = write!(out, " DEFAULT {default}");
            }
            out.push('\n');
        }

        if !table.primary_key.is_empty() {
            let _ = writeln!(out, "Primary key: ({})", table.primary_key.join(", "));
        }
        for fk in &table.foreign_keys {
            let _ = writeln!(out, "Foreign key {}: {}", fk.name, fk.definition);
        }
        for index in &table.indexes {
            let unique = if index.unique { "UNIQUE " } else { "" };
            let _ = writeln!(out, "Index {}: {unique}({})", index.name, index.columns.join(", "));
        }
    }
    out
}

pub fn privileges(privileges: &[Privilege]) -> String {
    privileges
        .iter()
        .map(Privilege::to_string)
        .collect::<Vec<_>>()
        .join(" and ")
}

pub fn manual_access_steps(host: &str, instance: &str, principal: &str) -> String {
    format!(
        "{rule}\nIf the automated grant failed, grant access manually:\n\
         1. Go to: {host}/database-instances\n\
         2. Select database: {instance}\n\
         3. Add service principal: {principal}\n\
         4. Grant: CONNECT and CREATE permissions\n{rule}",
        rule = rule('=', 70),
        host = host.trim_end_matches('/'),
    )
}

pub fn manual_permission_steps(instance: &str, principal: &str) -> String {
    format!(
        "Manual action required:\n\
         1. Go to the workspace\n\
         2. Navigate to database instance: {instance}\n\
         3. Grant CONNECT and CREATE permissions to: {principal}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpt_db::inspect::{ColumnInfo, IndexInfo, TableReport};

    fn sample_event() -> Event {
        Event {
            id: 7,
            title: "Jazz Night".to_string(),
            short_description: "Live jazz".to_string(),
            detailed_description: "Quartet on the rooftop".to_string(),
            city: "Lisbon".to_string(),
            days_of_week: vec!["Friday".to_string(), "Saturday".to_string()],
            cost_usd: 12.5,
            picture_url: "https://example.com/jazz.jpg".to_string(),
        }
    }

    #[test]
    fn verify_classifies_engine_urls() {
        let memory = verify("memory://local", None);
        assert_eq!(memory.exit_code, 1);
        assert!(memory.text.contains("LPT_EVENT_DB__INSTANCE_NAME"));

        let postgres = verify(
            "postgresql://sp:@host.example.com:5432/databricks_postgres",
            Some("LPT-LKB-2"),
        );
        assert_eq!(postgres.exit_code, 0);
        assert!(postgres.text.contains("Using instance: LPT-LKB-2"));

        assert_eq!(verify("mysql://elsewhere", None).exit_code, 2);
    }

    #[test]
    fn event_lists_days_and_two_decimal_cost() {
        let text = event(1, &sample_event());
        assert!(text.contains("Record #1"));
        assert!(text.contains("Days of Week:         Friday, Saturday"));
        assert!(text.contains("Cost (USD):           $12.50"));
    }

    #[test]
    fn records_reports_totals_and_empty_tables() {
        let text = records("LPT-LKB-2", &[sample_event()]);
        assert!(text.contains("Found 1 record(s)"));
        assert!(text.contains("Total records: 1"));

        let empty = records("LPT-LKB-2", &[]);
        assert!(empty.contains("No records found"));
    }

    #[test]
    fn schema_describes_columns_and_indexes() {
        let report = SchemaReport {
            schemas: vec!["public".to_string()],
            schema: "public".to_string(),
            tables: vec![TableReport {
                name: "event".to_string(),
                columns: vec![ColumnInfo {
                    name: "id".to_string(),
                    data_type: "integer".to_string(),
                    nullable: false,
                    default: Some("nextval('event_id_seq'::regclass)".to_string()),
                }],
                primary_key: vec!["id".to_string()],
                foreign_keys: vec![],
                indexes: vec![IndexInfo {
                    name: "ix_event_city".to_string(),
                    columns: vec!["city".to_string()],
                    unique: false,
                }],
                row_count: 3,
            }],
        };

        let text = schema(&report);
        assert!(text.contains("Table: event (3 rows)"));
        assert!(text.contains("NOT NULL DEFAULT nextval"));
        assert!(text.contains("Primary key: (id)"));
        assert!(text.contains("Index ix_event_city: (city)"));
    }

    #[test]
    fn privileges_use_catalog_names() {
        assert_eq!(
            privileges(&[Privilege::Usage, Privilege::Create]),
            "USAGE and CREATE"
        );
        assert_eq!(privileges(&[Privilege::AllPrivileges]), "ALL_PRIVILEGES");
    }

    #[test]
    fn manual_steps_name_instance_and_principal() {
        let text = manual_access_steps("https://ws.example.com/", "LPT-LKB-2", "sp-1");
        assert!(text.contains("https://ws.example.com/database-instances"));
        assert!(text.contains("Add service principal: sp-1"));
    }
}
