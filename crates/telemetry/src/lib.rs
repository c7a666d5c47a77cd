//! Tracing subscriber bootstrap.
//!
//! Two output formats are supported: JSON lines for log collectors, and a
//! pipe-separated human format:
//!
//! ```text
//! 2024-01-09 10:30:45.123 | lpt-event    | INFO     | lpt_db.database      | database connection validated
//! ```

use std::fmt;
use std::io::IsTerminal;

use anyhow::Context;
use lpt_kernel::settings::{LogFormat, Settings};
use time::OffsetDateTime;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    EnvFilter,
};

/// Width of the location column.
pub const LOCATION_WIDTH: usize = 20;

const RESET: &str = "\x1b[0m";

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init(settings: &Settings) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.telemetry.level)
            .with_context(|| format!("invalid log level '{}'", settings.telemetry.level))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match settings.telemetry.log_format {
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
        LogFormat::Pretty => builder
            .with_ansi(settings.telemetry.ansi && std::io::stderr().is_terminal())
            .event_format(PipeFormat::new(&settings.app_name))
            .try_init(),
    };

    installed
        .map_err(|err| anyhow::anyhow!(err))
        .context("failed to install tracing subscriber")
}

/// Pipe-separated event format: timestamp, app name, level, location, fields.
#[derive(Debug, Clone)]
pub struct PipeFormat {
    app_name: String,
}

impl PipeFormat {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for PipeFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let now = OffsetDateTime::now_utc();
        write!(
            writer,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03} | {:<12} | ",
            now.year(),
            u8::from(now.month()),
            now.day(),
            now.hour(),
            now.minute(),
            now.second(),
            now.millisecond(),
            self.app_name
        )?;

        let level = meta.level();
        if writer.has_ansi_escapes() {
            write!(writer, "{}{:<8}{}", level_color(level), level.as_str(), RESET)?;
        } else {
            write!(writer, "{:<8}", level.as_str())?;
        }

        let span = ctx.lookup_current().map(|span| span.name());
        let (module, function) = split_location(meta.module_path().unwrap_or_default(), span);
        let location = abbreviate_location(&module, &function, LOCATION_WIDTH);
        write!(writer, " | {:<width$} | ", location, width = LOCATION_WIDTH)?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "\x1b[35m",
        Level::DEBUG => "\x1b[36m",
        Level::INFO => "\x1b[32m",
        Level::WARN => "\x1b[33m",
        Level::ERROR => "\x1b[31m",
    }
}

/// Split a Rust module path into dotted module and function parts.
///
/// The module is the path without its last segment. The function is the
/// innermost span's name when there is one, otherwise that last segment.
pub fn split_location(module_path: &str, span: Option<&str>) -> (String, String) {
    let mut segments: Vec<&str> = module_path.split("::").filter(|s| !s.is_empty()).collect();
    let last = segments.pop().unwrap_or_default();
    let function = span.unwrap_or(last).to_string();
    (segments.join("."), function)
}

/// Fit `module.function` into `max_length` characters.
///
/// Fits as-is when short enough. Otherwise module segments are cut to their
/// first letter, then the function name is truncated, and if even the
/// abbreviated module is too long it is truncated on its own. `<module>`
/// stands for module-level code; an empty or `__main__` module is omitted.
pub fn abbreviate_location(module: &str, function: &str, max_length: usize) -> String {
    let has_module = !module.is_empty() && module != "__main__";
    let module_level = function == "<module>";

    let location = if module_level {
        if module.is_empty() {
            "<module>".to_string()
        } else {
            module.to_string()
        }
    } else if !has_module {
        function.to_string()
    } else {
        format!("{module}.{function}")
    };

    if location.chars().count() <= max_length {
        return location;
    }

    if !has_module || module_level {
        return truncate(&location, max_length);
    }

    let abbreviated: String = module
        .split('.')
        .filter_map(|part| part.chars().next())
        .map(String::from)
        .collect::<Vec<_>>()
        .join(".");
    let location = format!("{abbreviated}.{function}");
    if location.chars().count() <= max_length {
        return location;
    }

    let module_len = abbreviated.chars().count();
    match max_length.checked_sub(module_len + 1) {
        Some(available) if available > 0 => {
            format!("{abbreviated}.{}", truncate(function, available))
        }
        _ => truncate(&abbreviated, max_length),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
