use anyhow::Context;
use lpt_event::Runtime;
use lpt_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load lpt-event settings")?;
    lpt_telemetry::init(&settings)?;

    tracing::info!(
        "starting app with configuration:\n{}",
        serde_json::to_string_pretty(&settings).context("failed to render configuration")?
    );

    let runtime = Runtime::open(settings).await?;
    runtime.prepare().await?;
    runtime.serve().await
}
