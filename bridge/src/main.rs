use anyhow::Context;
use clap::Parser;
use rov_bridge::{init_logging, run, Args};
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.log_dir.as_deref(), args.log_keep_days).context("failed to initialize logging")?;

    let settings = args.load_settings().context("failed to load initial settings")?;
    if settings.is_none() {
        tracing::warn!("No initial settings; movement waits for a settings-change event");
    }

    run(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), settings, args.event_buffer)
        .await
        .context("autopilot bridge stopped with an error")?;

    tracing::info!("ROV bridge exited cleanly");
    Ok(())
}
