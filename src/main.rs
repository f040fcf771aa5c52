//! Form Broker CLI
//!
//! Loads a form description from JSON, shows it to one user through a
//! child-process host and prints the outcome as JSON on stdout.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use form_broker::{BrokerConfig, FormDescription, FormService, ProcessHost};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "form-broker", version, about = "Show a form to one user and print the outcome")]
struct Cli {
    /// Path to a JSON form description
    #[arg(long)]
    form: PathBuf,

    /// User to show the form to
    #[arg(long)]
    target: String,

    /// Host program; overrides FORM_BROKER_HOST and the config file
    #[arg(long)]
    host: Option<String>,

    /// Arguments for the host program
    #[arg(last = true)]
    host_args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = BrokerConfig::load()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let content = std::fs::read_to_string(&cli.form)
        .with_context(|| format!("failed to read {}", cli.form.display()))?;
    let form: FormDescription = serde_json::from_str(&content)
        .with_context(|| format!("invalid form description in {}", cli.form.display()))?;

    let program = cli
        .host
        .or_else(|| config.host_command())
        .ok_or_else(|| anyhow!("no form host configured; pass --host or set FORM_BROKER_HOST"))?;
    let args = if cli.host_args.is_empty() {
        config.host_args().to_vec()
    } else {
        cli.host_args
    };

    let (host, events) = ProcessHost::spawn(&program, &args)?;
    let service = FormService::with_config(Arc::new(host), &config);
    let pump = service.spawn_event_pump(events);

    let target = service.target(cli.target);
    let response = form.show(&target).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);

    service.shutdown().await;
    pump.abort();
    Ok(())
}
