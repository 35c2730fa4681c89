use anyhow::{Context, Result};
use roombook_schema::{cli, settings::Settings};

#[tokio::main]
async fn main() {
    roombook_schema::try_or_exit(run()).await;
}

async fn run() -> Result<()> {
    let args = cli::parse_args();

    roombook_schema::setup_logging(args.verbose, args.logoutput.as_deref())?;

    let config = args.config.to_string_lossy();
    let settings = Settings::load(&config)
        .with_context(|| format!("Failed to load settings from {}", config))?;

    log::debug!("Settings loaded: database configured = {}", settings.database.is_some());

    cli::run(&args, &settings).await
}
