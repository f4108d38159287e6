use admission_webhook::{
    cli,
    config::{self, Config},
    tracing::setup_tracing,
    AdmissionWebhook,
};
use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    let config = Config::from_args(&matches)?;

    setup_tracing(&config.log_level, &config.log_fmt, config.log_no_color)?;
    info!(
        service = config::SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        "starting"
    );

    let webhook = AdmissionWebhook::new_from_config(config).await?;
    webhook.run().await?;

    Ok(())
}
