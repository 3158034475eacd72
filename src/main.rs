use dotenv::dotenv;
use teloxide::Bot;
use tg_format_bot::{
    config::Config,
    handler::{App, run},
    telemetry::setup_logger,
};
use tracing::info;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenv().ok();
    color_eyre::install()?;
    setup_logger()?;

    let config = Config::from_env()?;
    info!(
        download_dir = %config.download_dir.display(),
        max_concurrent_jobs = config.max_concurrent_jobs,
        "configuration loaded"
    );
    tokio::fs::create_dir_all(&config.download_dir).await?;

    let bot = Bot::new(config.token.clone());
    let app = App::from_config(&config);

    run(bot, app).await;

    Ok(())
}
