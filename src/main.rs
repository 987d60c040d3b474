//! Meteobot CLI entry point.
//!
//! Provides `start`, `once`, and `preview` subcommands for running the
//! scheduled bot, sending a single report immediately, or printing a report
//! without delivering it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use teloxide::Bot;
use tokio::sync::watch;
use tracing::{error, info};

use meteobot::config::Config;
use meteobot::delivery::ReportJob;
use meteobot::moderation::ModerationFilter;
use meteobot::scheduler::{self, SchedulerDeps, SendSchedule};
use meteobot::telegram::{self, TelegramTransport};
use meteobot::transport::ChatTransport;
use meteobot::weather::{OpenWeatherClient, WeatherProvider};

/// Meteobot: scheduled weather reports for Telegram chats.
#[derive(Parser)]
#[command(name = "meteobot", version, about)]
struct Cli {
    /// Path to config.toml (default: $METEOBOT_CONFIG_PATH or ./config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute (default: start).
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Run the scheduler (and moderation, if enabled) until Ctrl+C.
    Start,
    /// Send one report to every configured chat now and exit.
    Once,
    /// Print a report to stdout without sending it.
    Preview,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Command::Start) {
        Command::Start => handle_start(Config::load(config_path)?).await,
        Command::Once => {
            let config = Config::load(config_path)?;
            meteobot::logging::init_cli(&config.logging)?;
            handle_once(config).await
        }
        Command::Preview => {
            let config = Config::load(config_path)?;
            meteobot::logging::init_cli(&config.logging)?;
            handle_preview(config).await
        }
    }
}

fn build_provider(config: &Config) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let client = OpenWeatherClient::new(
        config.weather_api_key()?,
        &config.weather.lang,
        config.timezone()?,
        config.weather.timeout(),
    )
    .context("failed to build weather client")?
    .with_base_url(&config.weather.base_url);
    Ok(Arc::new(client))
}

fn build_transport(config: &Config) -> anyhow::Result<TelegramTransport> {
    TelegramTransport::new(
        config.telegram_bot_token()?,
        std::time::Duration::from_secs(config.telegram.timeout_secs),
    )
}

/// Run the scheduled bot.
async fn handle_start(config: Config) -> anyhow::Result<()> {
    let logs_dir = config.logging.resolve_dir()?;
    let _logging_guard = meteobot::logging::init_production(&logs_dir, &config.logging)?;
    config.log_origin();

    config.validate().context("invalid configuration")?;
    info!(city = %config.weather.city, chats = config.telegram.chat_ids.len(), "meteobot starting");

    let tz = config.timezone()?;
    let job = Arc::new(ReportJob::from_config(&config, build_provider(&config)?)?);
    let transport: Arc<dyn ChatTransport> = Arc::new(build_transport(&config)?);
    let schedule = SendSchedule::parse(&config.schedule.send_times, tz)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handle = tokio::spawn(scheduler::run_scheduler(
        SchedulerDeps {
            job,
            transport: Arc::clone(&transport),
            destinations: config.telegram.chat_ids.clone(),
            schedule,
            tick: std::time::Duration::from_secs(config.schedule.tick_secs),
        },
        shutdown_rx,
    ));

    if config.moderation.enabled {
        let filter = Arc::new(ModerationFilter::from_config(&config.moderation));
        info!(
            active = filter.is_active(),
            threshold = filter.threshold(),
            policy = ?filter.policy(),
            "moderation enabled"
        );
        telegram::run_moderation(
            Bot::new(config.telegram_bot_token()?),
            filter,
            Arc::clone(&transport),
        )
        .await;
    } else {
        info!("moderation disabled, waiting for Ctrl+C");
        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl+C")?;
    }

    info!("shutdown requested");
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_handle.await {
        error!(error = %e, "scheduler task failed");
    }

    info!("meteobot shut down cleanly");
    Ok(())
}

/// Send one report to every configured chat.
async fn handle_once(config: Config) -> anyhow::Result<()> {
    config.log_origin();
    config.validate().context("invalid configuration")?;

    let job = ReportJob::from_config(&config, build_provider(&config)?)?;
    let transport = build_transport(&config)?;
    let outcome = job.run(&transport, &config.telegram.chat_ids).await;

    if outcome.delivered == 0 {
        anyhow::bail!("report was not delivered to any chat");
    }
    info!(delivered = outcome.delivered, failed = outcome.failed, "report sent");
    Ok(())
}

/// Print a report without delivering it.
async fn handle_preview(config: Config) -> anyhow::Result<()> {
    config.log_origin();
    let job = ReportJob::from_config(&config, build_provider(&config)?)?;
    let text = job
        .try_build(job.local_now())
        .await
        .context("weather data unavailable")?;
    println!("{text}");
    Ok(())
}
