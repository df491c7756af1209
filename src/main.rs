//! Umbrella service entry point.
//!
//! Intended to run once per scheduled trigger on a weekday morning.

use std::time::Duration;

use anyhow::Context;
use argh::FromArgs;
use chrono::Utc;

use umbrella_service::alert::notify::{
    LogChannel, NotificationChannel, PushoverChannel, failure_notification, summary_notification,
};
use umbrella_service::config::{Config, ConfigError, PUSHOVER_TOKEN_VAR};
use umbrella_service::ingest::darksky::{DarkSkyClient, forecast_page_url};
use umbrella_service::ingest::retry::RetryingFetcher;
use umbrella_service::logging::{self, Component};
use umbrella_service::RouteAssessor;

#[derive(FromArgs)]
/// Decide whether today's commute needs an umbrella and send a push notification.
struct Args {
    /// TOML config file; without it configuration is read from the environment
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// log the notification instead of sending it
    #[argh(switch)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => Config::load(path),
        None => Config::from_env(),
    }
    .context("Failed to load configuration")?;

    logging::init_logger(
        config.log_level(),
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    )?;

    logging::info(
        Component::Config,
        None,
        &format!(
            "Work window {}..={} {}, score threshold {}, {} fetch attempts",
            config.day_begin,
            config.day_end,
            config.timezone,
            config.score_threshold,
            config.retry_policy().attempts
        ),
    );

    // one "now" for the whole run, even if it strides midnight
    let now = Utc::now();
    logging::info(
        Component::System,
        None,
        &format!("Assessing {} route points at {}", config.route.len(), now.with_timezone(&config.timezone)),
    );

    let channel: Box<dyn NotificationChannel> = if args.dry_run {
        Box::new(LogChannel)
    } else if config.pushover_configured() {
        Box::new(PushoverChannel::new(
            &config.pushover.app_token,
            &config.pushover.user_key,
            &config.pushover.base_url,
        )?)
    } else {
        return Err(ConfigError::Missing(PUSHOVER_TOKEN_VAR))
            .context("Pushover credentials are required unless --dry-run is given");
    };

    let client = DarkSkyClient::new(
        &config.forecast.api_key,
        &config.forecast.base_url,
        Duration::from_secs(config.forecast.timeout_secs),
    )?;
    let assessor = RouteAssessor::new(client, RetryingFetcher::new(config.retry_policy()));

    match assessor.assess(&config.route, now, &config.work_window(), config.score_threshold) {
        Ok(result) => {
            let url = config.route.first().map(forecast_page_url);
            channel
                .send(&summary_notification(&result, url))
                .context("Failed to send summary notification")?;
            Ok(())
        }
        Err(err) => {
            // already logged by the assessor
            channel
                .send(&failure_notification(&err))
                .context("Failed to send failure notification")?;
            if err.is_nothing_to_report() {
                Ok(())
            } else {
                Err(err.into())
            }
        }
    }
}
