use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Local;
use clap::Parser;
use log::{error, info};
use tokio::sync::mpsc;

use crate::core::{
    config::{ConfigManager, Settings},
    error::AlarmError,
    notify::DesktopNotifier,
    scheduler::{AlarmConfig, AlarmScheduler},
    sound::AlarmSound,
    timeout,
};

#[derive(Debug, Parser)]
#[command(version, about = "Repeating desktop alarm and countdown timer")]
struct Cli {
    /// Notification title
    #[arg(long, alias = "ti")]
    title: Option<String>,

    /// Notification body
    #[arg(short, long)]
    message: Option<String>,

    /// When the alarm should fire: a date-time, a bare HH:MM clock
    /// time, or a relative duration like 90s / 5m / 2h
    #[arg(short, long)]
    timeout: Option<String>,

    /// Sound file to play, looked up in the files directory
    #[arg(short, long)]
    sound: Option<String>,

    /// Icon file for the notification
    #[arg(short, long)]
    icon: Option<String>,

    /// Skip sound playback
    #[arg(long)]
    no_sound: bool,

    /// Skip the desktop notification
    #[arg(long)]
    no_notification: bool,

    /// Fire once instead of repeating until acknowledged
    #[arg(long)]
    single: bool,
}

#[tokio::main(flavor = "current_thread")]
pub async fn run() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run_alarm(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run_alarm(cli: Cli) -> Result<(), AlarmError> {
    let base_dir = exe_dir();
    let mut settings = ConfigManager::new(base_dir.clone()).load();
    settings.apply_env_overrides(|key| std::env::var(key).ok());

    let config = alarm_options(&cli, &settings, &base_dir.join("files"));
    if settings.debug {
        info!("Options: {config:?}");
        info!("Settings: {settings:?}");
    }

    let raw = required_timeout(&cli)?;

    // Checked up front even when --no-sound suppresses playback.
    let player = AlarmSound::new(config.sound_file.clone())?;

    let timeout = timeout::resolve(raw, Local::now())?;
    info!(
        "Starting alarm for {raw} = {}ms = {}s",
        timeout.as_millis(),
        timeout.as_secs()
    );

    let (ack_tx, ack_rx) = mpsc::channel(1);
    let notifier = DesktopNotifier::new(ack_tx);

    let scheduler = AlarmScheduler::new(
        config,
        settings.log_interval(),
        settings.repeat_interval(),
        Box::new(player),
        Box::new(notifier),
        ack_rx,
    );
    scheduler.run(timeout).await;

    Ok(())
}

/// The timeout flag is mandatory; an empty value counts as absent.
fn required_timeout(cli: &Cli) -> Result<&str, AlarmError> {
    cli.timeout
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .ok_or(AlarmError::MissingTimeout)
}

/// Merge CLI arguments over settings over the hardcoded defaults into
/// the final alarm configuration.
fn alarm_options(cli: &Cli, settings: &Settings, files_dir: &Path) -> AlarmConfig {
    let sound = cli.sound.as_deref().unwrap_or(&settings.default_sound);
    let icon = cli.icon.as_deref().unwrap_or(&settings.default_icon);

    AlarmConfig {
        title: cli.title.clone().unwrap_or_else(|| "Alarm".to_string()),
        message: cli
            .message
            .clone()
            .unwrap_or_else(|| "Time's up!".to_string()),
        // join() drops the base when the name is already absolute.
        sound_file: files_dir.join(sound),
        icon_file: files_dir.join(icon),
        no_sound: cli.no_sound,
        no_notification: cli.no_notification,
        single: cli.single,
    }
}

/// Directory holding the executable, the anchor for `config.json` and
/// the bundled `files/` directory.
fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
