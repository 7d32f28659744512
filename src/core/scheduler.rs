//! The alarm state machine.
//!
//! An armed alarm counts down with a periodic status line, fires when
//! its trigger elapses, then refires on the repeat interval until the
//! user acknowledges it. Acknowledgment is the only terminal event and
//! cancels whatever is still pending.

use std::path::PathBuf;
use std::time::Duration;

use log::info;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::notify::Notifier;
use super::sound::SoundPlayer;
use super::timeout::ResolvedTimeout;

/// Everything one alarm needs, fixed before scheduling starts.
#[derive(Debug, Clone)]
pub struct AlarmConfig {
    pub title: String,
    pub message: String,
    pub sound_file: PathBuf,
    pub icon_file: PathBuf,
    pub no_sound: bool,
    pub no_notification: bool,
    pub single: bool,
}

/// Mutable state of one alarm run, handed back when the run ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmRunState {
    /// How many times the alarm has fired.
    pub fires: u32,
    /// Set when the terminal acknowledgment arrived.
    pub acknowledged: bool,
}

/// Drives one alarm from armed to acknowledged.
///
/// Three timer lines exist while it runs: the one-shot trigger, the
/// countdown status tick, and the repeat tick. Each is owned by
/// [`run`](Self::run) and cancelled by dropping it. Cancellation is
/// best-effort: a sound or notification already handed to the OS is
/// not recalled.
pub struct AlarmScheduler {
    config: AlarmConfig,
    log_interval: Duration,
    repeat_interval: Duration,
    player: Box<dyn SoundPlayer>,
    notifier: Box<dyn Notifier>,
    ack_rx: mpsc::Receiver<()>,
}

impl AlarmScheduler {
    pub fn new(
        config: AlarmConfig,
        log_interval: Duration,
        repeat_interval: Duration,
        player: Box<dyn SoundPlayer>,
        notifier: Box<dyn Notifier>,
        ack_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            config,
            log_interval,
            repeat_interval,
            player,
            notifier,
            ack_rx,
        }
    }

    /// Wait out the timeout, then fire until acknowledged.
    ///
    /// Returns only after acknowledgment. An acknowledgment that lands
    /// while the alarm is still armed cancels the trigger before it
    /// ever fires.
    pub async fn run(mut self, timeout: ResolvedTimeout) -> AlarmRunState {
        let started = Instant::now();
        let mut state = AlarmRunState::default();

        let trigger = time::sleep(timeout);
        tokio::pin!(trigger);

        // Armed: race the trigger against the countdown tick and an
        // early acknowledgment. Leaving the block drops the tick.
        let fired = {
            let mut log_tick = time::interval_at(started + self.log_interval, self.log_interval);
            log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // Polled in order: a tick due at the firing instant
                // yields to the trigger instead of logging once more.
                tokio::select! {
                    biased;
                    () = &mut trigger => break true,
                    _ = log_tick.tick() => self.log_countdown(started, timeout),
                    () = Self::acknowledged(&mut self.ack_rx) => break false,
                }
            }
        };

        if fired {
            self.fire(&mut state);

            if self.config.single {
                // No repeat line in single-shot mode. The alarm stays
                // alive waiting for its acknowledgment.
                Self::acknowledged(&mut self.ack_rx).await;
            } else {
                let mut repeat =
                    time::interval_at(Instant::now() + self.repeat_interval, self.repeat_interval);
                repeat.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = repeat.tick() => self.fire(&mut state),
                        () = Self::acknowledged(&mut self.ack_rx) => break,
                    }
                }
            }
        }

        state.acknowledged = true;
        info!("Acknowledged");
        state
    }

    /// One firing: log it, play the sound, show the notification.
    /// Every firing after the first counts as a reminder.
    fn fire(&self, state: &mut AlarmRunState) {
        if state.fires > 0 {
            info!("Reminder alarm!");
        }
        info!("Alarm!");
        state.fires += 1;

        if !self.config.no_sound {
            self.player.play();
        }
        if !self.config.no_notification {
            self.notifier
                .show(&self.config.title, &self.config.message, &self.config.icon_file);
        }
    }

    fn log_countdown(&self, started: Instant, timeout: Duration) {
        let elapsed = started.elapsed();
        let left = timeout.saturating_sub(elapsed);
        info!(
            "Time elapsed: {}s, time left {}s",
            elapsed.as_secs(),
            left.as_secs() + 1
        );
    }

    /// Completes when the user acknowledges the alarm. If every sender
    /// is gone nobody can acknowledge anymore and the future parks
    /// forever rather than fabricating an acknowledgment.
    async fn acknowledged(ack_rx: &mut mpsc::Receiver<()>) {
        match ack_rx.recv().await {
            Some(()) => {}
            None => std::future::pending::<()>().await,
        }
    }
}
