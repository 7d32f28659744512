//! Desktop notification delivery and acknowledgment.

use std::path::Path;

use log::warn;
use tokio::sync::mpsc;

#[cfg(all(unix, not(target_os = "macos")))]
use log::info;

/// Shows the alarm notification without blocking the caller.
pub trait Notifier: Send {
    fn show(&self, title: &str, message: &str, icon: &Path);
}

/// Notifications through the platform notification service.
///
/// The acknowledgment sender is registered once, at construction. The
/// channel holds a single message and clicks use `try_send`, so any
/// click after the first is absorbed without effect.
pub struct DesktopNotifier {
    ack_tx: mpsc::Sender<()>,
}

impl DesktopNotifier {
    pub fn new(ack_tx: mpsc::Sender<()>) -> Self {
        Self { ack_tx }
    }
}

impl Notifier for DesktopNotifier {
    fn show(&self, title: &str, message: &str, icon: &Path) {
        let title = title.to_string();
        let message = message.to_string();
        let icon = icon.display().to_string();
        let ack_tx = self.ack_tx.clone();

        // Delivery blocks while waiting for the click, so it runs on
        // its own thread and the scheduler keeps ticking.
        std::thread::spawn(move || deliver(&title, &message, &icon, &ack_tx));
    }
}

/// XDG notification servers report actions back, so the notification
/// carries a default action and the thread waits for the click.
#[cfg(all(unix, not(target_os = "macos")))]
fn deliver(title: &str, message: &str, icon: &str, ack_tx: &mpsc::Sender<()>) {
    use notify_rust::{Notification, Timeout};

    let mut notification = Notification::new();
    notification
        .summary(title)
        .body(message)
        .icon(icon)
        .sound_name("alarm-clock-elapsed")
        .timeout(Timeout::Never)
        .action("default", "Acknowledge");

    match notification.show() {
        Ok(handle) => handle.wait_for_action(|action| {
            if action == "default" {
                info!("Clicked");
                let _ = ack_tx.try_send(());
            }
        }),
        Err(err) => warn!("Could not show notification: {err}"),
    }
}

/// Without action support the notification is fire-and-forget and
/// acknowledgment has to come from terminating the process.
#[cfg(not(all(unix, not(target_os = "macos"))))]
fn deliver(title: &str, message: &str, icon: &str, _ack_tx: &mpsc::Sender<()>) {
    use notify_rust::{Notification, Timeout};

    let mut notification = Notification::new();
    notification
        .summary(title)
        .body(message)
        .icon(icon)
        .timeout(Timeout::Never);

    if let Err(err) = notification.show() {
        warn!("Could not show notification: {err}");
    }
}
