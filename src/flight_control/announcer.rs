use crate::info;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc;

/// Notification sink for phase transitions and operator callouts.
///
/// Implementations must return immediately, an announcement never blocks
/// the control loop that issued it.
pub trait Announcer: Send + Sync {
    fn announce(&self, text: &str);
}

/// Prints announcements to the console, prefixed with mission-elapsed time.
pub struct LogAnnouncer {
    start: DateTime<Utc>,
}

impl LogAnnouncer {
    pub fn new() -> Self { Self { start: Utc::now() } }

    fn mission_elapsed(&self) -> String {
        let elapsed = Utc::now() - self.start;
        format_elapsed(elapsed)
    }
}

impl Default for LogAnnouncer {
    fn default() -> Self { Self::new() }
}

impl Announcer for LogAnnouncer {
    fn announce(&self, text: &str) {
        info!("T+{} {text}", self.mission_elapsed());
    }
}

/// Forwards announcements into an unbounded channel, e.g. to a speech or
/// telemetry downlink consumer running on another task.
pub struct ChannelAnnouncer {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelAnnouncer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Announcer for ChannelAnnouncer {
    fn announce(&self, text: &str) {
        // a hung up consumer must not take the flight down with it
        let _ = self.tx.send(text.to_string());
    }
}

/// Formats a mission-elapsed time as `HH:MM:SS`.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
