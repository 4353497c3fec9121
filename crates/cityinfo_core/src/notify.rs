//! Outbound notification collaborator.
//!
//! # Responsibility
//! - Tell someone outside core that a point of interest was removed.
//!
//! # Invariants
//! - Notifiers never fail the operation that triggered them.
//! - Log lines carry metadata only; message text may hold user input.

use log::info;
use std::sync::Mutex;

/// Receives human-readable notices from core use-cases.
pub trait Notifier {
    fn notify(&self, subject: &str, message: &str);
}

/// Notifier that writes notices to the core log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, message: &str) {
        info!("{}", notification_log_line(subject, message));
    }
}

fn notification_log_line(subject: &str, message: &str) -> String {
    format!(
        "event=notification module=notify status=sent subject={subject:?} message_chars={}",
        message.chars().count()
    )
}

/// Notifier that keeps every notice in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(subject, message)` pairs received so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, subject: &str, message: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((subject.to_string(), message.to_string()));
        }
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, subject: &str, message: &str) {
        (**self).notify(subject, message);
    }
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn notify(&self, subject: &str, message: &str) {
        (**self).notify(subject, message);
    }
}
