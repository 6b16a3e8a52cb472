use std::time::{Duration, Instant};

use super::error_handling::AppError;

pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationKind {
    pub fn label(self) -> &'static str {
        match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Transient, dismissible messages that expire after a fixed duration.
#[derive(Debug)]
pub struct NotificationCenter {
    duration: Duration,
    next_id: u64,
    entries: Vec<Notification>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_DURATION)
    }
}

impl NotificationCenter {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            next_id: 1,
            entries: Vec::new(),
        }
    }

    pub fn push_at(&mut self, kind: NotificationKind, message: impl Into<String>, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(Notification {
            id,
            kind,
            message: message.into(),
            expires_at: now + self.duration,
        });
        id
    }

    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>) -> u64 {
        self.push_at(kind, message, Instant::now())
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(NotificationKind::Success, message)
    }

    pub fn error(&mut self, error: &AppError) -> u64 {
        self.push(NotificationKind::Error, error.user_message())
    }

    /// Posts `success` on `Ok`, the error's user message on `Err`.
    pub fn report<T>(&mut self, result: &Result<T, AppError>, success: &str) -> u64 {
        match result {
            Ok(_) => self.success(success),
            Err(e) => self.error(e),
        }
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    /// Drops everything that has expired by `now`; returns how many went.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|n| n.expires_at > now);
        before - self.entries.len()
    }

    /// Live notifications, oldest first.
    pub fn active(&self, now: Instant) -> Vec<&Notification> {
        self.entries.iter().filter(|n| n.expires_at > now).collect()
    }
}
