//! Alerts and the bounded alert log.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Info,
    Success,
    Warning,
    Error,
}

/// One entry in the alert log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self::at(kind, message, Utc::now())
    }

    pub fn at(kind: AlertKind, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp,
        }
    }
}

/// Default number of alerts kept.
pub const DEFAULT_ALERT_CAPACITY: usize = 50;

/// Insertion-ordered alert record that evicts its oldest entry once full.
#[derive(Debug, Clone)]
pub struct AlertLog {
    alerts: VecDeque<Alert>,
    capacity: usize,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}

impl AlertLog {
    /// Create a log holding at most `capacity` alerts (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            alerts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push to the end, evicting from the front past capacity.
    pub fn append(&mut self, alert: Alert) {
        self.alerts.push_back(alert);
        while self.alerts.len() > self.capacity {
            self.alerts.pop_front();
        }
    }

    /// Most recently appended alert.
    pub fn latest(&self) -> Option<&Alert> {
        self.alerts.back()
    }

    /// The last `count` alerts, oldest first.
    pub fn recent(&self, count: usize) -> Vec<Alert> {
        let skip = self.alerts.len().saturating_sub(count);
        self.alerts.iter().skip(skip).cloned().collect()
    }

    /// All alerts, oldest first.
    pub fn to_vec(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }

    /// Iterate oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    /// Drop every alert. Capacity is kept.
    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    /// Number of retained alerts.
    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
