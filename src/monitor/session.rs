//! Session state: counters, alert log and timing behind one owner.
//!
//! [`SessionAggregator`] is the only writer of the alert log and the
//! classifier. The proctor keeps it behind a single lock so every tick is
//! applied as one update and readers always see a consistent
//! [`StatusSnapshot`].

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::detection::{Detection, count_label};
use crate::monitor::alert::{Alert, AlertKind, AlertLog};
use crate::monitor::classifier::{Transition, ViolationClassifier, ViolationCounters};

/// Timing and activity of the proctoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub started_at: DateTime<Utc>,
    pub active: bool,
}

/// Read-only view of the monitoring state at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub person_count: usize,
    pub violations: ViolationCounters,
    pub session_start_time: DateTime<Utc>,
    pub is_active: bool,
}

impl StatusSnapshot {
    pub fn presence(&self) -> PresenceStatus {
        PresenceStatus::from_count(self.person_count)
    }

    /// Time since the session started, floored at zero.
    pub fn elapsed(&self, now: DateTime<Utc>) -> ChronoDuration {
        (now - self.session_start_time).max(ChronoDuration::zero())
    }
}

/// Presence as shown on the status panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    NoPerson,
    Single,
    Multiple(usize),
}

impl PresenceStatus {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => PresenceStatus::NoPerson,
            1 => PresenceStatus::Single,
            n => PresenceStatus::Multiple(n),
        }
    }

    pub fn message(&self) -> String {
        match self {
            PresenceStatus::NoPerson => "No person detected".to_string(),
            PresenceStatus::Single => "Single person detected".to_string(),
            PresenceStatus::Multiple(n) => format!("{n} persons detected"),
        }
    }
}

/// Render a session duration as `m:ss`.
pub fn format_session_duration(elapsed: ChronoDuration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Identifies the session state a tick was started against.
///
/// `epoch` changes whenever proctoring starts or stops, `generation`
/// whenever the session is reset. Results carrying an outdated ticket are
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTicket {
    epoch: u64,
    generation: u64,
}

/// What one applied tick changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub person_count: usize,
    pub transition: Option<Transition>,
}

/// Single owner of the session clock, classifier, alert log and latest
/// detections.
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    session: Session,
    classifier: ViolationClassifier,
    alerts: AlertLog,
    person_count: usize,
    detections: Vec<Detection>,
    tracked_label: String,
    epoch: u64,
    generation: u64,
}

impl SessionAggregator {
    /// Inactive aggregator counting detections labelled `tracked_label`.
    pub fn new(alert_capacity: usize, tracked_label: impl Into<String>) -> Self {
        Self {
            session: Session {
                started_at: Utc::now(),
                active: false,
            },
            classifier: ViolationClassifier::new(),
            alerts: AlertLog::new(alert_capacity),
            person_count: 0,
            detections: Vec::new(),
            tracked_label: tracked_label.into(),
            epoch: 0,
            generation: 0,
        }
    }

    /// Append an alert, evicting the oldest once the log is full.
    pub fn push_alert(&mut self, kind: AlertKind, message: impl Into<String>) {
        let alert = Alert::new(kind, message);
        tracing::debug!(kind = ?alert.kind, message = %alert.message, "Alert recorded");
        self.alerts.append(alert);
    }

    /// Mark the session active and restart its clock.
    pub fn begin(&mut self, now: DateTime<Utc>) {
        self.epoch += 1;
        self.session = Session {
            started_at: now,
            active: true,
        };
    }

    /// Mark the session inactive. Returns whether it was active.
    pub fn end(&mut self) -> bool {
        let was_active = self.session.active;
        if was_active {
            self.epoch += 1;
            self.session.active = false;
        }
        was_active
    }

    /// Clear alerts, counters and detections and restart the clock. The
    /// activity flag is left as it is.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.generation += 1;
        self.alerts.clear();
        self.classifier.reset();
        self.person_count = 0;
        self.detections.clear();
        self.session.started_at = now;
    }

    /// Ticket for a tick starting now, or `None` while inactive.
    pub fn ticket(&self) -> Option<TickTicket> {
        self.session.active.then_some(TickTicket {
            epoch: self.epoch,
            generation: self.generation,
        })
    }

    /// Whether results carrying `ticket` may still be applied.
    pub fn is_current(&self, ticket: TickTicket) -> bool {
        self.session.active && ticket.epoch == self.epoch && ticket.generation == self.generation
    }

    /// Apply one tick's detections. Returns `None` and changes nothing when
    /// the ticket is outdated.
    pub fn apply_detections(
        &mut self,
        ticket: TickTicket,
        detections: Vec<Detection>,
    ) -> Option<TickOutcome> {
        if !self.is_current(ticket) {
            return None;
        }

        let person_count = count_label(&detections, &self.tracked_label);
        let transition = self.classifier.observe(person_count);
        if let Some(t) = &transition {
            if t.is_violation() {
                tracing::warn!(person_count, violation = ?t, "Presence violation");
            }
            self.push_alert(t.alert_kind(), t.message());
        }

        self.person_count = person_count;
        self.detections = detections;
        Some(TickOutcome {
            person_count,
            transition,
        })
    }

    /// Record a failed detector call. Counters and person count stay as they
    /// were. Returns `false` for an outdated ticket.
    pub fn record_detection_failure(&mut self, ticket: TickTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.push_alert(AlertKind::Error, "Error during person detection");
        true
    }

    /// Person count, counters and timing as of the last applied tick.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            person_count: self.person_count,
            violations: self.classifier.counters(),
            session_start_time: self.session.started_at,
            is_active: self.session.active,
        }
    }

    /// Current session timing and activity.
    pub fn session(&self) -> Session {
        self.session
    }

    /// The alert log, oldest first.
    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    /// Detections from the last applied tick.
    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Detection, Rect};

    fn people(n: usize) -> Vec<Detection> {
        (0..n)
            .map(|i| Detection::person(i as f32 * 100.0, 0.0, 80.0, 200.0, 0.9))
            .collect()
    }

    fn active() -> (SessionAggregator, TickTicket) {
        let mut agg = SessionAggregator::new(50, "person");
        agg.begin(Utc::now());
        let ticket = agg.ticket().unwrap();
        (agg, ticket)
    }

    #[test]
    fn test_snapshot_deserialize_checks_counters() {
        let valid = r#"
            person_count = 1
            session_start_time = "2024-05-01T09:00:00Z"
            is_active = true

            [violations]
            no_person = 2
            multiple_person = 1
            total = 3
        "#;
        let snapshot: StatusSnapshot = toml::from_str(valid).unwrap();
        assert_eq!(snapshot.violations.total(), 3);

        let broken = valid.replace("total = 3", "total = 9");
        assert!(toml::from_str::<StatusSnapshot>(&broken).is_err());
    }

    #[test]
    fn test_inactive_has_no_ticket() {
        let agg = SessionAggregator::new(50, "person");
        assert!(agg.ticket().is_none());
        assert!(!agg.snapshot().is_active);
    }

    #[test]
    fn test_apply_counts_tracked_label_only() {
        let (mut agg, ticket) = active();
        let mut detections = people(1);
        detections.push(Detection::new("chair", 0.9, Rect::new(0.0, 0.0, 5.0, 5.0)));

        let outcome = agg.apply_detections(ticket, detections).unwrap();

        assert_eq!(outcome.person_count, 1);
        assert_eq!(outcome.transition, Some(Transition::Compliant));
        assert_eq!(agg.detections().len(), 2);
        assert_eq!(agg.alerts().latest().unwrap().kind, AlertKind::Success);
    }

    #[test]
    fn test_failure_leaves_state_unchanged() {
        let (mut agg, ticket) = active();
        agg.apply_detections(ticket, people(2));
        let before = agg.snapshot();

        assert!(agg.record_detection_failure(ticket));

        assert_eq!(agg.snapshot(), before);
        let latest = agg.alerts().latest().unwrap();
        assert_eq!(latest.kind, AlertKind::Error);
        assert_eq!(latest.message, "Error during person detection");
    }

    #[test]
    fn test_stale_ticket_discarded_after_end() {
        let (mut agg, ticket) = active();
        agg.end();

        assert!(agg.apply_detections(ticket, people(0)).is_none());
        assert!(!agg.record_detection_failure(ticket));
        assert!(agg.alerts().is_empty());
        assert_eq!(agg.snapshot().violations.total(), 0);
    }

    #[test]
    fn test_stale_ticket_discarded_after_restart() {
        let (mut agg, ticket) = active();
        agg.end();
        agg.begin(Utc::now());

        assert!(agg.apply_detections(ticket, people(0)).is_none());
        assert!(agg.apply_detections(agg.ticket().unwrap(), people(0)).is_some());
    }

    #[test]
    fn test_reset_keeps_activity_and_drops_old_tickets() {
        let (mut agg, ticket) = active();
        agg.apply_detections(ticket, people(0));
        agg.apply_detections(ticket, people(3));

        let later = Utc::now() + ChronoDuration::seconds(5);
        agg.reset(later);

        let snapshot = agg.snapshot();
        assert!(snapshot.is_active);
        assert_eq!(snapshot.violations, ViolationCounters::default());
        assert_eq!(snapshot.person_count, 0);
        assert_eq!(snapshot.session_start_time, later);
        assert!(agg.alerts().is_empty());
        assert!(agg.apply_detections(ticket, people(0)).is_none());
    }

    #[test]
    fn test_reset_twice_equals_once() {
        let (mut agg, ticket) = active();
        agg.apply_detections(ticket, people(0));
        let now = Utc::now();

        agg.reset(now);
        let once = agg.snapshot();
        agg.reset(now);

        assert_eq!(agg.snapshot(), once);
        assert!(agg.alerts().is_empty());
    }

    #[test]
    fn test_begin_restarts_clock_end_does_not() {
        let mut agg = SessionAggregator::new(50, "person");
        let t0 = Utc::now();
        agg.begin(t0);
        assert!(agg.end());
        assert!(!agg.end());
        assert_eq!(agg.session().started_at, t0);

        let t1 = t0 + ChronoDuration::seconds(30);
        agg.begin(t1);
        assert_eq!(agg.session().started_at, t1);
    }

    #[test]
    fn test_presence_and_duration_formatting() {
        assert_eq!(PresenceStatus::from_count(0).message(), "No person detected");
        assert_eq!(PresenceStatus::from_count(1).message(), "Single person detected");
        assert_eq!(PresenceStatus::from_count(4).message(), "4 persons detected");

        assert_eq!(format_session_duration(ChronoDuration::seconds(0)), "0:00");
        assert_eq!(format_session_duration(ChronoDuration::seconds(75)), "1:15");
        assert_eq!(format_session_duration(ChronoDuration::seconds(-3)), "0:00");
    }

    #[test]
    fn test_elapsed_since_start() {
        let (agg, _) = active();
        let snapshot = agg.snapshot();
        let later = snapshot.session_start_time + ChronoDuration::seconds(90);
        assert_eq!(snapshot.elapsed(later), ChronoDuration::seconds(90));
    }
}
