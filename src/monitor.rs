//! Presence-violation monitoring.
//!
//! Raw detection counts flow from the periodic detection loop into the
//! [`ViolationClassifier`], whose transitions become alerts and counter
//! updates held by the [`SessionAggregator`]. [`Proctor`] wires these to a
//! camera and a detector and exposes the host commands.

mod alert;
mod classifier;
mod proctor;
mod scheduler;
mod session;

pub use alert::{Alert, AlertKind, AlertLog, DEFAULT_ALERT_CAPACITY};
pub use classifier::{
    InconsistentCounters, Transition, ViolationClassifier, ViolationCounters, classify,
};
pub use proctor::Proctor;
pub use scheduler::OverlayFeed;
pub use session::{
    PresenceStatus, Session, SessionAggregator, StatusSnapshot, TickOutcome, TickTicket,
    format_session_duration,
};
