//! Edge-triggered presence classifier.
//!
//! The state is just the person count seen on the previous tick (or `None`
//! before the first tick). Counters move only when the count crosses into a
//! violating range, never while it stays there.

use serde::{Deserialize, Serialize};

use crate::monitor::alert::AlertKind;

/// Cumulative violation counts for one session.
///
/// `total == no_person + multiple_person` holds for every value this type
/// can take. Deserialization rejects input that breaks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "CounterFields")]
pub struct ViolationCounters {
    no_person: u64,
    multiple_person: u64,
    total: u64,
}

impl ViolationCounters {
    #[inline]
    pub fn no_person(&self) -> u64 {
        self.no_person
    }

    #[inline]
    pub fn multiple_person(&self) -> u64 {
        self.multiple_person
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Counters after recording `transition`. Non-violations leave them
    /// unchanged.
    #[must_use]
    pub fn record(self, transition: &Transition) -> Self {
        match transition {
            Transition::NoPerson => Self {
                no_person: self.no_person + 1,
                total: self.total + 1,
                ..self
            },
            Transition::MultiplePersons(_) => Self {
                multiple_person: self.multiple_person + 1,
                total: self.total + 1,
                ..self
            },
            Transition::Compliant => self,
        }
    }
}

/// Serialized counters whose total disagrees with its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("violation total {total} does not equal {no_person} + {multiple_person}")]
pub struct InconsistentCounters {
    pub no_person: u64,
    pub multiple_person: u64,
    pub total: u64,
}

#[derive(Deserialize)]
struct CounterFields {
    no_person: u64,
    multiple_person: u64,
    total: u64,
}

impl TryFrom<CounterFields> for ViolationCounters {
    type Error = InconsistentCounters;

    fn try_from(fields: CounterFields) -> Result<Self, Self::Error> {
        let CounterFields {
            no_person,
            multiple_person,
            total,
        } = fields;
        if no_person.checked_add(multiple_person) != Some(total) {
            return Err(InconsistentCounters {
                no_person,
                multiple_person,
                total,
            });
        }
        Ok(Self {
            no_person,
            multiple_person,
            total,
        })
    }
}

/// A change in presence worth alerting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Frame became empty
    NoPerson,
    /// More than one person appeared; carries the count
    MultiplePersons(usize),
    /// Back to exactly one person
    Compliant,
}

impl Transition {
    pub fn alert_kind(&self) -> AlertKind {
        match self {
            Transition::NoPerson => AlertKind::Error,
            Transition::MultiplePersons(_) => AlertKind::Warning,
            Transition::Compliant => AlertKind::Success,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Transition::NoPerson => "No person detected in frame".to_string(),
            Transition::MultiplePersons(n) => format!("Multiple persons detected ({n})"),
            Transition::Compliant => "Single person detected - compliant".to_string(),
        }
    }

    pub fn is_violation(&self) -> bool {
        !matches!(self, Transition::Compliant)
    }
}

/// Transition rule. The first matching arm wins.
pub fn classify(previous: Option<usize>, person_count: usize) -> Option<Transition> {
    if person_count == 0 && previous != Some(0) {
        Some(Transition::NoPerson)
    } else if person_count > 1 && previous.is_none_or(|p| p <= 1) {
        Some(Transition::MultiplePersons(person_count))
    } else if person_count == 1 && previous != Some(1) {
        Some(Transition::Compliant)
    } else {
        None
    }
}

/// Owns the previous count and the violation counters.
#[derive(Debug, Clone, Default)]
pub struct ViolationClassifier {
    previous: Option<usize>,
    counters: ViolationCounters,
}

impl ViolationClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one tick's person count.
    pub fn observe(&mut self, person_count: usize) -> Option<Transition> {
        let transition = classify(self.previous, person_count);
        if let Some(t) = &transition {
            self.counters = self.counters.record(t);
        }
        self.previous = Some(person_count);
        transition
    }

    pub fn counters(&self) -> ViolationCounters {
        self.counters
    }

    /// Count from the last observed tick.
    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    /// Forget the previous count and zero the counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
