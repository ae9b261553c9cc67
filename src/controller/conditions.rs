//! Status condition bookkeeping for Hostproxy.
//!
//! Conditions are keyed by `type`: at most one entry per type, updated in
//! place so the order of the others is preserved.

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};

/// Progress/health of the dependents.
pub const AVAILABLE: &str = "Available";
/// Set while the finalizer runs on a resource being deleted.
pub const DEGRADED: &str = "Degraded";

pub const REASON_RECONCILING: &str = "Reconciling";
pub const REASON_FINALIZING: &str = "Finalizing";
pub const REASON_RESIZING: &str = "Resizing";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a condition stamped with the current time.
pub fn new_condition(
    type_: &str,
    status: ConditionStatus,
    reason: &str,
    message: impl Into<String>,
    observed_generation: Option<i64>,
) -> Condition {
    Condition {
        type_: type_.to_string(),
        status: status.as_str().to_string(),
        reason: reason.to_string(),
        message: message.into(),
        observed_generation,
        last_transition_time: Time(Utc::now()),
    }
}

/// Look up the condition of the given type.
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Record `condition`, returning whether anything changed.
///
/// An entry with the same status, reason and message keeps its transition
/// time; only a differing observed generation is carried over. Otherwise the
/// existing entry of that type is replaced in place, or the condition is
/// appended.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) -> bool {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status
                && existing.reason == condition.reason
                && existing.message == condition.message
            {
                if existing.observed_generation == condition.observed_generation {
                    return false;
                }
                existing.observed_generation = condition.observed_generation;
                return true;
            }
            *existing = condition;
            true
        }
        None => {
            conditions.push(condition);
            true
        }
    }
}
