//! Health conditions reported on a component's status.
//!
//! A condition set holds at most one entry per type. [`set_condition`]
//! replaces an existing entry in place and appends otherwise, so the order in
//! which types first appeared is stable across passes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type for the generated Service.
pub const SERVICE_UP_TO_DATE: &str = "ServiceUpToDate";
/// Condition type for the generated Deployment.
pub const DEPLOYMENT_UP_TO_DATE: &str = "DeploymentUpToDate";
/// Condition type for the generated StatefulSet.
pub const STATEFUL_SET_UP_TO_DATE: &str = "StatefulSetUpToDate";
/// Condition type for spec validation.
pub const SPEC_VALID: &str = "SpecValid";

/// Reason recorded when a create-or-update call fails.
pub const REASON_UPDATE_ERROR: &str = "UpdateError";
/// Reason recorded when the live child cannot be fetched before applying.
pub const REASON_READ_ERROR: &str = "ReadError";
/// Reason recorded when an applied child cannot be read back.
pub const REASON_READ_BACK_ERROR: &str = "ReadBackError";
/// Reason recorded when the spec passes validation.
pub const REASON_VALID_SPEC: &str = "ValidSpec";
/// Reason recorded when the spec fails validation.
pub const REASON_INVALID_SPEC: &str = "InvalidSpec";

/// Health of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
    /// The aspect is in the desired state.
    Healthy,
    /// The aspect is not in the desired state.
    Unhealthy,
}

/// A typed health entry on a component status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, unique within a set.
    #[serde(rename = "type")]
    pub condition_type: String,

    /// Healthy or Unhealthy.
    pub status: ConditionStatus,

    /// Short machine-readable reason.
    pub reason: String,

    /// Human-readable message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Last time the status changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    /// A healthy condition stamped with the current time.
    pub fn healthy(
        condition_type: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(condition_type, ConditionStatus::Healthy, reason, message)
    }

    /// An unhealthy condition stamped with the current time.
    pub fn unhealthy(
        condition_type: impl Into<String>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(condition_type, ConditionStatus::Unhealthy, reason, message)
    }

    fn new(
        condition_type: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            condition_type: condition_type.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Whether the condition reports a healthy state.
    pub fn is_healthy(&self) -> bool {
        self.status == ConditionStatus::Healthy
    }
}

/// Insert or replace `condition` by type.
///
/// On replace the entry keeps its position. When the status did not change
/// the previous transition time is kept.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions
        .iter_mut()
        .find(|c| c.condition_type == condition.condition_type)
    {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time.take();
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

/// Look up a condition by type.
pub fn find_condition<'a>(conditions: &'a [Condition], condition_type: &str) -> Option<&'a Condition> {
    conditions
        .iter()
        .find(|c| c.condition_type == condition_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamped(mut c: Condition, time: &str) -> Condition {
        c.last_transition_time = Some(time.to_string());
        c
    }

    #[test]
    fn appends_new_types_in_order() {
        let mut set = Vec::new();
        set_condition(&mut set, Condition::healthy(SERVICE_UP_TO_DATE, "EnsuredService", ""));
        set_condition(
            &mut set,
            Condition::healthy(DEPLOYMENT_UP_TO_DATE, "EnsuredDeployment", ""),
        );

        let types: Vec<_> = set.iter().map(|c| c.condition_type.as_str()).collect();
        assert_eq!(types, vec![SERVICE_UP_TO_DATE, DEPLOYMENT_UP_TO_DATE]);
    }

    #[test]
    fn replaces_same_type_without_duplicating() {
        let mut set = Vec::new();
        set_condition(&mut set, Condition::healthy(SERVICE_UP_TO_DATE, "EnsuredService", ""));
        set_condition(
            &mut set,
            Condition::healthy(DEPLOYMENT_UP_TO_DATE, "EnsuredDeployment", ""),
        );
        set_condition(
            &mut set,
            Condition::unhealthy(SERVICE_UP_TO_DATE, REASON_UPDATE_ERROR, "boom"),
        );

        assert_eq!(set.len(), 2);
        assert_eq!(set[0].condition_type, SERVICE_UP_TO_DATE);
        assert_eq!(set[0].status, ConditionStatus::Unhealthy);
        assert_eq!(set[0].reason, REASON_UPDATE_ERROR);
        assert_eq!(set[1].condition_type, DEPLOYMENT_UP_TO_DATE);
    }

    #[test]
    fn keeps_transition_time_when_status_unchanged() {
        let mut set = vec![stamped(
            Condition::healthy(SERVICE_UP_TO_DATE, "EnsuredService", ""),
            "2019-07-01T00:00:00+00:00",
        )];
        set_condition(
            &mut set,
            stamped(
                Condition::healthy(SERVICE_UP_TO_DATE, "EnsuredService", "again"),
                "2019-07-02T00:00:00+00:00",
            ),
        );

        assert_eq!(
            set[0].last_transition_time.as_deref(),
            Some("2019-07-01T00:00:00+00:00")
        );
        assert_eq!(set[0].message, "again");
    }

    #[test]
    fn moves_transition_time_when_status_flips() {
        let mut set = vec![stamped(
            Condition::healthy(SERVICE_UP_TO_DATE, "EnsuredService", ""),
            "2019-07-01T00:00:00+00:00",
        )];
        set_condition(
            &mut set,
            stamped(
                Condition::unhealthy(SERVICE_UP_TO_DATE, "OrphanService", ""),
                "2019-07-02T00:00:00+00:00",
            ),
        );

        assert_eq!(
            set[0].last_transition_time.as_deref(),
            Some("2019-07-02T00:00:00+00:00")
        );
    }

    #[test]
    fn find_by_type() {
        let set = vec![Condition::unhealthy(SPEC_VALID, REASON_INVALID_SPEC, "bad")];
        assert!(find_condition(&set, SPEC_VALID).is_some());
        assert!(find_condition(&set, SERVICE_UP_TO_DATE).is_none());
    }
}
