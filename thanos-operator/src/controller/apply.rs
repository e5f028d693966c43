//! Create-or-update of child resources.
//!
//! The desired object only describes the fields the operator owns. An
//! existing object is updated by copying those fields onto it, which keeps
//! server-assigned state such as `resourceVersion`, `clusterIP`, defaulted
//! pod template fields and status. When the existing object already carries
//! every owned value nothing is written.

use super::client::ClusterClient;
use crate::error::{OperatorError, OperatorResult};
use crate::resources::quantity::parse_quantity;
use crate::resources::ChildResource;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde_json::Value;
use std::fmt;

/// What create-or-update did.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The child did not exist and was created.
    Created(ChildResource),
    /// The child differed and was replaced.
    Updated(ChildResource),
    /// The child already matched; no write happened.
    Unchanged(ChildResource),
}

impl ApplyOutcome {
    /// The child as stored after the operation.
    pub fn child(&self) -> &ChildResource {
        match self {
            ApplyOutcome::Created(c) | ApplyOutcome::Updated(c) | ApplyOutcome::Unchanged(c) => c,
        }
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApplyOutcome::Created(_) => "created",
            ApplyOutcome::Updated(_) => "updated",
            ApplyOutcome::Unchanged(_) => "unchanged",
        })
    }
}

/// Create `desired`, or bring `existing` in line with it.
pub async fn create_or_update(
    client: &dyn ClusterClient,
    namespace: &str,
    existing: Option<ChildResource>,
    desired: ChildResource,
) -> OperatorResult<ApplyOutcome> {
    let Some(existing) = existing else {
        let created = client.create_child(namespace, &desired).await?;
        return Ok(ApplyOutcome::Created(created));
    };

    let merged = merge(&existing, &desired)?;
    if is_subset(&to_value(&merged)?, &to_value(&existing)?) {
        return Ok(ApplyOutcome::Unchanged(existing));
    }

    let replaced = client.replace_child(namespace, &merged).await?;
    Ok(ApplyOutcome::Updated(replaced))
}

/// Copy the owned fields of `desired` onto `existing`.
///
/// Labels are overlaid, the controller reference is set, and the spec
/// fields the builders produce replace the existing ones. Fields the API
/// server refuses to change after creation (workload selectors, StatefulSet
/// service name and claim templates) keep their existing value, and the pod
/// template labels are extended so the kept selector still matches.
pub fn merge(existing: &ChildResource, desired: &ChildResource) -> OperatorResult<ChildResource> {
    let mut merged = existing.clone();

    {
        let (meta, wanted) = (merged.metadata_mut(), desired.metadata());
        if let Some(labels) = &wanted.labels {
            meta.labels
                .get_or_insert_with(Default::default)
                .extend(labels.clone());
        }
    }
    let controller_ref = desired
        .metadata()
        .owner_references
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|r| r.controller == Some(true))
        .cloned();
    if let Some(owner) = controller_ref {
        merged.set_controller_owner(owner);
    }

    match (&mut merged, desired) {
        (ChildResource::Service(current), ChildResource::Service(wanted)) => {
            let spec = current.spec.get_or_insert_with(Default::default);
            let wanted = wanted.spec.clone().unwrap_or_default();
            spec.selector = wanted.selector;
            spec.ports = wanted.ports;
        }
        (ChildResource::Deployment(current), ChildResource::Deployment(wanted)) => {
            let spec = current.spec.get_or_insert_with(Default::default);
            let wanted = wanted.spec.clone().unwrap_or_default();
            spec.replicas = wanted.replicas;
            spec.template = wanted.template;
            if is_empty_selector(&spec.selector) {
                spec.selector = wanted.selector;
            } else {
                pin_selector(&spec.selector, &mut spec.template);
            }
        }
        (ChildResource::StatefulSet(current), ChildResource::StatefulSet(wanted)) => {
            let spec = current.spec.get_or_insert_with(Default::default);
            let wanted = wanted.spec.clone().unwrap_or_default();
            spec.replicas = wanted.replicas;
            spec.template = wanted.template;
            pin_selector(&spec.selector, &mut spec.template);
        }
        (current, wanted) => {
            return Err(OperatorError::InvalidConfig(format!(
                "cannot merge {} into {}",
                wanted.kind(),
                current.kind()
            )))
        }
    }
    Ok(merged)
}

fn is_empty_selector(selector: &LabelSelector) -> bool {
    selector.match_labels.as_ref().map_or(true, |l| l.is_empty())
        && selector.match_expressions.as_ref().map_or(true, |e| e.is_empty())
}

/// Add the selector's labels to the pod template, replacing conflicting values.
fn pin_selector(selector: &LabelSelector, template: &mut PodTemplateSpec) {
    let Some(match_labels) = &selector.match_labels else {
        return;
    };
    template
        .metadata
        .get_or_insert_with(Default::default)
        .labels
        .get_or_insert_with(Default::default)
        .extend(match_labels.clone());
}

fn to_value(child: &ChildResource) -> OperatorResult<Value> {
    let value = match child {
        ChildResource::Service(o) => serde_json::to_value(o)?,
        ChildResource::Deployment(o) => serde_json::to_value(o)?,
        ChildResource::StatefulSet(o) => serde_json::to_value(o)?,
    };
    Ok(value)
}

/// Keys whose values map resource names to quantities.
const QUANTITY_MAPS: [&str; 2] = ["limits", "requests"];

/// Whether every value set in `wanted` is present and equal in `actual`.
///
/// Objects may carry extra keys in `actual`; arrays must have the same
/// length and match element by element. Values under `limits` and
/// `requests` are compared as quantities, since the API server stores
/// them in canonical form (`1024Mi` reads back as `1Gi`).
pub fn is_subset(wanted: &Value, actual: &Value) -> bool {
    subset(wanted, actual, false)
}

fn subset(wanted: &Value, actual: &Value, quantities: bool) -> bool {
    match (wanted, actual) {
        (Value::Object(w), Value::Object(a)) => w.iter().all(|(key, value)| match a.get(key) {
            Some(other) => subset(value, other, quantities || QUANTITY_MAPS.contains(&key.as_str())),
            None => value.is_null(),
        }),
        (Value::Array(w), Value::Array(a)) => {
            w.len() == a.len() && w.iter().zip(a).all(|(x, y)| subset(x, y, quantities))
        }
        (Value::String(w), Value::String(a)) if quantities => same_quantity(w, a),
        _ => wanted == actual,
    }
}

fn same_quantity(wanted: &str, actual: &str) -> bool {
    match (parse_quantity(wanted), parse_quantity(actual)) {
        (Some(w), Some(a)) => (w - a).abs() <= 1e-9 * w.abs().max(a.abs()),
        _ => wanted == actual,
    }
}
