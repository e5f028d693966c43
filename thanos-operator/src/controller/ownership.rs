//! Ownership guard for existing children.
//!
//! A child whose name collides with ours but that belongs to another owner
//! must be left alone. Unowned children are adopted.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

/// Return the current owner of `existing` when it is not the expected parent.
///
/// The controller reference decides when present, otherwise the first
/// reference. Returns `None` for an unowned child or one owned by the parent
/// identified by `owner_kind` and `owner_name`.
pub fn foreign_owner(
    existing: &ObjectMeta,
    owner_kind: &str,
    owner_name: &str,
) -> Option<OwnerReference> {
    let refs = existing.owner_references.as_deref().unwrap_or_default();
    let current = refs
        .iter()
        .find(|r| r.controller == Some(true))
        .or_else(|| refs.first())?;

    if current.kind == owner_kind && current.name == owner_name {
        None
    } else {
        Some(current.clone())
    }
}
