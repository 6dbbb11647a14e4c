//! Cluster profile membership and profile/claim ownership.

use crate::config::{Owner, ReferenceData};
use crate::error::ValidationError;
use crate::parse::{ClusterClaim, Metadata};

/// Ownership restriction for one profile or claim. An empty owner list leaves
/// it open to everyone.
fn verify_ownership(
    owners: &[Owner],
    metadata: &Metadata,
    kind: &str,
    name: &str,
) -> Result<(), ValidationError> {
    if owners.is_empty() {
        return Ok(());
    }
    if metadata.org.is_empty() || metadata.repo.is_empty() {
        return Err(ValidationError::reference(
            "can't do ownership check, metadata not defined",
        ));
    }
    if owners.iter().any(|o| o.admits(&metadata.org, &metadata.repo)) {
        return Ok(());
    }
    Err(ValidationError::reference(format!(
        "{}/{} is not an owner of the cluster {kind}: {name:?}",
        metadata.org, metadata.repo
    )))
}

fn prefixed(root: &str, error: ValidationError) -> ValidationError {
    ValidationError::new(error.kind, format!("{root}: {}", error.message))
}

pub fn verify_profile_ownership(
    owners: &[Owner],
    metadata: &Metadata,
    profile: &str,
) -> Result<(), ValidationError> {
    verify_ownership(owners, metadata, "profile", profile)
}

pub fn verify_claim_ownership(
    owners: &[Owner],
    metadata: &Metadata,
    claim: &str,
) -> Result<(), ValidationError> {
    verify_ownership(owners, metadata, "claim", claim)
}

/// Profile must be known (when a registry is configured) and usable by the
/// document's org/repo.
pub fn validate_cluster_profile(
    root: &str,
    profile: &str,
    metadata: &Metadata,
    reference: &ReferenceData,
    errors: &mut Vec<ValidationError>,
) {
    let invalid = || {
        ValidationError::reference(format!("{root}: invalid cluster profile {profile:?}"))
    };
    if profile.is_empty() {
        errors.push(invalid());
        return;
    }
    let Some(profiles) = &reference.profiles else {
        return;
    };
    match profiles.get(profile) {
        None => errors.push(invalid()),
        Some(details) => {
            if let Err(e) = verify_profile_ownership(&details.owners, metadata, profile) {
                errors.push(prefixed(root, e));
            }
        }
    }
}

/// Claims are restricted by their `owner` field.
pub fn validate_claim_ownership(
    root: &str,
    claim: &ClusterClaim,
    metadata: &Metadata,
    reference: &ReferenceData,
    errors: &mut Vec<ValidationError>,
) {
    let Some(details) = reference
        .claim_owners
        .as_ref()
        .and_then(|owners| owners.get(&claim.owner))
    else {
        return;
    };
    if let Err(e) = verify_claim_ownership(&details.owners, metadata, &claim.owner) {
        errors.push(prefixed(root, e));
    }
}
