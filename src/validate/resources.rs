//! Resource profiles and per-step resource requirements.

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::format::{Quantity, parse_quantity};
use crate::parse::{ResourceList, ResourceRequirements};

pub const SHM_RESOURCE: &str = "ci-operator.openshift.io/shm";
pub const KVM_RESOURCE: &str = "devices.kubevirt.io/kvm";
const SHM_LIMIT: &str = "2G";

/// The document-level profile map: non-empty, with a `*` fallback, each
/// profile well-formed.
pub fn validate_resources(
    root: &str,
    resources: &BTreeMap<String, ResourceRequirements>,
    errors: &mut Vec<ValidationError>,
) {
    if resources.is_empty() {
        errors.push(ValidationError::structural(format!(
            "'{root}' should be specified to provide resource requests"
        )));
        return;
    }
    if !resources.contains_key("*") {
        errors.push(ValidationError::structural(format!(
            "'{root}' must specify a blanket policy for '*'"
        )));
    }
    for (key, requirements) in resources {
        validate_resource_requirements(&format!("{root}.{key}"), requirements, errors);
    }
}

pub fn validate_resource_requirements(
    root: &str,
    requirements: &ResourceRequirements,
    errors: &mut Vec<ValidationError>,
) {
    validate_resource_list(&format!("{root}.limits"), &requirements.limits, errors);
    validate_resource_list(&format!("{root}.requests"), &requirements.requests, errors);
    if requirements.requests.is_empty() && requirements.limits.is_empty() {
        errors.push(ValidationError::structural(format!(
            "'{root}' should have at least one request or limit"
        )));
    }
}

fn validate_resource_list(root: &str, list: &ResourceList, errors: &mut Vec<ValidationError>) {
    for (key, raw) in list {
        match key.as_str() {
            "cpu" | "memory" | SHM_RESOURCE => {
                let quantity = match parse_quantity(raw) {
                    Ok(quantity) => {
                        if quantity.is_zero() {
                            errors.push(ValidationError::format(format!(
                                "{root}.{key}: quantity cannot be zero"
                            )));
                        }
                        if quantity.is_negative() {
                            errors.push(ValidationError::format(format!(
                                "{root}.{key}: quantity cannot be negative"
                            )));
                        }
                        Some(quantity)
                    }
                    Err(e) => {
                        errors.push(ValidationError::format(format!(
                            "{root}.{key}: invalid quantity: {e}"
                        )));
                        None
                    }
                };
                if key == SHM_RESOURCE {
                    check_shm_limit(root, key, quantity, errors);
                }
            }
            KVM_RESOURCE => {
                if raw != "1" {
                    errors.push(ValidationError::format(format!("{root}.{key}: must be 1")));
                }
            }
            _ => errors.push(ValidationError::naming(format!(
                "'{root}' specifies an invalid key {key}"
            ))),
        }
    }
}

fn check_shm_limit(
    root: &str,
    key: &str,
    quantity: Option<Quantity>,
    errors: &mut Vec<ValidationError>,
) {
    let Some(quantity) = quantity else { return };
    let Ok(limit) = parse_quantity(SHM_LIMIT) else { return };
    if quantity > limit {
        errors.push(ValidationError::format(format!(
            "{root}.{key}: quantity cannot be greater than {SHM_LIMIT}"
        )));
    }
}
