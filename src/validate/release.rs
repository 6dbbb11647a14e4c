//! Release descriptors and the legacy `tag_specification` shorthand.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::parse::resolve::{INITIAL_RELEASE, LATEST_RELEASE};
use crate::parse::{
    Candidate, Integration, Prerelease, Release, ReleaseKind, ReleaseTagConfiguration,
    UnresolvedRelease,
};

static MINOR_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]\.[0-9]+").expect("Invalid regex constant"));

const PRODUCTS: &[&str] = &["ocp", "okd"];
const ARCHITECTURES: &[&str] = &["amd64", "arm64", "multi", "ppc64le", "s390x"];
const CHANNELS: &[&str] = &["candidate", "fast", "stable"];

pub fn validate_release_tag_configuration(
    root: &str,
    tag: &ReleaseTagConfiguration,
    errors: &mut Vec<ValidationError>,
) {
    if tag.namespace.is_empty() {
        errors.push(ValidationError::structural(format!("{root}: no namespace defined")));
    }
    if tag.name.is_empty() {
        errors.push(ValidationError::structural(format!("{root}: no name defined")));
    }
}

/// Checks every named release in name order.
pub fn validate_releases(
    root: &str,
    releases: &BTreeMap<String, UnresolvedRelease>,
    has_tag_spec: bool,
    errors: &mut Vec<ValidationError>,
) {
    for (name, release) in releases {
        let path = format!("{root}.{name}");
        if has_tag_spec {
            for reserved in [LATEST_RELEASE, INITIAL_RELEASE] {
                if name == reserved {
                    errors.push(ValidationError::structural(format!(
                        "{path}: cannot request resolving a(n) {reserved} release and set tag_specification"
                    )));
                }
            }
        }
        if name.contains('.') {
            errors.push(ValidationError::naming(format!(
                "{root}[{name}]: the release name is not valid: must not contain '.'"
            )));
        }

        match release.kinds().as_slice() {
            [] => errors.push(ValidationError::structural(format!(
                "{path}: must set integration, candidate, prerelease or release"
            ))),
            [ReleaseKind::Integration(integration)] => {
                validate_integration(&path, name, integration, errors)
            }
            [ReleaseKind::Candidate(candidate)] => validate_candidate(&path, candidate, errors),
            [ReleaseKind::Release(release)] => validate_release(&path, release, errors),
            [ReleaseKind::Prerelease(prerelease)] => {
                validate_prerelease(&path, prerelease, errors)
            }
            _ => errors.push(ValidationError::structural(format!(
                "{path}: cannot set more than one of integration, candidate, prerelease and release"
            ))),
        }
    }
}

fn validate_integration(
    root: &str,
    name: &str,
    integration: &Integration,
    errors: &mut Vec<ValidationError>,
) {
    if integration.name.is_empty() {
        errors.push(ValidationError::structural(format!("{root}.name: must be set")));
    }
    if integration.namespace.is_empty() {
        errors.push(ValidationError::structural(format!("{root}.namespace: must be set")));
    }
    if integration.include_built_images && name != LATEST_RELEASE {
        errors.push(ValidationError::structural(format!(
            "{root}: only the `latest` release can set `include_built_images`"
        )));
    }
}

fn validate_candidate(root: &str, candidate: &Candidate, errors: &mut Vec<ValidationError>) {
    if let Err(e) = check_product(&format!("{root}.product"), &candidate.product) {
        errors.push(e);
        return;
    }
    check_architecture(root, &candidate.architecture, errors);

    // okd may leave the stream unset; it is defaulted later
    let streams: &[&str] = match candidate.product.as_str() {
        "okd" => &["", "okd", "okd-scos"],
        _ => &["ci", "nightly"],
    };
    if !streams.contains(&candidate.stream.as_str()) {
        errors.push(ValidationError::format(format!(
            "{root}.stream: must be one of {}",
            streams.join(", ")
        )));
    }

    if let Err(e) = check_version(&format!("{root}.version"), &candidate.version) {
        errors.push(e);
    }
    if candidate.relative < 0 {
        errors.push(ValidationError::format(format!(
            "{root}.relative: must be a positive integer"
        )));
    }
}

fn validate_release(root: &str, release: &Release, errors: &mut Vec<ValidationError>) {
    check_architecture(root, &release.architecture, errors);
    if !CHANNELS.contains(&release.channel.as_str()) {
        errors.push(ValidationError::format(format!(
            "{root}.channel: must be one of {}",
            CHANNELS.join(", ")
        )));
        return;
    }
    if let Err(e) = check_version(&format!("{root}.version"), &release.version) {
        errors.push(e);
    }
}

fn validate_prerelease(root: &str, prerelease: &Prerelease, errors: &mut Vec<ValidationError>) {
    if let Err(e) = check_product(&format!("{root}.product"), &prerelease.product) {
        errors.push(e);
        return;
    }
    check_architecture(root, &prerelease.architecture, errors);
    if prerelease.version_bounds.lower.is_empty() {
        errors.push(ValidationError::structural(format!(
            "{root}.version_bounds.lower: must be set"
        )));
    }
    if prerelease.version_bounds.upper.is_empty() {
        errors.push(ValidationError::structural(format!(
            "{root}.version_bounds.upper: must be set"
        )));
    }
}

fn check_product(root: &str, product: &str) -> Result<(), ValidationError> {
    if PRODUCTS.contains(&product) {
        Ok(())
    } else {
        Err(ValidationError::format(format!(
            "{root}: must be one of {}",
            PRODUCTS.join(", ")
        )))
    }
}

/// An empty architecture is allowed and defaulted later.
fn check_architecture(root: &str, architecture: &str, errors: &mut Vec<ValidationError>) {
    if !architecture.is_empty() && !ARCHITECTURES.contains(&architecture) {
        errors.push(ValidationError::format(format!(
            "{root}.architecture: must be one of {}",
            ARCHITECTURES.join(", ")
        )));
    }
}

fn check_version(root: &str, version: &str) -> Result<(), ValidationError> {
    if MINOR_VERSION.is_match(version) {
        Ok(())
    } else {
        Err(ValidationError::format(format!(
            "{root}: must be a minor version in the form {}",
            MINOR_VERSION.as_str()
        )))
    }
}
