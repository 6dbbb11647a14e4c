//! Promotion targets.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::parse::resolve::LATEST_RELEASE;
use crate::parse::{Document, PromotionConfiguration};

/// Namespaces guarded by the cluster admission webhook.
static FORBIDDEN_NAMESPACES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^kube|^openshift|^default$|^redhat").expect("Invalid regex constant")
});

/// Present on every cluster, so promoting there needs no namespace creation.
const NAMESPACE_EXCEPTIONS: &[&str] = &["openshift"];

const OFFICIAL_NAMESPACES: &[&str] = &["ocp", "origin"];

pub fn is_official_namespace(namespace: &str) -> bool {
    OFFICIAL_NAMESPACES.contains(&namespace)
}

/// Whether the document produces anything a promotion would publish.
pub fn has_image_targets(doc: &Document) -> bool {
    !doc.images.is_empty()
        || doc
            .promotion
            .as_ref()
            .is_some_and(|p| !p.additional_images.is_empty())
}

pub fn validate_promotion(root: &str, doc: &Document, errors: &mut Vec<ValidationError>) {
    let Some(promotion) = &doc.promotion else {
        return;
    };
    let imports_release = doc.input.tag_specification.is_some()
        || doc.input.releases.contains_key(LATEST_RELEASE);
    let image_targets = has_image_targets(doc);
    validate_promotion_configuration(root, promotion, image_targets, imports_release, errors);
}

fn validate_promotion_configuration(
    root: &str,
    promotion: &PromotionConfiguration,
    image_targets: bool,
    imports_release: bool,
    errors: &mut Vec<ValidationError>,
) {
    let legacy = promotion.has_legacy_target();
    let path_of = |i: usize| -> String {
        match (legacy, i) {
            (true, 0) => root.to_string(),
            (true, i) => format!("{root}.to[{}]", i - 1),
            (false, i) => format!("{root}.to[{i}]"),
        }
    };

    let targets = promotion.all_targets();
    for (i, target) in targets.iter().enumerate() {
        let path = path_of(i);
        if target.namespace.is_empty() {
            errors.push(ValidationError::structural(format!("{path}: no namespace defined")));
        }
        if FORBIDDEN_NAMESPACES.is_match(&target.namespace)
            && !NAMESPACE_EXCEPTIONS.contains(&target.namespace.as_str())
        {
            errors.push(ValidationError::naming(format!(
                "{path}: cannot promote to namespace {} matching this regular expression: (^kube.*|^openshift.*|^default$|^redhat.*)",
                target.namespace
            )));
        }
        match (target.name.is_empty(), target.tag.is_empty()) {
            (true, true) => errors.push(ValidationError::structural(format!(
                "{path}: no name or tag defined"
            ))),
            (false, false) => errors.push(ValidationError::structural(format!(
                "{path}: both name and tag defined"
            ))),
            _ => {}
        }

        if is_official_namespace(&target.namespace) && image_targets && !imports_release {
            errors.push(ValidationError::reference(format!(
                "importing the release stream is required to ensure the promoted images to the namespace {} can be integrated properly. Although it can be achieved by tag_specification or releases[\"latest\"], adding an e2e test is strongly suggested",
                target.namespace
            )));
        }

        for (j, other) in targets.iter().enumerate() {
            if i != j
                && target.namespace == other.namespace
                && target.name == other.name
                && target.tag == other.tag
            {
                errors.push(ValidationError::naming(format!(
                    "{path}: promotes to the same target as {}",
                    path_of(j)
                )));
            }
        }
    }
}
