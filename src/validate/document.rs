//! Whole-document rules that do not belong to any one section.

use crate::error::ValidationError;
use crate::parse::Document;

use super::ValidationOptions;

pub fn validate_document(doc: &Document, options: &ValidationOptions, errors: &mut Vec<ValidationError>) {
    // A document may exist only to promote its source.
    let promotes_additional = doc
        .promotion
        .as_ref()
        .is_some_and(|p| !p.additional_images.is_empty());
    if doc.tests.is_empty() && doc.images.is_empty() && !promotes_additional {
        errors.push(ValidationError::structural(
            "you must define at least one test or image build in 'tests' or 'images'",
        ));
    }

    if !doc.rpm_build_location.is_empty() && doc.rpm_build_commands.is_empty() {
        errors.push(ValidationError::structural(
            "'rpm_build_location' defined but no 'rpm_build_commands' found",
        ));
    }
    if !doc.rpm_build_location_list.is_empty() && doc.rpm_build_commands_list.is_empty() {
        errors.push(ValidationError::structural(
            "'rpm_build_location_list' defined but no 'rpm_build_commands_list' found",
        ));
    }
    if doc.input.base_rpm_images.is_some()
        && doc.rpm_build_commands.is_empty()
        && doc.rpm_build_commands_list.is_empty()
    {
        errors.push(ValidationError::reference(
            "'base_rpm_images' defined but no 'rpm_build_commands' or 'rpm_build_commands_list' found",
        ));
    }

    if !options.org.is_empty() && !options.repo.is_empty() {
        let default_location = format!("github.com/{}/{}", options.org, options.repo);
        if doc.canonical_go_repository.as_deref() == Some(default_location.as_str()) {
            errors.push(ValidationError::structural(
                "'canonical_go_repository' provides the default location, so is unnecessary",
            ));
        }
    }

    // The list forms are only produced when merging configurations, and a
    // merged document carries no metadata.
    let sets_lists = !doc.binary_build_commands_list.is_empty()
        || !doc.test_binary_build_commands_list.is_empty()
        || !doc.rpm_build_commands_list.is_empty()
        || !doc.rpm_build_location_list.is_empty();
    if !doc.metadata.org.is_empty() && sets_lists {
        errors.push(ValidationError::structural(
            "it is not permissible to directly set: ‘binary_build_commands_list’, ‘test_binary_build_commands_list’, ‘rpm_build_commands_list’, or ‘rpm_build_location_list’",
        ));
    }
}
