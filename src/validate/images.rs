//! Producers of pipeline artifacts: build roots, base images, image builds
//! and operator bundles. Every artifact they produce is registered in the
//! shared symbol table.

use std::collections::BTreeMap;

use crate::error::{ErrorKind, ValidationError};
use crate::parse::resolve::{
    BUNDLE_PREFIX, BUNDLE_SOURCE, INDEX_IMAGE, ROOT, bundle_name, index_name, with_ref,
};
use crate::parse::{
    BuildRootConfiguration, BuildRootSource, Document, ImageBuild, ImageStreamTagReference,
    OperatorConfiguration, PullSpecSubstitution,
};

use super::context::{ArtifactTable, FieldPath};

const UPDATE_GRAPH_MODES: [&str; 3] = ["semver", "semver-skippatch", "replaces"];

fn define(
    table: &mut ArtifactTable,
    path: &FieldPath,
    name: &str,
    errors: &mut Vec<ValidationError>,
) {
    if let Err(e) = table.define(path, name) {
        errors.push(e);
    }
}

// =============================================================================
// BUILD ROOTS
// =============================================================================

pub fn validate_build_roots(
    doc: &Document,
    table: &mut ArtifactTable,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(build_root) = &doc.input.build_root {
        validate_build_root(&FieldPath::new("build_root"), build_root, "", table, errors);
    } else if !doc.input.build_roots.is_empty() {
        let root = FieldPath::new("build_roots");
        for (reference, build_root) in &doc.input.build_roots {
            validate_build_root(&root.key(reference), build_root, reference, table, errors);
        }
    } else if !doc.images.is_empty() {
        errors.push(ValidationError::structural(
            "when 'images' are specified 'build_root' is required and must have image_stream_tag, project_image or from_repository set",
        ));
    }
}

fn validate_build_root(
    path: &FieldPath,
    build_root: &BuildRootConfiguration,
    reference: &str,
    table: &mut ArtifactTable,
    errors: &mut Vec<ValidationError>,
) {
    match build_root.sources().as_slice() {
        [] => errors.push(path.error(
            ErrorKind::Structural,
            "you have to specify one of project_image, image_stream_tag or from_repository",
        )),
        [BuildRootSource::ImageStreamTag(tag)] => {
            validate_build_root_tag(&path.field("image_stream_tag"), tag, errors)
        }
        [_] => {}
        [first, second, ..] => {
            let message = match (first, second) {
                (BuildRootSource::ImageStreamTag(_), BuildRootSource::ProjectImage(_)) => {
                    "image_stream_tag and project_image are mutually exclusive"
                }
                (BuildRootSource::ProjectImage(_), _) => {
                    "project_image and from_repository are mutually exclusive"
                }
                _ => "from_repository and image_stream_tag are mutually exclusive",
            };
            errors.push(path.error(ErrorKind::Structural, message));
        }
    }
    define(table, path, &with_ref(ROOT, reference), errors);
}

fn validate_build_root_tag(
    path: &FieldPath,
    tag: &ImageStreamTagReference,
    errors: &mut Vec<ValidationError>,
) {
    for (field, value) in [
        ("namespace", &tag.namespace),
        ("name", &tag.name),
        ("tag", &tag.tag),
    ] {
        if value.is_empty() {
            errors.push(
                path.field(field)
                    .error(ErrorKind::Structural, "value required but not provided"),
            );
        }
    }
}

// =============================================================================
// BASE IMAGES
// =============================================================================

fn validate_tag_reference_map(
    root: &str,
    images: &BTreeMap<String, ImageStreamTagReference>,
    errors: &mut Vec<ValidationError>,
) {
    for (name, image) in images {
        if name == ROOT {
            errors.push(ValidationError::naming(format!(
                "{root}.{name} can't be named 'root'"
            )));
        }
        if name == BUNDLE_SOURCE {
            errors.push(ValidationError::naming(format!(
                "{root}.{name}: cannot be named {BUNDLE_SOURCE}"
            )));
        }
        if name.starts_with(BUNDLE_PREFIX) {
            errors.push(ValidationError::naming(format!(
                "{root}.{name}: cannot begin with `{BUNDLE_PREFIX}`"
            )));
        }
        if name.starts_with(INDEX_IMAGE) {
            errors.push(ValidationError::naming(format!(
                "{root}.{name}: cannot begin with {INDEX_IMAGE}"
            )));
        }
        if image.tag.is_empty() {
            errors.push(ValidationError::structural(format!(
                "{root}.{name}.tag: value required but not provided"
            )));
        }
    }
}

pub fn validate_base_images(
    images: &BTreeMap<String, ImageStreamTagReference>,
    table: &mut ArtifactTable,
    errors: &mut Vec<ValidationError>,
) {
    let root = FieldPath::new("base_images");
    validate_tag_reference_map(root.as_str(), images, errors);
    for name in images.keys() {
        define(table, &root.key(name), name, errors);
    }
}

/// Each RPM base image is imported as `<name>-without-rpms` and rebuilt as `<name>`.
pub fn validate_base_rpm_images(
    images: &BTreeMap<String, ImageStreamTagReference>,
    table: &mut ArtifactTable,
    errors: &mut Vec<ValidationError>,
) {
    let root = FieldPath::new("base_rpm_images");
    validate_tag_reference_map(root.as_str(), images, errors);
    for name in images.keys() {
        let path = root.key(name);
        define(table, &path, &format!("{name}-without-rpms"), errors);
        define(table, &path, name, errors);
    }
}

// =============================================================================
// IMAGE BUILDS
// =============================================================================

pub fn validate_images(
    images: &[ImageBuild],
    table: &mut ArtifactTable,
    errors: &mut Vec<ValidationError>,
) {
    let root = FieldPath::new("images");
    for (i, image) in images.iter().enumerate() {
        let path = root.index(i);
        if image.to.is_empty() {
            errors.push(path.error(ErrorKind::Structural, "`to` must be set"));
        } else {
            define(table, &path, &with_ref(&image.to, &image.reference), errors);
        }
        if image.dockerfile_literal.is_some()
            && (!image.context_dir.is_empty() || !image.dockerfile_path.is_empty())
        {
            errors.push(path.error(
                ErrorKind::Structural,
                "dockerfile_literal is mutually exclusive with context_dir and dockerfile_path",
            ));
        }
    }
}

// =============================================================================
// OPERATOR
// =============================================================================

pub fn validate_operator(
    doc: &Document,
    operator: &OperatorConfiguration,
    table: &mut ArtifactTable,
    errors: &mut Vec<ValidationError>,
) {
    let root = FieldPath::new("operator");
    define(table, &root, BUNDLE_SOURCE, errors);

    for (i, bundle) in operator.bundles.iter().enumerate() {
        let path = root.field("bundles").index(i);
        let (image_path, image_name) = if bundle.as_name.is_empty() {
            (path.clone(), bundle_name(i))
        } else {
            (path.field("as"), bundle.as_name.clone())
        };
        define(table, &image_path, &image_name, errors);
        define(table, &image_path, &index_name(&image_name), errors);

        if bundle.as_name.is_empty() && !bundle.base_index.is_empty() {
            errors.push(
                path.field("base_index")
                    .error(ErrorKind::Structural, "base_index requires 'as' to be set"),
            );
        }
        if bundle.as_name.is_empty() && bundle.skip_building_index {
            errors.push(path.field("skip_building_index").error(
                ErrorKind::Structural,
                "skip_building_index requires 'as' to be set",
            ));
        }
        if !bundle.update_graph.is_empty() {
            let update_graph = path.field("update_graph");
            if bundle.base_index.is_empty() {
                errors.push(update_graph.error(
                    ErrorKind::Structural,
                    "update_graph requires base_index to be set",
                ));
            }
            if !UPDATE_GRAPH_MODES.contains(&bundle.update_graph.as_str()) {
                errors.push(update_graph.error(
                    ErrorKind::Format,
                    format!(
                        "update_graph must be {}, {}, or {}",
                        UPDATE_GRAPH_MODES[0], UPDATE_GRAPH_MODES[1], UPDATE_GRAPH_MODES[2]
                    ),
                ));
            }
        }
    }

    for (i, substitution) in operator.substitutions.iter().enumerate() {
        let path = root.field("substitute").index(i);
        if let Err(e) = validate_substitution(doc, &path, substitution) {
            errors.push(e);
        }
    }
}

/// Stops at the first problem: a missing field leaves nothing to resolve.
fn validate_substitution(
    doc: &Document,
    path: &FieldPath,
    substitution: &PullSpecSubstitution,
) -> Result<(), ValidationError> {
    if substitution.pullspec.is_empty() {
        return Err(path.field("pullspec").error(ErrorKind::Structural, "must be set"));
    }
    if substitution.with.is_empty() {
        return Err(path.field("with").error(ErrorKind::Structural, "must be set"));
    }
    if doc.link_for_image_name(&substitution.with).is_none() {
        return Err(path.field("with").error(
            ErrorKind::Reference,
            format!(
                "could not resolve '{}' to an image involved in the config",
                substitution.with
            ),
        ));
    }
    Ok(())
}
