//! Artifact naming rules and image-reference resolution.
//!
//! These are the naming conventions the execution engine uses for pipeline
//! artifacts and release streams. Validation resolves references with the
//! same rules so that what it accepts is what will run.

use super::types::{ClaimRelease, Document};

pub const PIPELINE_STREAM: &str = "pipeline";
pub const STABLE_STREAM: &str = "stable";
pub const RELEASE_PAYLOAD_STREAM: &str = "release";

pub const LATEST_RELEASE: &str = "latest";
pub const INITIAL_RELEASE: &str = "initial";

pub const SOURCE: &str = "src";
pub const ROOT: &str = "root";
pub const BINARIES: &str = "bin";
pub const TEST_BINARIES: &str = "test-bin";
pub const RPMS: &str = "rpms";
pub const BUNDLE_SOURCE: &str = "src-bundle";
pub const INDEX_IMAGE: &str = "ci-index";
pub const BUNDLE_PREFIX: &str = "ci-bundle";

/// Stream holding the images of release `name`.
pub fn release_stream_for(name: &str) -> String {
    if name == LATEST_RELEASE {
        STABLE_STREAM.to_string()
    } else {
        format!("{STABLE_STREAM}-{name}")
    }
}

/// Inverse of [`release_stream_for`].
pub fn release_name_from(stream: &str) -> String {
    if stream == STABLE_STREAM {
        LATEST_RELEASE.to_string()
    } else {
        stream
            .strip_prefix("stable-")
            .unwrap_or(stream)
            .to_string()
    }
}

pub fn is_release_stream(stream: &str) -> bool {
    stream.starts_with(STABLE_STREAM)
}

pub fn is_release_payload_stream(stream: &str) -> bool {
    stream == RELEASE_PAYLOAD_STREAM
}

/// Name of an artifact built for a specific ref of a multi-ref document.
pub fn with_ref(name: &str, reference: &str) -> String {
    if reference.is_empty() {
        name.to_string()
    } else {
        format!("{name}-{reference}")
    }
}

/// Name of the unnamed bundle at position `index`.
pub fn bundle_name(index: usize) -> String {
    format!("{BUNDLE_PREFIX}{index}")
}

/// Index image paired with a bundle; an empty name maps to the shared index.
pub fn index_name(bundle: &str) -> String {
    if bundle.is_empty() {
        INDEX_IMAGE.to_string()
    } else {
        format!("{INDEX_IMAGE}-{bundle}")
    }
}

pub fn is_index_image(name: &str) -> bool {
    name.starts_with(&format!("{INDEX_IMAGE}-"))
}

/// What a resolved image reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepLink {
    /// An artifact built or imported by the pipeline itself.
    Internal(String),
    /// A tag of a named release's image stream.
    ReleaseImage { release: String, tag: String },
    /// A release payload.
    ReleasePayload(String),
}

/// `None` when the stream is not one the pipeline knows how to provide.
pub fn link_for_image(stream: &str, tag: &str) -> Option<StepLink> {
    if stream == PIPELINE_STREAM {
        Some(StepLink::Internal(tag.to_string()))
    } else if is_release_payload_stream(stream) {
        Some(StepLink::ReleasePayload(tag.to_string()))
    } else if is_release_stream(stream) {
        Some(StepLink::ReleaseImage {
            release: release_name_from(stream),
            tag: tag.to_string(),
        })
    } else {
        None
    }
}

/// A reference split into stream and tag. `explicit` is false only when a bare
/// name fell through to the stable stream by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyParts {
    pub stream: String,
    pub tag: String,
    pub explicit: bool,
}

impl Document {
    pub fn is_base_image(&self, name: &str) -> bool {
        [&self.input.base_images, &self.input.base_rpm_images]
            .into_iter()
            .any(|images| images.as_ref().is_some_and(|m| m.contains_key(name)))
    }

    pub fn builds_image(&self, name: &str) -> bool {
        self.images.iter().any(|i| i.to == name)
    }

    pub fn is_bundle_image(&self, name: &str) -> bool {
        self.operator.as_ref().is_some_and(|op| {
            op.bundles.iter().enumerate().any(|(i, b)| {
                if b.as_name.is_empty() {
                    bundle_name(i) == name
                } else {
                    b.as_name == name
                }
            })
        })
    }

    /// Whether a bare name is provided by the pipeline stream.
    pub fn is_pipeline_image(&self, name: &str) -> bool {
        if self.is_base_image(name) {
            return true;
        }
        matches!(name, ROOT | SOURCE | BINARIES | TEST_BINARIES | RPMS) || self.builds_image(name)
    }

    /// Stream a bare name resolves to, and whether that was a deliberate match.
    pub fn image_stream_for(&self, name: &str) -> (&'static str, bool) {
        if self.is_pipeline_image(name) {
            (PIPELINE_STREAM, true)
        } else {
            (STABLE_STREAM, false)
        }
    }

    /// Splits `name` or `stream:tag`, applying a cluster claim's release rebinding.
    pub fn dependency_parts(&self, name: &str, claim: Option<&ClaimRelease>) -> DependencyParts {
        let (mut stream, mut tag, explicit) = match name.split_once(':') {
            Some((stream, tag)) => (stream.to_string(), tag.to_string(), true),
            None => {
                let (stream, explicit) = self.image_stream_for(name);
                (stream.to_string(), name.to_string(), explicit)
            }
        };
        if let Some(claim) = claim {
            if stream == release_stream_for(&claim.override_name) {
                stream = release_stream_for(&claim.release_name);
            }
            if stream == RELEASE_PAYLOAD_STREAM && tag == claim.override_name {
                tag = claim.release_name.clone();
            }
        }
        DependencyParts {
            stream,
            tag,
            explicit,
        }
    }

    /// Resolves an image name the way a step dependency would be, without claim context.
    pub fn link_for_image_name(&self, name: &str) -> Option<StepLink> {
        let parts = self.dependency_parts(name, None);
        link_for_image(&parts.stream, &parts.tag)
    }
}
