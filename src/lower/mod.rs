//! Lowering phase: Document → execution-graph steps.
//!
//! Expands a configuration into the steps the execution engine would run,
//! each with the artifacts it creates and the artifacts it needs. Only names
//! and edges are modelled; nothing here resolves images or talks to a cluster.

pub mod builder;

use crate::parse::Document;

/// What a graph step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphStepKind {
    /// Clones the repository into `src`.
    Source,
    /// Tags an external image into the pipeline.
    InputImage,
    /// Builds an image from a Dockerfile.
    ImageBuild,
    /// Runs commands on top of an earlier artifact (`bin`, `test-bin`, `rpms`).
    PipelineCache,
    RpmServe,
    RpmInjection,
    ReleaseInputs,
    ReleaseImport,
    BundleSource,
    IndexGenerator,
    Test,
    Promotion,
}

/// An artifact a step consumes. `field` is set when the reference comes from
/// the document and should be reported against that location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub image: String,
    pub field: Option<String>,
    /// Strict references must name a pipeline artifact; lenient ones may also
    /// be release or registry images and are only checked for well-known names.
    pub strict: bool,
}

impl Requirement {
    pub fn internal(image: impl Into<String>) -> Self {
        Requirement {
            image: image.into(),
            field: None,
            strict: false,
        }
    }

    pub fn strict(image: impl Into<String>, field: impl Into<String>) -> Self {
        Requirement {
            image: image.into(),
            field: Some(field.into()),
            strict: true,
        }
    }

    pub fn lenient(image: impl Into<String>, field: impl Into<String>) -> Self {
        Requirement {
            image: image.into(),
            field: Some(field.into()),
            strict: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStep {
    pub name: String,
    pub kind: GraphStepKind,
    pub creates: Vec<String>,
    pub requires: Vec<Requirement>,
}

impl GraphStep {
    pub fn new(kind: GraphStepKind, name: impl Into<String>) -> Self {
        GraphStep {
            name: name.into(),
            kind,
            creates: Vec::new(),
            requires: Vec::new(),
        }
    }

    /// A step whose only output is the artifact it is named after.
    pub fn producing(kind: GraphStepKind, name: impl Into<String>) -> Self {
        let name = name.into();
        GraphStep {
            creates: vec![name.clone()],
            ..GraphStep::new(kind, name)
        }
    }

    pub fn requiring(mut self, requirement: Requirement) -> Self {
        self.requires.push(requirement);
        self
    }
}

/// Steps in the order the engine would assemble them.
pub fn lower(doc: &Document) -> Vec<GraphStep> {
    let mut steps = Vec::new();
    builder::build_roots(doc, &mut steps);
    builder::source(&mut steps);
    builder::binaries(doc, &mut steps);
    builder::base_images(doc, &mut steps);
    builder::images(doc, &mut steps);
    builder::operator(doc, &mut steps);
    builder::tests(doc, &mut steps);
    builder::releases(doc, &mut steps);
    builder::promotion(doc, &mut steps);
    tracing::debug!(steps = steps.len(), "lowered configuration");
    steps
}
