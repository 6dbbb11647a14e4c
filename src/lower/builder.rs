//! Per-section step construction.

use crate::parse::resolve::{
    BINARIES, BUNDLE_SOURCE, INDEX_IMAGE, INITIAL_RELEASE, LATEST_RELEASE, ROOT, RPMS, SOURCE,
    TEST_BINARIES, bundle_name, index_name, with_ref,
};
use crate::parse::{BuildRootConfiguration, Document, LiteralTestStep, TestKind};

use super::{GraphStep, GraphStepKind, Requirement};

pub const RPM_SERVE: &str = "[serve:rpms]";
pub const RELEASE_INPUTS: &str = "[release-inputs]";
pub const PROMOTION: &str = "[promotion]";

pub fn input_step_name(image: &str) -> String {
    format!("[input:{image}]")
}

pub fn release_step_name(release: &str) -> String {
    format!("[release:{release}]")
}

/// Index generator paired with an index image.
pub fn index_generator_name(index: &str) -> String {
    format!("{index}-gen")
}

fn without_rpms(name: &str) -> String {
    format!("{name}-without-rpms")
}

// =============================================================================
// INPUTS
// =============================================================================

pub fn build_roots(doc: &Document, steps: &mut Vec<GraphStep>) {
    if let Some(root) = &doc.input.build_root {
        steps.push(build_root_step(root, ROOT.to_string()));
    } else {
        for (reference, root) in &doc.input.build_roots {
            steps.push(build_root_step(root, with_ref(ROOT, reference)));
        }
    }
}

fn build_root_step(root: &BuildRootConfiguration, name: String) -> GraphStep {
    if root.project_image.is_some() {
        GraphStep::producing(GraphStepKind::ImageBuild, name)
    } else {
        GraphStep {
            creates: vec![name.clone()],
            ..GraphStep::new(GraphStepKind::InputImage, input_step_name(&name))
        }
    }
}

/// The checkout is always part of the graph.
pub fn source(steps: &mut Vec<GraphStep>) {
    steps.push(
        GraphStep::producing(GraphStepKind::Source, SOURCE)
            .requiring(Requirement::internal(ROOT)),
    );
}

pub fn binaries(doc: &Document, steps: &mut Vec<GraphStep>) {
    if !doc.binary_build_commands.is_empty() {
        steps.push(
            GraphStep::producing(GraphStepKind::PipelineCache, BINARIES)
                .requiring(Requirement::internal(SOURCE)),
        );
    }
    if !doc.test_binary_build_commands.is_empty() {
        steps.push(
            GraphStep::producing(GraphStepKind::PipelineCache, TEST_BINARIES)
                .requiring(Requirement::internal(SOURCE)),
        );
    }
    if !doc.rpm_build_commands.is_empty() {
        let from = if doc.binary_build_commands.is_empty() {
            SOURCE
        } else {
            BINARIES
        };
        steps.push(
            GraphStep::producing(GraphStepKind::PipelineCache, RPMS)
                .requiring(Requirement::internal(from)),
        );
        steps.push(
            GraphStep::new(GraphStepKind::RpmServe, RPM_SERVE)
                .requiring(Requirement::internal(RPMS)),
        );
    }
}

pub fn base_images(doc: &Document, steps: &mut Vec<GraphStep>) {
    for name in doc.input.base_images.iter().flat_map(|m| m.keys()) {
        steps.push(GraphStep {
            creates: vec![name.clone()],
            ..GraphStep::new(GraphStepKind::InputImage, input_step_name(name))
        });
    }
    for name in doc.input.base_rpm_images.iter().flat_map(|m| m.keys()) {
        let intermediate = without_rpms(name);
        steps.push(GraphStep {
            creates: vec![intermediate.clone()],
            ..GraphStep::new(GraphStepKind::InputImage, input_step_name(&intermediate))
        });
        steps.push(
            GraphStep::producing(GraphStepKind::RpmInjection, name.as_str())
                .requiring(Requirement::internal(intermediate)),
        );
    }
}

// =============================================================================
// BUILDS
// =============================================================================

pub fn images(doc: &Document, steps: &mut Vec<GraphStep>) {
    for image in &doc.images {
        let mut step = GraphStep::producing(
            GraphStepKind::ImageBuild,
            with_ref(&image.to, &image.reference),
        )
        .requiring(Requirement::internal(SOURCE));
        if !image.from.is_empty() {
            step = step.requiring(Requirement::internal(image.from.as_str()));
        }
        steps.push(step);
    }
}

pub fn operator(doc: &Document, steps: &mut Vec<GraphStep>) {
    let Some(operator) = &doc.operator else {
        return;
    };
    steps.push(
        GraphStep::producing(GraphStepKind::BundleSource, BUNDLE_SOURCE)
            .requiring(Requirement::internal(SOURCE)),
    );

    let mut unnamed = Vec::new();
    for (i, bundle) in operator.bundles.iter().enumerate() {
        if bundle.as_name.is_empty() {
            unnamed.push(bundle_name(i));
            continue;
        }
        steps.push(
            GraphStep::producing(GraphStepKind::ImageBuild, bundle.as_name.as_str())
                .requiring(Requirement::internal(BUNDLE_SOURCE)),
        );
        push_index(steps, &index_name(&bundle.as_name), std::slice::from_ref(&bundle.as_name));
    }

    for bundle in &unnamed {
        steps.push(
            GraphStep::producing(GraphStepKind::ImageBuild, bundle.as_str())
                .requiring(Requirement::internal(BUNDLE_SOURCE)),
        );
    }
    if !unnamed.is_empty() {
        push_index(steps, INDEX_IMAGE, &unnamed);
    }
}

fn push_index(steps: &mut Vec<GraphStep>, index: &str, bundles: &[String]) {
    let generator = index_generator_name(index);
    let mut generate = GraphStep::producing(GraphStepKind::IndexGenerator, generator.as_str());
    for bundle in bundles {
        generate = generate.requiring(Requirement::internal(bundle.as_str()));
    }
    steps.push(generate);
    steps.push(
        GraphStep::producing(GraphStepKind::ImageBuild, index)
            .requiring(Requirement::internal(generator)),
    );
}

// =============================================================================
// TESTS, RELEASES, PROMOTION
// =============================================================================

pub fn tests(doc: &Document, steps: &mut Vec<GraphStep>) {
    for (i, test) in doc.tests.iter().enumerate() {
        let mut step = GraphStep::new(GraphStepKind::Test, test.as_name.as_str());
        for kind in test.kinds() {
            match kind {
                TestKind::Container(container) => {
                    step.requires.push(Requirement::strict(
                        container.from.as_str(),
                        format!("tests[{i}].from"),
                    ));
                }
                TestKind::MultiStage(stages) => {
                    for (stage, list) in [("pre", &stages.pre), ("test", &stages.test), ("post", &stages.post)] {
                        for (j, literal) in list.iter().enumerate() {
                            if let Some(literal) = &literal.literal {
                                push_step_image(&mut step, literal, format!("tests[{i}].steps.{stage}[{j}]"));
                            }
                        }
                    }
                }
                TestKind::MultiStageLiteral(stages) => {
                    for (stage, list) in [("pre", &stages.pre), ("test", &stages.test), ("post", &stages.post)] {
                        for (j, literal) in list.iter().enumerate() {
                            push_step_image(&mut step, literal, format!("tests[{i}].steps.{stage}[{j}]"));
                        }
                    }
                }
                TestKind::Installer(..) => {}
            }
        }
        steps.push(step);
    }
}

/// Only short `from` names refer to pipeline artifacts.
fn push_step_image(step: &mut GraphStep, literal: &LiteralTestStep, path: String) {
    if !literal.from.is_empty() && !literal.from.contains(':') {
        step.requires.push(Requirement::lenient(
            literal.from.as_str(),
            format!("{path}.from"),
        ));
    }
}

pub fn releases(doc: &Document, steps: &mut Vec<GraphStep>) {
    if doc.input.tag_specification.is_some() {
        steps.push(GraphStep::new(GraphStepKind::ReleaseInputs, RELEASE_INPUTS));
        for release in [INITIAL_RELEASE, LATEST_RELEASE] {
            steps.push(GraphStep::new(
                GraphStepKind::ReleaseImport,
                release_step_name(release),
            ));
        }
    }
    for name in doc.input.releases.keys() {
        steps.push(GraphStep::new(
            GraphStepKind::ReleaseImport,
            release_step_name(name),
        ));
    }
}

pub fn promotion(doc: &Document, steps: &mut Vec<GraphStep>) {
    let Some(promotion) = &doc.promotion else {
        return;
    };
    if promotion.disabled {
        return;
    }
    let mut step = GraphStep::new(GraphStepKind::Promotion, PROMOTION);
    for image in &doc.images {
        if !promotion.excluded_images.contains(&image.to) {
            step.requires
                .push(Requirement::internal(with_ref(&image.to, &image.reference)));
        }
    }
    steps.push(step);
}
