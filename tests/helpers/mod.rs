use std::collections::BTreeMap;

use release_config_check::parse::*;
use release_config_check::{ConfigurationError, ValidationOptions, Validator};

// =============================================================================
// Document builders
// =============================================================================

/// Smallest document that validates: a repository build root, a blanket
/// resource profile and one container test running in `src`.
pub fn base_document() -> Document {
    let mut doc = Document {
        metadata: Metadata {
            org: "org".into(),
            repo: "repo".into(),
            branch: "main".into(),
            variant: String::new(),
        },
        resources: [("*".to_string(), requests(&[("cpu", "100m")]))].into(),
        tests: vec![container_test("unit", "src")],
        ..Default::default()
    };
    doc.input.build_root = Some(BuildRootConfiguration {
        from_repository: true,
        ..Default::default()
    });
    doc
}

/// Same as [`base_document`] with the given tests in place of `unit`.
pub fn document_with_tests(tests: Vec<TestStepConfiguration>) -> Document {
    Document {
        tests,
        ..base_document()
    }
}

pub fn requests(entries: &[(&str, &str)]) -> ResourceRequirements {
    ResourceRequirements {
        requests: entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        ..Default::default()
    }
}

pub fn image_build(to: &str, from: &str) -> ImageBuild {
    ImageBuild {
        to: to.into(),
        from: from.into(),
        ..Default::default()
    }
}

pub fn stream_tag(namespace: &str, name: &str, tag: &str) -> ImageStreamTagReference {
    ImageStreamTagReference {
        namespace: namespace.into(),
        name: name.into(),
        tag: tag.into(),
    }
}

// =============================================================================
// Test builders
// =============================================================================

pub fn container_test(name: &str, from: &str) -> TestStepConfiguration {
    TestStepConfiguration {
        as_name: name.into(),
        commands: "make test".into(),
        container: Some(ContainerTestConfiguration {
            from: from.into(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A fully-resolved multi-stage test with all steps in the `test` phase.
pub fn literal_test(name: &str, steps: Vec<LiteralTestStep>) -> TestStepConfiguration {
    TestStepConfiguration {
        as_name: name.into(),
        literal_steps: Some(MultiStageTestConfigurationLiteral {
            test: steps,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A symbolic multi-stage test with the given `test` phase.
pub fn multi_stage_test(name: &str, steps: Vec<TestStep>) -> TestStepConfiguration {
    TestStepConfiguration {
        as_name: name.into(),
        steps: Some(MultiStageTestConfiguration {
            test: steps,
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn literal_step(name: &str, from: &str) -> LiteralTestStep {
    LiteralTestStep {
        as_name: name.into(),
        from: from.into(),
        commands: "echo ok".into(),
        resources: requests(&[("cpu", "10m")]),
        ..Default::default()
    }
}

pub fn dependency(name: &str, env: &str) -> StepDependency {
    StepDependency {
        name: name.into(),
        env: env.into(),
    }
}

// =============================================================================
// Validation shortcuts
// =============================================================================

/// Every diagnostic message for `doc`, without repository context.
pub fn messages(doc: &Document) -> Vec<String> {
    Validator::default()
        .collect(doc, &ValidationOptions::default())
        .into_iter()
        .map(|e| e.message)
        .collect()
}

pub fn error_messages(err: &ConfigurationError) -> Vec<String> {
    err.errors.messages().into_iter().map(str::to_string).collect()
}
