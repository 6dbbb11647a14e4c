//! Step dependencies must name something the pipeline will actually provide.

use crate::error::ValidationError;
use crate::parse::resolve::{
    BINARIES, INDEX_IMAGE, INITIAL_RELEASE, LATEST_RELEASE, PIPELINE_STREAM, ROOT, RPMS, SOURCE,
    TEST_BINARIES, index_name, is_index_image, is_release_payload_stream, is_release_stream,
    link_for_image, release_name_from,
};
use crate::parse::{ClaimRelease, Document, LiteralTestStep, StepDependency, TestStepConfiguration};

use super::test::claim_release_for;

pub fn validate_step_dependencies(doc: &Document, errors: &mut Vec<ValidationError>) {
    for (i, test) in doc.tests.iter().enumerate() {
        let claim = claim_release_for(test);
        let site = TestSite {
            doc,
            test,
            claim: claim.as_ref(),
            index: i,
        };
        if let Some(steps) = &test.steps {
            for (stage, list) in [("pre", &steps.pre), ("test", &steps.test), ("post", &steps.post)] {
                for (j, step) in list.iter().enumerate() {
                    if let Some(literal) = &step.literal {
                        site.check_step("steps", stage, j, literal, errors);
                    }
                }
            }
        }
        if let Some(steps) = &test.literal_steps {
            for (stage, list) in [("pre", &steps.pre), ("test", &steps.test), ("post", &steps.post)] {
                for (j, step) in list.iter().enumerate() {
                    site.check_step("literal_steps", stage, j, step, errors);
                }
            }
        }
    }
}

struct TestSite<'a> {
    doc: &'a Document,
    test: &'a TestStepConfiguration,
    claim: Option<&'a ClaimRelease>,
    index: usize,
}

impl TestSite<'_> {
    fn has_override(&self, env: &str) -> bool {
        self.test
            .dependency_overrides()
            .is_some_and(|overrides| overrides.contains_key(env))
    }

    fn check_step(
        &self,
        field: &str,
        stage: &str,
        step_index: usize,
        step: &LiteralTestStep,
        errors: &mut Vec<ValidationError>,
    ) {
        for (k, dependency) in step.dependencies.iter().enumerate() {
            for message in self.problems(dependency) {
                errors.push(ValidationError::reference(format!(
                    "tests[{}].{field}.{stage}[{step_index}].dependencies[{k}]: cannot determine source for dependency {:?} - {message}",
                    self.index, dependency.name
                )));
            }
        }
    }

    fn problems(&self, dependency: &StepDependency) -> Vec<String> {
        let doc = self.doc;
        let parts = doc.dependency_parts(&dependency.name, self.claim);
        let mut problems = Vec::new();
        if link_for_image(&parts.stream, &parts.tag).is_none() {
            problems.push("ensure the correct ImageStream name was provided".to_string());
        }
        if !parts.explicit {
            return problems;
        }

        let release = if is_release_stream(&parts.stream) {
            Some(release_name_from(&parts.stream))
        } else if is_release_payload_stream(&parts.stream) {
            Some(parts.tag.clone())
        } else {
            None
        };
        if let Some(release) = release.filter(|r| !r.is_empty()) {
            let implicit = (release == LATEST_RELEASE || release == INITIAL_RELEASE)
                && doc.input.tag_specification.is_some();
            let explicit = doc.input.releases.contains_key(&release)
                || self.claim.is_some_and(|c| c.release_name == release);
            if !implicit && !explicit {
                problems.push(format!(
                    "this dependency requires a {release:?} release, which is not configured"
                ));
            }
        }

        if parts.stream != PIPELINE_STREAM {
            return problems;
        }
        let overridden = self.has_override(&dependency.env);
        let missing = |what: &str| format!("this dependency requires {what}, which is not configured");
        let missing_all = |what: &str| format!("this dependency requires {what}, which are not configured");
        match parts.tag.as_str() {
            SOURCE => {}
            ROOT => {
                let configured =
                    doc.input.build_root.is_some() || !doc.input.build_roots.is_empty();
                if !configured && !overridden {
                    problems.push(missing("a build root"));
                }
            }
            BINARIES => {
                if doc.binary_build_commands.is_empty() && !overridden {
                    problems.push(missing_all("built binaries"));
                }
            }
            TEST_BINARIES => {
                if doc.test_binary_build_commands.is_empty() && !overridden {
                    problems.push(missing_all("built test binaries"));
                }
            }
            RPMS => {
                if doc.rpm_build_commands.is_empty() && !overridden {
                    problems.push(missing_all("built RPMs"));
                }
            }
            INDEX_IMAGE => {
                if doc.operator.is_none() && !overridden {
                    problems.push(missing("an operator bundle configuration"));
                }
            }
            name if is_index_image(name) => {
                let has_overrides = self.test.dependency_overrides().is_some_and(|o| !o.is_empty());
                match &doc.operator {
                    None if !has_overrides => {
                        problems.push(missing("an operator bundle configuration"))
                    }
                    operator => {
                        let found = operator.as_ref().is_some_and(|op| {
                            op.bundles.iter().any(|b| index_name(&b.as_name) == name)
                        });
                        if !found && !overridden {
                            let bundle = name.trim_start_matches(&format!("{INDEX_IMAGE}-"));
                            problems.push(missing(&format!("an operator bundle named {bundle}")));
                        }
                    }
                }
            }
            name => {
                if !doc.is_base_image(name) && !doc.builds_image(name) && !doc.is_bundle_image(name) {
                    problems.push(
                        "no base image import, project image build, or bundle image build is configured to provide this dependency"
                            .to_string(),
                    );
                }
            }
        }
        problems
    }
}
