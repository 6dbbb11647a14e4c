//! Test entries: naming, scheduling, secrets, and the one-shape-per-test rule.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::ReferenceData;
use crate::error::ValidationError;
use crate::format::{Duration, is_dns1123_subdomain, parse_cron, parse_duration, parse_quantity};
use crate::parse::resolve::{INDEX_IMAGE, INITIAL_RELEASE, LATEST_RELEASE};
use crate::parse::{
    ClaimRelease, Document, MultiStageTestConfiguration, MultiStageTestConfigurationLiteral,
    TestKind, TestStepConfiguration,
};

use super::context::{FieldPath, InputImages, TestScope};
use super::profiles::{validate_claim_ownership, validate_cluster_profile};
use super::step::{Stage, TrapCache, validate_leases, validate_literal_step, validate_test_step};

pub const MAX_TEST_NAME_LENGTH: usize = 61;
/// Claim tests derive more names from the test name.
pub const MAX_CLAIM_TEST_NAME_LENGTH: usize = 42;
const MAX_JOB_TIMEOUT: Duration = Duration::from_hours(8);

const RESERVED_CLAIM_LABELS: &[&str] = &["product", "version", "architecture", "cloud", "owner"];

/// Everything a test needs from outside itself.
pub struct TestEnvironment<'a> {
    pub doc: &'a Document,
    pub reference: &'a ReferenceData,
    pub traps: &'a TrapCache,
    pub releases: BTreeSet<String>,
    pub resolved: bool,
}

impl<'a> TestEnvironment<'a> {
    pub fn new(
        doc: &'a Document,
        reference: &'a ReferenceData,
        traps: &'a TrapCache,
        resolved: bool,
    ) -> Self {
        TestEnvironment {
            doc,
            reference,
            traps,
            releases: doc.input.releases.keys().cloned().collect(),
            resolved,
        }
    }

    fn has_release_rpms(&self) -> bool {
        self.doc.input.tag_specification.is_some()
            || (self.releases.contains(LATEST_RELEASE) && self.releases.contains(INITIAL_RELEASE))
    }
}

pub fn validate_tests(
    env: &TestEnvironment<'_>,
    input_images: &mut InputImages,
    errors: &mut Vec<ValidationError>,
) {
    let tests = &env.doc.tests;
    if tests.is_empty() {
        return;
    }
    search_for_duplicates(tests, errors);

    let images: BTreeSet<&str> = env.doc.images.iter().map(|i| i.to.as_str()).collect();
    for (i, test) in tests.iter().enumerate() {
        let root = format!("tests[{i}]");
        validate_name(&root, test, &images, errors);
        validate_body(&root, test, errors);
        validate_schedule(&root, test, errors);
        validate_secrets(&root, test, errors);
        validate_test_type(&root, test, env, input_images, errors);
    }
}

fn search_for_duplicates(tests: &[TestStepConfiguration], errors: &mut Vec<ValidationError>) {
    let mut seen = BTreeSet::new();
    let duplicates: Vec<&str> = tests
        .iter()
        .filter(|t| !seen.insert(t.as_name.as_str()))
        .map(|t| t.as_name.as_str())
        .collect();
    if !duplicates.is_empty() {
        errors.push(ValidationError::naming(format!(
            "tests: found duplicated test: ({})",
            duplicates.join(",")
        )));
    }
}

// =============================================================================
// NAME, BODY, SCHEDULE, SECRETS
// =============================================================================

fn validate_name(
    root: &str,
    test: &TestStepConfiguration,
    images: &BTreeSet<&str>,
    errors: &mut Vec<ValidationError>,
) {
    let name = test.as_name.as_str();
    let len = name.len();
    let message = if name.is_empty() {
        "is required".to_string()
    } else if len > MAX_TEST_NAME_LENGTH {
        format!("{len} characters long, maximum length is {MAX_TEST_NAME_LENGTH}")
    } else if len > MAX_CLAIM_TEST_NAME_LENGTH && test.cluster_claim.is_some() {
        format!(
            "{len} characters long, maximum length is {MAX_CLAIM_TEST_NAME_LENGTH} for tests with claims"
        )
    } else if name == "images" {
        "should not be called 'images' because it gets confused with '[images]' target".to_string()
    } else if name.starts_with(INDEX_IMAGE) {
        "should not begin with 'ci-index' because it gets confused with 'ci-index' and `ci-index-...` targets".to_string()
    } else if images.contains(name) {
        format!("duplicated name {name:?} already declared in 'images'")
    } else if !is_dns1123_subdomain(name) {
        format!("'{name}' is not a valid Kubernetes object name")
    } else {
        return;
    };
    errors.push(ValidationError::naming(format!("{root}.as: {message}")));
}

fn validate_body(root: &str, test: &TestStepConfiguration, errors: &mut Vec<ValidationError>) {
    let has_commands = !test.commands.is_empty();
    let has_steps = test.steps.is_some();
    let has_literal = test.literal_steps.is_some();
    if !has_commands && !has_steps && !has_literal {
        errors.push(ValidationError::structural(format!(
            "{root}: either `commands`, `steps`, or `literal_steps` should be set"
        )));
    } else if (has_commands && (has_steps || has_literal)) || (has_steps && has_literal) {
        errors.push(ValidationError::structural(format!(
            "{root}: `commands`, `steps`, and `literal_steps` are mutually exclusive"
        )));
    }
}

fn validate_schedule(root: &str, test: &TestStepConfiguration, errors: &mut Vec<ValidationError>) {
    let mut push = |message: String| errors.push(ValidationError::structural(format!("{root}: {message}")));
    let periodic = [
        ("cron", test.cron.is_some()),
        ("interval", test.interval.is_some()),
        ("minimum_interval", test.minimum_interval.is_some()),
    ];

    if test.postsubmit {
        for (field, set) in periodic {
            if set {
                push(format!("`{field}` and `postsubmit` are mututally exclusive"));
            }
        }
        if test.optional {
            push("`optional` and `postsubmit` are mututally exclusive".to_string());
        }
    }

    let (cron, interval, minimum) = (
        test.cron.is_some(),
        test.interval.is_some(),
        test.minimum_interval.is_some(),
    );
    if cron && interval {
        push("`interval` and `cron` cannot both be set".to_string());
    }
    if cron && minimum {
        push("`cron` and `minimum_interval` cannot both be set".to_string());
    }
    if interval && minimum {
        push("`interval` and `minimum_interval` cannot both be set".to_string());
    }

    if test.release_controller {
        for (field, set) in periodic {
            if set {
                push(format!("`{field}` cannot be set for release controller jobs"));
            }
        }
    }

    let is_periodic = periodic.iter().any(|(_, set)| *set);
    let change_detection = !test.run_if_changed.is_empty() || !test.skip_if_only_changed.is_empty();
    if is_periodic && ((change_detection && !test.presubmit) || test.optional) {
        push(
            "`cron`/`interval`/`minimum_interval` are mutually exclusive with `run_if_changed`/`skip_if_only_changed`/`optional`"
                .to_string(),
        );
    }
    if !test.run_if_changed.is_empty() && !test.skip_if_only_changed.is_empty() {
        push("`run_if_changed` and `skip_if_only_changed` are mutually exclusive".to_string());
    }
    if test.presubmit && (!is_periodic || test.postsubmit) {
        push("`presubmit` can be used only for periodics".to_string());
    }

    if let Some(interval) = &test.interval {
        if let Err(e) = parse_duration(interval) {
            push(format!("cannot parse interval: {e}"));
        }
    }
    if let Some(minimum) = &test.minimum_interval {
        if let Err(e) = parse_duration(minimum) {
            push(format!("cannot parse minimum_interval: {e}"));
        }
    }
    if let Some(cron) = &test.cron {
        if let Err(e) = parse_cron(cron) {
            push(format!("cannot parse cron: {e}"));
        }
    }
    if let Some(timeout) = &test.timeout {
        match parse_duration(timeout) {
            Err(e) => push(format!("cannot parse timeout: {e}")),
            Ok(d) if d > MAX_JOB_TIMEOUT => {
                push(format!("job timeout is limited to {MAX_JOB_TIMEOUT}"))
            }
            Ok(_) => {}
        }
    }
}

fn validate_secrets(root: &str, test: &TestStepConfiguration, errors: &mut Vec<ValidationError>) {
    if test.secret.is_some() && test.secrets.is_some() {
        errors.push(ValidationError::structural(
            "test.Secret and test.Secrets cannot both be set",
        ));
    }
    let secrets: Vec<_> = test
        .secrets
        .iter()
        .flatten()
        .chain(test.secret.iter())
        .collect();
    if secrets.is_empty() {
        return;
    }
    if test.container.is_none() {
        errors.push(ValidationError::structural(format!(
            "{root}: secret/secrets can be only used with container-based tests (use credentials in multi-stage tests)"
        )));
    }

    let mut seen = BTreeSet::new();
    for secret in secrets {
        if !is_dns1123_subdomain(&secret.name) {
            errors.push(ValidationError::naming(format!(
                "{root}.name: '{}' is not a valid Kubernetes object name",
                secret.name
            )));
        }
        if !seen.insert(secret.name.as_str()) {
            errors.push(ValidationError::naming(format!(
                "duplicate secret name entries found for {}",
                secret.name
            )));
        }
        if !secret.mount_path.is_empty() && !Path::new(&secret.mount_path).is_absolute() {
            errors.push(ValidationError::format(format!(
                "{root}.path: '{}' secret mount path must be an absolute path",
                secret.mount_path
            )));
        }
    }
}

// =============================================================================
// SHAPE
// =============================================================================

fn validate_test_type(
    root: &str,
    test: &TestStepConfiguration,
    env: &TestEnvironment<'_>,
    input_images: &mut InputImages,
    errors: &mut Vec<ValidationError>,
) {
    let metadata = &env.doc.metadata;
    let mut cluster_count = 0;

    if let Some(claim) = &test.cluster_claim {
        cluster_count += 1;
        for key in claim.labels.keys() {
            if RESERVED_CLAIM_LABELS.contains(&key.as_str()) {
                errors.push(ValidationError::naming(format!(
                    "{root}.cluster_claim.labels contains an invalid key in claim's label: {key}"
                )));
            }
        }
        for (field, value) in [
            ("version", &claim.version),
            ("cloud", &claim.cloud),
            ("owner", &claim.owner),
        ] {
            if value.is_empty() {
                errors.push(ValidationError::structural(format!(
                    "{root}.cluster_claim.{field} cannot be empty when cluster_claim is not nil"
                )));
            }
        }
        if !test.is_multi_stage() {
            errors.push(ValidationError::structural(format!(
                "{root}.cluster_claim cannot be set on a test which is not a multi-stage test"
            )));
        }
        validate_claim_ownership(root, claim, metadata, env.reference, errors);
    }

    if !test.cluster.is_empty() && !env.reference.is_valid_cluster(&test.cluster) {
        errors.push(ValidationError::reference(format!(
            "{root}.cluster is not a valid cluster: {}",
            test.cluster
        )));
    }

    let claim_release = claim_release_for(test);
    let kinds = test.kinds();
    let mut needs_release_rpms = false;

    for kind in &kinds {
        match kind {
            TestKind::Container(container) => {
                if let Some(volume) = &container.memory_backed_volume {
                    if let Err(e) = parse_quantity(&volume.size) {
                        errors.push(ValidationError::format(format!(
                            "{root}.memory_backed_volume: 'size' must be a Kubernetes quantity: {e}"
                        )));
                    }
                }
                if container.from.is_empty() {
                    errors.push(ValidationError::structural(format!(
                        "{root}: 'from' is required"
                    )));
                }
            }
            TestKind::Installer(installer, config) => {
                needs_release_rpms |= installer.needs_release_rpms();
                validate_cluster_profile(root, &config.cluster_profile, metadata, env.reference, errors);
            }
            TestKind::MultiStage(steps) => {
                if env.resolved {
                    errors.push(ValidationError::structural(format!(
                        "{root}: non-literal test found in fully-resolved configuration"
                    )));
                }
                if !steps.cluster_profile.is_empty() {
                    cluster_count += 1;
                    validate_cluster_profile(root, &steps.cluster_profile, metadata, env.reference, errors);
                }
                let mut scope = TestScope::new(
                    provided_env(&steps.env),
                    &env.releases,
                    claim_release.as_ref(),
                    Some(&mut *input_images),
                );
                validate_multi_stage(&FieldPath::new(root), steps, &mut scope, env.traps, errors);
            }
            TestKind::MultiStageLiteral(steps) => {
                if !steps.cluster_profile.is_empty() {
                    cluster_count += 1;
                    validate_cluster_profile(root, &steps.cluster_profile, metadata, env.reference, errors);
                }
                let mut scope = TestScope::new(
                    provided_env(&steps.env),
                    &env.releases,
                    claim_release.as_ref(),
                    Some(&mut *input_images),
                );
                validate_multi_stage_literal(
                    &FieldPath::new(root).field("steps"),
                    steps,
                    &mut scope,
                    env.traps,
                    errors,
                );
            }
        }
    }

    match kinds.len() {
        0 => errors.push(ValidationError::structural(format!(
            "{root} has no type, you may want to specify 'container' for a container based test"
        ))),
        1 => {
            if needs_release_rpms && !env.has_release_rpms() {
                errors.push(ValidationError::reference(format!(
                    "{root} requires a release in 'tag_specification' or 'releases'"
                )));
            }
        }
        _ => errors.push(ValidationError::structural(format!(
            "{root} has more than one type"
        ))),
    }
    if cluster_count > 1 {
        errors.push(ValidationError::structural(format!(
            "{root} installs more than one cluster, probably it defined both cluster_claim and cluster_profile"
        )));
    }
}

/// A test without `env` does not constrain its steps' parameters.
fn provided_env(env: &BTreeMap<String, String>) -> Option<&BTreeMap<String, String>> {
    (!env.is_empty()).then_some(env)
}

fn validate_multi_stage(
    root: &FieldPath,
    steps: &MultiStageTestConfiguration,
    scope: &mut TestScope<'_>,
    traps: &TrapCache,
    errors: &mut Vec<ValidationError>,
) {
    validate_leases(&root.field("leases"), &steps.leases, &mut scope.leases_seen, errors);
    for (stage, list) in Stage::ALL.into_iter().zip([&steps.pre, &steps.test, &steps.post]) {
        let path = root.field(stage.field());
        for (i, step) in list.iter().enumerate() {
            validate_test_step(&path.index(i), stage, step, scope, traps, errors);
        }
    }
}

fn validate_multi_stage_literal(
    root: &FieldPath,
    steps: &MultiStageTestConfigurationLiteral,
    scope: &mut TestScope<'_>,
    traps: &TrapCache,
    errors: &mut Vec<ValidationError>,
) {
    validate_leases(&root.field("leases"), &steps.leases, &mut scope.leases_seen, errors);
    for (stage, list) in Stage::ALL.into_iter().zip([&steps.pre, &steps.test, &steps.post]) {
        let path = root.field(stage.field());
        for (i, step) in list.iter().enumerate() {
            validate_literal_step(&path.index(i), stage, step, scope, traps, errors);
        }
    }
}

/// Claim release used by a test, if it has a claim.
pub fn claim_release_for(test: &TestStepConfiguration) -> Option<ClaimRelease> {
    test.cluster_claim
        .as_ref()
        .map(|c| c.claim_release(&test.as_name))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::parse::{
        ClusterClaim, ClusterTestConfiguration, ContainerTestConfiguration, LiteralTestStep,
        MemoryBackedVolume, ReleaseTagConfiguration, Secret, TestStep,
    };

    fn container(name: &str) -> TestStepConfiguration {
        TestStepConfiguration {
            as_name: name.into(),
            commands: "make test".into(),
            container: Some(ContainerTestConfiguration {
                from: "src".into(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn run_with(doc: &Document, reference: &ReferenceData, resolved: bool) -> (Vec<String>, InputImages) {
        let traps = TrapCache::new();
        let env = TestEnvironment::new(doc, reference, &traps, resolved);
        let mut images = InputImages::new();
        let mut errors = Vec::new();
        validate_tests(&env, &mut images, &mut errors);
        (errors.into_iter().map(|e| e.message).collect(), images)
    }

    fn run(tests: Vec<TestStepConfiguration>) -> Vec<String> {
        let doc = Document {
            tests,
            ..Default::default()
        };
        run_with(&doc, &ReferenceData::unrestricted(), false).0
    }

    #[test]
    fn valid_container_test() {
        assert!(run(vec![container("unit")]).is_empty());
    }

    #[test]
    fn duplicated_tests_listed_once_per_repeat() {
        let errors = run(vec![container("a"), container("b"), container("a"), container("a")]);
        assert_eq!(errors, vec!["tests: found duplicated test: (a,a)"]);
    }

    #[test_case("", "tests[0].as: is required" ; "empty")]
    #[test_case("images", "tests[0].as: should not be called 'images' because it gets confused with '[images]' target" ; "images")]
    #[test_case("ci-index-foo", "tests[0].as: should not begin with 'ci-index' because it gets confused with 'ci-index' and `ci-index-...` targets" ; "index prefix")]
    #[test_case("built", "tests[0].as: duplicated name \"built\" already declared in 'images'" ; "image clash")]
    #[test_case("Upper_Case", "tests[0].as: 'Upper_Case' is not a valid Kubernetes object name" ; "not dns")]
    fn name_rules(name: &str, expected: &str) {
        let doc = Document {
            images: vec![crate::parse::ImageBuild {
                to: "built".into(),
                ..Default::default()
            }],
            tests: vec![container(name)],
            ..Default::default()
        };
        let (errors, _) = run_with(&doc, &ReferenceData::unrestricted(), false);
        assert_eq!(errors, vec![expected]);
    }

    #[test]
    fn name_length_limits() {
        let long = "a".repeat(62);
        assert_eq!(
            run(vec![container(&long)]),
            vec!["tests[0].as: 62 characters long, maximum length is 61"]
        );

        let mut claimed = container(&"b".repeat(43));
        claimed.container = None;
        claimed.commands.clear();
        claimed.literal_steps = Some(MultiStageTestConfigurationLiteral::default());
        claimed.cluster_claim = Some(ClusterClaim {
            version: "4.16".into(),
            cloud: "aws".into(),
            owner: "dpp".into(),
            ..Default::default()
        });
        assert_eq!(
            run(vec![claimed]),
            vec!["tests[0].as: 43 characters long, maximum length is 42 for tests with claims"]
        );
    }

    #[test]
    fn commands_and_steps_are_exclusive() {
        let mut both = container("both");
        both.steps = Some(MultiStageTestConfiguration::default());
        let errors = run(vec![both]);
        assert!(errors.contains(
            &"tests[0]: `commands`, `steps`, and `literal_steps` are mutually exclusive".to_string()
        ));
        assert!(errors.contains(&"tests[0] has more than one type".to_string()));

        let mut neither = container("neither");
        neither.commands.clear();
        assert_eq!(
            run(vec![neither]),
            vec!["tests[0]: either `commands`, `steps`, or `literal_steps` should be set"]
        );
    }

    #[test_case(|t| { t.postsubmit = true; t.cron = Some("@yearly".into()) }, Some("`cron` and `postsubmit` are mututally exclusive") ; "cron with postsubmit")]
    #[test_case(|t| { t.postsubmit = true; t.optional = true }, Some("`optional` and `postsubmit` are mututally exclusive") ; "optional with postsubmit")]
    #[test_case(|t| { t.cron = Some("@yearly".into()); t.interval = Some("1h".into()) }, Some("`interval` and `cron` cannot both be set") ; "cron with interval")]
    #[test_case(|t| { t.cron = Some("@yearly".into()); t.minimum_interval = Some("1h".into()) }, Some("`cron` and `minimum_interval` cannot both be set") ; "cron with minimum interval")]
    #[test_case(|t| { t.interval = Some("1h".into()); t.minimum_interval = Some("1h".into()) }, Some("`interval` and `minimum_interval` cannot both be set") ; "interval with minimum interval")]
    #[test_case(|t| { t.release_controller = true; t.interval = Some("1h".into()) }, Some("`interval` cannot be set for release controller jobs") ; "release controller interval")]
    #[test_case(|t| { t.cron = Some("@yearly".into()); t.run_if_changed = "^docs/".into() }, Some("`cron`/`interval`/`minimum_interval` are mutually exclusive with `run_if_changed`/`skip_if_only_changed`/`optional`") ; "periodic with run_if_changed")]
    #[test_case(|t| { t.minimum_interval = Some("1h".into()); t.optional = true }, Some("`cron`/`interval`/`minimum_interval` are mutually exclusive with `run_if_changed`/`skip_if_only_changed`/`optional`") ; "periodic with optional")]
    #[test_case(|t| { t.run_if_changed = "a".into(); t.skip_if_only_changed = "b".into() }, Some("`run_if_changed` and `skip_if_only_changed` are mutually exclusive") ; "change detection conflict")]
    #[test_case(|t| t.presubmit = true, Some("`presubmit` can be used only for periodics") ; "presubmit in a presubmit")]
    #[test_case(|t| { t.presubmit = true; t.postsubmit = true }, Some("`presubmit` can be used only for periodics") ; "presubmit in a postsubmit")]
    #[test_case(|t| { t.presubmit = true; t.cron = Some("@daily".into()) }, None ; "presubmit in a periodic")]
    #[test_case(|t| { t.presubmit = true; t.interval = Some("6h".into()); t.run_if_changed = "^pkg/".into() }, None ; "periodic presubmit with run_if_changed")]
    #[test_case(|t| t.minimum_interval = Some("2h".into()), None ; "minimum interval alone")]
    #[test_case(|t| t.timeout = Some("9h".into()), Some("job timeout is limited to 8h0m0s") ; "timeout too long")]
    #[test_case(|t| t.timeout = Some("8h".into()), None ; "timeout at limit")]
    fn schedule_rules(configure: fn(&mut TestStepConfiguration), expected: Option<&str>) {
        let mut test = container("sched");
        configure(&mut test);
        let errors = run(vec![test]);
        match expected {
            None => assert!(errors.is_empty(), "unexpected: {errors:?}"),
            Some(message) => {
                let full = format!("tests[0]: {message}");
                assert!(errors.contains(&full), "missing {full:?} in {errors:?}");
            }
        }
    }

    #[test]
    fn unparseable_schedules() {
        let mut test = container("sched");
        test.interval = Some("forever".into());
        test.cron = Some("* * *".into());
        let errors = run(vec![test]);
        assert!(errors.iter().any(|e| e.starts_with("tests[0]: cannot parse interval: ")));
        assert!(errors.iter().any(|e| e.starts_with("tests[0]: cannot parse cron: ")));
    }

    #[test]
    fn secret_rules() {
        let mut test = container("secrets");
        test.secrets = Some(vec![
            Secret {
                name: "ok".into(),
                mount_path: "/var/run/ok".into(),
            },
            Secret {
                name: "ok".into(),
                mount_path: "relative".into(),
            },
            Secret {
                name: "Bad_Name".into(),
                mount_path: String::new(),
            },
        ]);
        assert_eq!(
            run(vec![test]),
            vec![
                "duplicate secret name entries found for ok",
                "tests[0].path: 'relative' secret mount path must be an absolute path",
                "tests[0].name: 'Bad_Name' is not a valid Kubernetes object name",
            ]
        );
    }

    #[test]
    fn secret_and_secrets_are_exclusive() {
        let mut test = container("secrets");
        test.secret = Some(Secret {
            name: "one".into(),
            mount_path: "/var/run/one".into(),
        });
        test.secrets = Some(vec![Secret {
            name: "two".into(),
            mount_path: "/var/run/two".into(),
        }]);
        assert_eq!(run(vec![test]), vec!["test.Secret and test.Secrets cannot both be set"]);
    }

    #[test]
    fn secrets_only_for_containers() {
        let test = TestStepConfiguration {
            as_name: "ms".into(),
            secret: Some(Secret {
                name: "s".into(),
                ..Default::default()
            }),
            steps: Some(MultiStageTestConfiguration {
                test: vec![TestStep::reference("unit")],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            run(vec![test]),
            vec![
                "tests[0]: secret/secrets can be only used with container-based tests (use credentials in multi-stage tests)"
            ]
        );
    }

    #[test]
    fn container_shape() {
        let mut test = container("c");
        test.container = Some(ContainerTestConfiguration {
            from: String::new(),
            memory_backed_volume: Some(MemoryBackedVolume {
                size: "lots".into(),
            }),
            clone: None,
        });
        let errors = run(vec![test]);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("tests[0].memory_backed_volume: 'size' must be a Kubernetes quantity: "));
        assert_eq!(errors[1], "tests[0]: 'from' is required");
    }

    #[test]
    fn no_type() {
        let mut test = container("c");
        test.container = None;
        assert_eq!(
            run(vec![test]),
            vec!["tests[0] has no type, you may want to specify 'container' for a container based test"]
        );
    }

    #[test]
    fn ansible_needs_release() {
        let mut test = container("e2e");
        test.container = None;
        test.openshift_ansible = Some(ClusterTestConfiguration {
            cluster_profile: "gcp".into(),
        });
        assert_eq!(
            run(vec![test.clone()]),
            vec!["tests[0] requires a release in 'tag_specification' or 'releases'"]
        );

        let doc = Document {
            input: crate::parse::InputConfiguration {
                tag_specification: Some(ReleaseTagConfiguration {
                    namespace: "ocp".into(),
                    name: "4.16".into(),
                }),
                ..Default::default()
            },
            tests: vec![test],
            ..Default::default()
        };
        assert!(run_with(&doc, &ReferenceData::unrestricted(), false).0.is_empty());
    }

    #[test]
    fn invalid_cluster() {
        let mut test = container("c");
        test.cluster = "bar".into();
        assert_eq!(run(vec![test]), vec!["tests[0].cluster is not a valid cluster: bar"]);
    }

    #[test]
    fn claim_rules() {
        let test = TestStepConfiguration {
            as_name: "claimed".into(),
            commands: "make".into(),
            container: Some(ContainerTestConfiguration {
                from: "src".into(),
                ..Default::default()
            }),
            cluster_claim: Some(ClusterClaim {
                version: "4.16".into(),
                labels: [("cloud".to_string(), "x".to_string()), ("team".to_string(), "y".to_string())].into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            run(vec![test]),
            vec![
                "tests[0].cluster_claim.labels contains an invalid key in claim's label: cloud",
                "tests[0].cluster_claim.cloud cannot be empty when cluster_claim is not nil",
                "tests[0].cluster_claim.owner cannot be empty when cluster_claim is not nil",
                "tests[0].cluster_claim cannot be set on a test which is not a multi-stage test",
            ]
        );
    }

    #[test]
    fn claim_and_profile_install_two_clusters() {
        let test = TestStepConfiguration {
            as_name: "e2e".into(),
            cluster_claim: Some(ClusterClaim {
                version: "4.16".into(),
                cloud: "aws".into(),
                owner: "dpp".into(),
                ..Default::default()
            }),
            steps: Some(MultiStageTestConfiguration {
                cluster_profile: "aws".into(),
                test: vec![TestStep::reference("e2e")],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            run(vec![test]),
            vec!["tests[0] installs more than one cluster, probably it defined both cluster_claim and cluster_profile"]
        );
    }

    #[test]
    fn resolved_documents_reject_symbolic_steps() {
        let test = TestStepConfiguration {
            as_name: "e2e".into(),
            steps: Some(MultiStageTestConfiguration {
                test: vec![TestStep::reference("e2e")],
                ..Default::default()
            }),
            ..Default::default()
        };
        let doc = Document {
            tests: vec![test],
            ..Default::default()
        };
        let (errors, _) = run_with(&doc, &ReferenceData::unrestricted(), true);
        assert_eq!(errors, vec!["tests[0]: non-literal test found in fully-resolved configuration"]);
    }

    #[test]
    fn step_paths_and_input_images() {
        let step = LiteralTestStep {
            as_name: "step".into(),
            from_image: Some(crate::parse::ImageStreamTagReference {
                namespace: "ns".into(),
                name: "name".into(),
                tag: "tag".into(),
            }),
            commands: "make".into(),
            resources: crate::parse::ResourceRequirements {
                requests: [("cpu".to_string(), "1".to_string())].into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let duplicate = LiteralTestStep {
            from: "src".into(),
            from_image: None,
            ..step.clone()
        };
        let test = TestStepConfiguration {
            as_name: "e2e".into(),
            literal_steps: Some(MultiStageTestConfigurationLiteral {
                pre: vec![step],
                post: vec![duplicate],
                ..Default::default()
            }),
            ..Default::default()
        };
        let doc = Document {
            tests: vec![test],
            ..Default::default()
        };
        let (errors, images) = run_with(&doc, &ReferenceData::unrestricted(), false);
        assert_eq!(errors, vec!["tests[0].steps.post[0]: duplicated name \"step\""]);
        assert_eq!(images.len(), 1);
        let (_, path) = images.iter().next().unwrap();
        assert_eq!(path.as_str(), "tests[0].steps.pre[0].from_image");
    }
}
