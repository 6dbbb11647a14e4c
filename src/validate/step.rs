//! Multi-stage test steps: registry references, chains and literal steps,
//! with the leaf checks every literal step runs.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::error::{ErrorKind, ValidationError};
use crate::format::is_dns1123_subdomain;
use crate::parse::resolve::{
    INITIAL_RELEASE, LATEST_RELEASE, PIPELINE_STREAM, RELEASE_PAYLOAD_STREAM, release_name_from,
    release_stream_for,
};
use crate::parse::{
    CredentialReference, ImageSource, LiteralTestStep, StepDependency, StepDnsConfig, StepKind,
    StepLease, StepParameter, TestStep,
};

use super::context::{FieldPath, TestScope};
use super::resources::validate_resource_requirements;

static TRAP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|\W)\s*trap\s*['"]?\w*['"]?\s*\w*"#).expect("Invalid regex constant")
});

const NODE_ARCHITECTURES: &[&str] = &["amd64", "arm64"];

/// Where in a multi-stage test a step runs. `Unknown` when validating a
/// registry step on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unknown,
    Pre,
    Test,
    Post,
}

impl Stage {
    pub fn field(self) -> &'static str {
        match self {
            Stage::Pre => "pre",
            Stage::Test => "test",
            Stage::Post => "post",
            Stage::Unknown => "",
        }
    }

    pub const ALL: [Stage; 3] = [Stage::Pre, Stage::Test, Stage::Post];
}

// =============================================================================
// TRAP DETECTION
// =============================================================================

/// Memoised `trap` search over step commands. Many tests share command bodies,
/// so results are kept per exact command string.
///
/// Interior mutability makes this `!Sync`: one cache per thread.
#[derive(Debug, Default)]
pub struct TrapCache {
    seen: RefCell<HashMap<String, bool>>,
}

impl TrapCache {
    pub fn new() -> Self {
        TrapCache::default()
    }

    pub fn has_trap(&self, commands: &str) -> bool {
        let cached = self.seen.borrow().get(commands).copied();
        if let Some(hit) = cached {
            return hit;
        }
        let hit = TRAP_PATTERN.is_match(commands);
        trace!(hit, "trap cache miss");
        self.seen.borrow_mut().insert(commands.to_string(), hit);
        hit
    }

    pub fn len(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.borrow().is_empty()
    }
}

// =============================================================================
// STEP LISTS
// =============================================================================

/// One entry of a symbolic `pre`/`test`/`post` list.
pub fn validate_test_step(
    path: &FieldPath,
    stage: Stage,
    step: &TestStep,
    scope: &mut TestScope<'_>,
    traps: &TrapCache,
    errors: &mut Vec<ValidationError>,
) {
    match step.kind() {
        StepKind::Conflicting => errors.push(path.error(
            ErrorKind::Structural,
            "only one of `ref`, `chain`, or a literal test step can be set",
        )),
        StepKind::Empty => errors.push(path.error(
            ErrorKind::Structural,
            "a reference, chain, or literal test step is required",
        )),
        StepKind::Reference(name) => claim_name(&path.field("ref"), name, scope, errors),
        StepKind::Chain(name) => claim_name(&path.field("chain"), name, scope, errors),
        StepKind::Literal(literal) => {
            validate_literal_step(path, stage, literal, scope, traps, errors)
        }
    }
}

fn claim_name(
    path: &FieldPath,
    name: &str,
    scope: &mut TestScope<'_>,
    errors: &mut Vec<ValidationError>,
) {
    if name.is_empty() {
        errors.push(path.error(ErrorKind::Structural, "length cannot be 0"));
    } else if !scope.names_seen.insert(name.to_string()) {
        errors.push(path.error(ErrorKind::Naming, format!("duplicated name {name:?}")));
    }
}

// =============================================================================
// LITERAL STEP
// =============================================================================

pub fn validate_literal_step(
    path: &FieldPath,
    stage: Stage,
    step: &LiteralTestStep,
    scope: &mut TestScope<'_>,
    traps: &TrapCache,
    errors: &mut Vec<ValidationError>,
) {
    if step.as_name.is_empty() {
        errors.push(path.error(ErrorKind::Structural, "`as` is required"));
    } else if !scope.names_seen.insert(step.as_name.clone()) {
        errors.push(path.error(
            ErrorKind::Naming,
            format!("duplicated name {:?}", step.as_name),
        ));
    }

    validate_image_source(path, step, scope, errors);

    if step.commands.is_empty() {
        errors.push(path.error(ErrorKind::Structural, "`commands` is required"));
    } else if step.grace_period.is_none() && traps.has_trap(&step.commands) {
        errors.push(ValidationError::structural(format!(
            "test `{}` has `commands` containing `trap` command, but test step is missing grace_period",
            step.as_name
        )));
    }

    if step.best_effort == Some(true) && step.timeout.is_none() {
        errors.push(ValidationError::structural(format!(
            "test {} contains best_effort without timeout",
            step.as_name
        )));
    }

    let root = path.as_str();
    validate_resource_requirements(&format!("{root}.resources"), &step.resources, errors);
    validate_credentials(root, &step.credentials, errors);
    if let Some(env) = scope.env {
        if let Err(e) = validate_parameters(path, &step.env, |name| env.contains_key(name)) {
            errors.push(e);
        }
    }
    validate_dependencies(root, &step.dependencies, errors);
    if let Some(dns) = &step.dns_config {
        validate_dns_config(&format!("{root}.dns_config"), dns, errors);
    }
    if let Some(arch) = &step.node_architecture {
        if let Err(e) = validate_node_architecture(root, arch) {
            errors.push(e);
        }
    }
    validate_leases(&path.field("leases"), &step.leases, &mut scope.leases_seen, errors);

    if matches!(stage, Stage::Pre | Stage::Test) && step.optional_on_success.is_some() {
        errors.push(path.error(
            ErrorKind::Structural,
            "`optional_on_success` is only allowed for Post steps",
        ));
    }
}

fn validate_image_source(
    path: &FieldPath,
    step: &LiteralTestStep,
    scope: &mut TestScope<'_>,
    errors: &mut Vec<ValidationError>,
) {
    match step.image_source() {
        ImageSource::Missing => {
            errors.push(path.error(ErrorKind::Structural, "`from` or `from_image` is required"))
        }
        ImageSource::Both => errors.push(path.error(
            ErrorKind::Structural,
            "`from` and `from_image` cannot be set together",
        )),
        ImageSource::Explicit(image) => {
            let image_path = path.field("from_image");
            for (field, value) in [
                ("namespace", &image.namespace),
                ("name", &image.name),
                ("tag", &image.tag),
            ] {
                if value.is_empty() {
                    errors.push(
                        image_path.error(ErrorKind::Structural, format!("`{field}` is required")),
                    );
                }
            }
            if let Some(tag) = step.from_image_tag() {
                scope.record_input_image(tag, &image_path);
            }
        }
        ImageSource::Tag(from) => validate_from(&path.field("from"), from, scope, errors),
    }
}

/// `from` is `tag` or `stream:tag`; a stream must be one the test can see.
fn validate_from(
    path: &FieldPath,
    from: &str,
    scope: &TestScope<'_>,
    errors: &mut Vec<ValidationError>,
) {
    let parts: Vec<&str> = from.split(':').collect();
    if parts.len() > 2 {
        errors.push(path.error(
            ErrorKind::Format,
            format!("'{from}' is not a valid imagestream reference"),
        ));
    }
    for (i, part) in parts.iter().enumerate() {
        if !is_dns1123_subdomain(part) {
            errors.push(path.error(
                ErrorKind::Naming,
                format!("'{part}' is not a valid Kubernetes object name"),
            ));
        } else if i == 0 && parts.len() == 2 && !is_known_stream(part, scope) {
            errors.push(path.error(
                ErrorKind::Reference,
                format!("unknown imagestream '{part}'"),
            ));
        }
    }
}

fn is_known_stream(stream: &str, scope: &TestScope<'_>) -> bool {
    if stream == PIPELINE_STREAM
        || stream == RELEASE_PAYLOAD_STREAM
        || stream == release_stream_for(LATEST_RELEASE)
        || stream == release_stream_for(INITIAL_RELEASE)
    {
        return true;
    }
    let release = release_name_from(stream);
    scope.releases.contains(&release)
        || scope
            .claim
            .is_some_and(|claim| claim.override_name == release)
}

// =============================================================================
// LEAF CHECKS
// =============================================================================

pub fn validate_credentials(
    root: &str,
    credentials: &[CredentialReference],
    errors: &mut Vec<ValidationError>,
) {
    for (i, credential) in credentials.iter().enumerate() {
        let at = format!("{root}.credentials[{i}]");
        if credential.name.is_empty() {
            errors.push(ValidationError::structural(format!("{at}.name cannot be empty")));
        }
        if credential.namespace.is_empty() {
            errors.push(ValidationError::structural(format!(
                "{at}.namespace cannot be empty"
            )));
        }
        if credential.mount_path.is_empty() {
            errors.push(ValidationError::structural(format!(
                "{at}.mountPath cannot be empty"
            )));
        } else if !Path::new(&credential.mount_path).is_absolute() {
            errors.push(ValidationError::format(format!(
                "{at}.mountPath is not absolute: {}",
                credential.mount_path
            )));
        }

        for (j, other) in credentials.iter().enumerate().skip(i + 1) {
            if credential.mount_path == other.mount_path {
                if credential.name == other.name {
                    errors.push(ValidationError::naming(format!(
                        "{at} and credentials[{j}] mount to the same location ({}) and have the same name, which would result in a collision",
                        credential.mount_path
                    )));
                } else if credential.collection.is_empty()
                    || credential.collection != other.collection
                {
                    errors.push(ValidationError::naming(format!(
                        "{at} and credentials[{j}] mount to the same location ({})",
                        credential.mount_path
                    )));
                }
                continue;
            }
            let (mine, theirs) = (Path::new(&credential.mount_path), Path::new(&other.mount_path));
            if !mine.is_absolute() || !theirs.is_absolute() {
                continue;
            }
            if mine.starts_with(theirs) {
                errors.push(ValidationError::naming(format!(
                    "{at} mounts at {}, which is under credentials[{j}] ({})",
                    credential.mount_path, other.mount_path
                )));
            }
            if theirs.starts_with(mine) {
                errors.push(ValidationError::naming(format!(
                    "{root}.credentials[{j}] mounts at {}, which is under credentials[{i}] ({})",
                    other.mount_path, credential.mount_path
                )));
            }
        }
    }
}

/// Parameters without a default must be provided by the enclosing test.
pub fn validate_parameters(
    path: &FieldPath,
    params: &[StepParameter],
    provided: impl Fn(&str) -> bool,
) -> Result<(), ValidationError> {
    let missing: Vec<&str> = params
        .iter()
        .filter(|p| p.default.is_none() && !provided(&p.name))
        .map(|p| p.name.as_str())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(path.error(
            ErrorKind::Reference,
            format!("unresolved parameter(s): [{}]", missing.join(" ")),
        ))
    }
}

pub fn validate_dependencies(
    root: &str,
    dependencies: &[StepDependency],
    errors: &mut Vec<ValidationError>,
) {
    let mut env = BTreeSet::new();
    for (i, dependency) in dependencies.iter().enumerate() {
        let at = format!("{root}.dependencies[{i}]");
        if dependency.name.is_empty() {
            errors.push(ValidationError::structural(format!("{at}.name must be set")));
        } else if dependency.name.matches(':').count() > 1 {
            errors.push(ValidationError::format(format!(
                "{at}.name must take the `tag` or `stream:tag` form, not {:?}",
                dependency.name
            )));
        }
        if dependency.env.is_empty() {
            errors.push(ValidationError::structural(format!("{at}.env must be set")));
        } else if !env.insert(dependency.env.as_str()) {
            errors.push(ValidationError::naming(format!(
                "{at}.env targets an environment variable that is already set by another dependency"
            )));
        }
    }
}

pub fn validate_dns_config(root: &str, dns: &StepDnsConfig, errors: &mut Vec<ValidationError>) {
    for (i, search) in dns.searches.iter().enumerate() {
        if search.is_empty() {
            errors.push(ValidationError::structural(format!(
                "{root}.searches[{i}] must be set"
            )));
        }
    }
}

pub fn validate_node_architecture(root: &str, arch: &str) -> Result<(), ValidationError> {
    if NODE_ARCHITECTURES.contains(&arch) {
        Ok(())
    } else {
        Err(ValidationError::format(format!(
            "{root}.nodeArchitecture: invalid node architecture {arch}, expected one of {}",
            NODE_ARCHITECTURES.join(" or ")
        )))
    }
}

/// Lease variables share one namespace across a test and all of its steps.
pub fn validate_leases(
    path: &FieldPath,
    leases: &[StepLease],
    seen: &mut BTreeSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    for (i, lease) in leases.iter().enumerate() {
        let at = path.index(i);
        if lease.resource_type.is_empty() {
            errors.push(at.error(ErrorKind::Structural, "'resource_type' cannot be empty"));
        }
        if lease.env.is_empty() {
            errors.push(at.error(ErrorKind::Structural, "'env' cannot be empty"));
        } else if !seen.insert(lease.env.clone()) {
            errors.push(at.error(
                ErrorKind::Naming,
                format!("duplicate environment variable: {}", lease.env),
            ));
        }
    }
}
