//! Serde model of a release build configuration document.
//!
//! Keys are snake_case, matching the on-disk format. Maps are `BTreeMap` so
//! every pass over them is ordered and repeatable.

use std::collections::BTreeMap;

use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};

// =============================================================================
// TOP-LEVEL DOCUMENT
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    #[serde(rename = "zz_generated_metadata", alias = "metadata")]
    pub metadata: Metadata,
    #[serde(flatten)]
    pub input: InputConfiguration,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub binary_build_commands: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub test_binary_build_commands: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rpm_build_commands: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rpm_build_location: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub binary_build_commands_list: Vec<RefCommands>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub test_binary_build_commands_list: Vec<RefCommands>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rpm_build_commands_list: Vec<RefCommands>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rpm_build_location_list: Vec<RefLocation>,

    pub canonical_go_repository: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageBuild>,
    pub operator: Option<OperatorConfiguration>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceRequirements>,
    pub promotion: Option<PromotionConfiguration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestStepConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub org: String,
    pub repo: String,
    pub branch: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub variant: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefCommands {
    #[serde(rename = "ref")]
    pub reference: String,
    pub commands: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefLocation {
    #[serde(rename = "ref")]
    pub reference: String,
    pub location: String,
}

// =============================================================================
// INPUTS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfiguration {
    pub build_root: Option<BuildRootConfiguration>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub build_roots: BTreeMap<String, BuildRootConfiguration>,
    /// `None` and an empty map differ: an explicit empty map still counts as
    /// "declared" for the RPM build check.
    pub base_images: Option<BTreeMap<String, ImageStreamTagReference>>,
    pub base_rpm_images: Option<BTreeMap<String, ImageStreamTagReference>>,
    pub tag_specification: Option<ReleaseTagConfiguration>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub releases: BTreeMap<String, UnresolvedRelease>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageStreamTagReference {
    pub namespace: String,
    pub name: String,
    pub tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildRootConfiguration {
    pub image_stream_tag: Option<ImageStreamTagReference>,
    pub project_image: Option<ProjectImageInputs>,
    pub from_repository: bool,
    pub use_build_cache: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectImageInputs {
    pub context_dir: String,
    pub dockerfile_path: String,
}

/// Where a build root comes from. Validators match on `BuildRootConfiguration::sources`.
#[derive(Debug, Clone, Copy)]
pub enum BuildRootSource<'a> {
    ImageStreamTag(&'a ImageStreamTagReference),
    ProjectImage(&'a ProjectImageInputs),
    FromRepository,
}

impl BuildRootConfiguration {
    pub fn sources(&self) -> Vec<BuildRootSource<'_>> {
        let mut sources = Vec::new();
        if let Some(tag) = &self.image_stream_tag {
            sources.push(BuildRootSource::ImageStreamTag(tag));
        }
        if let Some(project) = &self.project_image {
            sources.push(BuildRootSource::ProjectImage(project));
        }
        if self.from_repository {
            sources.push(BuildRootSource::FromRepository);
        }
        sources
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseTagConfiguration {
    pub namespace: String,
    pub name: String,
}

// =============================================================================
// RELEASES
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnresolvedRelease {
    pub integration: Option<Integration>,
    pub candidate: Option<Candidate>,
    pub release: Option<Release>,
    pub prerelease: Option<Prerelease>,
}

#[derive(Debug, Clone, Copy)]
pub enum ReleaseKind<'a> {
    Integration(&'a Integration),
    Candidate(&'a Candidate),
    Release(&'a Release),
    Prerelease(&'a Prerelease),
}

impl UnresolvedRelease {
    /// Every descriptor kind that is set, in declaration order.
    pub fn kinds(&self) -> Vec<ReleaseKind<'_>> {
        let mut kinds = Vec::new();
        if let Some(i) = &self.integration {
            kinds.push(ReleaseKind::Integration(i));
        }
        if let Some(c) = &self.candidate {
            kinds.push(ReleaseKind::Candidate(c));
        }
        if let Some(r) = &self.release {
            kinds.push(ReleaseKind::Release(r));
        }
        if let Some(p) = &self.prerelease {
            kinds.push(ReleaseKind::Prerelease(p));
        }
        kinds
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Integration {
    pub namespace: String,
    pub name: String,
    pub include_built_images: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Candidate {
    pub product: String,
    pub architecture: String,
    pub stream: String,
    pub version: String,
    pub relative: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub architecture: String,
    pub channel: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Prerelease {
    pub product: String,
    pub architecture: String,
    pub version_bounds: VersionBounds,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionBounds {
    pub lower: String,
    pub upper: String,
}

// =============================================================================
// IMAGE BUILDS AND OPERATOR BUNDLES
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageBuild {
    pub from: String,
    pub to: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub context_dir: String,
    pub dockerfile_path: String,
    pub dockerfile_literal: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfiguration {
    pub bundles: Vec<Bundle>,
    pub substitutions: Vec<PullSpecSubstitution>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Bundle {
    #[serde(rename = "as")]
    pub as_name: String,
    pub context_dir: String,
    pub dockerfile_path: String,
    pub base_index: String,
    pub update_graph: String,
    pub skip_building_index: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PullSpecSubstitution {
    pub pullspec: String,
    pub with: String,
}

// =============================================================================
// RESOURCES
// =============================================================================

pub type ResourceList = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceRequirements {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: ResourceList,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: ResourceList,
}

// =============================================================================
// PROMOTION
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfiguration {
    /// Legacy single-target form.
    pub namespace: String,
    pub name: String,
    pub tag: String,
    #[serde(rename = "to")]
    pub targets: Vec<PromotionTarget>,
    pub additional_images: BTreeMap<String, String>,
    pub excluded_images: Vec<String>,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionTarget {
    pub namespace: String,
    pub name: String,
    pub tag: String,
    pub disabled: bool,
}

impl PromotionConfiguration {
    pub fn has_legacy_target(&self) -> bool {
        !self.namespace.is_empty() || !self.name.is_empty() || !self.tag.is_empty()
    }

    /// Legacy target first (when present), then the `to` list.
    pub fn all_targets(&self) -> Vec<PromotionTarget> {
        let mut targets = Vec::with_capacity(self.targets.len() + 1);
        if self.has_legacy_target() {
            targets.push(PromotionTarget {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
                tag: self.tag.clone(),
                disabled: self.disabled,
            });
        }
        targets.extend(self.targets.iter().cloned());
        targets
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestStepConfiguration {
    #[serde(rename = "as")]
    pub as_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub commands: String,

    pub cron: Option<String>,
    pub interval: Option<String>,
    pub minimum_interval: Option<String>,
    pub postsubmit: bool,
    pub presubmit: bool,
    pub release_controller: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub run_if_changed: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub skip_if_only_changed: String,
    pub optional: bool,
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster: String,
    pub cluster_claim: Option<ClusterClaim>,

    pub secret: Option<Secret>,
    pub secrets: Option<Vec<Secret>>,

    pub container: Option<ContainerTestConfiguration>,
    pub steps: Option<MultiStageTestConfiguration>,
    pub literal_steps: Option<MultiStageTestConfigurationLiteral>,
    pub openshift_ansible: Option<ClusterTestConfiguration>,
    pub openshift_ansible_src: Option<ClusterTestConfiguration>,
    pub openshift_ansible_custom: Option<ClusterTestConfiguration>,
    pub openshift_installer: Option<ClusterTestConfiguration>,
    pub openshift_installer_upi: Option<ClusterTestConfiguration>,
    pub openshift_installer_upi_src: Option<ClusterTestConfiguration>,
    pub openshift_installer_custom_test_image: Option<ClusterTestConfiguration>,
}

/// The legacy cluster-installer shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallerKind {
    OpenshiftAnsible,
    OpenshiftAnsibleSrc,
    OpenshiftAnsibleCustom,
    OpenshiftInstaller,
    OpenshiftInstallerUpi,
    OpenshiftInstallerUpiSrc,
    OpenshiftInstallerCustomTestImage,
}

impl InstallerKind {
    /// Ansible-based installs pull the release RPMs.
    pub fn needs_release_rpms(self) -> bool {
        matches!(
            self,
            InstallerKind::OpenshiftAnsible
                | InstallerKind::OpenshiftAnsibleSrc
                | InstallerKind::OpenshiftAnsibleCustom
        )
    }
}

/// One test shape. A well-formed test has exactly one.
#[derive(Debug, Clone, Copy)]
pub enum TestKind<'a> {
    Container(&'a ContainerTestConfiguration),
    MultiStage(&'a MultiStageTestConfiguration),
    MultiStageLiteral(&'a MultiStageTestConfigurationLiteral),
    Installer(InstallerKind, &'a ClusterTestConfiguration),
}

impl TestStepConfiguration {
    /// Every shape field that is set, in declaration order.
    pub fn kinds(&self) -> Vec<TestKind<'_>> {
        let mut kinds = Vec::new();
        if let Some(c) = &self.container {
            kinds.push(TestKind::Container(c));
        }
        let installers = [
            (InstallerKind::OpenshiftAnsible, &self.openshift_ansible),
            (InstallerKind::OpenshiftAnsibleSrc, &self.openshift_ansible_src),
            (InstallerKind::OpenshiftAnsibleCustom, &self.openshift_ansible_custom),
            (InstallerKind::OpenshiftInstaller, &self.openshift_installer),
            (InstallerKind::OpenshiftInstallerUpi, &self.openshift_installer_upi),
            (InstallerKind::OpenshiftInstallerUpiSrc, &self.openshift_installer_upi_src),
            (
                InstallerKind::OpenshiftInstallerCustomTestImage,
                &self.openshift_installer_custom_test_image,
            ),
        ];
        for (kind, config) in installers {
            if let Some(config) = config {
                kinds.push(TestKind::Installer(kind, config));
            }
        }
        if let Some(s) = &self.steps {
            kinds.push(TestKind::MultiStage(s));
        }
        if let Some(l) = &self.literal_steps {
            kinds.push(TestKind::MultiStageLiteral(l));
        }
        kinds
    }

    pub fn is_multi_stage(&self) -> bool {
        self.steps.is_some() || self.literal_steps.is_some()
    }

    /// Dependency overrides of whichever multi-stage shape is set.
    pub fn dependency_overrides(&self) -> Option<&BTreeMap<String, String>> {
        if let Some(literal) = &self.literal_steps {
            return Some(&literal.dependency_overrides);
        }
        self.steps.as_ref().map(|s| &s.dependency_overrides)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Secret {
    pub name: String,
    pub mount_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerTestConfiguration {
    pub from: String,
    pub memory_backed_volume: Option<MemoryBackedVolume>,
    pub clone: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryBackedVolume {
    pub size: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterTestConfiguration {
    pub cluster_profile: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterClaim {
    pub product: String,
    pub version: String,
    pub architecture: String,
    pub cloud: String,
    pub owner: String,
    pub labels: BTreeMap<String, String>,
    pub timeout: Option<String>,
}

/// Release names a cluster claim rebinds for one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRelease {
    pub release_name: String,
    pub override_name: String,
}

impl ClusterClaim {
    pub fn claim_release(&self, test_name: &str) -> ClaimRelease {
        ClaimRelease {
            release_name: format!("latest-{test_name}"),
            override_name: "latest".to_string(),
        }
    }
}

// =============================================================================
// MULTI-STAGE TESTS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiStageTestConfiguration {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_profile: String,
    pub workflow: Option<String>,
    pub pre: Vec<TestStep>,
    pub test: Vec<TestStep>,
    pub post: Vec<TestStep>,
    pub env: BTreeMap<String, String>,
    pub dependency_overrides: BTreeMap<String, String>,
    pub leases: Vec<StepLease>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiStageTestConfigurationLiteral {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cluster_profile: String,
    pub pre: Vec<LiteralTestStep>,
    pub test: Vec<LiteralTestStep>,
    pub post: Vec<LiteralTestStep>,
    pub env: BTreeMap<String, String>,
    pub dependency_overrides: BTreeMap<String, String>,
    pub leases: Vec<StepLease>,
}

/// An entry of a symbolic `pre`/`test`/`post` list: a registry reference, a
/// chain, or an inline literal step. The raw form can carry several at once,
/// which validation reports.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "RawTestStep")]
pub struct TestStep {
    pub reference: Option<String>,
    pub chain: Option<String>,
    pub literal: Option<LiteralTestStep>,
}

#[derive(Debug, Clone, Copy)]
pub enum StepKind<'a> {
    Reference(&'a str),
    Chain(&'a str),
    Literal(&'a LiteralTestStep),
    /// More than one of the above.
    Conflicting,
    Empty,
}

impl TestStep {
    pub fn kind(&self) -> StepKind<'_> {
        match (&self.reference, &self.chain, &self.literal) {
            (Some(r), None, None) => StepKind::Reference(r),
            (None, Some(c), None) => StepKind::Chain(c),
            (None, None, Some(l)) => StepKind::Literal(l),
            (None, None, None) => StepKind::Empty,
            _ => StepKind::Conflicting,
        }
    }

    pub fn literal(step: LiteralTestStep) -> Self {
        TestStep {
            literal: Some(step),
            ..Default::default()
        }
    }

    pub fn reference(name: &str) -> Self {
        TestStep {
            reference: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn chain(name: &str) -> Self {
        TestStep {
            chain: Some(name.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct RawTestStep {
    #[serde(rename = "ref")]
    reference: Option<String>,
    chain: Option<String>,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<RawTestStep> for TestStep {
    type Error = serde_json::Error;

    fn try_from(raw: RawTestStep) -> Result<Self, Self::Error> {
        let literal = if raw.rest.is_empty() {
            None
        } else {
            Some(serde_json::from_value(serde_json::Value::Object(raw.rest))?)
        };
        Ok(TestStep {
            reference: raw.reference,
            chain: raw.chain,
            literal,
        })
    }
}

impl Serialize for TestStep {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(reference) = &self.reference {
            map.serialize_entry("ref", reference)?;
        }
        if let Some(chain) = &self.chain {
            map.serialize_entry("chain", chain)?;
        }
        if let Some(literal) = &self.literal {
            match serde_json::to_value(literal).map_err(S::Error::custom)? {
                serde_json::Value::Object(fields) => {
                    for (key, value) in &fields {
                        map.serialize_entry(key, value)?;
                    }
                }
                other => return Err(S::Error::custom(format!("literal step serialized as {other}"))),
            }
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteralTestStep {
    #[serde(rename = "as")]
    pub as_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub from: String,
    pub from_image: Option<ImageStreamTagReference>,
    pub commands: String,
    pub resources: ResourceRequirements,
    pub timeout: Option<String>,
    pub grace_period: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<CredentialReference>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<StepParameter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<StepDependency>,
    pub dns_config: Option<StepDnsConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub leases: Vec<StepLease>,
    pub optional_on_success: Option<bool>,
    pub best_effort: Option<bool>,
    pub node_architecture: Option<String>,
}

/// Where a literal step's image comes from.
#[derive(Debug, Clone, Copy)]
pub enum ImageSource<'a> {
    Tag(&'a str),
    Explicit(&'a ImageStreamTagReference),
    Both,
    Missing,
}

impl LiteralTestStep {
    pub fn image_source(&self) -> ImageSource<'_> {
        match (self.from.is_empty(), &self.from_image) {
            (false, None) => ImageSource::Tag(&self.from),
            (true, Some(image)) => ImageSource::Explicit(image),
            (false, Some(_)) => ImageSource::Both,
            (true, None) => ImageSource::Missing,
        }
    }

    /// Pipeline tag under which a `from_image` is imported.
    pub fn from_image_tag(&self) -> Option<String> {
        self.from_image
            .as_ref()
            .map(|i| format!("{}-{}-{}", i.namespace, i.name, i.tag))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialReference {
    pub namespace: String,
    pub name: String,
    pub mount_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub collection: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepParameter {
    pub name: String,
    pub default: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub documentation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDependency {
    pub name: String,
    pub env: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepDnsConfig {
    pub nameservers: Vec<String>,
    pub searches: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepLease {
    pub resource_type: String,
    pub env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}
