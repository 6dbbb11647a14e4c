//! Read-only reference data injected into a [`crate::validate::Validator`]:
//! which cluster profiles exist, who may use them, who may use which cluster
//! claims, and which build clusters a test may pin itself to.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Build-farm clusters accepted when no explicit list is configured.
pub const DEFAULT_CLUSTERS: &[&str] = &[
    "app.ci",
    "arm01",
    "build01",
    "build02",
    "build03",
    "build04",
    "build05",
    "build09",
    "build10",
    "build11",
    "hosted-mgmt",
    "multi01",
    "vsphere02",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse validator configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("cluster profile {0:?} is listed more than once")]
    DuplicateProfile(String),
    #[error("cluster claim {0:?} is listed more than once")]
    DuplicateClaim(String),
}

/// One org, optionally narrowed to some of its repos. No repos means the
/// whole org.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Owner {
    pub org: String,
    pub repos: Vec<String>,
}

impl Owner {
    pub fn admits(&self, org: &str, repo: &str) -> bool {
        self.org == org && (self.repos.is_empty() || self.repos.iter().any(|r| r == repo))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterProfileDetails {
    pub profile: String,
    pub owners: Vec<Owner>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterClaimDetails {
    pub claim: String,
    pub owners: Vec<Owner>,
}

/// On-disk form of the reference data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub cluster_profiles: Option<Vec<ClusterProfileDetails>>,
    pub cluster_claim_owners: Option<Vec<ClusterClaimDetails>>,
    pub clusters: Option<Vec<String>>,
}

impl ValidatorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ValidatorConfig = serde_json::from_str(json)?;
        config.index()?;
        Ok(config)
    }

    /// Keyed lookup tables. Absent lists stay `None`, which means unrestricted.
    pub fn index(&self) -> Result<ReferenceData, ConfigError> {
        let profiles = match &self.cluster_profiles {
            None => None,
            Some(list) => {
                let mut map = BTreeMap::new();
                for details in list {
                    if map.insert(details.profile.clone(), details.clone()).is_some() {
                        return Err(ConfigError::DuplicateProfile(details.profile.clone()));
                    }
                }
                Some(map)
            }
        };
        let claim_owners = match &self.cluster_claim_owners {
            None => None,
            Some(list) => {
                let mut map = BTreeMap::new();
                for details in list {
                    if map.insert(details.claim.clone(), details.clone()).is_some() {
                        return Err(ConfigError::DuplicateClaim(details.claim.clone()));
                    }
                }
                Some(map)
            }
        };
        let clusters = match &self.clusters {
            Some(list) => list.iter().cloned().collect(),
            None => DEFAULT_CLUSTERS.iter().map(|c| c.to_string()).collect(),
        };
        Ok(ReferenceData {
            profiles,
            claim_owners,
            clusters,
        })
    }
}

/// Indexed reference data, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub profiles: Option<BTreeMap<String, ClusterProfileDetails>>,
    pub claim_owners: Option<BTreeMap<String, ClusterClaimDetails>>,
    pub clusters: BTreeSet<String>,
}

impl ReferenceData {
    /// No profile or claim restrictions, default cluster list.
    pub fn unrestricted() -> Self {
        ReferenceData {
            profiles: None,
            claim_owners: None,
            clusters: DEFAULT_CLUSTERS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn is_valid_cluster(&self, cluster: &str) -> bool {
        self.clusters.contains(cluster)
    }
}
