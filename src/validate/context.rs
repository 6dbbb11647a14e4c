//! Traversal state: where we are, what has been defined, and what a test's
//! steps have already claimed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{ErrorKind, ValidationError};
use crate::parse::ClaimRelease;

// =============================================================================
// DIAGNOSTIC PATH
// =============================================================================

/// Location inside the document, e.g. `tests[2].steps.pre[0].dependencies[1]`.
/// Every extension returns a new value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(root: impl Into<String>) -> Self {
        FieldPath(root.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> Self {
        if self.0.is_empty() {
            FieldPath(name.to_string())
        } else {
            FieldPath(format!("{}.{}", self.0, name))
        }
    }

    /// # Panics
    /// On an empty path: an index only means something beneath a named field.
    pub fn index(&self, i: usize) -> Self {
        assert!(!self.0.is_empty(), "index {i} applied to an empty field path");
        FieldPath(format!("{}[{}]", self.0, i))
    }

    /// # Panics
    /// On an empty path, for the same reason as [`FieldPath::index`].
    pub fn key(&self, k: &str) -> Self {
        assert!(!self.0.is_empty(), "key {k:?} applied to an empty field path");
        FieldPath(format!("{}[{}]", self.0, k))
    }

    /// `"<path>: <message>"`.
    pub fn error(&self, kind: ErrorKind, message: impl fmt::Display) -> ValidationError {
        ValidationError::new(kind, format!("{}: {}", self.0, message))
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FieldPath {
    fn from(s: &str) -> Self {
        FieldPath::new(s)
    }
}

// =============================================================================
// ARTIFACT SYMBOL TABLE
// =============================================================================

/// Artifact name → path of the field that first defined it.
#[derive(Debug, Clone, Default)]
pub struct ArtifactTable {
    defined: BTreeMap<String, String>,
}

impl ArtifactTable {
    /// A table holding only the source checkout, which always exists.
    pub fn new() -> Self {
        let mut table = ArtifactTable::default();
        table.seed(crate::parse::resolve::SOURCE, crate::parse::resolve::SOURCE);
        table
    }

    /// Records `name` without a collision check, replacing any earlier definer.
    pub fn seed(&mut self, name: &str, definer: &str) {
        self.defined.insert(name.to_string(), definer.to_string());
    }

    /// Records `name` as defined at `path`; first definer wins.
    pub fn define(&mut self, path: &FieldPath, name: &str) -> Result<(), ValidationError> {
        if let Some(previous) = self.defined.get(name) {
            return Err(path.error(
                ErrorKind::Naming,
                format!("duplicate image name '{name}' (previously defined by field '{previous}')"),
            ));
        }
        self.defined.insert(name.to_string(), path.to_string());
        Ok(())
    }

    pub fn definer(&self, name: &str) -> Option<&str> {
        self.defined.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defined.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }
}

/// `from_image` imports referenced by multi-stage steps, keyed by pipeline tag.
/// Several steps may import the same tag, so only the first field is kept and
/// the tags are defined in the symbol table once every test has been walked.
pub type InputImages = BTreeMap<String, FieldPath>;

// =============================================================================
// TEST SCOPE
// =============================================================================

/// State shared by a multi-stage test and all of its steps.
#[derive(Debug)]
pub struct TestScope<'a> {
    /// Parameters the test provides; `None` skips the unresolved-parameter check.
    pub env: Option<&'a BTreeMap<String, String>>,
    /// Names of configured releases.
    pub releases: &'a BTreeSet<String>,
    pub claim: Option<&'a ClaimRelease>,
    pub names_seen: BTreeSet<String>,
    pub leases_seen: BTreeSet<String>,
    pub input_images: Option<&'a mut InputImages>,
}

impl<'a> TestScope<'a> {
    pub fn new(
        env: Option<&'a BTreeMap<String, String>>,
        releases: &'a BTreeSet<String>,
        claim: Option<&'a ClaimRelease>,
        input_images: Option<&'a mut InputImages>,
    ) -> Self {
        TestScope {
            env,
            releases,
            claim,
            names_seen: BTreeSet::new(),
            leases_seen: BTreeSet::new(),
            input_images,
        }
    }

    /// Scope for a step validated outside of any test.
    pub fn detached(releases: &'a BTreeSet<String>) -> Self {
        TestScope::new(None, releases, None, None)
    }

    /// Records a `from_image` tag unless an earlier field already did.
    pub fn record_input_image(&mut self, tag: String, path: &FieldPath) {
        if let Some(images) = self.input_images.as_deref_mut() {
            images.entry(tag).or_insert_with(|| path.clone());
        }
    }
}
