//! Validation phase: semantic checks over a parsed document.
//!
//! Every section validator appends to one shared diagnostic list and, where it
//! produces pipeline artifacts, registers them in one shared [`ArtifactTable`].
//! Sections run in a fixed order so that "first definer wins" is stable.

pub mod context;
pub mod dependencies;
pub mod document;
pub mod graph;
pub mod images;
pub mod profiles;
pub mod promotion;
pub mod release;
pub mod resources;
pub mod step;
pub mod test;

use std::collections::BTreeSet;

use tracing::{debug, info, instrument};

use crate::config::{ConfigError, ReferenceData, ValidatorConfig};
use crate::error::{ConfigurationError, ErrorList, ValidationError};
use crate::parse::resolve::{BINARIES, RPMS, TEST_BINARIES, with_ref};
use crate::parse::{Document, LiteralTestStep, RefCommands};

use context::{ArtifactTable, FieldPath, InputImages, TestScope};
use step::{Stage, TrapCache};
use test::TestEnvironment;

/// Per-call inputs that are not part of the document.
#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    /// Requesting repository, used only for the canonical-repository check.
    pub org: String,
    pub repo: String,
    /// The document must not contain symbolic multi-stage tests.
    pub resolved: bool,
}

impl ValidationOptions {
    pub fn for_repo(org: impl Into<String>, repo: impl Into<String>) -> Self {
        ValidationOptions {
            org: org.into(),
            repo: repo.into(),
            resolved: false,
        }
    }

    pub fn resolved() -> Self {
        ValidationOptions {
            resolved: true,
            ..Default::default()
        }
    }
}

/// Reusable validator for bulk checks. Holds the injected reference data and
/// a trap-detection cache that persists across documents.
///
/// Not `Sync`; use one per thread.
#[derive(Debug)]
pub struct Validator {
    reference: ReferenceData,
    traps: TrapCache,
}

impl Default for Validator {
    fn default() -> Self {
        Validator::with_reference(ReferenceData::unrestricted())
    }
}

impl Validator {
    pub fn new(config: &ValidatorConfig) -> Result<Self, ConfigError> {
        Ok(Validator::with_reference(config.index()?))
    }

    pub fn with_reference(reference: ReferenceData) -> Self {
        Validator {
            reference,
            traps: TrapCache::new(),
        }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Validates a document as stored in the configuration repository.
    pub fn validate_configuration(
        &self,
        doc: &Document,
        org: &str,
        repo: &str,
    ) -> Result<(), ConfigurationError> {
        self.validate(doc, &ValidationOptions::for_repo(org, repo))
    }

    /// Validates a document whose multi-stage tests must all be literal.
    pub fn validate_resolved(&self, doc: &Document) -> Result<(), ConfigurationError> {
        self.validate(doc, &ValidationOptions::resolved())
    }

    /// Validates a document at execution time, with no repository context.
    pub fn validate_runtime(&self, doc: &Document) -> Result<(), ConfigurationError> {
        self.validate(doc, &ValidationOptions::default())
    }

    #[instrument(skip_all, fields(org = %options.org, repo = %options.repo, resolved = options.resolved))]
    pub fn validate(&self, doc: &Document, options: &ValidationOptions) -> Result<(), ConfigurationError> {
        let errors: ErrorList = self.collect(doc, options).into();
        if errors.is_empty() {
            debug!("configuration is valid");
        } else {
            info!(errors = errors.len(), "configuration is invalid");
        }
        errors.into_result()
    }

    /// Every diagnostic for `doc`, in traversal order.
    pub fn collect(&self, doc: &Document, options: &ValidationOptions) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut table = ArtifactTable::new();
        seed_build_commands(doc, &mut table);

        document::validate_document(doc, options, &mut errors);
        resources::validate_resources("resources", &doc.resources, &mut errors);
        debug!(errors = errors.len(), "document checked");

        images::validate_build_roots(doc, &mut table, &mut errors);
        if let Some(operator) = &doc.operator {
            images::validate_operator(doc, operator, &mut table, &mut errors);
        }
        if let Some(base) = &doc.input.base_images {
            images::validate_base_images(base, &mut table, &mut errors);
        }
        if let Some(base) = &doc.input.base_rpm_images {
            images::validate_base_rpm_images(base, &mut table, &mut errors);
        }
        debug!(errors = errors.len(), artifacts = table.len(), "inputs checked");

        if let Some(tag) = &doc.input.tag_specification {
            release::validate_release_tag_configuration("tag_specification", tag, &mut errors);
        }
        promotion::validate_promotion("promotion", doc, &mut errors);
        release::validate_releases(
            "releases",
            &doc.input.releases,
            doc.input.tag_specification.is_some(),
            &mut errors,
        );
        debug!(errors = errors.len(), "releases and promotion checked");

        images::validate_images(&doc.images, &mut table, &mut errors);

        let env = TestEnvironment::new(doc, &self.reference, &self.traps, options.resolved);
        let mut input_images = InputImages::new();
        test::validate_tests(&env, &mut input_images, &mut errors);
        for (tag, path) in &input_images {
            if let Err(e) = table.define(path, tag) {
                errors.push(e);
            }
        }
        debug!(errors = errors.len(), tests = doc.tests.len(), "tests checked");

        dependencies::validate_step_dependencies(doc, &mut errors);
        debug!(errors = errors.len(), "dependencies checked");
        errors
    }

    /// Checks a standalone registry step. Checks that need the enclosing test
    /// or document (parameters, image references) are skipped.
    pub fn is_valid_reference(&self, step: &LiteralTestStep) -> Vec<ValidationError> {
        let releases = BTreeSet::new();
        let mut scope = TestScope::detached(&releases);
        let mut errors = Vec::new();
        step::validate_literal_step(
            &FieldPath::new(step.as_name.as_str()),
            Stage::Unknown,
            step,
            &mut scope,
            &self.traps,
            &mut errors,
        );
        errors
    }
}

/// Binaries and RPMs are produced by commands rather than declared images.
fn seed_build_commands(doc: &Document, table: &mut ArtifactTable) {
    let sources: [(&str, &str, &str, &[RefCommands]); 3] = [
        (BINARIES, "binary_build_commands", &doc.binary_build_commands, &doc.binary_build_commands_list),
        (
            TEST_BINARIES,
            "test_binary_build_commands",
            &doc.test_binary_build_commands,
            &doc.test_binary_build_commands_list,
        ),
        (RPMS, "rpm_build_commands", &doc.rpm_build_commands, &doc.rpm_build_commands_list),
    ];
    for (name, field, single, list) in sources {
        if !single.is_empty() {
            table.seed(name, field);
        } else {
            for entry in list {
                table.seed(&with_ref(name, &entry.reference), field);
            }
        }
    }
}
