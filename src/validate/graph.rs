//! Execution-graph checks over lowered steps: unique targets, resolvable
//! container images and an acyclic build order.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{ErrorList, GraphError, ValidationError};
use crate::lower::{GraphStep, Requirement};
use crate::parse::resolve::{BINARIES, ROOT, RPMS, SOURCE, TEST_BINARIES};

/// Config field whose absence explains a missing well-known artifact.
fn missing_field_hint(image: &str) -> Option<&'static str> {
    match image {
        ROOT => Some("build_root"),
        BINARIES => Some("binary_build_commands"),
        TEST_BINARIES => Some("test_binary_build_commands"),
        RPMS => Some("rpm_build_commands"),
        _ => None,
    }
}

/// Dependency graph over step indices; an edge runs from the step that
/// creates an artifact to every step requiring it.
pub struct StepGraph<'a> {
    pub graph: DiGraph<&'a str, ()>,
    pub creators: HashMap<&'a str, NodeIndex>,
}

impl<'a> StepGraph<'a> {
    pub fn build(steps: &'a [GraphStep]) -> Self {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = steps.iter().map(|s| graph.add_node(s.name.as_str())).collect();

        let mut creators = HashMap::new();
        for (step, &node) in steps.iter().zip(&nodes) {
            for image in &step.creates {
                creators.entry(image.as_str()).or_insert(node);
            }
        }
        for (step, &node) in steps.iter().zip(&nodes) {
            for requirement in &step.requires {
                if let Some(&creator) = creators.get(requirement.image.as_str()) {
                    graph.add_edge(creator, node, ());
                }
            }
        }
        StepGraph { graph, creators }
    }

    pub fn provides(&self, image: &str) -> bool {
        image == SOURCE || self.creators.contains_key(image)
    }
}

/// Each target name may be produced by one step only.
pub fn validate_target_names(steps: &[GraphStep]) -> Result<(), GraphError> {
    let mut errors = ErrorList::new();
    duplicate_targets(steps, &mut errors);
    finish(errors)
}

/// Full graph pass: target names, image references and cycles.
pub fn validate_graph(steps: &[GraphStep]) -> Result<(), GraphError> {
    let mut errors = ErrorList::new();
    duplicate_targets(steps, &mut errors);

    let graph = StepGraph::build(steps);
    for step in steps {
        for requirement in &step.requires {
            if let Some(error) = unresolved(&graph, requirement) {
                errors.push(error);
            }
        }
    }
    if let Err(cycle) = toposort(&graph.graph, None) {
        errors.push(ValidationError::reference(format!(
            "steps form a dependency cycle at {:?}",
            graph.graph[cycle.node_id()]
        )));
    }
    finish(errors)
}

fn finish(errors: ErrorList) -> Result<(), GraphError> {
    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(errors = errors.len(), "execution graph is invalid");
        Err(GraphError { errors })
    }
}

fn duplicate_targets(steps: &[GraphStep], errors: &mut ErrorList) {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    for step in steps {
        let name = step.name.as_str();
        if !seen.insert(name) && reported.insert(name) {
            errors.push(ValidationError::naming(format!(
                "configuration contains duplicate target: {name}"
            )));
        }
    }
}

fn unresolved(graph: &StepGraph<'_>, requirement: &Requirement) -> Option<ValidationError> {
    let field = requirement.field.as_deref()?;
    let image = requirement.image.as_str();
    if graph.provides(image) {
        return None;
    }
    match (missing_field_hint(image), requirement.strict) {
        (Some(hint), _) => Some(ValidationError::reference(format!(
            "{field}: unknown image {image:?} (configuration is missing `{hint}`)"
        ))),
        (None, true) => Some(ValidationError::reference(format!(
            "{field}: unknown image {image:?}"
        ))),
        (None, false) => None,
    }
}
