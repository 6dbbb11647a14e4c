//! WASM entry points for browser use.

use wasm_bindgen::prelude::*;

use crate::config::ValidatorConfig;
use crate::error::ValidationError;
use crate::validate::{ValidationOptions, Validator};

/// Validate a configuration JSON against optional reference data JSON.
/// Returns `{status: "valid"}` or `{status: "invalid", errors, rendered}`.
#[wasm_bindgen]
pub fn validate_configuration(json: &str, reference_json: &str, org: &str, repo: &str) -> JsValue {
    let result = validate_configuration_inner(json, reference_json, ValidationOptions::for_repo(org, repo));
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

/// Same as [`validate_configuration`] but requires fully-resolved tests.
#[wasm_bindgen]
pub fn validate_resolved_configuration(json: &str, reference_json: &str) -> JsValue {
    let result = validate_configuration_inner(json, reference_json, ValidationOptions::resolved());
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn validate_configuration_inner(json: &str, reference_json: &str, options: ValidationOptions) -> ValidationResult {
    let config = if reference_json.trim().is_empty() {
        ValidatorConfig::default()
    } else {
        match ValidatorConfig::from_json(reference_json) {
            Ok(c) => c,
            Err(e) => return ValidationResult::failed("config", e.to_string()),
        }
    };
    let validator = match Validator::new(&config) {
        Ok(v) => v,
        Err(e) => return ValidationResult::failed("config", e.to_string()),
    };
    let doc = match crate::parse::parse(json) {
        Ok(d) => d,
        Err(e) => return ValidationResult::failed("parse", e.to_string()),
    };

    match validator.validate(&doc, &options) {
        Ok(()) => ValidationResult::Valid,
        Err(e) => ValidationResult::Invalid {
            rendered: e.to_string(),
            errors: e.errors.into_iter().map(ErrorDto::from).collect(),
        },
    }
}

/// Lower a configuration and run the execution-graph checks.
/// Returns the step names on success.
#[wasm_bindgen]
pub fn validate_graph(json: &str) -> JsValue {
    let result = validate_graph_inner(json);
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

fn validate_graph_inner(json: &str) -> GraphResult {
    let doc = match crate::parse::parse(json) {
        Ok(d) => d,
        Err(e) => {
            return GraphResult::Errors {
                rendered: e.to_string(),
                errors: vec![ErrorDto {
                    kind: "parse".into(),
                    message: e.to_string(),
                }],
            };
        }
    };
    let steps = crate::lower::lower(&doc);
    match crate::validate::graph::validate_graph(&steps) {
        Ok(()) => GraphResult::Success {
            steps: steps.into_iter().map(|s| s.name).collect(),
        },
        Err(e) => GraphResult::Errors {
            rendered: e.to_string(),
            errors: e.errors.into_iter().map(ErrorDto::from).collect(),
        },
    }
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(serde::Serialize, serde::Deserialize)]
struct ErrorDto {
    kind: String,
    message: String,
}

impl From<ValidationError> for ErrorDto {
    fn from(e: ValidationError) -> Self {
        ErrorDto {
            kind: e.kind.to_string(),
            message: e.message,
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum ValidationResult {
    Valid,
    Invalid { rendered: String, errors: Vec<ErrorDto> },
}

impl ValidationResult {
    fn failed(kind: &str, message: String) -> Self {
        ValidationResult::Invalid {
            rendered: message.clone(),
            errors: vec![ErrorDto {
                kind: kind.into(),
                message,
            }],
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(tag = "status")]
enum GraphResult {
    #[serde(rename = "success")]
    Success { steps: Vec<String> },
    #[serde(rename = "errors")]
    Errors { rendered: String, errors: Vec<ErrorDto> },
}
