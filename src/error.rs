//! Diagnostic types shared by every validation pass.

use serde::Serialize;

/// Broad class of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed mutually-exclusive combinations, missing required fields.
    Structural,
    /// Duplicate or invalid identifiers.
    Naming,
    /// References that cannot be resolved against the rest of the document.
    Reference,
    /// Malformed quantities, schedules, durations and paths.
    Format,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Structural => write!(f, "structural"),
            ErrorKind::Naming => write!(f, "naming"),
            ErrorKind::Reference => write!(f, "reference"),
            ErrorKind::Format => write!(f, "format"),
        }
    }
}

/// One problem found in a document. `Display` prints only the message, which
/// already carries its location prefix when it has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ValidationError {
            kind,
            message: message.into(),
        }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structural, message)
    }

    pub fn naming(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Naming, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Reference, message)
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Format, message)
    }
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Diagnostics in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorList(Vec<ValidationError>);

impl ErrorList {
    pub fn new() -> Self {
        ErrorList(Vec::new())
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }

    /// Renders the list as the single-line or itemised report. Returns `None`
    /// for an empty list.
    pub fn render(&self) -> Option<String> {
        match self.0.as_slice() {
            [] => None,
            [only] => Some(format!("invalid configuration: {}", only.message)),
            all => {
                let items: Vec<&str> = all.iter().map(|e| e.message.as_str()).collect();
                Some(format!(
                    "configuration has {} errors:\n\n  * {}\n",
                    all.len(),
                    items.join("\n  * ")
                ))
            }
        }
    }

    /// Converts into a `Result`, failing when any diagnostic was collected.
    pub fn into_result(self) -> Result<(), ConfigurationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError { errors: self })
        }
    }
}

impl Extend<ValidationError> for ErrorList {
    fn extend<T: IntoIterator<Item = ValidationError>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<ValidationError> for ErrorList {
    fn from_iter<T: IntoIterator<Item = ValidationError>>(iter: T) -> Self {
        ErrorList(iter.into_iter().collect())
    }
}

impl From<Vec<ValidationError>> for ErrorList {
    fn from(errors: Vec<ValidationError>) -> Self {
        ErrorList(errors)
    }
}

impl IntoIterator for ErrorList {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Aggregated failure of a whole-document validation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .errors.render().unwrap_or_default())]
pub struct ConfigurationError {
    pub errors: ErrorList,
}

/// Aggregated failure of the execution-graph pass. One error renders as its
/// bare message, several as `[a, b]`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", render_graph(.errors))]
pub struct GraphError {
    pub errors: ErrorList,
}

fn render_graph(errors: &ErrorList) -> String {
    match errors.messages().as_slice() {
        [only] => only.to_string(),
        all => format!("[{}]", all.join(", ")),
    }
}
