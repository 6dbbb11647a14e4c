pub mod config;
pub mod error;
pub mod format;
pub mod lower;
pub mod parse;
pub mod validate;
pub mod wasm;

pub use config::{ReferenceData, ValidatorConfig};
pub use error::{ConfigurationError, ErrorKind, ErrorList, GraphError, ValidationError};
pub use validate::{ValidationOptions, Validator};
