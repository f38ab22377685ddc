//! Error and diagnostic types for a generation run.

use thiserror::Error;

/// Fatal failures of a generation run.
///
/// Every variant describes a malformed or contradictory input; a run that hits
/// one of them stops and returns it unchanged to the host.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Reference '{reference}' could not be resolved from document '{document}'")]
    UnresolvedReference { reference: String, document: String },

    #[error("Array schema '{name}' has neither items nor prefixItems: {schema}")]
    MalformedArray { name: String, schema: String },

    #[error(
        "Operation '{operation}' uses path parameter '{parameter}' in '{path}' but does not declare it"
    )]
    MissingPathParameter {
        operation: String,
        path: String,
        parameter: String,
    },

    #[error("Brand '{brand}' is registered with base type '{existing}', cannot register it again with '{requested}'")]
    BrandConflict {
        brand: String,
        existing: String,
        requested: String,
    },

    #[error("Brand '{brand}' collides with an existing declaration name")]
    BrandNameCollision { brand: String },

    #[error("Declaration '{name}' from document '{document}' collides with an earlier declaration of the same name")]
    DuplicateDeclaration { name: String, document: String },

    #[error("Reference '{reference}' loops back on itself without reaching a schema")]
    ReferenceCycle { reference: String },

    #[error("Failed to parse document '{document}': {message}")]
    DocumentParse { document: String, message: String },

    #[error("Invalid output policy: {0}")]
    InvalidPolicy(#[from] toml::de::Error),
}

/// Kind of a non-fatal finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A later declaration was dropped because an earlier one has the same name.
    DuplicateDeclaration,
    /// A declaration was renamed to a document-qualified alias to avoid shadowing.
    ShadowedImport,
    /// An operation took a numeric suffix because its name was already used.
    RenamedOperation,
}

/// A non-fatal finding collected during a run and returned with its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Declaration (or operation) name the finding is about
    pub name: String,
    /// Document the affected declaration came from
    pub document: String,
    pub message: String,
}
