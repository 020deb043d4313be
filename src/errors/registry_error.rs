use thiserror::Error;

/// Errors raised while building or querying the filter registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Could not find name: ({name})")]
    NotFound { name: String },

    #[error("Expected exactly one name, found: ({})", .names.join(" "))]
    Ambiguous { names: Vec<String> },

    #[error("Filter enumeration failed with status {status}")]
    EnumerationFailed { status: i32 },
}

/// Errors raised while describing filter metadata.
#[derive(Error, Debug)]
pub enum DescribeError {
    #[error("Unsupported scalar type for argument {name}: {type_code}({type_bits})")]
    UnsupportedScalarType {
        name: String,
        type_code: String,
        type_bits: u8,
    },

    #[error("The {field} value of argument {name} does not match its declared type")]
    ScalarTypeMismatch { name: String, field: String },

    #[error("Unable to serialize the description: {0}")]
    Serialization(#[from] serde_json::Error),
}
