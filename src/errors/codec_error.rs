//! Error types for argument packing and unpacking.

use thiserror::Error;

/// Protocol errors raised while converting between a message document and argument values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("The {message} message must be a map")]
    MessageNotMap { message: String },

    #[error("The member {member} of {context} is missing")]
    MissingMember { context: String, member: String },

    #[error("The member {member} of {context} must be {expected}")]
    WrongKind {
        context: String,
        member: String,
        expected: String,
    },

    #[error("The member {member} of {context} must have {expected} elements, got {actual}")]
    ArrayLengthMismatch {
        context: String,
        member: String,
        expected: usize,
        actual: usize,
    },

    #[error("The handle argument {name} must not be present in the inputs")]
    HandleArgumentPresent { name: String },

    #[error("The argument {name} cannot be {operation}: it is a {kind}")]
    InvalidArgumentKind {
        name: String,
        operation: String,
        kind: String,
    },

    #[error("Unsupported scalar type for argument {name}: {type_code}({type_bits})")]
    UnsupportedScalarType {
        name: String,
        type_code: String,
        type_bits: u8,
    },

    #[error("The elem_size of buffer {name} must be {expected}, got {actual}")]
    ElemSizeMismatch {
        name: String,
        expected: i32,
        actual: i32,
    },

    #[error("The host data of buffer {name} holds {actual} bytes but its shape addresses {required}")]
    HostTooSmall {
        name: String,
        required: usize,
        actual: usize,
    },

    #[error("The shape of buffer {name} is invalid: {reason}")]
    InvalidShape { name: String, reason: String },

    #[error("The member {member} could not be set on {context}")]
    SetMemberFailed { context: String, member: String },
}
