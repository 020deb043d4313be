//! Error types raised inside the built-in kernels.

use thiserror::Error;

/// Status a built-in kernel returns after reporting a [`KernelError`].
pub const KERNEL_FAILURE_STATUS: i32 = -1;

/// Failures a built-in kernel reports through its call context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("{filter}: expected {expected} arguments, got {actual}")]
    ArgumentCount {
        filter: String,
        expected: usize,
        actual: usize,
    },

    #[error("{filter}: argument {name} must be {expected}")]
    ArgumentMismatch {
        filter: String,
        name: String,
        expected: String,
    },

    #[error("{filter}: buffer {name} has elem_size {actual}, expected {expected}")]
    ElemSize {
        filter: String,
        name: String,
        expected: i32,
        actual: i32,
    },

    #[error("{filter}: buffer {name} has no host storage")]
    MissingHost { filter: String, name: String },

    #[error("{filter}: buffer {name} is empty")]
    EmptyBuffer { filter: String, name: String },

    #[error("{filter}: the region of {name} exceeds the coordinate range")]
    RegionOverflow { filter: String, name: String },

    #[error("{filter}: access to {name} at {coord:?} is out of bounds")]
    OutOfBounds {
        filter: String,
        name: String,
        coord: [i32; 3],
    },
}
