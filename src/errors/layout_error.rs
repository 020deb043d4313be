//! Error types for buffer layout adaptation and copying.

use thiserror::Error;

/// Errors that can occur while reshaping, allocating, or copying buffer storage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Unsupported element size: {elem_size}")]
    InvalidElemSize { elem_size: i32 },

    #[error("Source and destination element sizes differ: {src} != {dst}")]
    ElemSizeMismatch { src: i32, dst: i32 },

    #[error("Negative stride {stride} in dimension {dimension} is not supported")]
    NegativeStride { dimension: usize, stride: i32 },

    #[error("Buffers support at most {max} dimensions, got {dimensions}")]
    TooManyDimensions { dimensions: i32, max: usize },

    #[error("Buffer addresses more elements than can be represented")]
    SizeOverflow,

    #[error("Unable to allocate {bytes} bytes of buffer storage")]
    AllocationFailed { bytes: usize },

    #[error("The {label} buffer has no host storage")]
    MissingHost { label: String },

    #[error("The {label} buffer holds {actual} bytes but {required} are addressed")]
    HostTooSmall {
        label: String,
        required: usize,
        actual: usize,
    },

    #[error("The argument {name} does not hold a buffer")]
    NotABuffer { name: String },
}
