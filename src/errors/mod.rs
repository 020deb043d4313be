//! Error types for the packaged-call runtime.
//!
//! Each concern owns a specific error enum instead of a generic wrapper like
//! `anyhow` or `Box<dyn Error>`, so callers can match on the exact failure.

mod codec_error;
mod kernel_error;
mod layout_error;
mod packaged_call_error;
mod registry_error;

pub use codec_error::CodecError;
pub use kernel_error::{KERNEL_FAILURE_STATUS, KernelError};
pub use layout_error::LayoutError;
pub use packaged_call_error::{
    CallPhase, MARSHALING_FAILURE_MESSAGE, MARSHALING_FAILURE_STATUS, PackagedCallError,
};
pub use registry_error::{DescribeError, RegistryError};

/// Result type alias for argument codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Result type alias for buffer layout operations.
pub type LayoutResult<T> = std::result::Result<T, LayoutError>;

/// Result type alias for registry lookups.
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Result type alias for metadata descriptions.
pub type DescribeResult<T> = std::result::Result<T, DescribeError>;

/// Result type alias for built-in kernel bodies.
pub type KernelResult<T> = std::result::Result<T, KernelError>;

/// Result type alias for packaged calls.
pub type PackagedCallResult<T> = std::result::Result<T, PackagedCallError>;
