//! Outcome errors of a packaged call.

use std::fmt;

use thiserror::Error;

use super::{CodecError, LayoutError};

/// Status returned when marshaling fails inside the call runtime itself.
pub const MARSHALING_FAILURE_STATUS: i32 = -6502;

/// Message reported through the context's error hook for marshaling failures.
pub const MARSHALING_FAILURE_MESSAGE: &str = "MakePackagedCall_Failure.";

/// The kernel invocation that produced a nonzero status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    BoundsQuery,
    Execute,
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallPhase::BoundsQuery => write!(f, "bounds query"),
            CallPhase::Execute => write!(f, "execute"),
        }
    }
}

/// Terminal failure of a packaged call.
///
/// Kernel failures carry the kernel's own status untouched; the kernel has
/// already reported its message through the call context. Every other
/// variant is a marshaling failure and maps to [`MARSHALING_FAILURE_STATUS`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackagedCallError {
    #[error("Kernel {phase} call failed with status {status}")]
    Kernel { phase: CallPhase, status: i32 },

    #[error("Argument marshaling failed: {0}")]
    Codec(#[from] CodecError),

    #[error("Buffer preparation failed: {0}")]
    Layout(#[from] LayoutError),
}

impl PackagedCallError {
    /// Status code a C-style caller would observe for this failure.
    pub fn status(&self) -> i32 {
        match self {
            PackagedCallError::Kernel { status, .. } => *status,
            _ => MARSHALING_FAILURE_STATUS,
        }
    }

    pub fn is_marshaling_failure(&self) -> bool {
        !matches!(self, PackagedCallError::Kernel { .. })
    }
}
