//! Argument values handed to a kernel entry point.

use crate::buffer::BufferDescriptor;
use crate::filter_metadata::ScalarValue;

/// Value of one kernel argument: a typed scalar or a buffer.
///
/// Which variant is present always follows from the argument's declared kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Scalar(ScalarValue),
    Buffer(BufferDescriptor),
}

impl Default for ArgValue {
    fn default() -> Self {
        ArgValue::Buffer(BufferDescriptor::default())
    }
}

impl ArgValue {
    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            ArgValue::Scalar(s) => Some(s),
            ArgValue::Buffer(_) => None,
        }
    }

    pub fn as_buffer(&self) -> Option<&BufferDescriptor> {
        match self {
            ArgValue::Buffer(b) => Some(b),
            ArgValue::Scalar(_) => None,
        }
    }

    pub fn as_buffer_mut(&mut self) -> Option<&mut BufferDescriptor> {
        match self {
            ArgValue::Buffer(b) => Some(b),
            ArgValue::Scalar(_) => None,
        }
    }
}

/// Returns true if the arguments describe a bounds query: some buffer carries no host data.
///
/// Kernels answer a bounds query by writing the shapes they require into the
/// buffer descriptors without touching any data.
pub fn is_bounds_query(args: &[ArgValue]) -> bool {
    args.iter()
        .filter_map(ArgValue::as_buffer)
        .any(|b| b.host.is_none())
}
