//! Kernels linked into this crate.
//!
//! Every kernel follows the packaged calling convention: it receives one
//! [`ArgValue`] per declared argument and returns 0 on success. When any
//! buffer has no host storage the call is a bounds query and the kernel only
//! writes the layout it requires into the descriptors.

use crate::arg_value::ArgValue;
use crate::buffer::BufferDescriptor;
use crate::call_context::CallContext;
use crate::errors::{KERNEL_FAILURE_STATUS, KernelError, KernelResult};
use crate::filter_metadata::{ArgumentKind, FilterInfo, FilterMetadata};

pub mod brighten;
pub mod copy_image;
pub mod packaged_call_tester;

/// Target recorded in the metadata of the built-in kernels.
pub const TARGET: &str = "host";

/// Every kernel this crate registers.
pub fn registered_filters() -> Vec<FilterInfo> {
    vec![brighten::filter_info(), packaged_call_tester::filter_info()]
}

/// Hands every registered kernel to `register`, stopping at the first nonzero status.
pub fn enumerate_registered_filters(register: &mut dyn FnMut(FilterInfo) -> i32) -> i32 {
    for info in registered_filters() {
        let status = register(info);
        if status != 0 {
            return status;
        }
    }
    0
}

/// Converts a kernel body's result into a status, reporting failures through the context.
pub(crate) fn finish(context: &dyn CallContext, result: KernelResult<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            context.error(&e.to_string());
            KERNEL_FAILURE_STATUS
        }
    }
}

/// Verifies the argument list matches the kernel's declaration.
pub(crate) fn check_arguments(metadata: &FilterMetadata, args: &[ArgValue]) -> KernelResult<()> {
    if args.len() != metadata.arguments.len() {
        return Err(KernelError::ArgumentCount {
            filter: metadata.name.to_string(),
            expected: metadata.arguments.len(),
            actual: args.len(),
        });
    }
    for (arg, value) in metadata.arguments.iter().zip(args) {
        let matches = match (arg.kind, value) {
            (ArgumentKind::InputScalar, ArgValue::Scalar(scalar)) => {
                scalar.matches_type(arg.type_code, arg.type_bits)
            }
            (ArgumentKind::InputBuffer | ArgumentKind::OutputBuffer, ArgValue::Buffer(_)) => true,
            _ => false,
        };
        if !matches {
            return Err(KernelError::ArgumentMismatch {
                filter: metadata.name.to_string(),
                name: arg.name.to_string(),
                expected: format!(
                    "{} of type {}({})",
                    arg.kind.label(),
                    arg.type_code.as_str(),
                    arg.type_bits
                ),
            });
        }
        if let ArgValue::Buffer(buf) = value {
            if buf.elem_size != arg.elem_size() {
                return Err(KernelError::ElemSize {
                    filter: metadata.name.to_string(),
                    name: arg.name.to_string(),
                    expected: arg.elem_size(),
                    actual: buf.elem_size,
                });
            }
        }
    }
    Ok(())
}

pub(crate) fn buffer_arg<'v>(
    metadata: &FilterMetadata,
    args: &'v [ArgValue],
    index: usize,
) -> KernelResult<&'v BufferDescriptor> {
    args.get(index)
        .and_then(ArgValue::as_buffer)
        .ok_or_else(|| buffer_mismatch(metadata, index))
}

pub(crate) fn buffer_arg_mut<'v>(
    metadata: &FilterMetadata,
    args: &'v mut [ArgValue],
    index: usize,
) -> KernelResult<&'v mut BufferDescriptor> {
    args.get_mut(index)
        .and_then(ArgValue::as_buffer_mut)
        .ok_or_else(|| buffer_mismatch(metadata, index))
}

fn buffer_mismatch(metadata: &FilterMetadata, index: usize) -> KernelError {
    KernelError::ArgumentMismatch {
        filter: metadata.name.to_string(),
        name: metadata
            .arguments
            .get(index)
            .map_or("?", |arg| arg.name)
            .to_string(),
        expected: "a buffer".to_string(),
    }
}

fn region_overflow(filter: &str, name: &str) -> KernelError {
    KernelError::RegionOverflow {
        filter: filter.to_string(),
        name: name.to_string(),
    }
}

/// Requests a dense planar layout over the first three dimensions.
pub(crate) fn request_planar(
    filter: &str,
    name: &str,
    buf: &mut BufferDescriptor,
) -> KernelResult<()> {
    let mut strides = [0; 3];
    let mut step: i32 = 1;
    let len = strides.len();
    for (i, stride) in strides.iter_mut().enumerate() {
        *stride = step;
        if i + 1 < len {
            step = step
                .checked_mul(buf.extent[i].max(1))
                .ok_or_else(|| region_overflow(filter, name))?;
        }
    }
    buf.stride[..3].copy_from_slice(&strides);
    Ok(())
}

/// Every `[x, y, c]` coordinate of a 3-D region, x fastest.
pub(crate) fn region_coords(
    filter: &str,
    name: &str,
    min: [i32; 4],
    extent: [i32; 4],
) -> KernelResult<impl Iterator<Item = [i32; 3]> + use<>> {
    let span = |i: usize| {
        min[i]
            .checked_add(extent[i])
            .map(|end| min[i]..end)
            .ok_or_else(|| region_overflow(filter, name))
    };
    let (xs, ys, cs) = (span(0)?, span(1)?, span(2)?);
    Ok(cs.flat_map(move |c| {
        let xs = xs.clone();
        ys.clone()
            .flat_map(move |y| xs.clone().map(move |x| [x, y, c]))
    }))
}

/// Clamps a coordinate into the buffer's region, repeating its edges.
pub(crate) fn clamp_to_region(
    filter: &str,
    name: &str,
    buf: &BufferDescriptor,
    coord: [i32; 3],
) -> KernelResult<[i32; 3]> {
    let mut clamped = coord;
    for (i, c) in clamped.iter_mut().enumerate() {
        if buf.extent[i] < 1 {
            return Err(KernelError::EmptyBuffer {
                filter: filter.to_string(),
                name: name.to_string(),
            });
        }
        let low = i64::from(buf.min[i]);
        let high = low + i64::from(buf.extent[i]) - 1;
        *c = i32::try_from(i64::from(*c).clamp(low, high))
            .map_err(|_| region_overflow(filter, name))?;
    }
    Ok(clamped)
}

pub(crate) fn read_u8(
    filter: &str,
    name: &str,
    buf: &BufferDescriptor,
    coord: [i32; 3],
) -> KernelResult<u8> {
    let host = buf.host().ok_or_else(|| KernelError::MissingHost {
        filter: filter.to_string(),
        name: name.to_string(),
    })?;
    buf.element_offset(&coord)
        .and_then(|offset| host.get(offset).copied())
        .ok_or_else(|| KernelError::OutOfBounds {
            filter: filter.to_string(),
            name: name.to_string(),
            coord,
        })
}

pub(crate) fn write_u8(
    filter: &str,
    name: &str,
    buf: &mut BufferDescriptor,
    coord: [i32; 3],
    value: u8,
) -> KernelResult<()> {
    let offset = buf.element_offset(&coord);
    let host = buf.host_mut().ok_or_else(|| KernelError::MissingHost {
        filter: filter.to_string(),
        name: name.to_string(),
    })?;
    let slot = offset
        .and_then(|offset| host.get_mut(offset))
        .ok_or_else(|| KernelError::OutOfBounds {
            filter: filter.to_string(),
            name: name.to_string(),
            coord,
        })?;
    *slot = value;
    Ok(())
}
