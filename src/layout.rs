//! Buffer layout negotiation.
//!
//! A bounds query tells us, per buffer argument, the shape and strides the
//! kernel wants (the *constraint*). Input buffers are copied into a new layout
//! only when the constraint actually disagrees with what the caller supplied;
//! output buffers are shaped from the constraint and freshly allocated.

use log::debug;

use crate::buffer::{BufferDescriptor, MAX_DIMENSIONS, allocate_storage};
use crate::copy::copy_buffer;
use crate::errors::{LayoutError, LayoutResult};
use crate::filter_metadata::ArgumentInfo;

/// Channel count assumed for an unconstrained, non-interleaved channel dimension.
const DEFAULT_CHANNELS: i32 = 4;

fn rank(arg: &ArgumentInfo) -> LayoutResult<usize> {
    usize::try_from(arg.dimensions)
        .ok()
        .filter(|&d| d <= MAX_DIMENSIONS)
        .ok_or(LayoutError::TooManyDimensions {
            dimensions: arg.dimensions,
            max: MAX_DIMENSIONS,
        })
}

/// Returns true if the constraint describes a classically interleaved layout.
fn is_chunky(constraint: &BufferDescriptor) -> bool {
    constraint.stride[0] >= 1 && constraint.stride[2] == 1
}

/// Completes the strides of an interleaved ("chunky") layout.
///
/// Interleaved kernels usually pin `stride[0]` and `stride[2]` and leave
/// `stride[1]` open; copying with the open stride garbles the image. When the
/// constraint has `stride[2] == 1`, the channel extent is tied to `stride[0]`
/// (or `stride[0]` to the channel extent if it is unset), and `stride[1]` is
/// set to a full row.
pub fn fix_chunky_strides(
    dimensions: usize,
    constraint: &BufferDescriptor,
    buf: &mut BufferDescriptor,
) -> LayoutResult<()> {
    if dimensions < 3 || constraint.stride[2] != 1 {
        return Ok(());
    }
    if constraint.stride[0] >= 1 {
        buf.extent[2] = constraint.stride[0];
    } else {
        buf.stride[0] = buf.extent[2];
    }
    buf.stride[1] = buf.extent[0]
        .checked_mul(buf.stride[0])
        .ok_or(LayoutError::SizeOverflow)?;
    Ok(())
}

/// Reconciles a caller-supplied input buffer with the kernel's constraint.
///
/// A nonzero constraint `min` or `extent` that is smaller than the caller's,
/// or a nonzero constraint `stride` that differs from it, forces a copy into
/// freshly allocated storage with the constrained layout, which then replaces
/// `buf`. Otherwise `buf` is left exactly as it was. Returns whether a copy
/// was made.
pub fn adapt_input_buffer_layout(
    arg: &ArgumentInfo,
    constraint: &BufferDescriptor,
    buf: &mut BufferDescriptor,
) -> LayoutResult<bool> {
    let dimensions = rank(arg)?;
    let mut adapted = buf.without_host();
    let mut need_copy = false;
    for i in 0..dimensions {
        if constraint.min[i] != 0 && adapted.min[i] > constraint.min[i] {
            adapted.min[i] = constraint.min[i];
            need_copy = true;
        }
        if constraint.extent[i] != 0 && adapted.extent[i] > constraint.extent[i] {
            adapted.extent[i] = constraint.extent[i];
            need_copy = true;
        }
        if constraint.stride[i] != 0 && constraint.stride[i] != adapted.stride[i] {
            adapted.stride[i] = constraint.stride[i];
            need_copy = true;
        }
    }
    if !need_copy {
        debug!("{}: layout already satisfies the kernel", arg.name);
        return Ok(false);
    }

    fix_chunky_strides(dimensions, constraint, &mut adapted)?;
    let bytes = adapted.byte_len(dimensions)?;
    adapted.host = Some(allocate_storage(bytes)?);
    copy_buffer(buf, &mut adapted)?;
    debug!(
        "{}: relaid out to extent {:?} stride {:?} ({} bytes)",
        arg.name, adapted.extent, adapted.stride, bytes
    );
    *buf = adapted;
    Ok(true)
}

/// Builds and allocates an output buffer from the kernel's constraint.
///
/// Unconstrained extents become 1, except the channel dimension, which takes
/// the interleave width for chunky layouts and 4 otherwise. If any stride is
/// still open after the chunky fix-up, the whole buffer is laid out planar.
pub fn prepare_output_buffer(
    arg: &ArgumentInfo,
    constraint: &BufferDescriptor,
) -> LayoutResult<BufferDescriptor> {
    let dimensions = rank(arg)?;
    let mut buf = constraint.without_host();
    for i in 0..dimensions {
        if buf.extent[i] != 0 {
            continue;
        }
        buf.extent[i] = match i {
            2 if is_chunky(constraint) => constraint.stride[0],
            2 => DEFAULT_CHANNELS,
            _ => 1,
        };
    }
    fix_chunky_strides(dimensions, constraint, &mut buf)?;

    if buf.stride[..dimensions].contains(&0) {
        buf.stride[0] = 1;
        for i in 1..dimensions {
            buf.stride[i] = buf.stride[i - 1]
                .checked_mul(buf.extent[i - 1])
                .ok_or(LayoutError::SizeOverflow)?;
        }
    }
    buf.elem_size = arg.elem_size();
    let bytes = buf.byte_len(dimensions)?;
    buf.host = Some(allocate_storage(bytes)?);
    debug!(
        "{}: allocated output extent {:?} stride {:?} ({} bytes)",
        arg.name, buf.extent, buf.stride, bytes
    );
    Ok(buf)
}
