//! Raw buffer copy between two layouts of the same element size.

use crate::buffer::BufferDescriptor;
use crate::errors::{LayoutError, LayoutResult};
use crate::filters::copy_image::{copy_image_float32, copy_image_uint8, copy_image_uint16};

type CopyImageFunc = fn(&BufferDescriptor, &mut BufferDescriptor) -> LayoutResult<()>;

fn copy_image_invalid(src: &BufferDescriptor, _dst: &mut BufferDescriptor) -> LayoutResult<()> {
    Err(LayoutError::InvalidElemSize {
        elem_size: src.elem_size,
    })
}

/// Indexed by `elem_size - 1`.
const COPY_FUNCS: [CopyImageFunc; 4] = [
    copy_image_uint8,
    copy_image_uint16,
    copy_image_invalid,
    copy_image_float32,
];

/// Copies the contents of `src` into the storage of `dst`, converting layout as needed.
///
/// As many channels as fit are copied; extra destination channels are filled
/// with the opaque value. The fields of `dst` are left untouched, only the
/// memory its host storage holds is written. Element sizes must match and be
/// 1, 2 or 4 bytes.
pub fn copy_buffer(src: &BufferDescriptor, dst: &mut BufferDescriptor) -> LayoutResult<()> {
    if src.elem_size != dst.elem_size {
        return Err(LayoutError::ElemSizeMismatch {
            src: src.elem_size,
            dst: dst.elem_size,
        });
    }
    let index = usize::try_from(i64::from(src.elem_size) - 1)
        .ok()
        .filter(|&i| i < COPY_FUNCS.len())
        .ok_or(LayoutError::InvalidElemSize {
            elem_size: src.elem_size,
        })?;
    COPY_FUNCS[index](src, dst)
}
