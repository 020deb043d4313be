//! Copy-image kernels used to reformat buffers between layouts.
//!
//! Each kernel walks every element of the destination region. Coordinates
//! inside the source region take the source element; anything outside it
//! (extra channels, wider rows) is filled with the "opaque" value for the
//! element type. Both buffers are treated as 4-D: unused dimensions are padded
//! to extent 1, which keeps their memory layout unchanged.

use std::ops::Range;

use crate::buffer::{BufferDescriptor, MAX_DIMENSIONS};
use crate::errors::{LayoutError, LayoutResult};

pub fn copy_image_uint8(src: &BufferDescriptor, dst: &mut BufferDescriptor) -> LayoutResult<()> {
    copy_image(src, dst, [u8::MAX])
}

pub fn copy_image_uint16(src: &BufferDescriptor, dst: &mut BufferDescriptor) -> LayoutResult<()> {
    copy_image(src, dst, bytemuck::cast::<u16, [u8; 2]>(u16::MAX))
}

/// Four-byte elements are assumed to be floats, so excess channels are filled with 1.0.
pub fn copy_image_float32(src: &BufferDescriptor, dst: &mut BufferDescriptor) -> LayoutResult<()> {
    copy_image(src, dst, bytemuck::cast::<f32, [u8; 4]>(1.0))
}

/// Coordinates `min..min + extent` of one dimension.
fn span(min: i32, extent: i32) -> LayoutResult<Range<i32>> {
    let end = min.checked_add(extent).ok_or(LayoutError::SizeOverflow)?;
    Ok(min..end)
}

fn copy_image<const N: usize>(
    src: &BufferDescriptor,
    dst: &mut BufferDescriptor,
    opaque: [u8; N],
) -> LayoutResult<()> {
    let src_shape = src.padded_4d();
    let dst_shape = dst.padded_4d();
    for (label, shape, host) in [
        ("source", &src_shape, src.host()),
        ("destination", &dst_shape, dst.host()),
    ] {
        if shape.elem_size as usize != N {
            return Err(LayoutError::InvalidElemSize {
                elem_size: shape.elem_size,
            });
        }
        let required = shape.byte_len(MAX_DIMENSIONS)?;
        let actual = host.map_or(0, <[u8]>::len);
        if host.is_some() && actual < required {
            return Err(LayoutError::HostTooSmall {
                label: label.to_string(),
                required,
                actual,
            });
        }
    }

    let src_host = src.host().ok_or_else(|| LayoutError::MissingHost {
        label: "source".to_string(),
    })?;
    let dst_host = dst.host_mut().ok_or_else(|| LayoutError::MissingHost {
        label: "destination".to_string(),
    })?;

    let out_of_range = |label: &str, offset: usize, len: usize| LayoutError::HostTooSmall {
        label: label.to_string(),
        required: offset + N,
        actual: len,
    };

    let [xs, ys, cs, ws] = [0, 1, 2, 3].map(|i| span(dst_shape.min[i], dst_shape.extent[i]));
    let (xs, ys, cs, ws) = (xs?, ys?, cs?, ws?);
    for w in ws {
        for c in cs.clone() {
            for y in ys.clone() {
                for x in xs.clone() {
                    let coord = [x, y, c, w];
                    let value = match src_shape.element_offset(&coord) {
                        Some(offset) => {
                            let start = offset * N;
                            src_host
                                .get(start..start + N)
                                .ok_or_else(|| out_of_range("source", start, src_host.len()))?
                        }
                        None => &opaque[..],
                    };
                    let start = dst_shape.element_offset(&coord).unwrap_or_default() * N;
                    let len = dst_host.len();
                    dst_host
                        .get_mut(start..start + N)
                        .ok_or_else(|| out_of_range("destination", start, len))?
                        .copy_from_slice(value);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interleaved_rgb(width: i32, height: i32, data: Vec<u8>) -> BufferDescriptor {
        BufferDescriptor {
            host: Some(data),
            extent: [width, height, 3, 1],
            stride: [3, 3 * width, 1, 1],
            elem_size: 1,
            ..BufferDescriptor::default()
        }
    }

    #[test]
    fn test_interleaved_to_planar() {
        let src = interleaved_rgb(2, 1, vec![1, 2, 3, 4, 5, 6]);
        let mut dst = BufferDescriptor::planar([2, 1, 3, 1], 1).unwrap();
        copy_image_uint8(&src, &mut dst).unwrap();
        assert_eq!(dst.host().unwrap(), &[1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_extra_destination_channels_are_opaque() {
        let src = interleaved_rgb(1, 1, vec![10, 20, 30]);
        let mut dst = BufferDescriptor {
            host: Some(vec![0; 4]),
            extent: [1, 1, 4, 1],
            stride: [4, 4, 1, 1],
            elem_size: 1,
            ..BufferDescriptor::default()
        };
        copy_image_uint8(&src, &mut dst).unwrap();
        assert_eq!(dst.host().unwrap(), &[10, 20, 30, 255]);
    }

    #[test]
    fn test_float_opaque_is_one() {
        let src = BufferDescriptor {
            host: Some(bytemuck::cast_slice::<f32, u8>(&[0.25]).to_vec()),
            extent: [1, 1, 1, 1],
            stride: [1, 1, 1, 1],
            elem_size: 4,
            ..BufferDescriptor::default()
        };
        let mut dst = BufferDescriptor::planar([1, 1, 2, 1], 4).unwrap();
        copy_image_float32(&src, &mut dst).unwrap();
        let host = dst.host().unwrap();
        let values: Vec<f32> = host
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(values, vec![0.25, 1.0]);
    }

    #[test]
    fn test_region_past_coordinate_range_is_rejected() {
        let src = interleaved_rgb(1, 1, vec![1, 2, 3]);
        let mut dst = BufferDescriptor::planar([2, 1, 1, 1], 1).unwrap();
        dst.min = [i32::MAX, 0, 0, 0];
        assert_eq!(
            copy_image_uint8(&src, &mut dst),
            Err(LayoutError::SizeOverflow)
        );
    }

    #[test]
    fn test_short_source_host_is_rejected() {
        let src = interleaved_rgb(2, 1, vec![1, 2, 3]);
        let mut dst = BufferDescriptor::planar([2, 1, 3, 1], 1).unwrap();
        assert!(matches!(
            copy_image_uint8(&src, &mut dst),
            Err(LayoutError::HostTooSmall { .. })
        ));
    }
}
