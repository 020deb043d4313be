//! Multi-dimensional buffer descriptors.

use crate::errors::{LayoutError, LayoutResult};

/// Maximum number of dimensions a buffer descriptor can describe.
pub const MAX_DIMENSIONS: usize = 4;

/// Shape and storage of one buffer argument.
///
/// A stride of zero means "unconstrained / not yet decided", never a real
/// zero stride. `host` is `None` when the buffer carries no data, which is how
/// a bounds query is presented to a kernel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferDescriptor {
    /// Opaque device-side handle; always zero in this runtime.
    pub dev: u64,
    pub host: Option<Vec<u8>>,
    pub extent: [i32; MAX_DIMENSIONS],
    pub stride: [i32; MAX_DIMENSIONS],
    pub min: [i32; MAX_DIMENSIONS],
    /// Bytes per element.
    pub elem_size: i32,
}

impl BufferDescriptor {
    /// Creates a densely packed planar buffer with zeroed storage.
    pub fn planar(extent: [i32; MAX_DIMENSIONS], elem_size: i32) -> LayoutResult<Self> {
        let mut stride = [0; MAX_DIMENSIONS];
        let mut step: i32 = 1;
        for i in 0..MAX_DIMENSIONS {
            if extent[i] == 0 {
                break;
            }
            stride[i] = step;
            step = step
                .checked_mul(extent[i])
                .ok_or(LayoutError::SizeOverflow)?;
        }
        let mut buf = Self {
            extent,
            stride,
            elem_size,
            ..Self::default()
        };
        let bytes = buf.byte_len(MAX_DIMENSIONS)?;
        buf.host = Some(allocate_storage(bytes)?);
        Ok(buf)
    }

    /// Returns a copy of the shape fields with no host storage and a zeroed device handle.
    pub fn without_host(&self) -> Self {
        Self {
            dev: 0,
            host: None,
            extent: self.extent,
            stride: self.stride,
            min: self.min,
            elem_size: self.elem_size,
        }
    }

    pub fn host(&self) -> Option<&[u8]> {
        self.host.as_deref()
    }

    pub fn host_mut(&mut self) -> Option<&mut [u8]> {
        self.host.as_deref_mut()
    }

    /// Number of elements spanned by the first `dimensions` dimensions.
    ///
    /// This follows the strides rather than the product of extents, so rows
    /// padded beyond their extent are accounted for. Negative strides are
    /// rejected; empty dimensions contribute nothing.
    pub fn max_elem_count(&self, dimensions: usize) -> LayoutResult<usize> {
        let mut count: i64 = 1;
        for i in 0..dimensions.min(MAX_DIMENSIONS) {
            let stride = self.stride[i];
            if stride < 0 {
                return Err(LayoutError::NegativeStride {
                    dimension: i,
                    stride,
                });
            }
            let span = (self.extent[i].max(1) as i64 - 1) * stride as i64;
            count = count.checked_add(span).ok_or(LayoutError::SizeOverflow)?;
        }
        usize::try_from(count).map_err(|_| LayoutError::SizeOverflow)
    }

    /// Number of bytes spanned by the first `dimensions` dimensions.
    pub fn byte_len(&self, dimensions: usize) -> LayoutResult<usize> {
        let elem_size =
            usize::try_from(self.elem_size).map_err(|_| LayoutError::InvalidElemSize {
                elem_size: self.elem_size,
            })?;
        self.max_elem_count(dimensions)?
            .checked_mul(elem_size)
            .ok_or(LayoutError::SizeOverflow)
    }

    /// Returns true if the absolute coordinate lies inside the buffer's region.
    pub fn contains(&self, coord: &[i32]) -> bool {
        coord
            .iter()
            .enumerate()
            .take(MAX_DIMENSIONS)
            .all(|(i, &c)| {
                let c = i64::from(c);
                let min = i64::from(self.min[i]);
                c >= min && c < min + i64::from(self.extent[i])
            })
    }

    /// Element offset of an absolute coordinate, or `None` if it falls outside the region.
    pub fn element_offset(&self, coord: &[i32]) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let mut offset: i64 = 0;
        for (i, &c) in coord.iter().enumerate().take(MAX_DIMENSIONS) {
            let step = (i64::from(c) - i64::from(self.min[i]))
                .checked_mul(i64::from(self.stride[i]))?;
            offset = offset.checked_add(step)?;
        }
        usize::try_from(offset).ok()
    }

    /// Returns the same shape with zero extents and strides in every dimension raised to 1.
    ///
    /// Rank-reduced buffers then share the memory layout of a 4-D buffer whose
    /// trailing dimensions are singular.
    pub fn padded_4d(&self) -> Self {
        let mut padded = self.without_host();
        for i in 0..MAX_DIMENSIONS {
            if padded.extent[i] == 0 {
                padded.extent[i] = 1;
            }
            if padded.stride[i] == 0 {
                padded.stride[i] = 1;
            }
        }
        padded
    }
}

/// Allocates zeroed storage, reporting an allocation shortfall instead of aborting.
pub fn allocate_storage(bytes: usize) -> LayoutResult<Vec<u8>> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(bytes)
        .map_err(|_| LayoutError::AllocationFailed { bytes })?;
    storage.resize(bytes, 0);
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_elem_count_follows_strides() {
        let buf = BufferDescriptor {
            extent: [3, 2, 0, 0],
            stride: [1, 8, 0, 0],
            elem_size: 1,
            ..BufferDescriptor::default()
        };
        // Padded rows: 1 + 2 * 1 + 1 * 8
        assert_eq!(buf.max_elem_count(2).unwrap(), 11);
        assert_eq!(buf.byte_len(2).unwrap(), 11);
    }

    #[test]
    fn test_max_elem_count_rejects_negative_stride() {
        let buf = BufferDescriptor {
            extent: [3, 2, 0, 0],
            stride: [1, -3, 0, 0],
            elem_size: 1,
            ..BufferDescriptor::default()
        };
        assert!(matches!(
            buf.max_elem_count(2),
            Err(LayoutError::NegativeStride {
                dimension: 1,
                stride: -3
            })
        ));
    }

    #[test]
    fn test_planar_allocation() {
        let buf = BufferDescriptor::planar([4, 3, 2, 0], 2).unwrap();
        assert_eq!(buf.stride, [1, 4, 12, 0]);
        assert_eq!(buf.host().unwrap().len(), 4 * 3 * 2 * 2);
    }

    #[test]
    fn test_element_offset_respects_min() {
        let buf = BufferDescriptor {
            extent: [4, 4, 0, 0],
            stride: [1, 4, 0, 0],
            min: [10, 20, 0, 0],
            elem_size: 1,
            ..BufferDescriptor::default()
        };
        assert_eq!(buf.element_offset(&[11, 22]), Some(9));
        assert_eq!(buf.element_offset(&[9, 22]), None);
        assert_eq!(buf.element_offset(&[10, 24]), None);
    }

    #[test]
    fn test_extreme_min_and_extent_are_outside() {
        let buf = BufferDescriptor {
            extent: [i32::MAX, 1, 0, 0],
            stride: [1, 1, 0, 0],
            min: [i32::MAX, i32::MIN, 0, 0],
            elem_size: 1,
            ..BufferDescriptor::default()
        };
        assert!(buf.contains(&[i32::MAX, i32::MIN]));
        assert!(!buf.contains(&[i32::MIN, i32::MIN]));
        assert_eq!(buf.element_offset(&[i32::MAX, i32::MIN]), Some(0));
        assert_eq!(buf.element_offset(&[0, 0]), None);
    }

    #[test]
    fn test_planar_stride_overflow_is_reported() {
        assert!(matches!(
            BufferDescriptor::planar([100_000, 100_000, 1, 0], 1),
            Err(LayoutError::SizeOverflow)
        ));
    }

    #[test]
    fn test_without_host_drops_storage() {
        let mut buf = BufferDescriptor::planar([2, 2, 0, 0], 1).unwrap();
        buf.dev = 42;
        let shape = buf.without_host();
        assert!(shape.host.is_none());
        assert_eq!(shape.dev, 0);
        assert_eq!(shape.extent, buf.extent);
    }
}
