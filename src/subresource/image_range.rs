//! Per-`(aspect, mip)` byte-layout metadata and the generator that turns a
//! 2D/3D sub-region of one subresource into byte ranges.

use crate::containers::{Range, RangeMap, SmallRangeMap};
use crate::error::CoreError;

use super::encoder::{canonical_aspect_params, AspectMask, AspectParameters};

/// Byte layout of one `(aspect, mip)` level across every layer/depth-slice
/// it spans.
#[derive(Clone, Copy, Debug)]
pub struct SubresourceLayout {
    pub offset: u64,
    pub size: u64,
    pub row_pitch: u64,
    /// Bytes between consecutive depth slices of a 3D image, or between
    /// consecutive array layers of a 2D array image.
    pub plane_pitch: u64,
    /// Stride the generator advances by for one `y` step. Distinct from
    /// `row_pitch` in name only for uncompressed formats; kept as its own
    /// field because it is what `ImageRangeGenerator` actually increments
    /// by, mirroring the source's separate incrementer state rather than
    /// re-deriving it from the static layout on every step.
    pub y_step_pitch: u64,
    /// Stride the generator advances by for one `z`/layer step.
    pub z_step_pitch: u64,
    /// Total bytes spanned by this subresource across every layer or depth
    /// slice it covers; equals `size` under this encoder's tightly-packed
    /// layout, exposed separately since the source derives it from the
    /// step pitches rather than from the static `VkSubresourceLayout`.
    pub layer_span: u64,
}

/// Static description of an image's addressing, independent of any
/// particular sub-region query.
#[derive(Clone, Copy, Debug)]
pub struct ImageDescription {
    pub aspect_mask: AspectMask,
    pub mip_count: u32,
    pub layer_count: u32,
    /// Width/height/depth at mip 0. `depth` is 1 for non-3D images.
    pub extent: (u32, u32, u32),
    pub texel_size: f64,
    /// Compressed-format block footprint; `(1, 1, 1)` for uncompressed.
    pub texel_block_extent: (u32, u32, u32),
    pub is_3d: bool,
    /// When `is_3d`, treat a region query's `layer` argument as a depth-slice
    /// base added to `z` rather than ignored, the way a 2D array image's
    /// `layer` is used. Lets a 3D image be walked as if it were a 2D array
    /// of its depth slices.
    pub is_depth_sliced: bool,
}

fn div_round_up(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

fn mip_extent((w, h, d): (u32, u32, u32), mip: u32, is_3d: bool) -> (u32, u32, u32) {
    let mw = (w >> mip).max(1);
    let mh = (h >> mip).max(1);
    let md = if is_3d { (d >> mip).max(1) } else { d };
    (mw, mh, md)
}

/// Computes byte layouts for every `(aspect, mip)` pair of an image and
/// answers sub-region-to-byte-range queries against them.
#[derive(Clone, Debug)]
pub struct ImageRangeEncoder {
    params: AspectParameters,
    mip_count: u32,
    layer_count: u32,
    extent: (u32, u32, u32),
    texel_size: f64,
    texel_block_extent: (u32, u32, u32),
    is_3d: bool,
    is_depth_sliced: bool,
    is_compressed: bool,
    y_interleave: bool,
    layouts: Vec<SubresourceLayout>,
}

impl ImageRangeEncoder {
    pub fn new(desc: ImageDescription) -> Result<Self, CoreError> {
        let params = canonical_aspect_params(desc.aspect_mask).ok_or(CoreError::UnsupportedAspectMask {
            mask: desc.aspect_mask.bits(),
        })?;
        if desc.mip_count == 0 || desc.layer_count == 0 || params.aspect_count() == 0 {
            return Err(CoreError::DegenerateLimits {
                aspect_count: params.aspect_count(),
                mip_count: desc.mip_count,
                layer_count: desc.layer_count,
            });
        }

        let is_compressed = desc.texel_block_extent != (1, 1, 1);
        // Block-compressed rows pack several texel rows into one addressable
        // row, so the generator's y-step interleaves block rows rather than
        // walking one texel row at a time.
        let y_interleave = is_compressed;

        let mut layouts = Vec::with_capacity((params.aspect_count() * desc.mip_count) as usize);
        let mut offset = 0u64;
        for _aspect in 0..params.aspect_count() {
            for mip in 0..desc.mip_count {
                let (w, h, d) = mip_extent(desc.extent, mip, desc.is_3d);
                let (bw, bh, _bd) = desc.texel_block_extent;
                let blocks_w = div_round_up(w, bw.max(1));
                let blocks_h = div_round_up(h, bh.max(1));
                let row_pitch = (blocks_w as f64 * desc.texel_size).ceil() as u64;
                let plane_pitch = row_pitch * blocks_h as u64;
                let planes = if desc.is_3d { d } else { desc.layer_count };
                let size = plane_pitch * planes as u64;
                layouts.push(SubresourceLayout {
                    offset,
                    size,
                    row_pitch,
                    plane_pitch,
                    y_step_pitch: row_pitch,
                    z_step_pitch: plane_pitch,
                    layer_span: size,
                });
                offset += size;
            }
        }

        Ok(ImageRangeEncoder {
            params,
            mip_count: desc.mip_count,
            layer_count: desc.layer_count,
            extent: desc.extent,
            texel_size: desc.texel_size,
            texel_block_extent: desc.texel_block_extent,
            is_3d: desc.is_3d,
            is_depth_sliced: desc.is_depth_sliced,
            is_compressed,
            y_interleave,
            layouts,
        })
    }

    pub fn total_size(&self) -> u64 {
        self.layouts.last().map(|l| l.offset + l.size).unwrap_or(0)
    }

    pub fn layout(&self, aspect_index: u32, mip: u32) -> &SubresourceLayout {
        &self.layouts[(aspect_index * self.mip_count + mip) as usize]
    }

    pub fn is_compressed(&self) -> bool {
        self.is_compressed
    }

    /// Whether the generator's `y` step interleaves block rows rather than
    /// individual texel rows.
    pub fn y_interleave(&self) -> bool {
        self.y_interleave
    }

    pub fn is_depth_sliced(&self) -> bool {
        self.is_depth_sliced
    }

    /// Byte ranges covering `extent` texels starting at `offset` within
    /// subresource `(aspect_index, mip)`, `layer` selecting the array layer
    /// (2D images) or depth-slice base (3D images).
    pub fn sub_region_ranges(
        &self,
        aspect_index: u32,
        mip: u32,
        layer: u32,
        offset: (u32, u32, u32),
        extent: (u32, u32, u32),
    ) -> ImageRangeGenerator<'_> {
        ImageRangeGenerator::new(self, aspect_index, mip, layer, offset, extent)
    }
}

/// Walks the rows (and, for 3D images, depth slices) of a sub-region,
/// yielding the minimal set of contiguous byte ranges that cover it. A row
/// is always contiguous by construction; rows and slices are greedily
/// merged with their successor when there is no padding between them, which
/// is what collapses a full-width or full-extent region down to one range
/// without needing a distinct code path per addressing case.
pub struct ImageRangeGenerator<'a> {
    encoder: &'a ImageRangeEncoder,
    layout: SubresourceLayout,
    base_x: u32,
    width: u32,
    y0: u32,
    y1: u32,
    y: u32,
    z1: u32,
    z: u32,
    base_layer: u32,
    pending: Option<Range<u64>>,
}

impl<'a> ImageRangeGenerator<'a> {
    fn new(
        encoder: &'a ImageRangeEncoder,
        aspect_index: u32,
        mip: u32,
        layer: u32,
        offset: (u32, u32, u32),
        extent: (u32, u32, u32),
    ) -> Self {
        let layout = *encoder.layout(aspect_index, mip);
        let (bw, bh, _) = encoder.texel_block_extent;
        let y0 = offset.1 / bh.max(1);
        let y1 = y0 + div_round_up(extent.1, bh.max(1));
        ImageRangeGenerator {
            encoder,
            layout,
            base_x: offset.0 / bw.max(1),
            width: div_round_up(extent.0, bw.max(1)),
            y0,
            y1,
            y: y0,
            z1: offset.2 + extent.2,
            z: offset.2,
            base_layer: layer,
            pending: None,
        }
    }

    fn row_range(&self, y: u32, z: u32) -> Range<u64> {
        // A depth-sliced 3D image addresses its depth slices the way a 2D
        // array image addresses layers (`base_layer + z`); a plain 3D image
        // addresses them directly by `z`, per `Convert2DCompatibleTo3D` in
        // the source this generator is modeled on.
        let plane_index = if self.encoder.is_3d && !self.encoder.is_depth_sliced {
            z
        } else {
            self.base_layer + z
        };
        let row_start = self.layout.offset
            + plane_index as u64 * self.layout.z_step_pitch
            + y as u64 * self.layout.y_step_pitch
            + (self.base_x as f64 * self.encoder.texel_size) as u64;
        let row_len = ((self.width as f64) * self.encoder.texel_size).ceil() as u64;
        Range::new(row_start, row_start + row_len)
    }

    fn next_raw(&mut self) -> Option<Range<u64>> {
        if self.z >= self.z1 || self.width == 0 || self.y0 >= self.y1 {
            return None;
        }
        let range = self.row_range(self.y, self.z);
        self.y += 1;
        if self.y >= self.y1 {
            self.y = self.y0;
            self.z += 1;
        }
        Some(range)
    }
}

impl<'a> Iterator for ImageRangeGenerator<'a> {
    type Item = Range<u64>;

    fn next(&mut self) -> Option<Range<u64>> {
        let mut current = self.pending.take().or_else(|| self.next_raw())?;
        loop {
            match self.next_raw() {
                Some(next) if current.is_prior_to(&next) => current.end = next.end,
                Some(next) => {
                    self.pending = Some(next);
                    break;
                }
                None => break,
            }
        }
        Some(current)
    }
}

/// Per-subresource span storage, dispatching between the array-backed and
/// tree-backed range maps by subresource count the way the source picks
/// between its two representations at construction time.
pub enum SubresourceSpans<V, const N: usize> {
    Small(SmallRangeMap<u64, V, N>),
    Big(RangeMap<u64, V>),
}

impl<V: Clone, const N: usize> SubresourceSpans<V, N> {
    pub fn new(subresource_count: u64) -> Self {
        if subresource_count as usize <= N {
            SubresourceSpans::Small(SmallRangeMap::new(subresource_count as usize))
        } else {
            SubresourceSpans::Big(RangeMap::new())
        }
    }

    pub fn find(&self, index: u64) -> Option<&V> {
        match self {
            SubresourceSpans::Small(m) => m.find(index).map(|(_, v)| v),
            SubresourceSpans::Big(m) => m.find(index).map(|(_, v)| v),
        }
    }

    pub fn insert(&mut self, key: Range<u64>, value: V) {
        match self {
            SubresourceSpans::Small(m) => {
                m.emplace(key, value);
            }
            SubresourceSpans::Big(m) => {
                m.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder_2d_uncompressed() -> ImageRangeEncoder {
        ImageRangeEncoder::new(ImageDescription {
            aspect_mask: AspectMask::COLOR,
            mip_count: 1,
            layer_count: 2,
            extent: (4, 2, 1),
            texel_size: 4.0,
            texel_block_extent: (1, 1, 1),
            is_3d: false,
            is_depth_sliced: false,
        })
        .unwrap()
    }

    #[test]
    fn full_row_region_is_one_range_per_row() {
        let enc = encoder_2d_uncompressed();
        let ranges: Vec<Range<u64>> = enc.sub_region_ranges(0, 0, 0, (0, 0, 0), (4, 1, 1)).collect();
        assert_eq!(ranges, vec![Range::new(0, 16)]);
    }

    #[test]
    fn full_extent_region_merges_into_single_range() {
        let enc = encoder_2d_uncompressed();
        let ranges: Vec<Range<u64>> = enc.sub_region_ranges(0, 0, 0, (0, 0, 0), (4, 2, 1)).collect();
        assert_eq!(ranges, vec![Range::new(0, 32)]);
    }

    #[test]
    fn partial_row_region_does_not_merge_across_rows() {
        let enc = encoder_2d_uncompressed();
        let ranges: Vec<Range<u64>> = enc.sub_region_ranges(0, 0, 0, (0, 0, 0), (2, 2, 1)).collect();
        assert_eq!(ranges, vec![Range::new(0, 8), Range::new(16, 24)]);
    }

    #[test]
    fn layer_selects_the_right_plane() {
        let enc = encoder_2d_uncompressed();
        let ranges: Vec<Range<u64>> = enc.sub_region_ranges(0, 0, 1, (0, 0, 0), (4, 1, 1)).collect();
        assert_eq!(ranges, vec![Range::new(32, 48)]);
    }

    #[test]
    fn mip_levels_get_disjoint_layouts() {
        let enc = ImageRangeEncoder::new(ImageDescription {
            aspect_mask: AspectMask::COLOR,
            mip_count: 2,
            layer_count: 1,
            extent: (4, 4, 1),
            texel_size: 4.0,
            texel_block_extent: (1, 1, 1),
            is_3d: false,
            is_depth_sliced: false,
        })
        .unwrap();
        let l0 = enc.layout(0, 0);
        let l1 = enc.layout(0, 1);
        assert_eq!(l0.offset, 0);
        assert_eq!(l0.size, 64);
        assert_eq!(l1.offset, 64);
        assert_eq!(l1.size, 16);
    }

    #[test]
    fn compressed_format_reports_interleave() {
        let enc = ImageRangeEncoder::new(ImageDescription {
            aspect_mask: AspectMask::COLOR,
            mip_count: 1,
            layer_count: 1,
            extent: (8, 8, 1),
            texel_size: 16.0,
            texel_block_extent: (4, 4, 1),
            is_3d: false,
            is_depth_sliced: false,
        })
        .unwrap();
        assert!(enc.is_compressed());
        assert!(enc.y_interleave());
        assert!(!encoder_2d_uncompressed().is_compressed());
        assert!(!encoder_2d_uncompressed().y_interleave());
    }

    #[test]
    fn depth_sliced_3d_image_addresses_z_like_a_layer() {
        let enc = ImageRangeEncoder::new(ImageDescription {
            aspect_mask: AspectMask::COLOR,
            mip_count: 1,
            layer_count: 1,
            extent: (4, 1, 4),
            texel_size: 4.0,
            texel_block_extent: (1, 1, 1),
            is_3d: true,
            is_depth_sliced: true,
        })
        .unwrap();
        assert!(enc.is_depth_sliced());

        // layer=2 is added to z for every step, so a single-slice region at
        // z=0 lands on the plane at z_step_pitch * 2, not at offset 0 as a
        // plain (non-depth-sliced) 3D image would.
        let ranges: Vec<Range<u64>> = enc.sub_region_ranges(0, 0, 2, (0, 0, 0), (4, 1, 1)).collect();
        assert_eq!(ranges, vec![Range::new(32, 48)]);
    }

    #[test]
    fn plain_3d_image_ignores_layer_and_addresses_z_directly() {
        let enc = ImageRangeEncoder::new(ImageDescription {
            aspect_mask: AspectMask::COLOR,
            mip_count: 1,
            layer_count: 1,
            extent: (4, 1, 4),
            texel_size: 4.0,
            texel_block_extent: (1, 1, 1),
            is_3d: true,
            is_depth_sliced: false,
        })
        .unwrap();
        assert!(!enc.is_depth_sliced());

        // layer=2 is ignored; the region at z=0 still lands at offset 0.
        let ranges: Vec<Range<u64>> = enc.sub_region_ranges(0, 0, 2, (0, 0, 0), (4, 1, 1)).collect();
        assert_eq!(ranges, vec![Range::new(0, 16)]);
    }
}
