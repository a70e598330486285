//! Bijective `(aspect, mip, layer) <-> dense index` encoding, and the range
//! generator that walks a subresource region as index ranges.

use arrayvec::ArrayVec;
use bitflags::bitflags;
use once_cell::sync::Lazy;

use crate::containers::Range;
use crate::error::CoreError;
use crate::FastHashMap;

bitflags! {
    /// Which component families of an image a subresource coordinate can
    /// name. Mirrors the canonical `VkImageAspectFlagBits` combinations the
    /// core actually supports, not the full bitfield.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AspectMask: u32 {
        const COLOR = 0x1;
        const DEPTH = 0x2;
        const STENCIL = 0x4;
        const PLANE_0 = 0x10;
        const PLANE_1 = 0x20;
        const PLANE_2 = 0x40;
    }
}

/// Per supported aspect-mask combination: the ordered list of single-aspect
/// bits it decomposes into (at most 4).
#[derive(Clone, Debug)]
pub struct AspectParameters {
    bits: ArrayVec<AspectMask, 4>,
}

impl AspectParameters {
    fn of(bits: &[AspectMask]) -> Self {
        AspectParameters { bits: bits.iter().copied().collect() }
    }

    pub fn aspect_count(&self) -> u32 {
        self.bits.len() as u32
    }

    pub fn bit(&self, aspect_index: u32) -> AspectMask {
        self.bits[aspect_index as usize]
    }

    pub fn aspect_index(&self, bit: AspectMask) -> Option<u32> {
        self.bits.iter().position(|b| *b == bit).map(|i| i as u32)
    }
}

static ASPECT_TABLE: Lazy<FastHashMap<AspectMask, AspectParameters>> = Lazy::new(|| {
    use AspectMask as M;
    let mut t = FastHashMap::default();
    t.insert(M::COLOR, AspectParameters::of(&[M::COLOR]));
    t.insert(M::DEPTH, AspectParameters::of(&[M::DEPTH]));
    t.insert(M::STENCIL, AspectParameters::of(&[M::STENCIL]));
    t.insert(M::DEPTH | M::STENCIL, AspectParameters::of(&[M::DEPTH, M::STENCIL]));
    t.insert(M::PLANE_0 | M::PLANE_1, AspectParameters::of(&[M::PLANE_0, M::PLANE_1]));
    t.insert(
        M::PLANE_0 | M::PLANE_1 | M::PLANE_2,
        AspectParameters::of(&[M::PLANE_0, M::PLANE_1, M::PLANE_2]),
    );
    t
});

/// Looks up the canonical aspect decomposition for `mask`, if supported.
pub fn canonical_aspect_params(mask: AspectMask) -> Option<AspectParameters> {
    ASPECT_TABLE.get(&mask).cloned()
}

#[derive(Clone, Copy, Debug)]
pub struct Limits {
    pub mip_count: u32,
    pub layer_count: u32,
    pub aspect_mask: AspectMask,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subresource {
    pub aspect_mask_bit: AspectMask,
    pub aspect_index: u32,
    pub mip: u32,
    pub layer: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Form {
    /// Both mip and layer counts exceed 1: full `aspect*M*L + mip*L + layer`.
    Full,
    /// Layer count is 1: the layer term is always zero and elided.
    LayerLess,
    /// Mip count is 1: the mip term is always zero and elided.
    MipLess,
}

/// Encodes/decodes `(aspect, mip, layer)` against a dense `[0, aspect_count
/// * mip_count * layer_count)` index space. The specialization (full /
/// layer-less / mip-less) is chosen once at construction and dispatched
/// through `self.form` at every call, playing the role the source fills
/// with stored member-function pointers.
#[derive(Clone, Debug)]
pub struct RangeEncoder {
    limits: Limits,
    params: AspectParameters,
    aspect_base: ArrayVec<u64, 4>,
    form: Form,
}

impl RangeEncoder {
    pub fn new(limits: Limits) -> Result<Self, CoreError> {
        let params = canonical_aspect_params(limits.aspect_mask).ok_or(CoreError::UnsupportedAspectMask {
            mask: limits.aspect_mask.bits(),
        })?;
        if limits.mip_count == 0 || limits.layer_count == 0 || params.aspect_count() == 0 {
            return Err(CoreError::DegenerateLimits {
                aspect_count: params.aspect_count(),
                mip_count: limits.mip_count,
                layer_count: limits.layer_count,
            });
        }
        let form = match (limits.mip_count > 1, limits.layer_count > 1) {
            (true, true) => Form::Full,
            (true, false) => Form::LayerLess,
            (false, _) => Form::MipLess,
        };
        let per_aspect = match form {
            Form::Full => limits.mip_count as u64 * limits.layer_count as u64,
            Form::LayerLess => limits.mip_count as u64,
            Form::MipLess => limits.layer_count as u64,
        };
        let aspect_base = (0..params.aspect_count()).map(|i| i as u64 * per_aspect).collect();
        Ok(RangeEncoder { limits, params, aspect_base, form })
    }

    pub fn subresource_count(&self) -> u64 {
        self.params.aspect_count() as u64 * self.limits.mip_count as u64 * self.limits.layer_count as u64
    }

    pub fn params(&self) -> &AspectParameters {
        &self.params
    }

    pub fn encode(&self, subres: Subresource) -> u64 {
        let base = self.aspect_base[subres.aspect_index as usize];
        match self.form {
            Form::Full => base + subres.mip as u64 * self.limits.layer_count as u64 + subres.layer as u64,
            Form::LayerLess => base + subres.mip as u64,
            Form::MipLess => base + subres.layer as u64,
        }
    }

    pub fn decode(&self, index: u64) -> Subresource {
        let aspect_index = self.aspect_base.iter().rposition(|&b| b <= index).unwrap_or(0) as u32;
        let offset = index - self.aspect_base[aspect_index as usize];
        let (mip, layer) = match self.form {
            Form::Full => (offset / self.limits.layer_count as u64, offset % self.limits.layer_count as u64),
            Form::LayerLess => (offset, 0),
            Form::MipLess => (0, offset),
        };
        Subresource {
            aspect_mask_bit: self.params.bit(aspect_index),
            aspect_index,
            mip: mip as u32,
            layer: layer as u32,
        }
    }

    /// Aspect index of the lowest bit in `mask` also present in this
    /// encoder's aspect set, searching from the beginning.
    pub fn lower_bound_from_mask(&self, mask: AspectMask) -> u32 {
        self.lower_bound_from_mask_from(mask, 0)
    }

    /// As `lower_bound_from_mask`, but resumes searching at `start` (used to
    /// find the next aspect after the one just processed). Returns
    /// `aspect_count()` when there is none.
    pub fn lower_bound_from_mask_from(&self, mask: AspectMask, start: u32) -> u32 {
        for i in start..self.params.aspect_count() {
            if mask.contains(self.params.bit(i)) {
                return i;
            }
        }
        self.params.aspect_count()
    }
}

/// A subresource region: an aspect mask plus mip/layer base+count, as a
/// `VkImageSubresourceRange` carries.
#[derive(Clone, Copy, Debug)]
pub struct SubresourceRange {
    pub aspect_mask: AspectMask,
    pub base_mip: u32,
    pub mip_count: u32,
    pub base_layer: u32,
    pub layer_count: u32,
}

/// Walks every encoded subresource in a region, aspect-then-mip-then-layer,
/// yielding the minimal set of contiguous index ranges that cover it.
/// Finite, forward-only, non-restartable.
pub struct RangeGenerator<'a> {
    encoder: &'a RangeEncoder,
    range: SubresourceRange,
    aspect_index: u32,
    mip: u32,
    finished: bool,
    pending: Option<Range<u64>>,
}

impl<'a> RangeGenerator<'a> {
    pub fn new(encoder: &'a RangeEncoder, range: SubresourceRange) -> Self {
        let aspect_index = encoder.lower_bound_from_mask(range.aspect_mask);
        let finished = aspect_index >= encoder.params.aspect_count() || range.layer_count == 0 || range.mip_count == 0;
        RangeGenerator {
            encoder,
            range,
            aspect_index,
            mip: range.base_mip,
            finished,
            pending: None,
        }
    }

    fn next_raw(&mut self) -> Option<Range<u64>> {
        if self.finished {
            return None;
        }
        let aspect_bit = self.encoder.params.bit(self.aspect_index);
        let start = self.encoder.encode(Subresource {
            aspect_mask_bit: aspect_bit,
            aspect_index: self.aspect_index,
            mip: self.mip,
            layer: self.range.base_layer,
        });
        let result = Range::new(start, start + self.range.layer_count as u64);

        self.mip += 1;
        if self.mip >= self.range.base_mip + self.range.mip_count {
            self.mip = self.range.base_mip;
            self.aspect_index = self.encoder.lower_bound_from_mask_from(self.range.aspect_mask, self.aspect_index + 1);
            if self.aspect_index >= self.encoder.params.aspect_count() {
                self.finished = true;
            }
        }
        Some(result)
    }
}

impl<'a> Iterator for RangeGenerator<'a> {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn three_aspect_encoder() -> RangeEncoder {
        RangeEncoder::new(Limits {
            mip_count: 2,
            layer_count: 3,
            aspect_mask: AspectMask::PLANE_0 | AspectMask::PLANE_1 | AspectMask::PLANE_2,
        })
        .unwrap()
    }

    #[test]
    fn encode_decode_bijection_scenario() {
        let enc = three_aspect_encoder();
        assert_eq!(enc.subresource_count(), 18);
        let s = Subresource {
            aspect_mask_bit: AspectMask::PLANE_2,
            aspect_index: 2,
            mip: 1,
            layer: 2,
        };
        assert_eq!(enc.encode(s), 17);
        let decoded = enc.decode(13);
        assert_eq!(decoded.aspect_index, 2);
        assert_eq!(decoded.mip, 0);
        assert_eq!(decoded.layer, 1);
    }

    #[test]
    fn encode_decode_roundtrip_every_index() {
        let enc = three_aspect_encoder();
        for i in 0..enc.subresource_count() {
            let s = enc.decode(i);
            assert_eq!(enc.encode(s), i);
        }
    }

    #[test]
    fn unsupported_aspect_mask_is_rejected() {
        let err = RangeEncoder::new(Limits {
            mip_count: 2,
            layer_count: 4,
            aspect_mask: AspectMask::COLOR | AspectMask::DEPTH,
        });
        assert!(matches!(err, Err(CoreError::UnsupportedAspectMask { .. })));
    }

    #[test]
    fn range_generator_single_aspect_single_mip() {
        let enc = RangeEncoder::new(Limits {
            mip_count: 2,
            layer_count: 4,
            aspect_mask: AspectMask::DEPTH | AspectMask::STENCIL,
        })
        .unwrap();
        let range = SubresourceRange {
            aspect_mask: AspectMask::DEPTH,
            base_mip: 0,
            mip_count: 1,
            base_layer: 0,
            layer_count: 3,
        };
        let ranges: Vec<Range<u64>> = RangeGenerator::new(&enc, range).collect();
        assert_eq!(ranges, vec![Range::new(0, 3)]);
    }

    #[test]
    fn range_generator_merges_full_mip_run() {
        let enc = RangeEncoder::new(Limits {
            mip_count: 3,
            layer_count: 4,
            aspect_mask: AspectMask::COLOR,
        })
        .unwrap();
        let range = SubresourceRange {
            aspect_mask: AspectMask::COLOR,
            base_mip: 0,
            mip_count: 3,
            base_layer: 0,
            layer_count: 4,
        };
        let ranges: Vec<Range<u64>> = RangeGenerator::new(&enc, range).collect();
        assert_eq!(ranges, vec![Range::new(0, 12)]);
    }
}
