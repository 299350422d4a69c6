//! Maps logical segment indices onto (chain, offset, length).
//!
//! Segments are numbered across all chains in declaration order. Within a chain the offsets are a
//! running sum of the lengths before them, so the segments of a chain tile `[0, chain length)`
//! exactly, without gaps or overlaps.

use crate::{
    CHAIN_CAPACITY, Error, MAX_CHAINS, MAX_SEGMENTS, Result,
    config::{AnimationSpec, Config, SegmentConfig},
};
use core::ops::Range;
use heapless::Vec;

/// A contiguous, immutable range of one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    /// Index of the chain this segment lives on
    pub chain: usize,
    /// First pixel of the segment within its chain
    pub start: usize,
    /// Number of pixels
    pub len: usize,
}

impl Segment {
    /// The pixel range of the segment within its chain
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// Every segment of every chain, plus each segment's mode registry
pub struct SegmentMap {
    segments: Vec<Segment, MAX_SEGMENTS>,
    registries: Vec<&'static SegmentConfig, MAX_SEGMENTS>,
    chain_lens: Vec<usize, MAX_CHAINS>,
}

impl SegmentMap {
    /// Lay out the segments of `config` and check every registered animation.
    ///
    /// Calling this again builds a completely new map; any runners started against the old map
    /// must be stopped by the caller first.
    pub fn configure(config: &Config) -> Result<Self> {
        let mut segments = Vec::new();
        let mut registries = Vec::new();
        let mut chain_lens = Vec::new();

        for (chain, chain_config) in config.chains.iter().enumerate() {
            let mut start = 0;
            for segment_config in chain_config.segments {
                let segment = Segment {
                    chain,
                    start,
                    len: segment_config.len,
                };
                let index = segments.len();
                for (mode, spec) in segment_config.modes {
                    spec.validate(index, *mode)?;
                }
                let count = index + 1;
                segments
                    .push(segment)
                    .map_err(|_| Error::TooManySegments { count })?;
                registries
                    .push(segment_config)
                    .map_err(|_| Error::TooManySegments { count })?;
                start += segment_config.len;
            }
            if start > CHAIN_CAPACITY {
                return Err(Error::ChainTooLong {
                    chain,
                    pixels: start,
                });
            }
            chain_lens.push(start).map_err(|_| Error::TooManyChains {
                count: config.chains.len(),
            })?;
        }

        debug!(
            "SEGMENTS: {} segments over {} chains",
            segments.len(),
            chain_lens.len()
        );
        Ok(Self {
            segments,
            registries,
            chain_lens,
        })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> Result<Segment> {
        self.segments
            .get(index)
            .copied()
            .ok_or(Error::UnknownSegment { segment: index })
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Number of chains, and the pixel count each one has to be sized to
    pub fn chain_lens(&self) -> &[usize] {
        &self.chain_lens
    }

    /// The animation segment `index` runs for `mode`, if it has one registered
    pub fn animation_for(&self, index: usize, mode: char) -> Option<&AnimationSpec> {
        self.registries.get(index)?.animation_for(mode)
    }
}
