use crate::{BLACK, CHAIN_CAPACITY, Error, Result};
use core::ops::Range;
use heapless::Vec;
use smart_leds::RGB8;

/// Pushes a whole pixel buffer out to one physical chain.
///
/// A write takes at least as long as the wire protocol needs for every pixel, so it bounds the
/// frame rate of everything sharing the chain.
pub trait ChainWriter {
    async fn write(&mut self, pixels: &[RGB8]) -> Result<()>;
}

/// One physical chain: its fixed-length pixel buffer and the writer that drives it
pub struct Chain<W> {
    id: usize,
    pixels: Vec<RGB8, CHAIN_CAPACITY>,
    writer: W,
}

impl<W: ChainWriter> Chain<W> {
    /// A black chain of `len` pixels. `len` is clamped to the buffer capacity
    pub fn new(id: usize, len: usize, writer: W) -> Self {
        let mut pixels = Vec::new();
        // Cannot fail, `len` is clamped
        let _ = pixels.resize(len.min(CHAIN_CAPACITY), BLACK);
        Self { id, pixels, writer }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn set_pixel(&mut self, offset: usize, colour: RGB8) {
        if let Some(pixel) = self.pixels.get_mut(offset) {
            *pixel = colour;
        }
    }

    /// The pixels of `range`, clipped to the chain
    pub fn segment_mut(&mut self, range: Range<usize>) -> &mut [RGB8] {
        let end = range.end.min(self.pixels.len());
        let start = range.start.min(end);
        &mut self.pixels[start..end]
    }

    /// Push the whole buffer to the hardware
    pub async fn flush(&mut self) -> Result<()> {
        self.writer
            .write(&self.pixels)
            .await
            .map_err(|_| Error::ChainWrite { chain: self.id })
    }

    /// Turn every pixel off and flush
    pub async fn blackout(&mut self) -> Result<()> {
        self.pixels.fill(BLACK);
        self.flush().await
    }
}
