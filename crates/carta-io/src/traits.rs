//! Reader interface shared by all codecs.

use crate::IoResult;
use carta_core::RgbaBuffer;

/// An opened image whose geometry is known and whose pixels can be copied
/// into an [`RgbaBuffer`].
///
/// Readers are `Send` so they can be created and drained on worker threads.
pub trait ImageReader: Send {
    /// Source image width.
    fn width(&self) -> u32;

    /// Source image height.
    fn height(&self) -> u32;

    /// Copies the source region whose top-left corner is `(x0, y0)` into
    /// `dst`, clipped to both the source and `dst` bounds.
    fn read(&mut self, x0: u32, y0: u32, dst: &mut RgbaBuffer) -> IoResult<()>;
}

/// Reader over an image already decoded to 8-bit RGBA.
///
/// Both codecs decode eagerly when opened so that a reader that was created
/// successfully can always be read.
#[derive(Debug, Clone)]
pub(crate) struct DecodedReader {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl DecodedReader {
    pub(crate) fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        debug_assert_eq!(rgba.len(), width as usize * height as usize * 4);
        Self { width, height, rgba }
    }
}

impl ImageReader for DecodedReader {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn read(&mut self, x0: u32, y0: u32, dst: &mut RgbaBuffer) -> IoResult<()> {
        let cols = self.width.saturating_sub(x0).min(dst.width()) as usize;
        let rows = self.height.saturating_sub(y0).min(dst.height());
        let src_stride = self.width as usize * 4;
        for y in 0..rows {
            let start = (y0 + y) as usize * src_stride + x0 as usize * 4;
            let src = &self.rgba[start..start + cols * 4];
            let row = dst.row_mut(y);
            for (word, px) in row.iter_mut().zip(src.chunks_exact(4)) {
                *word = u32::from_le_bytes([px[0], px[1], px[2], px[3]]);
            }
        }
        Ok(())
    }
}
