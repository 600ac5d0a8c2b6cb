use std::fmt;

use crate::parser::{ColorTable, DisposalMethod};

/// RGBA8 pixels covering the whole logical screen, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Bitmap {
    /// A fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba(&self) -> &[u8] {
        &self.data
    }

    /// Panics if `(x, y)` is outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let at = self.offset(x, y);
        [self.data[at], self.data[at + 1], self.data[at + 2], self.data[at + 3]]
    }

    pub(crate) fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let at = self.offset(x, y);
        self.data[at..at + 4].copy_from_slice(&rgba);
    }

    /// Clears a rectangle to transparent, clipped to the bitmap.
    pub(crate) fn clear_rect(&mut self, left: u32, top: u32, width: u32, height: u32) {
        let right = (left + width).min(self.width);
        let bottom = (top + height).min(self.height);
        if left >= right {
            return;
        }
        for y in top..bottom {
            let start = self.offset(left, y);
            let end = self.offset(right - 1, y) + 4;
            self.data[start..end].fill(0);
        }
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) is outside {}x{}", self.width, self.height);
        (y as usize * self.width as usize + x as usize) * 4
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitmap({}x{})", self.width, self.height)
    }
}

/// One decoded image of the animation.
///
/// `image` is already composited with everything drawn before it and can be shown on its
/// own.
#[derive(Debug, Clone)]
pub struct Frame {
    pub disposal_method: DisposalMethod,
    /// Start time in milliseconds, the sum of every earlier delay.
    pub time: u64,
    /// Display time in milliseconds.
    pub delay: u32,
    pub transparency_index: Option<u8>,
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub local_color_table: Option<ColorTable>,
    pub interlaced: bool,
    pub image: Bitmap,
}

impl Frame {
    pub fn end_time(&self) -> u64 {
        self.time + u64::from(self.delay)
    }
}
