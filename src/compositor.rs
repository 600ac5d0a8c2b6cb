//! Turns decoded pixel indices into finished, standalone frames.

use log::debug;

use crate::frame::{Bitmap, Frame};
use crate::options::DisposalMode;
use crate::parser::{ColorTable, DisposalMethod};

// (first row, row step) for each of the four interlace passes
const INTERLACE_PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Placement and control data of the image being composited.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ImageBlock {
    pub(crate) left: u16,
    pub(crate) top: u16,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) interlaced: bool,
    pub(crate) transparency: Option<u8>,
    pub(crate) disposal_method: DisposalMethod,
}

pub(crate) struct Compositor {
    mode: DisposalMode,
    screen_width: u32,
    screen_height: u32,
    deinterlaced: Vec<u8>,
    // canvas the last frame was drawn over, kept only when that frame restores to previous
    restore_base: Option<Bitmap>,
}

impl Compositor {
    pub(crate) fn new(mode: DisposalMode) -> Self {
        Self {
            mode,
            screen_width: 0,
            screen_height: 0,
            deinterlaced: Vec::new(),
            restore_base: None,
        }
    }

    pub(crate) fn set_screen(&mut self, width: u16, height: u16) {
        self.screen_width = width.into();
        self.screen_height = height.into();
    }

    /// Composites `pixels` (one palette index per pixel of `image`) over `previous`.
    pub(crate) fn composite(
        &mut self,
        image: &ImageBlock,
        pixels: &[u8],
        color_table: &ColorTable,
        previous: Option<&Frame>,
    ) -> Bitmap {
        let pixels = if image.interlaced {
            deinterlace(pixels, image.width.into(), &mut self.deinterlaced);
            &self.deinterlaced[..]
        } else {
            pixels
        };

        let blank = || Bitmap::new(self.screen_width, self.screen_height);

        let (mut canvas, clear_transparent) = match self.mode {
            DisposalMode::Simplified => match previous {
                Some(frame) if frame.disposal_method.is_restore() => (blank(), true),
                Some(frame) => (frame.image.clone(), false),
                None => (blank(), false),
            },
            DisposalMode::Conformant => {
                let canvas = match previous {
                    Some(frame) => match frame.disposal_method {
                        DisposalMethod::RestoreBackground => {
                            let mut canvas = frame.image.clone();
                            canvas.clear_rect(
                                frame.left.into(),
                                frame.top.into(),
                                frame.width.into(),
                                frame.height.into(),
                            );
                            canvas
                        }
                        DisposalMethod::RestorePrevious => {
                            self.restore_base.take().unwrap_or_else(blank)
                        }
                        DisposalMethod::None | DisposalMethod::Keep => frame.image.clone(),
                    },
                    None => blank(),
                };
                self.restore_base = (image.disposal_method == DisposalMethod::RestorePrevious)
                    .then(|| canvas.clone());
                (canvas, false)
            }
        };

        debug!(
            "compositing {}x{} at ({}, {}) over {}",
            image.width,
            image.height,
            image.left,
            image.top,
            if clear_transparent { "a blank canvas" } else { "the previous frame" }
        );
        draw(&mut canvas, image, pixels, color_table, clear_transparent);
        canvas
    }
}

/// Puts the rows of an interlaced image back in top to bottom order.
///
/// `out` is only reallocated when the pixel count changes.
pub(crate) fn deinterlace(pixels: &[u8], width: usize, out: &mut Vec<u8>) {
    if out.len() != pixels.len() {
        *out = vec![0; pixels.len()];
    }
    if width == 0 {
        return;
    }
    let height = pixels.len() / width;
    let mut rows = pixels.chunks_exact(width);
    for (first_row, step) in INTERLACE_PASSES {
        for row in (first_row..height).step_by(step) {
            let Some(source) = rows.next() else {
                return;
            };
            out[row * width..(row + 1) * width].copy_from_slice(source);
        }
    }
}

fn draw(
    canvas: &mut Bitmap,
    image: &ImageBlock,
    pixels: &[u8],
    color_table: &ColorTable,
    clear_transparent: bool,
) {
    let width = image.width as usize;
    if width == 0 {
        return;
    }
    for (y, row) in pixels.chunks_exact(width).enumerate() {
        let canvas_y = image.top as u32 + y as u32;
        if canvas_y >= canvas.height() {
            break;
        }
        for (x, &index) in row.iter().enumerate() {
            let canvas_x = image.left as u32 + x as u32;
            if canvas_x >= canvas.width() {
                break;
            }
            if image.transparency == Some(index) {
                if clear_transparent {
                    canvas.set_pixel(canvas_x, canvas_y, [0; 4]);
                }
                continue;
            }
            let [r, g, b] = color_table.resolve(index);
            canvas.set_pixel(canvas_x, canvas_y, [r, g, b, 255]);
        }
    }
}
