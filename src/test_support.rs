//! Fixture helpers: LZW encoding and a tiny GIF writer.

use std::collections::HashMap;

use weezl::{encode::Encoder, BitOrder};

const MAX_CODES: u16 = 4096;

/// Deterministic pseudo random numbers for fixtures.
pub(crate) struct Lcg(u64);

impl Lcg {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }
}

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    acc: u32,
    bits: u8,
}

impl BitWriter {
    fn write(&mut self, code: u16, size: u8) {
        self.acc |= (code as u32) << self.bits;
        self.bits += size;
        while self.bits >= 8 {
            self.bytes.push(self.acc as u8);
            self.acc >>= 8;
            self.bits -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.bytes.push(self.acc as u8);
        }
        self.bytes
    }
}

/// GIF-flavoured LZW, as written by `weezl`.
pub(crate) fn lzw_encode(min_code_size: u8, pixels: &[u8]) -> Vec<u8> {
    Encoder::new(BitOrder::Lsb, min_code_size)
        .encode(pixels)
        .unwrap()
}

/// Encodes each segment with a fresh table, separated by clear codes. `weezl` only clears
/// when its table fills up, so streams with an early clear are written by hand.
pub(crate) fn lzw_encode_segments(min_code_size: u8, segments: &[&[u8]]) -> Vec<u8> {
    let clear_code = 1u16 << min_code_size;
    let end_code = clear_code + 1;
    let mut writer = BitWriter::default();
    let mut code_size = min_code_size + 1;
    let mut table: HashMap<(u16, u8), u16> = HashMap::new();

    for segment in segments {
        writer.write(clear_code, code_size);
        table.clear();
        let mut next = clear_code + 2;
        code_size = min_code_size + 1;

        let mut current: Option<u16> = None;
        for &k in segment.iter() {
            let Some(prefix) = current else {
                current = Some(k.into());
                continue;
            };
            if let Some(&code) = table.get(&(prefix, k)) {
                current = Some(code);
                continue;
            }
            writer.write(prefix, code_size);
            table.insert((prefix, k), next);
            next += 1;
            if next > 1 << code_size && code_size < 12 {
                code_size += 1;
            }
            current = Some(k.into());
            if next == MAX_CODES {
                writer.write(clear_code, code_size);
                table.clear();
                next = clear_code + 2;
                code_size = min_code_size + 1;
            }
        }
        if let Some(prefix) = current {
            writer.write(prefix, code_size);
            // the decoder adds an entry for this code too
            next += 1;
            if next > 1 << code_size && code_size < 12 {
                code_size += 1;
            }
        }
    }

    writer.write(end_code, code_size);
    writer.finish()
}

pub(crate) fn sub_blocks(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 255 + 2);
    for chunk in data.chunks(255) {
        out.push(chunk.len() as u8);
        out.extend_from_slice(chunk);
    }
    out.push(0);
    out
}

/// Reorders rows the way an interlaced GIF stores them.
pub(crate) fn interlace_rows(pixels: &[u8], width: usize) -> Vec<u8> {
    let height = pixels.len() / width;
    let mut out = Vec::with_capacity(pixels.len());
    for (offset, step) in [(0, 8), (4, 8), (2, 4), (1, 2)] {
        for row in (offset..height).step_by(step) {
            out.extend_from_slice(&pixels[row * width..(row + 1) * width]);
        }
    }
    out
}

fn encode_table(colors: &[[u8; 3]]) -> (u8, Vec<u8>) {
    let mut exponent = 0u8;
    while (2usize << exponent) < colors.len() {
        exponent += 1;
    }
    let mut bytes: Vec<u8> = colors.iter().flatten().copied().collect();
    bytes.resize(3 * (2usize << exponent), 0);
    (exponent, bytes)
}

pub(crate) struct ImageSpec<'a> {
    pub(crate) left: u16,
    pub(crate) top: u16,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) pixels: &'a [u8],
    pub(crate) interlaced: bool,
    pub(crate) local_table: Option<&'a [[u8; 3]]>,
}

impl<'a> ImageSpec<'a> {
    pub(crate) fn new(left: u16, top: u16, width: u16, height: u16, pixels: &'a [u8]) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            left,
            top,
            width,
            height,
            pixels,
            interlaced: false,
            local_table: None,
        }
    }

    pub(crate) fn interlaced(mut self) -> Self {
        self.interlaced = true;
        self
    }

    pub(crate) fn local_table(mut self, colors: &'a [[u8; 3]]) -> Self {
        self.local_table = Some(colors);
        self
    }
}

pub(crate) struct GifBuilder {
    bytes: Vec<u8>,
}

impl GifBuilder {
    pub(crate) fn new(width: u16, height: u16, global_table: Option<&[[u8; 3]]>) -> Self {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        match global_table {
            Some(colors) => {
                let (exponent, table) = encode_table(colors);
                bytes.extend_from_slice(&[0b1111_0000 | exponent, 0, 0]);
                bytes.extend_from_slice(&table);
            }
            None => bytes.extend_from_slice(&[0, 0, 0]),
        }
        Self { bytes }
    }

    pub(crate) fn graphic_control(mut self, disposal: u8, delay_cs: u16, transparency: Option<u8>) -> Self {
        let packed = (disposal << 2) | transparency.is_some() as u8;
        self.bytes.extend_from_slice(&[0x21, 0xf9, 4, packed]);
        self.bytes.extend_from_slice(&delay_cs.to_le_bytes());
        self.bytes.extend_from_slice(&[transparency.unwrap_or(0), 0]);
        self
    }

    pub(crate) fn comment(mut self, text: &str) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xfe]);
        self.bytes.extend_from_slice(&sub_blocks(text.as_bytes()));
        self
    }

    pub(crate) fn netscape_loop(mut self, count: u16) -> Self {
        self.bytes.extend_from_slice(&[0x21, 0xff, 11]);
        self.bytes.extend_from_slice(b"NETSCAPE2.0");
        self.bytes.extend_from_slice(&[3, 1]);
        self.bytes.extend_from_slice(&count.to_le_bytes());
        self.bytes.push(0);
        self
    }

    pub(crate) fn extension(mut self, label: u8, body: &[u8]) -> Self {
        self.bytes.extend_from_slice(&[0x21, label]);
        self.bytes.extend_from_slice(&sub_blocks(body));
        self
    }

    pub(crate) fn image(mut self, image: ImageSpec<'_>) -> Self {
        self.bytes.push(0x2c);
        for field in [image.left, image.top, image.width, image.height] {
            self.bytes.extend_from_slice(&field.to_le_bytes());
        }
        let mut packed = if image.interlaced { 0b0100_0000 } else { 0 };
        let local = image.local_table.map(encode_table);
        if let Some((exponent, _)) = &local {
            packed |= 0b1000_0000 | exponent;
        }
        self.bytes.push(packed);
        if let Some((_, table)) = &local {
            self.bytes.extend_from_slice(table);
        }

        let max_index = image.pixels.iter().copied().max().unwrap_or(0);
        let min_code_size = (8 - max_index.leading_zeros() as u8).max(2);
        let ordered = if image.interlaced {
            interlace_rows(image.pixels, image.width as usize)
        } else {
            image.pixels.to_vec()
        };
        self.bytes.push(min_code_size);
        self.bytes.extend_from_slice(&sub_blocks(&lzw_encode(min_code_size, &ordered)));
        self
    }

    pub(crate) fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub(crate) fn build(mut self) -> Vec<u8> {
        self.bytes.push(0x3b);
        self.bytes
    }

    pub(crate) fn build_without_trailer(self) -> Vec<u8> {
        self.bytes
    }
}

pub(crate) const RED: [u8; 3] = [255, 0, 0];
pub(crate) const GREEN: [u8; 3] = [0, 255, 0];
pub(crate) const BLUE: [u8; 3] = [0, 0, 255];
pub(crate) const WHITE: [u8; 3] = [255, 255, 255];
pub(crate) const PALETTE: [[u8; 3]; 4] = [RED, GREEN, BLUE, WHITE];

pub(crate) fn opaque(rgb: [u8; 3]) -> [u8; 4] {
    [rgb[0], rgb[1], rgb[2], 255]
}
