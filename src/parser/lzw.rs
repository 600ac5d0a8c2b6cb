use log::{debug, warn};

use super::bit_reader::BitReader;

pub(crate) const MAX_CODE_SIZE: u8 = 12;
const MAX_CODES: usize = 1 << MAX_CODE_SIZE;
// min code sizes above this leave no room for the clear and end codes
pub(crate) const MAX_MIN_CODE_SIZE: u8 = 11;

/// What happened while decompressing one image body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct LzwReport {
    /// Pixels written before the data ran out; the rest of the output is zeroed.
    pub(crate) written: usize,
    /// First code that pointed past the end of the code table, if any.
    pub(crate) invalid_code: Option<u16>,
    /// The stream held more pixels than the output has room for.
    pub(crate) overflowed: bool,
}

impl LzwReport {
    pub(crate) fn is_clean(&self, expected: usize) -> bool {
        self.written == expected && self.invalid_code.is_none() && !self.overflowed
    }
}

/// String table stored as prefix links, so a new entry costs one slot no matter how long
/// the string it stands for is.
struct CodeTable {
    prefix: Vec<u16>,
    suffix: Vec<u8>,
    first: Vec<u8>,
    length: Vec<u16>,
    next: usize,
    reset_to: usize,
}

impl CodeTable {
    fn new(minimum_code_size: u8) -> Self {
        let clear_code = 1usize << minimum_code_size;
        let mut table = Self {
            prefix: vec![0; MAX_CODES],
            suffix: vec![0; MAX_CODES],
            first: vec![0; MAX_CODES],
            length: vec![0; MAX_CODES],
            next: clear_code + 2,
            reset_to: clear_code + 2,
        };
        for code in 0..clear_code {
            table.suffix[code] = code as u8;
            table.first[code] = code as u8;
            table.length[code] = 1;
        }
        table
    }

    fn reset(&mut self) {
        self.next = self.reset_to;
    }

    fn contains(&self, code: u16) -> bool {
        (code as usize) < self.next && self.length[code as usize] > 0
    }

    fn is_full(&self) -> bool {
        self.next >= MAX_CODES
    }

    /// {CODE-1}+K
    fn push(&mut self, prefix: u16, k: u8) {
        let slot = self.next;
        self.prefix[slot] = prefix;
        self.suffix[slot] = k;
        self.first[slot] = self.first[prefix as usize];
        self.length[slot] = self.length[prefix as usize] + 1;
        self.next += 1;
    }

    /// Writes the string for `code` at `out[at..]`, returning how many pixels it stands for.
    /// Pixels that would land past the end of `out` are dropped.
    fn write(&self, code: u16, out: &mut [u8], at: usize) -> usize {
        let length = self.length[code as usize] as usize;
        let mut code = code as usize;
        // strings are stored back to front, walk the prefix chain from the last pixel
        for offset in (0..length).rev() {
            if let Some(pixel) = out.get_mut(at + offset) {
                *pixel = self.suffix[code];
            }
            code = self.prefix[code] as usize;
        }
        length
    }
}

/// Decompresses a GIF image body into `out`, which must be sized to the frame's pixel count.
pub(crate) fn lzw_decode(buf: &[u8], minimum_code_size: u8, out: &mut [u8]) -> LzwReport {
    let mut report = LzwReport::default();

    if minimum_code_size > MAX_MIN_CODE_SIZE {
        warn!("minimum code size {minimum_code_size} is out of range");
        out.fill(0);
        report.invalid_code = Some(0);
        return report;
    }

    let clear_code: u16 = 1 << minimum_code_size;
    let end_of_information_code = clear_code + 1;
    debug!("clear_code={clear_code} end_of_information_code={end_of_information_code}");

    let mut code_table = CodeTable::new(minimum_code_size);
    let mut reader = BitReader::new(buf);
    let mut code_size = minimum_code_size + 1;
    let mut last_code: Option<u16> = None;
    let mut written = 0;

    while let Some(code) = reader.next(code_size) {
        if code == clear_code {
            code_size = minimum_code_size + 1;
            code_table.reset();
            last_code = None;
            continue;
        }

        if code == end_of_information_code {
            break;
        }

        let Some(previous) = last_code else {
            // first code after a clear, nothing to extend yet
            if code_table.contains(code) {
                written += code_table.write(code, out, written);
                last_code = Some(code);
            } else {
                debug!("skipping degenerate first code {code}");
            }
            continue;
        };

        // let K be the first index of {CODE}, or of {CODE-1} when CODE is not in the table yet
        let k = if code_table.contains(code) {
            code_table.first[code as usize]
        } else if code as usize == code_table.next {
            code_table.first[previous as usize]
        } else {
            warn!("code {code} is past the end of the code table ({})", code_table.next);
            report.invalid_code = Some(code);
            break;
        };

        if !code_table.is_full() {
            code_table.push(previous, k);
            if code_table.next == 1 << code_size && code_size < MAX_CODE_SIZE {
                code_size += 1;
            }
        }

        written += code_table.write(code, out, written);
        last_code = Some(code);
    }

    if written > out.len() {
        report.overflowed = true;
        written = out.len();
    } else {
        out[written..].fill(0);
    }
    report.written = written;
    debug!("lzw decoded {written} of {} pixels, {} bits left over", out.len(), reader.remaining());
    report
}
