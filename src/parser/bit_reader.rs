pub(crate) struct BitReader<'a> {
    buf: &'a [u8],
    // index by bit instead of by byte
    position: usize,
    length: usize,
}

impl<'a> BitReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            position: 0,
            length: buf.len() * 8,
        }
    }

    /// Reads the next `count` bits (at most 16), least significant bit first.
    pub(crate) fn next(&mut self, count: u8) -> Option<u16> {
        debug_assert!(count <= 16);
        let start_position = self.position;
        let end_position = self.position + count as usize;

        if end_position > self.length {
            return None;
        }

        // end_position not inclusive, i always forget..
        let mut value: u16 = 0;
        let mut position = start_position;
        while position < end_position {
            let byte = self.buf[position >> 3];
            let shift = position & 7;
            // take as many bits as this byte still holds, up to what's left to read
            let take = (8 - shift).min(end_position - position);
            let bits = (byte >> shift) as u16 & ((1u16 << take) - 1);
            value |= bits << (position - start_position);
            position += take;
        }

        self.position = end_position;
        Some(value)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.length - self.position
    }
}
