//! Sequential reader over the raw bytes of a GIF.
//!
//! Reads never fail. Once the cursor passes the end of the buffer, missing bytes read as
//! zero and slices come back short; `overrun()` records that this happened so a strict
//! caller can turn it into an error.

pub(crate) struct ByteStream {
    data: Vec<u8>,
    position: usize,
    overrun: bool,
}

impl ByteStream {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            position: 0,
            overrun: false,
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.position >= self.data.len()
    }

    pub(crate) fn overrun(&self) -> bool {
        self.overrun
    }

    pub(crate) fn read_byte(&mut self) -> u8 {
        match self.data.get(self.position) {
            Some(&byte) => {
                self.position += 1;
                byte
            }
            None => {
                self.overrun = true;
                0
            }
        }
    }

    pub(crate) fn read_u16(&mut self) -> u16 {
        // GIF89a: multi-byte numeric fields are little endian
        u16::from_le_bytes([self.read_byte(), self.read_byte()])
    }

    pub(crate) fn read_bytes(&mut self, count: usize) -> &[u8] {
        let start = self.position.min(self.data.len());
        let end = start.saturating_add(count).min(self.data.len());
        if end - start < count {
            self.overrun = true;
        }
        self.position = end;
        &self.data[start..end]
    }

    /// Next `count` bytes as Latin-1 text.
    pub(crate) fn read_string(&mut self, count: usize) -> String {
        latin1(self.read_bytes(count))
    }

    /// Concatenated payload of a sub-block sequence, as Latin-1 text.
    pub(crate) fn read_sub_blocks(&mut self) -> String {
        latin1(&self.read_sub_blocks_as_vec())
    }

    pub(crate) fn read_sub_blocks_as_vec(&mut self) -> Vec<u8> {
        let mut result = Vec::new();
        self.for_each_sub_block(|block| result.extend_from_slice(block));
        result
    }

    pub(crate) fn skip_sub_blocks(&mut self) {
        self.for_each_sub_block(|_| {});
    }

    fn for_each_sub_block(&mut self, mut f: impl FnMut(&[u8])) {
        // a stream without a terminator just runs into the end of the buffer
        while !self.is_exhausted() {
            let block_size = self.read_byte();
            if block_size == 0 {
                break;
            }
            f(self.read_bytes(block_size.into()));
        }
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| byte as char).collect()
}

#[cfg(test)]
mod tests {
    use super::ByteStream;

    #[test]
    fn reads_little_endian_fields() {
        let mut stream = ByteStream::new(vec![0x0a, 0x00, 0x34, 0x12, 0xff]);
        assert_eq!(stream.read_u16(), 10);
        assert_eq!(stream.read_u16(), 0x1234);
        assert_eq!(stream.read_byte(), 0xff);
        assert!(stream.is_exhausted());
        assert!(!stream.overrun());
    }

    #[test]
    fn sub_blocks_are_concatenated() {
        let mut stream = ByteStream::new(vec![3, b'a', b'b', b'c', 2, b'd', b'e', 0, 0x3b]);
        assert_eq!(stream.read_sub_blocks(), "abcde");
        assert_eq!(stream.read_byte(), 0x3b);
    }

    #[test]
    fn strings_are_latin1() {
        let mut stream = ByteStream::new(vec![b'G', 0xe9, 0xff]);
        assert_eq!(stream.read_string(3), "G\u{e9}\u{ff}");
    }

    #[test]
    fn truncated_sub_blocks_return_what_is_available() {
        let mut stream = ByteStream::new(vec![5, 1, 2]);
        assert_eq!(stream.read_sub_blocks_as_vec(), vec![1, 2]);
        assert!(stream.is_exhausted());
        assert!(stream.overrun());
    }

    #[test]
    fn missing_terminator_stops_at_end_of_buffer() {
        let mut stream = ByteStream::new(vec![1, 7, 1, 8]);
        assert_eq!(stream.read_sub_blocks_as_vec(), vec![7, 8]);
        assert_eq!(stream.position(), stream.len());
    }

    #[test]
    fn reads_past_end_yield_zero() {
        let mut stream = ByteStream::new(vec![1]);
        assert_eq!(stream.read_byte(), 1);
        assert!(!stream.overrun());
        assert_eq!(stream.read_u16(), 0);
        assert_eq!(stream.read_bytes(4), &[] as &[u8]);
        assert!(stream.overrun());
        assert_eq!(stream.position(), 1);
    }
}
