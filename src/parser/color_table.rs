use std::fmt;

/// A global or local palette.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ColorTable(Box<[[u8; 3]]>);

impl ColorTable {
    pub fn from_rgb_bytes(bytes: &[u8]) -> Self {
        Self(
            bytes
                .chunks_exact(3)
                .map(|rgb| [rgb[0], rgb[1], rgb[2]])
                .collect(),
        )
    }

    /// Byte length of a table whose packed size field is `exponent`.
    pub(crate) fn byte_len(exponent: u8) -> usize {
        3 * (1 << ((exponent & 0b111) + 1))
    }

    /// Indices the table doesn't cover resolve to black.
    pub fn resolve(&self, index: u8) -> [u8; 3] {
        self.0.get(index as usize).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.0
    }
}

impl fmt::Debug for ColorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColorTable({} colors)", self.0.len())
    }
}
