mod bit_reader;
mod color_table;
mod decoder;
mod lzw;
mod stream;

pub use color_table::ColorTable;
pub use decoder::{LogicalScreenDescriptor, LoopCount, Version};
pub(crate) use decoder::{Parser, Step};

/// What happens to a frame's pixels once the next frame is drawn.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMethod {
    #[default]
    None = 0,
    Keep = 1,
    RestoreBackground = 2,
    RestorePrevious = 3,
}

impl DisposalMethod {
    /// Reserved values (4-7) are treated as no disposal.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => DisposalMethod::Keep,
            2 => DisposalMethod::RestoreBackground,
            3 => DisposalMethod::RestorePrevious,
            _ => DisposalMethod::None,
        }
    }

    pub fn is_restore(self) -> bool {
        matches!(self, DisposalMethod::RestoreBackground | DisposalMethod::RestorePrevious)
    }
}
