//! Progressive GIF decoding and frame-accurate playback.
//!
//! A [`Gif`] fetches and parses a GIF one block at a time, compositing every image into a
//! full-canvas RGBA [`Bitmap`], and then drives playback over the decoded frames.

mod compositor;
mod error;
mod events;
mod fetch;
mod frame;
mod handle;
mod options;
mod parser;
pub mod ppm_writer;
mod scheduler;

#[cfg(test)]
mod test_support;

pub use error::DecodeError;
pub use events::Progress;
pub use fetch::{Fetch, FileFetcher, Response, GIF_CONTENT_TYPE};
pub use frame::{Bitmap, Frame};
pub use handle::{CancelHandle, Gif, LoadOutcome};
pub use options::{CorruptionPolicy, DecoderOptions, DisposalMode};
pub use parser::{ColorTable, DisposalMethod, LogicalScreenDescriptor, LoopCount, Version};
