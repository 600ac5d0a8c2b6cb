/// How frames are composited over the ones before them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisposalMode {
    /// Only looks at the last finished frame: when it asked to be restored (to background or
    /// to previous) the next frame starts from a blank canvas, otherwise from a copy of it.
    #[default]
    Simplified,
    /// GIF89a disposal: restore-to-background clears only the previous frame's rectangle and
    /// restore-to-previous brings back the canvas from before that frame was drawn.
    Conformant,
}

/// What to do with truncated or malformed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptionPolicy {
    /// Decode whatever is there; missing bytes read as zero.
    #[default]
    Tolerant,
    /// Fail the load with `DecodeError::CorruptStream`.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecoderOptions {
    pub(crate) wait_till_done: bool,
    pub(crate) first_frame_only: bool,
    pub(crate) disposal: DisposalMode,
    pub(crate) corruption: CorruptionPolicy,
    pub(crate) speed: f64,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            wait_till_done: true,
            first_frame_only: false,
            disposal: DisposalMode::default(),
            corruption: CorruptionPolicy::default(),
            speed: 1.0,
        }
    }
}

impl DecoderOptions {
    /// When set, `on_load` fires once after the last frame instead of after every frame.
    pub fn wait_till_done(mut self, wait_till_done: bool) -> Self {
        self.wait_till_done = wait_till_done;
        self
    }

    /// Stop parsing after the first image.
    pub fn first_frame_only(mut self, first_frame_only: bool) -> Self {
        self.first_frame_only = first_frame_only;
        self
    }

    pub fn disposal(mut self, disposal: DisposalMode) -> Self {
        self.disposal = disposal;
        self
    }

    pub fn corruption(mut self, corruption: CorruptionPolicy) -> Self {
        self.corruption = corruption;
        self
    }

    /// Initial playback speed. Negative plays backwards, zero starts paused.
    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }
}
