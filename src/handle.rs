use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use tokio::time::Instant;

use crate::error::DecodeError;
use crate::events::{Events, Progress};
use crate::fetch::Fetch;
use crate::frame::{Bitmap, Frame};
use crate::options::DecoderOptions;
use crate::parser::{ColorTable, LogicalScreenDescriptor, LoopCount, Parser, Step, Version};
use crate::scheduler::Playback;

/// How a load ended when it didn't fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Complete,
    Cancelled,
}

type CancelCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct LoadControl {
    loading: bool,
    pending_cancel: Option<CancelCallback>,
}

/// Cancels an in-progress load from anywhere, including from inside a callback.
///
/// The parser looks at it once per parsed block.
#[derive(Clone, Default)]
pub struct CancelHandle {
    control: Arc<Mutex<LoadControl>>,
}

impl CancelHandle {
    /// Asks the running load to stop after its current block. `callback` fires once the load
    /// has wound down. Returns false, and drops `callback`, if nothing is loading or a cancel
    /// is already pending.
    pub fn cancel_load(&self, callback: impl FnOnce() + Send + 'static) -> bool {
        let mut control = self.lock();
        if !control.loading || control.pending_cancel.is_some() {
            return false;
        }
        control.pending_cancel = Some(Box::new(callback));
        true
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    fn begin(&self) {
        let mut control = self.lock();
        control.loading = true;
        control.pending_cancel = None;
    }

    fn cancel_requested(&self) -> bool {
        self.lock().pending_cancel.is_some()
    }

    /// Ends the load, handing back the cancel callback if one was registered.
    fn settle(&self) -> Option<CancelCallback> {
        let mut control = self.lock();
        control.loading = false;
        control.pending_cancel.take()
    }

    fn lock(&self) -> MutexGuard<'_, LoadControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let control = self.lock();
        f.debug_struct("CancelHandle")
            .field("loading", &control.loading)
            .field("cancel_pending", &control.pending_cancel.is_some())
            .finish()
    }
}

/// A decoded (or decoding) animated GIF plus its playback state.
pub struct Gif {
    options: DecoderOptions,
    frames: Vec<Frame>,
    screen: Option<LogicalScreenDescriptor>,
    version: Option<Version>,
    global_color_table: Option<ColorTable>,
    comment: String,
    loop_count: Option<LoopCount>,
    length: u64,
    // frame the next image is composited over, only set while parsing
    last_frame: Option<usize>,
    complete: bool,
    cancelled: bool,
    playback: Playback,
    control: CancelHandle,
    events: Events,
}

impl Default for Gif {
    fn default() -> Self {
        Self::new()
    }
}

impl Gif {
    pub fn new() -> Self {
        Self::with_options(DecoderOptions::default())
    }

    pub fn with_options(options: DecoderOptions) -> Self {
        Self {
            options,
            frames: Vec::new(),
            screen: None,
            version: None,
            global_color_table: None,
            comment: String::new(),
            loop_count: None,
            length: 0,
            last_frame: None,
            complete: false,
            cancelled: false,
            playback: Playback::new(options.speed),
            control: CancelHandle::default(),
            events: Events::default(),
        }
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    pub fn on_progress(&mut self, callback: impl FnMut(Progress) + Send + 'static) {
        self.events.progress.set(callback);
    }

    /// Receives the number of frames decoded so far.
    pub fn on_load(&mut self, callback: impl FnMut(usize) + Send + 'static) {
        self.events.load.set(callback);
    }

    pub fn on_error(&mut self, callback: impl FnMut(String) + Send + 'static) {
        self.events.error.set(callback);
    }

    pub fn on_load_all(&mut self, mut callback: impl FnMut() + Send + 'static) {
        self.events.load_all.set(move |()| callback());
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.control.clone()
    }

    /// Fetches `url` and decodes it.
    pub async fn load<F: Fetch>(&mut self, fetcher: &F, url: &str) -> Result<LoadOutcome, DecodeError> {
        self.begin_load();
        info!("loading {url}");

        let response = match fetcher.fetch(url).await {
            Ok(response) => response,
            Err(source) => {
                return Err(self.fail(DecodeError::Network {
                    url: url.into(),
                    source,
                }))
            }
        };
        if !response.is_ok() {
            return Err(self.fail(DecodeError::Status {
                url: url.into(),
                status: response.status,
            }));
        }
        if !response.is_gif() {
            return Err(self.fail(DecodeError::UnexpectedContentType {
                url: url.into(),
                content_type: response.content_type.unwrap_or_default(),
            }));
        }

        self.parse(response.body).await
    }

    /// Decodes GIF bytes that are already in memory.
    pub async fn decode(&mut self, bytes: Vec<u8>) -> Result<LoadOutcome, DecodeError> {
        self.begin_load();
        self.parse(bytes).await
    }

    fn begin_load(&mut self) {
        self.frames.clear();
        self.screen = None;
        self.version = None;
        self.global_color_table = None;
        self.comment.clear();
        self.loop_count = None;
        self.length = 0;
        self.last_frame = None;
        self.complete = false;
        self.cancelled = false;
        self.playback = Playback::new(self.options.speed);
        self.control.begin();
    }

    async fn parse(&mut self, bytes: Vec<u8>) -> Result<LoadOutcome, DecodeError> {
        let mut parser = Parser::new(bytes, self.options);

        loop {
            let previous = self.last_frame.map(|index| &self.frames[index]);
            let step = match parser.step(previous) {
                Ok(step) => step,
                Err(err) => return Err(self.fail(err)),
            };
            if self.screen.is_none() {
                self.screen = parser.screen();
            }

            let finished = match step {
                Step::Continue => false,
                Step::Frame(frame) => {
                    self.push_frame(frame, &parser);
                    false
                }
                Step::Finished => true,
            };

            if finished || self.control.cancel_requested() {
                return Ok(self.finish(parser));
            }

            // let the host run between blocks
            tokio::task::yield_now().await;
        }
    }

    fn push_frame(&mut self, frame: Frame, parser: &Parser) {
        self.length = frame.end_time();
        self.frames.push(frame);
        self.last_frame = Some(self.frames.len() - 1);
        if self.frames.len() == 1 {
            self.playback.rewind(&self.frames);
        }

        let frame_count = self.frames.len();
        self.events.progress.fire(Progress {
            bytes_read: parser.bytes_read(),
            total_bytes: parser.total_bytes(),
            frame: frame_count,
        });
        if !self.options.wait_till_done {
            self.events.load.fire(frame_count);
        }
    }

    fn finish(&mut self, parser: Parser) -> LoadOutcome {
        let cancel = self.control.settle();

        let metadata = parser.finish();
        self.version = metadata.version;
        self.global_color_table = metadata.global_color_table;
        self.comment = metadata.comment;
        self.loop_count = metadata.loop_count;
        self.last_frame = None;
        self.playback.rewind(&self.frames);

        let frame_count = self.frames.len();
        match cancel {
            // a cancelled load reports through its cancel callback only
            Some(callback) => {
                self.cancelled = true;
                info!("load cancelled after {frame_count} frames");
                callback();
                LoadOutcome::Cancelled
            }
            None => {
                self.complete = true;
                info!("loaded {frame_count} frames, {} ms", self.length);
                self.events.load_all.fire(());
                if self.options.wait_till_done {
                    self.events.load.fire(frame_count);
                }
                LoadOutcome::Complete
            }
        }
    }

    fn fail(&mut self, err: DecodeError) -> DecodeError {
        warn!("load failed: {err}");
        // a cancel that races an error has nothing left to stop
        drop(self.control.settle());
        self.last_frame = None;
        self.events.fail(err.to_string());
        err
    }

    pub fn width(&self) -> u16 {
        self.screen.map_or(0, |screen| screen.screen_width)
    }

    pub fn height(&self) -> u16 {
        self.screen.map_or(0, |screen| screen.screen_height)
    }

    pub fn screen(&self) -> Option<&LogicalScreenDescriptor> {
        self.screen.as_ref()
    }

    pub fn version(&self) -> Option<Version> {
        self.version
    }

    pub fn global_color_table(&self) -> Option<&ColorTable> {
        self.global_color_table.as_ref()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total duration in milliseconds.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn loop_count(&self) -> Option<LoopCount> {
        self.loop_count
    }

    pub fn is_loading(&self) -> bool {
        self.control.is_loading()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Index of the frame on screen.
    pub fn current_frame(&self) -> Option<usize> {
        self.playback.displayed()
    }

    /// The bitmap a renderer should show right now.
    pub fn current_bitmap(&self) -> Option<&Bitmap> {
        self.playback
            .displayed()
            .and_then(|index| self.frames.get(index))
            .map(|frame| &frame.image)
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn speed(&self) -> f64 {
        self.playback.speed()
    }

    /// Negative speeds play backwards; zero pauses.
    pub fn set_speed(&mut self, speed: f64) {
        self.playback.set_speed(speed);
    }

    pub fn play(&mut self) {
        self.playback.play(&self.frames);
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn stop(&mut self) {
        self.playback.stop(&self.frames);
    }

    pub fn toggle_play(&mut self) {
        self.playback.toggle(&self.frames);
    }

    pub fn seek(&mut self, time_ms: u64) {
        self.playback.seek(&self.frames, self.length, time_ms);
    }

    pub fn seek_frame(&mut self, index: usize) {
        self.playback.seek_frame(&self.frames, index);
    }

    /// Waits for the next tick and shows the frame it's due for. Returns `None` right away
    /// when playback isn't running.
    pub async fn next_tick(&mut self) -> Option<usize> {
        let deadline = self.playback.deadline()?;
        tokio::time::sleep_until(deadline).await;
        self.playback.tick(&self.frames, Instant::now())
    }
}

impl fmt::Debug for Gif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gif")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("frames", &self.frames.len())
            .field("length", &self.length)
            .field("complete", &self.complete)
            .field("cancelled", &self.cancelled)
            .field("playback", &self.playback)
            .finish()
    }
}
