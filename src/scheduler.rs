//! Playback state: which frame is up next, which one is on screen, and when the next
//! tick is due.

use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use crate::frame::Frame;

#[derive(Debug)]
pub(crate) struct Playback {
    current: usize,
    displayed: Option<usize>,
    speed: f64,
    // deadline of the one outstanding tick, if playing
    timer: Option<Instant>,
}

impl Playback {
    pub(crate) fn new(speed: f64) -> Self {
        Self {
            current: 0,
            displayed: None,
            speed: sanitize(speed),
            timer: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> usize {
        self.current
    }

    pub(crate) fn displayed(&self) -> Option<usize> {
        self.displayed
    }

    pub(crate) fn speed(&self) -> f64 {
        self.speed
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.timer.is_some()
    }

    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.timer
    }

    pub(crate) fn set_speed(&mut self, speed: f64) {
        self.speed = sanitize(speed);
        if self.speed == 0.0 {
            self.pause();
        }
    }

    /// Arms the timer for an immediate tick, unless already playing.
    pub(crate) fn play(&mut self, frames: &[Frame]) {
        if self.timer.is_none() && !frames.is_empty() && self.speed != 0.0 {
            self.timer = Some(Instant::now());
        }
    }

    pub(crate) fn pause(&mut self) {
        self.timer = None;
    }

    pub(crate) fn stop(&mut self, frames: &[Frame]) {
        self.pause();
        self.rewind(frames);
    }

    pub(crate) fn toggle(&mut self, frames: &[Frame]) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play(frames);
        }
    }

    /// Shows the first frame, if there is one.
    pub(crate) fn rewind(&mut self, frames: &[Frame]) {
        self.current = 0;
        self.displayed = (!frames.is_empty()).then_some(0);
    }

    /// Shows the current frame, steps toward the next one and re-arms the timer for when
    /// the shown frame's delay is over. Returns the index now on screen.
    pub(crate) fn tick(&mut self, frames: &[Frame], now: Instant) -> Option<usize> {
        if frames.is_empty() || self.speed == 0.0 {
            self.timer = None;
            return None;
        }

        let count = frames.len();
        let index = self.current % count;
        self.displayed = Some(index);

        let delay = scaled_delay(frames[index].delay, self.speed);
        self.current = if self.speed > 0.0 {
            (index + 1) % count
        } else {
            (index + count - 1) % count
        };
        self.timer = Some(now + delay);

        debug!("showing frame {index} for {delay:?}");
        Some(index)
    }

    /// Jumps to the frame showing at `time_ms`, wrapping around the total `length`.
    pub(crate) fn seek(&mut self, frames: &[Frame], length: u64, time_ms: u64) {
        if frames.is_empty() {
            return;
        }
        let index = if length == 0 {
            0
        } else {
            let time = time_ms % length;
            frames
                .iter()
                .position(|frame| time < frame.end_time())
                .unwrap_or(frames.len() - 1)
        };
        self.jump(index);
    }

    pub(crate) fn seek_frame(&mut self, frames: &[Frame], index: usize) {
        if frames.is_empty() {
            return;
        }
        self.jump(index % frames.len());
    }

    fn jump(&mut self, index: usize) {
        self.current = index;
        self.displayed = Some(index);
        if self.timer.is_some() {
            self.timer = Some(Instant::now());
        }
    }
}

fn sanitize(speed: f64) -> f64 {
    if speed.is_finite() {
        speed
    } else {
        0.0
    }
}

/// A frame's delay at the given playback speed; only the magnitude of `speed` counts.
pub(crate) fn scaled_delay(delay_ms: u32, speed: f64) -> Duration {
    Duration::from_micros((f64::from(delay_ms) * 1000.0 / speed.abs()).round() as u64)
}
