/// Reported after every composited frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub bytes_read: usize,
    pub total_bytes: usize,
    /// Number of frames decoded so far.
    pub frame: usize,
}

/// A callback slot. Firing an empty slot does nothing, and a disarmed slot stays empty
/// until a new callback is registered.
pub(crate) struct Hook<T> {
    callback: Option<Box<dyn FnMut(T) + Send>>,
}

impl<T> Default for Hook<T> {
    fn default() -> Self {
        Self { callback: None }
    }
}

impl<T> Hook<T> {
    pub(crate) fn set(&mut self, callback: impl FnMut(T) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub(crate) fn fire(&mut self, value: T) {
        if let Some(callback) = self.callback.as_mut() {
            callback(value);
        }
    }

    pub(crate) fn disarm(&mut self) {
        self.callback = None;
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.callback.is_some()
    }
}

#[derive(Default)]
pub(crate) struct Events {
    pub(crate) progress: Hook<Progress>,
    pub(crate) load: Hook<usize>,
    pub(crate) error: Hook<String>,
    pub(crate) load_all: Hook<()>,
}

impl Events {
    /// Reports a failed load. Load and error hooks are disarmed so a failure is only ever
    /// reported once.
    pub(crate) fn fail(&mut self, message: String) {
        self.error.fire(message);
        self.error.disarm();
        self.load.disarm();
    }
}
