#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct CatchOptions {
    pub(crate) capture_location: bool,
    pub(crate) log_level: Option<log::Level>,
}

impl Default for CatchOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl CatchOptions {
    pub const fn new() -> Self {
        Self {
            capture_location: true,
            log_level: Some(log::Level::Debug),
        }
    }

    /// Record where intercepted panics were raised.
    ///
    /// This chains a process-wide panic hook the first time it is needed.
    /// The previously installed hook still runs.
    pub fn with_capture_location(self, capture_location: bool) -> Self {
        Self {
            capture_location,
            ..self
        }
    }

    /// Level used to log intercepted faults, `None` to stay quiet.
    pub fn with_log_level(self, level: impl Into<Option<log::Level>>) -> Self {
        Self {
            log_level: level.into(),
            ..self
        }
    }
}
