use std::{any::Any, borrow::Cow, cell::RefCell};

type Payload = Box<dyn Any + Send + 'static>;
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An unexpected fault intercepted by a catching scope.
///
/// The cause is kept as-is: either the payload of a panic that unwound out of
/// the block, or an error the block reported through
/// [`Scope::raise`](crate::Scope::raise) or [`Scope::attempt`](crate::Scope::attempt).
pub struct Fault {
    cause: Cause,
    location: Option<FaultLocation>,
}

enum Cause {
    Panic(Payload),
    Error(BoxError),
}

impl Fault {
    pub fn from_panic(payload: Box<dyn Any + Send + 'static>) -> Self {
        Self {
            cause: Cause::Panic(payload),
            location: None,
        }
    }

    pub fn from_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::from_boxed_error(Box::new(error))
    }

    pub fn from_boxed_error(error: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        Self {
            cause: Cause::Error(error),
            location: None,
        }
    }

    pub(crate) fn with_location(self, location: Option<FaultLocation>) -> Self {
        Self { location, ..self }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self.cause, Cause::Panic(..))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.cause, Cause::Error(..))
    }

    /// A readable message for the cause, if there is one.
    ///
    /// Panics with a `&str` or `String` payload (what `panic!` produces) are
    /// borrowed. Error causes are rendered with `Display`.
    pub fn message(&self) -> Option<Cow<'_, str>> {
        match &self.cause {
            Cause::Panic(payload) => payload
                .downcast_ref::<&'static str>()
                .map(|s| Cow::Borrowed(*s))
                .or_else(|| payload.downcast_ref::<String>().map(|s| Cow::Borrowed(&**s))),
            Cause::Error(error) => Some(Cow::Owned(error.to_string())),
        }
    }

    /// Downcasts a panic payload.
    pub fn downcast_ref<X: Any>(&self) -> Option<&X> {
        match &self.cause {
            Cause::Panic(payload) => payload.downcast_ref(),
            Cause::Error(..) => None,
        }
    }

    pub fn error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match &self.cause {
            Cause::Error(error) => Some(&**error),
            Cause::Panic(..) => None,
        }
    }

    /// Where the panic was raised, when location capture was enabled.
    pub fn location(&self) -> Option<&FaultLocation> {
        self.location.as_ref()
    }

    pub fn into_panic_payload(self) -> Result<Box<dyn Any + Send + 'static>, Self> {
        match self.cause {
            Cause::Panic(payload) => Ok(payload),
            cause => Err(Self { cause, ..self }),
        }
    }

    pub fn into_error(self) -> Result<Box<dyn std::error::Error + Send + Sync + 'static>, Self> {
        match self.cause {
            Cause::Error(error) => Ok(error),
            cause => Err(Self { cause, ..self }),
        }
    }

    /// Raises the fault again on the normal panic channel.
    ///
    /// A panic cause is resumed with its original payload. An error cause
    /// panics with the `Fault` itself as the payload, so a catching scope
    /// further out gets the error object back.
    #[track_caller]
    pub fn resume(self) -> ! {
        match self.into_panic_payload() {
            Ok(payload) => {
                // the hook does not run for a resumed payload
                clear_panic_location();
                std::panic::resume_unwind(payload)
            }
            Err(fault) => std::panic::panic_any(fault),
        }
    }
}

impl std::fmt::Debug for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Fault");
        match &self.cause {
            Cause::Panic(..) => s.field("panic", &self.message()),
            Cause::Error(error) => s.field("error", error),
        };
        s.field("location", &self.location).finish()
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(msg) => f.write_str(&msg)?,
            None => f.write_str("opaque panic payload")?,
        }
        if let Some(location) = &self.location {
            write!(f, " (at {location})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.cause {
            Cause::Error(error) => Some(&**error),
            Cause::Panic(..) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultLocation {
    file: Box<str>,
    line: u32,
    column: u32,
}

impl FaultLocation {
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl std::fmt::Display for FaultLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

thread_local! {
    static LAST_PANIC: RefCell<Option<FaultLocation>> = RefCell::new(None);
}

static LOCATION_HOOK: once_cell::sync::OnceCell<()> = once_cell::sync::OnceCell::new();

/// Chains a panic hook that records where the latest panic on this thread
/// was raised. Installed at most once per process.
pub(crate) fn install_location_hook() {
    LOCATION_HOOK.get_or_init(|| {
        log::debug!("installing panic location hook");

        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(loc) = info.location() {
                let location = FaultLocation {
                    file: loc.file().into(),
                    line: loc.line(),
                    column: loc.column(),
                };
                // the thread may be tearing down its locals
                let _ = LAST_PANIC.try_with(|slot| slot.replace(Some(location)));
            }
            previous(info)
        }));
    });
}

pub(crate) fn clear_panic_location() {
    let _ = LAST_PANIC.try_with(|slot| slot.take());
}

pub(crate) fn take_panic_location() -> Option<FaultLocation> {
    LAST_PANIC.try_with(|slot| slot.take()).ok().flatten()
}
