use std::panic::{catch_unwind, AssertUnwindSafe};

use outcome_types::Outcome;

use crate::{fault, scope::Termination, CatchOptions, Exit, Fault, Scope};

/// Error side of [`run_catching`]: a domain failure, or something that broke
/// underneath the block.
#[derive(Debug)]
pub enum ScopeFault<E> {
    /// Came from an unwrapped outcome or an explicit failing return.
    ExpectedFailure(E),
    /// A panic, or a fault raised through [`Scope::raise`] / [`Scope::attempt`].
    UnexpectedFault(Fault),
}

impl<E> ScopeFault<E> {
    pub fn is_expected_failure(&self) -> bool {
        matches!(self, Self::ExpectedFailure(..))
    }

    pub fn is_unexpected_fault(&self) -> bool {
        matches!(self, Self::UnexpectedFault(..))
    }

    pub fn expected_failure(self) -> Option<E> {
        match self {
            Self::ExpectedFailure(error) => Some(error),
            Self::UnexpectedFault(..) => None,
        }
    }

    pub fn unexpected_fault(self) -> Option<Fault> {
        match self {
            Self::UnexpectedFault(fault) => Some(fault),
            Self::ExpectedFailure(..) => None,
        }
    }

    pub fn as_expected_failure(&self) -> Option<&E> {
        match self {
            Self::ExpectedFailure(error) => Some(error),
            Self::UnexpectedFault(..) => None,
        }
    }

    pub fn as_unexpected_fault(&self) -> Option<&Fault> {
        match self {
            Self::UnexpectedFault(fault) => Some(fault),
            Self::ExpectedFailure(..) => None,
        }
    }

    /// The expected failure, or `default` for an unexpected fault.
    pub fn value_or(self, default: E) -> E {
        self.expected_failure().unwrap_or(default)
    }

    pub fn map_expected<F>(self, transform: impl FnOnce(E) -> F) -> ScopeFault<F> {
        match self {
            Self::ExpectedFailure(error) => ScopeFault::ExpectedFailure(transform(error)),
            Self::UnexpectedFault(fault) => ScopeFault::UnexpectedFault(fault),
        }
    }

    /// Collapses into a single `E`, converting an unexpected fault with `transform`.
    pub fn into_failure(self, transform: impl FnOnce(Fault) -> E) -> E {
        match self {
            Self::ExpectedFailure(error) => error,
            Self::UnexpectedFault(fault) => transform(fault),
        }
    }
}

impl<E> std::fmt::Display for ScopeFault<E>
where
    E: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExpectedFailure(error) => write!(f, "{error}"),
            Self::UnexpectedFault(fault) => write!(f, "unexpected fault: {fault}"),
        }
    }
}

impl<E> std::error::Error for ScopeFault<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ExpectedFailure(error) => Some(error),
            Self::UnexpectedFault(fault) => Some(fault),
        }
    }
}

/// Helpers for the outcome of [`run_catching`].
pub trait CatchingOutcome<T, E> {
    /// Folds unexpected faults back into the domain error type.
    ///
    /// Expected failures pass through without calling `transform`.
    fn map_unexpected_fault(self, transform: impl FnOnce(Fault) -> E) -> Outcome<T, E>;

    fn is_expected_failure(&self) -> bool;

    fn is_unexpected_fault(&self) -> bool;
}

impl<T, E> CatchingOutcome<T, E> for Outcome<T, ScopeFault<E>> {
    fn map_unexpected_fault(self, transform: impl FnOnce(Fault) -> E) -> Outcome<T, E> {
        self.map_error(|fault| fault.into_failure(transform))
    }

    fn is_expected_failure(&self) -> bool {
        matches!(self, Outcome::Failure(fault) if fault.is_expected_failure())
    }

    fn is_unexpected_fault(&self) -> bool {
        matches!(self, Outcome::Failure(fault) if fault.is_unexpected_fault())
    }
}

/// Like [`run`](crate::run), but panics unwinding out of `block` are
/// intercepted and reported as [`ScopeFault::UnexpectedFault`].
///
/// Domain failures are reported as [`ScopeFault::ExpectedFailure`]. Nothing
/// can be intercepted when the binary is built with `panic = "abort"`.
///
/// ```
/// use outcome_scope::{run_catching, CatchingOutcome, Outcome, ScopeFault};
///
/// let outcome: Outcome<u32, ScopeFault<String>> = run_catching(|scope| {
///     let items: Vec<u32> = vec![];
///     let first = scope.unwrap_result(items.first().copied().ok_or("empty".to_string()))?;
///     Ok(first)
/// });
/// assert!(outcome.is_expected_failure());
///
/// let outcome: Outcome<u32, ScopeFault<String>> = run_catching(|_| {
///     let items: Vec<u32> = vec![];
///     Ok(items[0])
/// });
/// assert!(outcome.is_unexpected_fault());
///
/// let collapsed = outcome.map_unexpected_fault(|fault| format!("internal error: {fault}"));
/// assert!(collapsed.error().starts_with("internal error: index out of bounds"));
/// ```
pub fn run_catching<T, E, F>(block: F) -> Outcome<T, ScopeFault<E>>
where
    F: for<'s> FnOnce(&Scope<'s, T, E>) -> Result<T, Exit<'s, T, E>>,
{
    run_catching_with(CatchOptions::default(), block)
}

pub fn run_catching_with<T, E, F>(options: CatchOptions, block: F) -> Outcome<T, ScopeFault<E>>
where
    F: for<'s> FnOnce(&Scope<'s, T, E>) -> Result<T, Exit<'s, T, E>>,
{
    if options.capture_location {
        fault::install_location_hook();
    }
    fault::clear_panic_location();

    let scope = Scope::new();
    let termination = match catch_unwind(AssertUnwindSafe(|| block(&scope))) {
        Ok(Ok(value)) => {
            log::trace!("catching scope completed");
            return Outcome::Success(value);
        }
        Ok(Err(exit)) => exit.termination,
        Err(payload) => {
            // always taken, so a later catch never sees this panic's location
            let location = fault::take_panic_location().filter(|_| options.capture_location);
            let fault = match payload.downcast::<Fault>() {
                Ok(fault) => *fault,
                Err(payload) => Fault::from_panic(payload).with_location(location),
            };
            report(&options, "panicked", &fault);
            return Outcome::Failure(ScopeFault::UnexpectedFault(fault));
        }
    };

    match termination {
        Termination::Unwrapped(error) => {
            log::trace!("catching scope short-circuited on a failure");
            Outcome::Failure(ScopeFault::ExpectedFailure(error))
        }
        Termination::Success(value) => {
            log::trace!("catching scope returned a success");
            Outcome::Success(value)
        }
        Termination::Failure(error) => {
            log::trace!("catching scope returned a failure");
            Outcome::Failure(ScopeFault::ExpectedFailure(error))
        }
        Termination::Fault(fault) => {
            report(&options, "raised a fault", &fault);
            Outcome::Failure(ScopeFault::UnexpectedFault(fault))
        }
    }
}

fn report(options: &CatchOptions, what: &str, fault: &Fault) {
    if let Some(level) = options.log_level {
        log::log!(level, "catching scope {what}: {fault}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outcome_types::Outcome::{Failure, Success};

    #[derive(Debug, PartialEq)]
    enum AppError {
        NotFound(String),
        Internal(String),
    }

    #[test]
    fn success_passes_through() {
        let outcome: Outcome<i32, ScopeFault<&str>> = run_catching(|scope| {
            let a = scope.unwrap(Success(5))?;
            Ok(a + 1)
        });
        assert_eq!(outcome.value_or(0), 6);

        let outcome: Outcome<i32, ScopeFault<&str>> = run_catching(|scope| {
            scope.return_success(2)?;
            Ok(1)
        });
        assert!(outcome.is_success());
        assert_eq!(outcome.value_or(0), 2);
    }

    #[test]
    fn panic_is_unexpected_fault() {
        let mut reached = false;
        let outcome: Outcome<i32, ScopeFault<&str>> = run_catching(|scope| {
            scope.unwrap(Success(5))?;
            if !reached {
                panic!("x");
            }
            reached = true;
            Ok(1)
        });

        assert!(outcome.is_unexpected_fault());
        assert!(!outcome.is_expected_failure());
        assert!(!reached);

        let fault = outcome.error().unexpected_fault().expect("a fault");
        assert!(fault.is_panic());
        assert_eq!(fault.message().as_deref(), Some("x"));
    }

    #[test]
    fn unwrapped_failure_is_expected() {
        let outcome: Outcome<i32, ScopeFault<&str>> = run_catching(|scope| {
            scope.unwrap(<Outcome<(), _>>::Failure("err"))?;
            Ok(1)
        });

        assert!(outcome.is_expected_failure());
        assert!(!outcome.is_unexpected_fault());
        assert_eq!(outcome.error().expected_failure(), Some("err"));
    }

    #[test]
    fn explicit_failures_are_expected() {
        let outcome: Outcome<(), ScopeFault<&str>> = run_catching(|scope| {
            scope.return_failure("boom")?;
            Ok(())
        });
        assert_eq!(outcome.error().as_expected_failure(), Some(&"boom"));

        let outcome: Outcome<(), ScopeFault<&str>> = run_catching(|scope| {
            scope.ensure(false, || "unmet")?;
            Ok(())
        });
        assert_eq!(outcome.error().expected_failure(), Some("unmet"));
    }

    #[test]
    fn attempted_errors_keep_their_cause() {
        let outcome: Outcome<i32, ScopeFault<AppError>> =
            run_catching(|scope| scope.attempt("nine".parse::<i32>()));

        let fault = outcome.error().unexpected_fault().expect("a fault");
        assert!(fault.is_error());
        assert!(fault
            .error()
            .expect("an error cause")
            .is::<std::num::ParseIntError>());
    }

    #[test]
    fn raised_faults_are_unexpected() {
        let outcome: Outcome<(), ScopeFault<AppError>> = run_catching(|scope| {
            scope.raise(Fault::from_panic(Box::new(7_i64)))?;
            Ok(())
        });

        let fault = outcome.error().unexpected_fault().expect("a fault");
        assert_eq!(fault.downcast_ref::<i64>(), Some(&7));
    }

    #[test]
    fn map_unexpected_fault() {
        let expected: Outcome<(), ScopeFault<AppError>> =
            Failure(ScopeFault::ExpectedFailure(AppError::NotFound(String::from("user"))));
        let outcome =
            expected.map_unexpected_fault(|_| unreachable!("expected failures pass through"));
        assert_eq!(outcome, Failure(AppError::NotFound(String::from("user"))));

        let unexpected: Outcome<(), ScopeFault<AppError>> =
            run_catching(|_| panic!("disk on fire"));
        let outcome = unexpected.map_unexpected_fault(|fault| {
            AppError::Internal(fault.message().unwrap_or_default().into_owned())
        });
        assert_eq!(outcome, Failure(AppError::Internal(String::from("disk on fire"))));

        let success: Outcome<i32, ScopeFault<AppError>> = Success(3);
        let outcome = success.map_unexpected_fault(|_| unreachable!("successes pass through"));
        assert_eq!(outcome, Success(3));
    }

    #[test]
    fn collapse_into_anyhow() {
        let outcome: Outcome<i32, ScopeFault<anyhow::Error>> = run_catching(|scope| {
            let value = scope.unwrap_result(Err(anyhow::anyhow!("missing config")))?;
            Ok(value)
        });
        let error = outcome
            .map_unexpected_fault(|fault| anyhow::anyhow!("internal: {fault}"))
            .error();
        assert_eq!(error.to_string(), "missing config");

        let outcome: Outcome<i32, ScopeFault<anyhow::Error>> =
            run_catching(|_| panic!("lost the handle"));
        let error = outcome
            .map_unexpected_fault(|fault| {
                anyhow::anyhow!("internal: {}", fault.message().unwrap_or_default())
            })
            .error();
        assert_eq!(error.to_string(), "internal: lost the handle");
    }

    #[test]
    fn scope_fault_accessors() {
        let expected = <ScopeFault<&str>>::ExpectedFailure("e");
        assert!(expected.is_expected_failure());
        assert!(expected.as_unexpected_fault().is_none());
        assert_eq!(expected.to_string(), "e");
        assert_eq!(expected.value_or("default"), "e");

        let fault = Fault::from_panic(Box::new("oops"));
        let unexpected = <ScopeFault<&str>>::UnexpectedFault(fault);
        assert!(unexpected.is_unexpected_fault());
        assert!(unexpected.as_expected_failure().is_none());
        assert_eq!(unexpected.to_string(), "unexpected fault: oops");
        assert_eq!(unexpected.value_or("default"), "default");

        let mapped = <ScopeFault<&str>>::ExpectedFailure("abc").map_expected(str::len);
        assert_eq!(mapped.expected_failure(), Some(3));
    }

    #[test]
    fn nested_catching_scope_absorbs_panics() {
        let outcome: Outcome<i32, ScopeFault<&str>> = run_catching(|outer| {
            let inner: Outcome<i32, ScopeFault<&str>> = run_catching(|_| panic!("inner"));
            let recovered = inner.map_unexpected_fault(|_| "inner fault");
            outer.unwrap(recovered.and_then_error(|_| Success(40))).map(|n| n + 2)
        });
        assert_eq!(outcome.value_or(0), 42);
    }

    #[test]
    fn plain_scope_panics_reach_catching_scope() {
        let mut after = false;
        let outcome: Outcome<i32, ScopeFault<&str>> = run_catching(|scope| {
            let inner: Outcome<i32, &str> = crate::run(|_| panic!("from plain scope"));
            after = true;
            scope.unwrap(inner)
        });

        assert!(!after);
        let fault = outcome.error().unexpected_fault().expect("a fault");
        assert_eq!(fault.message().as_deref(), Some("from plain scope"));
    }

    #[test]
    fn nested_plain_scope_keeps_error_cause() {
        let outcome: Outcome<i32, ScopeFault<()>> = run_catching(|scope| {
            let inner: Outcome<i32, ()> =
                crate::run(|inner| inner.attempt("x1".parse::<i32>()));
            scope.unwrap(inner)
        });

        let fault = outcome.error().unexpected_fault().expect("a fault");
        assert!(fault.is_error());
        assert!(fault
            .error()
            .expect("an error cause")
            .is::<std::num::ParseIntError>());
        assert!(fault.location().is_none());

        let outcome: Outcome<(), ScopeFault<()>> = run_catching(|_| {
            let inner: Outcome<(), ()> = crate::run(|inner| {
                inner.raise(Fault::from_panic(Box::new(7_i64)))?;
                Ok(())
            });
            Ok(inner.value_or(()))
        });
        let fault = outcome.error().unexpected_fault().expect("a fault");
        assert_eq!(fault.downcast_ref::<i64>(), Some(&7));
    }

    #[test]
    fn resumed_panic_ignores_earlier_location() {
        let quiet = CatchOptions::new()
            .with_capture_location(false)
            .with_log_level(None);

        let outcome: Outcome<(), ScopeFault<()>> = run_catching(|_| {
            let first: Outcome<(), ScopeFault<()>> =
                run_catching_with(quiet, |_| panic!("first"));
            assert!(first.is_unexpected_fault());

            let second: Outcome<(), ()> = crate::run(|scope| {
                scope.raise(Fault::from_panic(Box::new("second")))?;
                Ok(())
            });
            Ok(second.value_or(()))
        });

        let fault = outcome.error().unexpected_fault().expect("a fault");
        assert_eq!(fault.message().as_deref(), Some("second"));
        assert!(fault.location().is_none());
    }

    #[test]
    fn captures_panic_location() {
        let line = line!() + 2;
        let outcome: Outcome<(), ScopeFault<()>> = run_catching(|_| {
            panic!("here");
        });

        let fault = outcome.error().unexpected_fault().expect("a fault");
        let location = fault.location().expect("location captured");
        assert!(location.file().ends_with("catching.rs"));
        assert_eq!(location.line(), line);
    }

    #[test]
    fn location_capture_can_be_disabled() {
        let options = CatchOptions::new()
            .with_capture_location(false)
            .with_log_level(None);
        let outcome: Outcome<(), ScopeFault<()>> =
            run_catching_with(options, |_| panic!("quiet"));

        let fault = outcome.error().unexpected_fault().expect("a fault");
        assert!(fault.location().is_none());
        assert_eq!(fault.message().as_deref(), Some("quiet"));
    }
}
