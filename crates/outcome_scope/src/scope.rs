use std::{convert::Infallible, marker::PhantomData};

use outcome_types::Outcome;

use crate::Fault;

/// The success type of the explicit returns: they never produce a value.
pub type Never = Infallible;

// invariant in 's, so two activations never share a brand
type Brand<'s> = PhantomData<fn(&'s ()) -> &'s ()>;

/// Handle given to a block run by [`run`] or [`run_catching`](crate::run_catching).
///
/// Every operation that ends the block hands back an [`Exit`] through `Err`.
/// The block propagates it with `?`, and the boundary that created this scope
/// absorbs it. Only the `?` ends the block: an `Exit` that is dropped, or
/// turned into an `Option` with `.ok()`, leaves the block running. The `'s` brand is fresh per activation, so neither the handle
/// nor its exits can leave the block or be absorbed by another scope:
///
/// ```compile_fail
/// use outcome_scope::{run, Outcome};
///
/// let outer: Outcome<i32, String> = run(|outer| {
///     let inner: Outcome<i32, String> = run(|_inner| {
///         outer.return_failure(String::from("escaped"))?;
///         Ok(1)
///     });
///     outer.unwrap(inner)
/// });
/// ```
pub struct Scope<'s, T, E> {
    brand: Brand<'s>,
    _types: PhantomData<fn() -> (T, E)>,
}

/// Termination signal of a scope block.
#[must_use = "an `Exit` only ends the scope once the block returns it"]
#[derive(Debug)]
pub struct Exit<'s, T, E> {
    pub(crate) termination: Termination<T, E>,
    _brand: Brand<'s>,
}

#[derive(Debug)]
pub(crate) enum Termination<T, E> {
    Unwrapped(E),
    Success(T),
    Failure(E),
    Fault(Fault),
}

impl<'s, T, E> Scope<'s, T, E> {
    pub(crate) fn new() -> Self {
        Self {
            brand: PhantomData,
            _types: PhantomData,
        }
    }

    /// Yields the value of a `Success`, or exits the scope with the `Failure`.
    ///
    /// The outcome's error type must already be the scope's `E`; use
    /// [`Outcome::map_error`] first when it is not.
    pub fn unwrap<U>(&self, outcome: Outcome<U, E>) -> Result<U, Exit<'s, T, E>> {
        match outcome {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(error) => Err(self.exit(Termination::Unwrapped(error))),
        }
    }

    pub fn unwrap_result<U>(&self, result: Result<U, E>) -> Result<U, Exit<'s, T, E>> {
        self.unwrap(result.into())
    }

    /// Ends the scope with `Success(value)`.
    pub fn return_success(&self, value: T) -> Result<Never, Exit<'s, T, E>> {
        Err(self.exit(Termination::Success(value)))
    }

    /// Ends the scope with `Failure(error)`.
    pub fn return_failure(&self, error: E) -> Result<Never, Exit<'s, T, E>> {
        Err(self.exit(Termination::Failure(error)))
    }

    pub fn ensure(
        &self,
        condition: bool,
        error: impl FnOnce() -> E,
    ) -> Result<(), Exit<'s, T, E>> {
        if !condition {
            self.return_failure(error())?;
        }
        Ok(())
    }

    /// Ends the scope with an unexpected fault.
    ///
    /// [`run`] raises the fault again as a panic, while
    /// [`run_catching`](crate::run_catching) reports it as
    /// [`ScopeFault::UnexpectedFault`](crate::ScopeFault::UnexpectedFault).
    pub fn raise(&self, fault: Fault) -> Result<Never, Exit<'s, T, E>> {
        Err(self.exit(Termination::Fault(fault)))
    }

    /// Like [`Scope::unwrap_result`] for errors outside the scope's domain:
    /// an `Err` ends the scope with an unexpected fault, see [`Scope::raise`].
    pub fn attempt<U, X>(&self, result: Result<U, X>) -> Result<U, Exit<'s, T, E>>
    where
        X: std::error::Error + Send + Sync + 'static,
    {
        result.map_err(|error| self.exit(Termination::Fault(Fault::from_error(error))))
    }

    fn exit(&self, termination: Termination<T, E>) -> Exit<'s, T, E> {
        Exit {
            termination,
            _brand: self.brand,
        }
    }
}

impl<T, E> std::fmt::Debug for Scope<'_, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope").finish_non_exhaustive()
    }
}

/// Runs `block`, turning the first exit it returns into the outcome.
///
/// A block that finishes with `Ok(value)` produces `Success(value)`. Panics
/// are not intercepted here, see [`run_catching`](crate::run_catching). A
/// fault raised by the block is resumed with [`Fault::resume`].
///
/// ```
/// use outcome_scope::{run, Outcome};
///
/// fn parse(input: &str) -> Outcome<i32, String> {
///     input
///         .parse::<i32>()
///         .map_err(|_| format!("not a number: {input}"))
///         .into()
/// }
///
/// let sum = run(|scope| {
///     let a = scope.unwrap(parse("1"))?;
///     let b = scope.unwrap(parse("2"))?;
///     Ok(a + b)
/// });
/// assert_eq!(sum, Outcome::Success(3));
///
/// let sum = run(|scope| {
///     let a = scope.unwrap(parse("1"))?;
///     let b = scope.unwrap(parse("two"))?;
///     Ok(a + b)
/// });
/// assert_eq!(sum, Outcome::Failure(String::from("not a number: two")));
/// ```
#[track_caller]
pub fn run<T, E, F>(block: F) -> Outcome<T, E>
where
    F: for<'s> FnOnce(&Scope<'s, T, E>) -> Result<T, Exit<'s, T, E>>,
{
    let scope = Scope::new();
    let termination = match block(&scope) {
        Ok(value) => {
            log::trace!("scope completed");
            return Outcome::Success(value);
        }
        Err(exit) => exit.termination,
    };

    match termination {
        Termination::Unwrapped(error) => {
            log::trace!("scope short-circuited on a failure");
            Outcome::Failure(error)
        }
        Termination::Success(value) => {
            log::trace!("scope returned a success");
            Outcome::Success(value)
        }
        Termination::Failure(error) => {
            log::trace!("scope returned a failure");
            Outcome::Failure(error)
        }
        Termination::Fault(fault) => {
            log::debug!("scope raised a fault, resuming it: {fault}");
            fault.resume()
        }
    }
}
