use std::fmt::Debug;

/// Either a successful value or a failure.
///
/// Like [`Result`], but with the variant names used throughout this workspace.
/// Converts to and from [`Result`] without loss.
#[must_use = "this `Outcome` may be a `Failure`, which should be handled"]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Outcome<T, E> {
    Success(T),
    Failure(E),
}

use Outcome::{Failure, Success};

impl<T, E> Outcome<T, E> {
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Success(..))
    }

    #[inline]
    pub const fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// Returns the success value.
    ///
    /// # Panics
    /// If this is a `Failure`. Use [`Outcome::success`] or one of the
    /// `value_or` variants to handle that case.
    #[track_caller]
    pub fn value(self) -> T
    where
        E: Debug,
    {
        match self {
            Success(value) => value,
            Failure(error) => {
                panic!("called `Outcome::value()` on a `Failure` value: {error:?}")
            }
        }
    }

    /// Returns the failure value.
    ///
    /// # Panics
    /// If this is a `Success`.
    #[track_caller]
    pub fn error(self) -> E
    where
        T: Debug,
    {
        match self {
            Failure(error) => error,
            Success(value) => {
                panic!("called `Outcome::error()` on a `Success` value: {value:?}")
            }
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            Success(value) => Some(value),
            Failure(..) => None,
        }
    }

    pub fn failure(self) -> Option<E> {
        match self {
            Success(..) => None,
            Failure(error) => Some(error),
        }
    }

    pub const fn as_ref(&self) -> Outcome<&T, &E> {
        match self {
            Success(value) => Success(value),
            Failure(error) => Failure(error),
        }
    }

    pub fn value_or(self, default: T) -> T {
        match self {
            Success(value) => value,
            Failure(..) => default,
        }
    }

    pub fn value_or_else(self, default: impl FnOnce(E) -> T) -> T {
        match self {
            Success(value) => value,
            Failure(error) => default(error),
        }
    }

    pub fn map_value<U>(self, transform: impl FnOnce(T) -> U) -> Outcome<U, E> {
        match self {
            Success(value) => Success(transform(value)),
            Failure(error) => Failure(error),
        }
    }

    pub fn map_error<F>(self, transform: impl FnOnce(E) -> F) -> Outcome<T, F> {
        match self {
            Success(value) => Success(value),
            Failure(error) => Failure(transform(error)),
        }
    }

    /// Chains another fallible step onto a `Success`.
    pub fn and_then<U>(self, next: impl FnOnce(T) -> Outcome<U, E>) -> Outcome<U, E> {
        match self {
            Success(value) => next(value),
            Failure(error) => Failure(error),
        }
    }

    /// Chains a recovery step onto a `Failure`.
    pub fn and_then_error<F>(self, next: impl FnOnce(E) -> Outcome<T, F>) -> Outcome<T, F> {
        match self {
            Success(value) => Success(value),
            Failure(error) => next(error),
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        self.into()
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Success(value),
            Err(error) => Failure(error),
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, E> {
    fn from(outcome: Outcome<T, E>) -> Self {
        match outcome {
            Success(value) => Ok(value),
            Failure(error) => Err(error),
        }
    }
}
