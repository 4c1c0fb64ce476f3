use crate::Outcome;

/// Collects every success value, in order, or returns the first failure.
///
/// Elements after the first failure are not pulled from the iterator.
pub fn collect<I, T, E>(outcomes: I) -> Outcome<Vec<T>, E>
where
    I: IntoIterator<Item = Outcome<T, E>>,
{
    outcomes.into_iter().collect()
}

/// Maps the value of every `Success`, keeping each `Failure` as-is.
///
/// Unlike [`collect`] this visits every element.
pub fn map_values<I, T, E, U>(outcomes: I, mut transform: impl FnMut(T) -> U) -> Vec<Outcome<U, E>>
where
    I: IntoIterator<Item = Outcome<T, E>>,
{
    outcomes
        .into_iter()
        .map(|outcome| outcome.map_value(&mut transform))
        .collect()
}

impl<T, E, C> FromIterator<Outcome<T, E>> for Outcome<C, E>
where
    C: FromIterator<T>,
{
    fn from_iter<I: IntoIterator<Item = Outcome<T, E>>>(iter: I) -> Self {
        iter.into_iter()
            .map(Outcome::into_result)
            .collect::<Result<C, E>>()
            .into()
    }
}
