use rand::{seq::index, Rng};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("Draw count must be between 1 and {pool} (got {requested})")]
    CountOutOfRange { requested: i64, pool: usize },
}

/// Samples `count` distinct elements of `pool` uniformly without replacement.
///
/// Every subset of size `count` is equally likely and the returned order is shuffled.
/// `count` outside `1..=pool.len()` is rejected before any randomness is consumed.
pub fn draw<T: Clone, R: Rng + ?Sized>(pool: &[T], count: i64, rng: &mut R) -> Result<Vec<T>, DrawError> {
    let amount = usize::try_from(count)
        .ok()
        .filter(|&k| k > 0 && k <= pool.len())
        .ok_or(DrawError::CountOutOfRange { requested: count, pool: pool.len() })?;

    Ok(index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|idx| pool[idx].clone())
        .collect())
}
