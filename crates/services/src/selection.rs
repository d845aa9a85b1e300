//! Random card selection and presentation shuffles shared by both quiz engines.

use rand::Rng;
use rand::seq::SliceRandom;

use cards_core::model::MAX_QUIZ_CARDS;

/// Picks up to `MAX_QUIZ_CARDS` candidates uniformly at random, without replacement.
///
/// The returned order is the question order.
pub fn select_cards<T, R: Rng + ?Sized>(mut candidates: Vec<T>, rng: &mut R) -> Vec<T> {
    candidates.as_mut_slice().shuffle(rng);
    candidates.truncate(MAX_QUIZ_CARDS);
    candidates
}

/// A uniformly random permutation of `items`.
pub fn shuffled<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.as_mut_slice().shuffle(rng);
    out
}

/// A uniformly random permutation of `canonical` that differs from it.
///
/// With fewer than two elements there is no other permutation, so the input comes
/// back unchanged. Resampling stops within two draws on average.
pub fn non_canonical_shuffle<T: Clone + PartialEq, R: Rng + ?Sized>(
    canonical: &[T],
    rng: &mut R,
) -> Vec<T> {
    let mut out = canonical.to_vec();
    if out.len() < 2 {
        return out;
    }
    loop {
        out.as_mut_slice().shuffle(rng);
        if out != canonical {
            return out;
        }
    }
}
